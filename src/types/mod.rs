//! Core types shared by the bridge components.
//!
//! ## Contents
//!
//! - [`Frame`] is an immutable radio payload, shared via `Arc`
//! - [`Command`] enumerates every uplink and downlink message
//! - [`MfcId`], [`DeviceTag`], [`ActuatorState`] and [`BridgeContext`] hold the
//!   per-controller state the bridge owns
//! - [`GasTable`] maps gas names to wire codes
//! - [`wire`] holds the fixed protocol byte values
//!
//! ## Usage Example
//!
//! ```rust
//! use flowgate::types::{BridgeContext, GasTable, MfcId};
//!
//! let mut ctx = BridgeContext::new();
//! ctx.actuators.get_mut(MfcId::FIRST).last_gas_code = GasTable::code_of("METHANE");
//!
//! assert_eq!(ctx.actuators.get(MfcId::FIRST).last_gas_code, Some(0x02));
//! assert_eq!(GasTable::name_of(0x02), "METHANE");
//! ```

mod command;
mod frame;
mod gas;
mod state;
pub mod wire;

pub use command::{Command, GasSelection};
pub use frame::Frame;
pub use gas::{GasTable, UNKNOWN_GAS};
pub use state::{ActuatorState, BridgeContext, DeviceTag, MfcId, MfcState};
