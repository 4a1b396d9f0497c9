//! Per-MFC actuator state and the bridge context that owns it

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FrameError;

/// Identifier of one of the two mass-flow controllers.
///
/// Only `0` and `1` are representable; anything else is rejected at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MfcId(u8);

impl MfcId {
    pub const FIRST: MfcId = MfcId(0);
    pub const SECOND: MfcId = MfcId(1);

    /// Both controllers in id order.
    pub const ALL: [MfcId; 2] = [MfcId::FIRST, MfcId::SECOND];

    /// Validate a raw id.
    pub fn new(id: i64) -> Result<Self, FrameError> {
        match id {
            0 | 1 => Ok(MfcId(id as u8)),
            _ => Err(FrameError::InvalidMfcId { id }),
        }
    }

    /// Wire value of the id.
    pub fn as_u8(self) -> u8 {
        self.0
    }

    /// Index into per-MFC storage.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for MfcId {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        MfcId::new(i64::from(value))
    }
}

impl From<MfcId> for u8 {
    fn from(id: MfcId) -> Self {
        id.0
    }
}

impl fmt::Display for MfcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Two raw device-tag bytes, e.g. `BL`. Any byte value is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceTag(pub [u8; 2]);

impl DeviceTag {
    /// Tag reported before the publisher has named the device.
    pub const UNSET: DeviceTag = DeviceTag(*b"XX");

    pub fn new(first: u8, second: u8) -> Self {
        Self([first, second])
    }

    pub fn bytes(&self) -> [u8; 2] {
        self.0
    }
}

impl Default for DeviceTag {
    fn default() -> Self {
        DeviceTag::UNSET
    }
}

impl fmt::Display for DeviceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Last known readings for one controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MfcState {
    pub current_flow: f32,
    pub current_setpoint: f32,
    pub device_tag: DeviceTag,
    pub last_gas_code: Option<u8>,
}

/// State of both controllers, indexed by [`MfcId`].
#[derive(Debug, Clone, Default)]
pub struct ActuatorState {
    mfcs: [MfcState; 2],
}

impl ActuatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: MfcId) -> &MfcState {
        &self.mfcs[id.index()]
    }

    pub fn get_mut(&mut self, id: MfcId) -> &mut MfcState {
        &mut self.mfcs[id.index()]
    }
}

/// Everything the bridge mutates at runtime.
///
/// Constructed once at startup, owned by the scheduler and lent to the
/// dispatcher for the duration of one downlink.
#[derive(Debug, Clone, Default)]
pub struct BridgeContext {
    pub actuators: ActuatorState,
    pub device_on: bool,
}

impl BridgeContext {
    pub fn new() -> Self {
        Self::default()
    }
}
