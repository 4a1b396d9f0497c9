//! Fixed byte values of the radio frame protocol
//!
//! These values are shared with the network server and must never be renumbered.

// Downlink command codes (network -> device)
pub mod downlink {
    pub const DEVICE_OFF: u8 = 0x00;
    pub const DEVICE_ON: u8 = 0x01;
    pub const SET_SETPOINT: u8 = 0x10;
    pub const REFRESH: u8 = 0x11;
    pub const GAS_SELECT: u8 = 0x21;

    /// Longest downlink accepted for on/off/refresh/gas commands
    pub const MAX_SHORT_COMMAND_LEN: usize = 10;
    pub const SETPOINT_MIN_LEN: usize = 6;
    pub const SETPOINT_MAX_LEN: usize = 15;
    /// Command byte plus one (mfc, gas) pair
    pub const GAS_SELECT_MIN_LEN: usize = 3;
    /// Length at which the second (mfc, gas) pair is present
    pub const GAS_SELECT_PAIR_LEN: usize = 5;
    /// Nothing shorter than this is dispatchable
    pub const MIN_FRAME_LEN: usize = 2;
}

// Uplink command codes (device -> network)
pub mod uplink {
    pub const ACK_SETPOINT: u8 = 0x11; // shares its value with downlink::REFRESH
    pub const ERROR: u8 = 0x1F;
    pub const STATUS_REPORT: u8 = 0x20;
    pub const HEARTBEAT: u8 = 0x30;

    pub const STATUS_REPORT_LEN: usize = 12;
    pub const ERROR_LEN: usize = 3;
    pub const HEARTBEAT_LEN: usize = 2;
    pub const ACK_SETPOINT_LEN: usize = 2;
}

// Error frame sources (byte 1 of an Error uplink)
pub mod error_source {
    pub const STATUS_PUBLISHER: u8 = 0x01;
    pub const RADIO: u8 = 0x03;
    pub const NETWORK_SESSION: u8 = 0x04;
}

// Error frame codes (byte 2 of an Error uplink)
pub mod error_code {
    pub const PUBLISHER_MESSAGE: u8 = 0x02;
    pub const TELEMETRY_PARSE: u8 = 0x03;
    pub const EXCHANGE_TIMEOUT: u8 = 0x04;
    pub const EXCHANGE_FAILURE: u8 = 0x05;
    pub const RADIO_INIT: u8 = 0x06; // not sendable: the radio is down
    pub const SESSION_ACTIVATION: u8 = 0x07; // not sendable: no session
}
