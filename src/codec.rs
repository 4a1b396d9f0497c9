//! Binary frame codec for the radio link
//!
//! Encodes [`Command`]s into [`Frame`]s and decodes received bytes back into
//! commands. Uplink and downlink frames are separate families (code `0x11` is
//! a refresh request downlink but a setpoint acknowledgment uplink), so there
//! is one decoder per direction.
//!
//! ## Layouts
//!
//! | Command | Direction | Bytes |
//! |---|---|---|
//! | DeviceOff / DeviceOn | down | `[0x00 / 0x01, ..]`, 2..=10 |
//! | SetSetpoint | down | `[0x10, mfc, f32 BE x4, ..]`, 6..=15 |
//! | RefreshRequest | down | `[0x11, ..]`, 2..=10 |
//! | GasSelect | down | `[0x21, mfc, gas, (mfc, gas)?, ..]`, 3..=10 |
//! | StatusReport | up | `[0x20, mfc, setpoint BE x4, flow BE x4, tag x2]` |
//! | Error | up | `[0x1F, source, code]` |
//! | Heartbeat | up | `[0x30, 0x00]` |
//! | AckSetpoint | up | `[0x11, mfc]` |
//!
//! Floats are IEEE-754 single precision, big-endian, reinterpreted bit for bit.

use tracing::warn;

use crate::FrameError;
use crate::types::wire::{downlink, uplink};
use crate::types::{Command, DeviceTag, Frame, GasSelection, MfcId};

/// Encode a command into its frame layout. Total and deterministic.
pub fn encode(command: &Command) -> Frame {
    let bytes = match *command {
        Command::DeviceOff => vec![downlink::DEVICE_OFF, 0x00],
        Command::DeviceOn => vec![downlink::DEVICE_ON, 0x00],
        Command::SetSetpoint { mfc, value } => {
            let mut bytes = Vec::with_capacity(downlink::SETPOINT_MIN_LEN);
            bytes.push(downlink::SET_SETPOINT);
            bytes.push(mfc.as_u8());
            bytes.extend_from_slice(&value.to_bits().to_be_bytes());
            bytes
        }
        Command::RefreshRequest => vec![downlink::REFRESH, 0x00],
        Command::GasSelect { first, second } => {
            let mut bytes = vec![downlink::GAS_SELECT, first.mfc.as_u8(), first.gas_code];
            if let Some(second) = second {
                bytes.push(second.mfc.as_u8());
                bytes.push(second.gas_code);
            }
            bytes
        }
        Command::StatusReport { mfc, setpoint, flow, device_tag } => {
            let mut bytes = Vec::with_capacity(uplink::STATUS_REPORT_LEN);
            bytes.push(uplink::STATUS_REPORT);
            bytes.push(mfc.as_u8());
            bytes.extend_from_slice(&setpoint.to_bits().to_be_bytes());
            bytes.extend_from_slice(&flow.to_bits().to_be_bytes());
            bytes.extend_from_slice(&device_tag.bytes());
            bytes
        }
        Command::Error { source, code } => vec![uplink::ERROR, source, code],
        Command::Heartbeat => vec![uplink::HEARTBEAT, 0x00],
        Command::AckSetpoint { mfc } => vec![uplink::ACK_SETPOINT, mfc.as_u8()],
    };

    Frame::new(bytes)
}

/// Decode a frame received from the network server.
///
/// Frames outside the accepted length range of their command code are
/// rejected with [`FrameError::Length`]; unknown codes with
/// [`FrameError::UnknownCommand`].
pub fn decode_downlink(bytes: &[u8]) -> Result<Command, FrameError> {
    let code = leading_code(bytes)?;
    let len = bytes.len();

    match code {
        downlink::DEVICE_ON => {
            check_len(code, len, downlink::MIN_FRAME_LEN, downlink::MAX_SHORT_COMMAND_LEN)?;
            Ok(Command::DeviceOn)
        }
        downlink::DEVICE_OFF => {
            check_len(code, len, downlink::MIN_FRAME_LEN, downlink::MAX_SHORT_COMMAND_LEN)?;
            Ok(Command::DeviceOff)
        }
        downlink::SET_SETPOINT => {
            check_len(code, len, downlink::SETPOINT_MIN_LEN, downlink::SETPOINT_MAX_LEN)?;
            let mfc = MfcId::try_from(bytes[1])?;
            let value = read_f32_be(&bytes[2..6]);
            Ok(Command::SetSetpoint { mfc, value })
        }
        downlink::REFRESH => {
            check_len(code, len, downlink::MIN_FRAME_LEN, downlink::MAX_SHORT_COMMAND_LEN)?;
            Ok(Command::RefreshRequest)
        }
        downlink::GAS_SELECT => {
            check_len(code, len, downlink::GAS_SELECT_MIN_LEN, downlink::MAX_SHORT_COMMAND_LEN)?;
            let first = GasSelection { mfc: MfcId::try_from(bytes[1])?, gas_code: bytes[2] };
            let second = if len >= downlink::GAS_SELECT_PAIR_LEN {
                second_gas_pair(bytes[3], bytes[4])
            } else {
                None
            };
            Ok(Command::GasSelect { first, second })
        }
        other => Err(FrameError::UnknownCommand { code: other }),
    }
}

/// Decode a frame sent by a device. Lengths must match the encoded layout exactly.
pub fn decode_uplink(bytes: &[u8]) -> Result<Command, FrameError> {
    let code = leading_code(bytes)?;
    let len = bytes.len();

    match code {
        uplink::STATUS_REPORT => {
            check_len(code, len, uplink::STATUS_REPORT_LEN, uplink::STATUS_REPORT_LEN)?;
            Ok(Command::StatusReport {
                mfc: MfcId::try_from(bytes[1])?,
                setpoint: read_f32_be(&bytes[2..6]),
                flow: read_f32_be(&bytes[6..10]),
                device_tag: DeviceTag::new(bytes[10], bytes[11]),
            })
        }
        uplink::ERROR => {
            check_len(code, len, uplink::ERROR_LEN, uplink::ERROR_LEN)?;
            Ok(Command::Error { source: bytes[1], code: bytes[2] })
        }
        uplink::HEARTBEAT => {
            check_len(code, len, uplink::HEARTBEAT_LEN, uplink::HEARTBEAT_LEN)?;
            Ok(Command::Heartbeat)
        }
        uplink::ACK_SETPOINT => {
            check_len(code, len, uplink::ACK_SETPOINT_LEN, uplink::ACK_SETPOINT_LEN)?;
            Ok(Command::AckSetpoint { mfc: MfcId::try_from(bytes[1])? })
        }
        other => Err(FrameError::UnknownCommand { code: other }),
    }
}

/// The second pair is optional: a bad mfc id drops it without touching the first.
fn second_gas_pair(mfc: u8, gas_code: u8) -> Option<GasSelection> {
    match MfcId::try_from(mfc) {
        Ok(mfc) => Some(GasSelection { mfc, gas_code }),
        Err(e) => {
            warn!("Dropping second gas selection pair: {}", e);
            None
        }
    }
}

fn leading_code(bytes: &[u8]) -> Result<u8, FrameError> {
    match bytes {
        [] => Err(FrameError::Empty),
        [_] => Err(FrameError::TooShort { len: 1 }),
        [code, ..] => Ok(*code),
    }
}

fn check_len(code: u8, len: usize, min: usize, max: usize) -> Result<(), FrameError> {
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(FrameError::Length { code, len, min, max })
    }
}

fn read_f32_be(bytes: &[u8]) -> f32 {
    f32::from_bits(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
