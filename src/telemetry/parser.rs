//! Incremental parser for the status publisher's line protocol
//!
//! The publisher writes newline-terminated text lines:
//!
//! ```text
//! STATUS:<tag0><tag1>:<mfc>:<flow>:<setpoint>:<gas>   full reading
//! STATUS:<mfc>:<flow>                                short reading
//! ERROR:<text>
//! INFO:<text>
//! ```
//!
//! `<gas>` is either a numeric gas code (decimal, `0x` hex or leading-zero
//! octal) or a gas name from the [`GasTable`]. Codes outside the table are
//! kept as text only. `<tag0><tag1>` may be any two bytes.
//!
//! Reads from the publisher arrive in arbitrary chunks, so [`TelemetryLineParser`]
//! buffers partial lines between [`feed`](TelemetryLineParser::feed) calls and only
//! hands out complete ones from [`drain`](TelemetryLineParser::drain).

use tracing::{debug, warn};

use crate::types::{DeviceTag, GasTable, MfcId};
use crate::{BridgeError, Result};

const STATUS_PREFIX: &str = "STATUS:";
const ERROR_PREFIX: &str = "ERROR:";
const INFO_PREFIX: &str = "INFO:";

/// Longest partial line kept while waiting for its newline.
pub const MAX_PARTIAL_LINE: usize = 4096;

/// Kind of a parsed telemetry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Status,
    Error,
    Info,
}

/// Structured content of a `STATUS:` line.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReading {
    pub mfc: MfcId,
    pub flow: f32,
    /// Present only for the full grammar
    pub setpoint: Option<f32>,
    /// Present only for the full grammar
    pub device_tag: Option<DeviceTag>,
    /// Gas code from the [`GasTable`], numeric or resolved from a gas name
    pub gas_code: Option<u8>,
    /// Gas field exactly as the publisher wrote it
    pub gas_token: Option<String>,
}

impl StatusReading {
    /// Whether the line used the full six-field grammar.
    pub fn is_full(&self) -> bool {
        self.setpoint.is_some()
    }

    /// Human-readable gas for log lines.
    pub fn gas_label(&self) -> &str {
        match (self.gas_code, self.gas_token.as_deref()) {
            (Some(code), _) => GasTable::name_of(code),
            (None, Some(token)) => token,
            (None, None) => "-",
        }
    }
}

/// One parsed telemetry line.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryRecord {
    Status(StatusReading),
    Error(String),
    Info(String),
}

impl TelemetryRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            TelemetryRecord::Status(_) => RecordKind::Status,
            TelemetryRecord::Error(_) => RecordKind::Error,
            TelemetryRecord::Info(_) => RecordKind::Info,
        }
    }
}

/// Buffering line parser for the publisher's output stream.
#[derive(Debug, Default)]
pub struct TelemetryLineParser {
    buffer: Vec<u8>,
    rejected: usize,
}

impl TelemetryLineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes read from the stream.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Remove every complete line from the buffer and parse it.
    ///
    /// Unparsable lines are logged and skipped. Bytes after the last newline stay
    /// buffered for the next call.
    pub fn drain(&mut self) -> Vec<TelemetryRecord> {
        let mut records = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = match &self.buffer[start..end] {
                [rest @ .., b'\r'] => rest,
                line => line,
            };
            start = end + 1;

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match parse_raw_line(line) {
                Ok(record) => records.push(record),
                Err(err) if line.starts_with(STATUS_PREFIX.as_bytes()) => {
                    self.rejected += 1;
                    warn!("Failed to parse status: {}", err);
                }
                Err(err) => {
                    debug!("Ignoring publisher output: {}", err);
                }
            }
        }

        self.buffer.drain(..start);

        if self.buffer.len() > MAX_PARTIAL_LINE {
            warn!(
                "Discarding {} buffered bytes without a line break from the status publisher",
                self.buffer.len()
            );
            self.buffer.clear();
            self.rejected += 1;
        }

        records
    }

    /// Number of rejected status lines since the last call, resetting the count.
    pub fn take_rejected(&mut self) -> usize {
        std::mem::take(&mut self.rejected)
    }

    /// Bytes held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Parse a single line without its terminator.
pub fn parse_line(line: &str) -> Result<TelemetryRecord> {
    parse_raw_line(line.as_bytes())
}

/// Status lines are split on raw bytes so the device tag survives any encoding;
/// everything else is decoded lossily.
fn parse_raw_line(line: &[u8]) -> Result<TelemetryRecord> {
    if let Some(rest) = line.strip_prefix(STATUS_PREFIX.as_bytes()) {
        return parse_status(line, rest).map(TelemetryRecord::Status);
    }

    let text = String::from_utf8_lossy(line);
    if let Some(text) = text.strip_prefix(ERROR_PREFIX) {
        return Ok(TelemetryRecord::Error(text.trim().to_string()));
    }
    if let Some(text) = text.strip_prefix(INFO_PREFIX) {
        return Ok(TelemetryRecord::Info(text.trim().to_string()));
    }

    Err(BridgeError::telemetry_parse(text, "no STATUS/ERROR/INFO prefix"))
}

fn rejected(line: &[u8], details: impl Into<String>) -> BridgeError {
    BridgeError::telemetry_parse(String::from_utf8_lossy(line), details)
}

fn parse_status(line: &[u8], rest: &[u8]) -> Result<StatusReading> {
    if let [tag0, tag1, b':', fields @ ..] = rest {
        let tag = DeviceTag::new(*tag0, *tag1);
        if let Some(reading) = parse_full_status(tag, &String::from_utf8_lossy(fields)) {
            return reading.map_err(|details| rejected(line, details));
        }
    }

    let rest = String::from_utf8_lossy(rest);
    let fields: Vec<&str> = rest.split(':').collect();
    let [mfc, flow] = fields.as_slice() else {
        return Err(rejected(line, format!("expected 5 or 2 fields, found {}", fields.len())));
    };

    let flow = parse_float(flow).ok_or_else(|| rejected(line, format!("bad flow '{}'", flow)))?;
    let mfc = parse_mfc(mfc).map_err(|details| rejected(line, details))?;

    Ok(StatusReading { mfc, flow, setpoint: None, device_tag: None, gas_code: None, gas_token: None })
}

/// Fields after the tag. `None` when they do not have the full shape,
/// `Some(Err)` when they do but name an invalid controller.
fn parse_full_status(tag: DeviceTag, fields: &str) -> Option<std::result::Result<StatusReading, String>> {
    let mut fields = fields.splitn(4, ':');
    let mfc = fields.next()?;
    let flow = parse_float(fields.next()?)?;
    let setpoint = parse_float(fields.next()?)?;
    let gas = fields.next()?.trim();

    if gas.is_empty() {
        return None;
    }
    let raw_mfc = mfc.trim().parse::<i64>().ok()?;

    let reading = MfcId::new(raw_mfc).map_err(|e| e.to_string()).map(|mfc| StatusReading {
        mfc,
        flow,
        setpoint: Some(setpoint),
        device_tag: Some(tag),
        gas_code: parse_gas_code(gas),
        gas_token: Some(gas.to_string()),
    });

    Some(reading)
}

fn parse_mfc(field: &str) -> std::result::Result<MfcId, String> {
    let raw = field.trim().parse::<i64>().map_err(|_| format!("bad mfc id '{}'", field))?;
    MfcId::new(raw).map_err(|e| e.to_string())
}

fn parse_float(field: &str) -> Option<f32> {
    field.trim().parse::<f32>().ok()
}

/// Numeric gas code or a lookup by gas name; only codes in the table count.
fn parse_gas_code(token: &str) -> Option<u8> {
    let code = match parse_integer(token) {
        Some(value) => u8::try_from(value).ok()?,
        None => GasTable::code_of(token)?,
    };
    GasTable::contains(code).then_some(code)
}

/// Integer with C-style radix prefixes: `0x1f`, `017`, `23`.
fn parse_integer(token: &str) -> Option<i64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };

    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };

    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn status(record: &TelemetryRecord) -> &StatusReading {
        match record {
            TelemetryRecord::Status(reading) => reading,
            other => panic!("expected status, got {:?}", other),
        }
    }

    #[test]
    fn full_status_line_with_gas_name() {
        let mut parser = TelemetryLineParser::new();
        parser.feed(b"STATUS:BL:0:1.5000:10.0000:METHANE\n");

        let records = parser.drain();
        assert_eq!(records.len(), 1);

        let reading = status(&records[0]);
        assert_eq!(reading.mfc, MfcId::FIRST);
        assert_eq!(reading.flow, 1.5);
        assert_eq!(reading.setpoint, Some(10.0));
        assert_eq!(reading.device_tag, Some(DeviceTag(*b"BL")));
        assert_eq!(reading.gas_code, Some(0x02));
        assert_eq!(reading.gas_label(), "METHANE");
        assert!(reading.is_full());
    }

    #[test]
    fn gas_token_may_be_numeric_or_multi_word() {
        let hex = parse_line("STATUS:BF:1:0.0:2.0:0x0d").unwrap();
        assert_eq!(status(&hex).gas_code, Some(0x0D));

        let decimal = parse_line("STATUS:BF:1:0.0:2.0:7").unwrap();
        assert_eq!(status(&decimal).gas_code, Some(0x07));

        let octal = parse_line("STATUS:BF:1:0.0:2.0:010").unwrap();
        assert_eq!(status(&octal).gas_code, Some(8));

        let spaced = parse_line("STATUS:BF:1:0.0:2.0:CARBON DIOXIDE").unwrap();
        assert_eq!(status(&spaced).gas_code, Some(0x03));

        let unknown = parse_line("STATUS:BF:1:0.0:2.0:ARGON").unwrap();
        assert_eq!(status(&unknown).gas_code, None);
        assert_eq!(status(&unknown).gas_label(), "ARGON");

        let out_of_range = parse_line("STATUS:BF:1:0.0:2.0:300").unwrap();
        assert_eq!(status(&out_of_range).gas_code, None);
    }

    #[test]
    fn gas_codes_outside_the_table_are_kept_as_text_only() {
        let record = parse_line("STATUS:BL:0:1.0:2.0:0xFE").unwrap();
        let reading = status(&record);
        assert_eq!(reading.gas_code, None);
        assert_eq!(reading.gas_token.as_deref(), Some("0xFE"));
        assert_eq!(reading.gas_label(), "0xFE");

        let edge = parse_line("STATUS:BL:0:1.0:2.0:14").unwrap();
        assert_eq!(status(&edge).gas_code, None);
    }

    #[test]
    fn device_tag_may_be_any_two_bytes() {
        let mut parser = TelemetryLineParser::new();
        parser.feed(b"STATUS:\xB0\x01:1:0.5:2.0:AIR\n");

        let records = parser.drain();
        assert_eq!(records.len(), 1);
        let reading = status(&records[0]);
        assert_eq!(reading.device_tag, Some(DeviceTag::new(0xB0, 0x01)));
        assert_eq!(reading.mfc, MfcId::SECOND);
        assert_eq!(reading.gas_code, Some(0x00));
        assert_eq!(parser.take_rejected(), 0);
    }

    #[test]
    fn short_status_line_falls_back() {
        let record = parse_line("STATUS:1:3.25").unwrap();
        let reading = status(&record);
        assert_eq!(reading.mfc, MfcId::SECOND);
        assert_eq!(reading.flow, 3.25);
        assert_eq!(reading.setpoint, None);
        assert_eq!(reading.device_tag, None);
        assert!(!reading.is_full());
    }

    #[test]
    fn out_of_range_mfc_is_rejected_in_both_grammars() {
        assert!(parse_line("STATUS:BL:2:1.0:1.0:AIR").is_err());
        assert!(parse_line("STATUS:5:1.0").is_err());
        assert!(parse_line("STATUS:-1:1.0").is_err());
    }

    #[test]
    fn malformed_status_lines_are_rejected() {
        assert!(parse_line("STATUS:").is_err());
        assert!(parse_line("STATUS:BL:0:abc:1.0:AIR").is_err());
        assert!(parse_line("STATUS:0:1.0:extra").is_err());
        assert!(parse_line("STATUS:BLX:0:1.0:1.0:AIR").is_err());
    }

    #[test]
    fn error_and_info_lines_pass_through() {
        assert_eq!(
            parse_line("ERROR: serial port closed").unwrap(),
            TelemetryRecord::Error("serial port closed".to_string())
        );
        let info = parse_line("INFO:publisher ready").unwrap();
        assert_eq!(info.kind(), RecordKind::Info);
    }

    #[test]
    fn partial_lines_wait_for_their_newline() {
        let mut parser = TelemetryLineParser::new();
        parser.feed(b"STATUS:1:2.");
        assert!(parser.drain().is_empty());
        assert_eq!(parser.pending_len(), 11);

        parser.feed(b"5\r\nINFO:x");
        let records = parser.drain();
        assert_eq!(records.len(), 1);
        assert_eq!(status(&records[0]).flow, 2.5);
        assert_eq!(parser.pending_len(), 6);
    }

    #[test]
    fn rejected_status_lines_are_counted_but_other_noise_is_not() {
        let mut parser = TelemetryLineParser::new();
        parser.feed(b"[SocketServer] Listening\nSTATUS:9:1.0\n\nSTATUS:0:1.0\n");

        let records = parser.drain();
        assert_eq!(records.len(), 1);
        assert_eq!(parser.take_rejected(), 1);
        assert_eq!(parser.take_rejected(), 0);
    }

    #[test]
    fn runaway_partial_line_is_discarded() {
        let mut parser = TelemetryLineParser::new();
        parser.feed(&vec![b'A'; MAX_PARTIAL_LINE + 1]);
        assert!(parser.drain().is_empty());
        assert_eq!(parser.pending_len(), 0);
        assert_eq!(parser.take_rejected(), 1);
    }

    #[test]
    fn invalid_utf8_does_not_poison_the_stream() {
        let mut parser = TelemetryLineParser::new();
        parser.feed(b"INFO:\xFF\xFE\nSTATUS:0:1.0\n");
        let records = parser.drain();
        assert_eq!(records.len(), 2);
    }

    fn arb_line() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u8..=1, 0u32..100_000, 0u32..100_000, "[A-Z]{2}", 0u8..=13).prop_map(
                |(mfc, flow, sp, tag, gas)| format!(
                    "STATUS:{}:{}:{}:{}:{}",
                    tag,
                    mfc,
                    flow as f32 / 1000.0,
                    sp as f32 / 1000.0,
                    GasTable::name_of(gas)
                )
            ),
            (0u8..=3, 0u32..100_000).prop_map(|(mfc, flow)| format!("STATUS:{}:{}", mfc, flow as f32 / 100.0)),
            "[a-z ]{0,20}".prop_map(|text| format!("ERROR:{}", text)),
            "[a-z ]{0,20}".prop_map(|text| format!("INFO:{}", text)),
            "[a-zA-Z0-9:]{0,30}",
        ]
    }

    proptest! {
        #[test]
        fn split_feeds_drain_the_same_records(
            lines in prop::collection::vec(arb_line(), 0..12),
            crlf in any::<bool>(),
            split in any::<prop::sample::Index>()
        ) {
            let terminator = if crlf { "\r\n" } else { "\n" };
            let input: String = lines.iter().map(|l| format!("{}{}", l, terminator)).collect();
            let bytes = input.as_bytes();
            let at = if bytes.is_empty() { 0 } else { split.index(bytes.len() + 1) };

            let mut whole = TelemetryLineParser::new();
            whole.feed(bytes);
            let expected = whole.drain();

            let mut halves = TelemetryLineParser::new();
            halves.feed(&bytes[..at]);
            let mut actual = halves.drain();
            halves.feed(&bytes[at..]);
            actual.extend(halves.drain());

            prop_assert_eq!(actual, expected);
            prop_assert_eq!(halves.pending_len(), 0);
        }
    }
}
