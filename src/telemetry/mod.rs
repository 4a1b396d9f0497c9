//! Telemetry ingestion from the status publisher
//!
//! [`source`] delivers raw bytes without blocking; [`parser`] turns them into
//! [`TelemetryRecord`]s.

pub mod parser;
pub mod source;

pub use parser::{RecordKind, StatusReading, TelemetryLineParser, TelemetryRecord, parse_line};
pub use source::{PublisherProcess, TelemetrySource};
