//! Frame type exchanged with the radio transport

use std::fmt;
use std::sync::Arc;

/// Immutable radio frame: one command byte followed by its payload.
///
/// Bytes are shared via `Arc` so queued frames can be cloned for logging and
/// retries without copying.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    bytes: Arc<[u8]>,
}

impl Frame {
    /// Create a frame from raw bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes: bytes.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Leading command byte, if any
    pub fn code(&self) -> Option<u8> {
        self.bytes.first().copied()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for Frame {
    fn from(bytes: &[u8]) -> Self {
        Self { bytes: bytes.into() }
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame[{}]", self)
    }
}

impl fmt::Display for Frame {
    /// Space-separated upper-case hex, e.g. `11 00`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}
