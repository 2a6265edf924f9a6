//! Classic CAN frame in its 16-byte raw socket wire form
//!
//! ```text
//! offset  0..4   arbitration ID, u32 little-endian
//! offset  4      DLC (0..=8)
//! offset  5..8   reserved
//! offset  8..16  payload, bytes past DLC are don't-care
//! ```

use std::fmt;

use crate::error::FrameError;

/// Size of a classic CAN frame on a raw socket
pub const CAN_MTU: usize = 16;

/// Maximum classic CAN payload length
pub const CAN_MAX_DLEN: usize = 8;

const ID_RANGE: std::ops::Range<usize> = 0..4;
const DLC_OFFSET: usize = 4;
const DATA_OFFSET: usize = 8;

/// A classic CAN frame kept in its exact wire image
///
/// Parsing preserves every byte, including the reserved bytes and any
/// payload bytes past the DLC, so two frames compare equal only when their
/// wire images are identical.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanFrame([u8; CAN_MTU]);

impl CanFrame {
    /// Build a frame from an arbitration ID word and up to 8 payload bytes
    pub fn new(id: u32, data: &[u8]) -> Result<Self, FrameError> {
        if data.len() > CAN_MAX_DLEN {
            return Err(FrameError::PayloadTooLong(data.len()));
        }

        let mut buf = [0u8; CAN_MTU];
        buf[ID_RANGE].copy_from_slice(&id.to_le_bytes());
        buf[DLC_OFFSET] = data.len() as u8;
        buf[DATA_OFFSET..DATA_OFFSET + data.len()].copy_from_slice(data);
        Ok(Self(buf))
    }

    /// Parse a received wire image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let buf: [u8; CAN_MTU] = bytes.try_into().map_err(|_| FrameError::InvalidLength {
            expected: CAN_MTU,
            actual: bytes.len(),
        })?;

        let dlc = buf[DLC_OFFSET];
        if dlc as usize > CAN_MAX_DLEN {
            return Err(FrameError::InvalidDlc(dlc));
        }
        Ok(Self(buf))
    }

    /// Raw 32-bit ID word, flag bits included
    pub fn id(&self) -> u32 {
        let mut id = [0u8; 4];
        id.copy_from_slice(&self.0[ID_RANGE]);
        u32::from_le_bytes(id)
    }

    pub fn dlc(&self) -> u8 {
        self.0[DLC_OFFSET]
    }

    /// The meaningful payload bytes
    pub fn data(&self) -> &[u8] {
        let len = (self.dlc() as usize).min(CAN_MAX_DLEN);
        &self.0[DATA_OFFSET..DATA_OFFSET + len]
    }

    pub fn as_bytes(&self) -> &[u8; CAN_MTU] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; CAN_MTU] {
        self.0
    }
}

impl fmt::Debug for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanFrame")
            .field("id", &format_args!("0x{:X}", self.id()))
            .field("dlc", &self.dlc())
            .field("data", &format_args!("{:02X?}", self.data()))
            .finish()
    }
}

/// candump-style `123#01020304050607`
impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03X}#", self.id())?;
        for b in self.data() {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl AsRef<[u8]> for CanFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Parse a CAN ID from string (supports hex with 0x prefix)
pub fn parse_can_id(s: &str) -> Result<u32, FrameError> {
    let s = s.trim();
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };

    u32::from_str_radix(digits, radix).map_err(|_| FrameError::InvalidId(s.to_string()))
}
