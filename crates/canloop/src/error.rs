//! Error types for interface resolution, framing and the loopback exchange

use std::io;

use thiserror::Error;

use crate::frame::CAN_MTU;

/// Errors from resolving an interface name to its kernel index
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Name does not fit the kernel's fixed-size name field
    #[error("interface name '{name}' is {len} bytes, maximum is {max}")]
    NameTooLong { name: String, len: usize, max: usize },

    /// Empty name or a name with an interior NUL byte
    #[error("invalid interface name {0:?}")]
    InvalidName(String),

    /// The kernel rejected the name-to-index query
    #[error("SIOCGIFINDEX failed for '{interface}': {source}")]
    DeviceControlFailed {
        interface: String,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    /// Raw OS error code of a rejected query, if any
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::DeviceControlFailed { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Errors from building or parsing a classic CAN frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("payload is {0} bytes, classic CAN carries at most 8")]
    PayloadTooLong(usize),

    #[error("invalid DLC {0}, expected 0..=8")]
    InvalidDlc(u8),

    #[error("frame is {actual} bytes, expected {expected}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid CAN ID '{0}'")]
    InvalidId(String),
}

/// Errors from the loopback exchange
///
/// Every variant except [`ExchangeError::VerificationMismatch`] is a setup or
/// I/O failure that ends the exchange where it happens.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("failed to open raw CAN socket: {0}")]
    SocketCreationFailed(#[source] io::Error),

    #[error("interface not found: {0}")]
    InterfaceNotFound(#[from] ResolveError),

    #[error("failed to configure socket option: {0}")]
    OptionConfigurationFailed(#[source] io::Error),

    #[error("failed to bind to interface index {ifindex}: {source}")]
    BindFailed {
        ifindex: u32,
        #[source]
        source: io::Error,
    },

    #[error("invalid outbound frame: {0}")]
    InvalidFrame(#[from] FrameError),

    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    #[error("exchange task failed: {0}")]
    TaskFailed(String),

    #[error("sent and received frames differ: sent {sent:02X?}, received {received:02X?}")]
    VerificationMismatch {
        sent: [u8; CAN_MTU],
        received: [u8; CAN_MTU],
    },
}

impl ExchangeError {
    /// Raw OS error code carried by a system-originated failure
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::SocketCreationFailed(e)
            | Self::OptionConfigurationFailed(e)
            | Self::SendFailed(e)
            | Self::ReceiveFailed(e)
            | Self::BindFailed { source: e, .. } => e.raw_os_error(),
            Self::InterfaceNotFound(e) => e.os_code(),
            _ => None,
        }
    }
}

/// Errors from loading an exchange configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
