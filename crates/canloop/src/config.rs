//! Loopback exchange configuration
//!
//! Every field has a default, so an empty file describes the default
//! run: frame `123#01020304050607` on `vcan0`, written 50 ms after the
//! reader starts.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, FrameError};
use crate::frame::{parse_can_id, CanFrame};

/// Complete exchange configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// CAN interface name (e.g., "vcan0")
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Read timeout in milliseconds; absent means the read may block forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_ms: Option<u64>,

    /// Outbound frame
    #[serde(default)]
    pub frame: FrameConfig,

    /// When the frame is written relative to the blocking read
    #[serde(default)]
    pub send: SendTiming,
}

fn default_interface() -> String {
    "vcan0".to_string()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            read_timeout_ms: None,
            frame: FrameConfig::default(),
            send: SendTiming::default(),
        }
    }
}

impl ExchangeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without a socket
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interface.trim().is_empty() {
            return Err(ConfigError::Invalid("interface must not be empty".to_string()));
        }
        if self.read_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "read_timeout_ms must be positive; omit it to block forever".to_string(),
            ));
        }
        self.frame
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

/// Outbound frame definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Arbitration ID ("0x123" or decimal)
    #[serde(default = "default_frame_id")]
    pub id: String,

    /// Payload bytes, at most 8
    #[serde(default = "default_frame_data")]
    pub data: Vec<u8>,
}

fn default_frame_id() -> String {
    "0x123".to_string()
}

fn default_frame_data() -> Vec<u8> {
    vec![1, 2, 3, 4, 5, 6, 7]
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            id: default_frame_id(),
            data: default_frame_data(),
        }
    }
}

impl FrameConfig {
    pub fn build(&self) -> Result<CanFrame, FrameError> {
        CanFrame::new(parse_can_id(&self.id)?, &self.data)
    }
}

/// Ordering of the write relative to the blocking read
///
/// The socket is bound before either side starts, so both orderings must
/// produce the same result. The delay only makes it likely that the reader
/// is already blocked when the frame goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SendTiming {
    /// Write from a separate task after a delay while the reader blocks
    AfterDelay {
        #[serde(default = "default_delay_ms")]
        delay_ms: u64,
    },
    /// Write before the read call is made
    BeforeRead,
}

fn default_delay_ms() -> u64 {
    50
}

impl Default for SendTiming {
    fn default() -> Self {
        Self::AfterDelay {
            delay_ms: default_delay_ms(),
        }
    }
}
