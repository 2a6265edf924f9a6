//! canloop - raw SocketCAN interface resolution and loopback exchange
//!
//! This crate opens a `CAN_RAW` socket, resolves an interface name to its
//! kernel index, enables reception of the socket's own frames, binds, and
//! checks that a written frame reads back byte for byte.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              LoopbackExchange                │
//! │  prepare → send ‖ recv → ExchangeReport      │
//! │                                              │
//! │  ┌──────────────┐        ┌───────────────┐   │
//! │  │ RawCanSocket │        │ CanFrame      │   │
//! │  │ (fd, &self)  │        │ (16-byte wire)│   │
//! │  └──────┬───────┘        └───────────────┘   │
//! │         │                                    │
//! │  ┌──────┴───────┐                            │
//! │  │ resolve_index│  DeviceControl seam        │
//! │  └──────┬───────┘                            │
//! │         │                                    │
//! │      ┌──┴──┐                                 │
//! │      │ sys │  every unsafe call              │
//! │      └─────┘                                 │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The socket, resolver and exchange are Linux only; the frame codec and
//! configuration build everywhere.

pub mod config;
pub mod error;
pub mod frame;

#[cfg(target_os = "linux")]
pub mod exchange;
#[cfg(target_os = "linux")]
pub mod ifindex;
#[cfg(target_os = "linux")]
pub mod socket;
#[cfg(target_os = "linux")]
mod sys;

pub use config::{ExchangeConfig, FrameConfig, SendTiming};
pub use error::{ConfigError, ExchangeError, FrameError, ResolveError};
pub use frame::{parse_can_id, CanFrame, CAN_MAX_DLEN, CAN_MTU};

#[cfg(target_os = "linux")]
pub use exchange::{ExchangeReport, ExchangeStage, LoopbackExchange};
#[cfg(target_os = "linux")]
pub use ifindex::{resolve_index, DeviceControl, InterfaceRequest, IFNAMSIZ, MAX_NAME_LEN};
#[cfg(target_os = "linux")]
pub use socket::RawCanSocket;
