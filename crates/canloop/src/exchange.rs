//! Loopback exchange over a raw CAN socket
//!
//! The exchange is strictly linear:
//!
//! ```text
//! Created → Resolved → Configured → Bound → Exchanged → Verified
//! ```
//!
//! Any failure before `Exchanged` ends the run at that step. A mismatch
//! between the sent and received frames is reported with both wire images
//! by [`ExchangeReport::verify`].
//!
//! # Example
//!
//! ```ignore
//! use canloop::{ExchangeConfig, LoopbackExchange};
//!
//! let exchange = LoopbackExchange::new(ExchangeConfig::default());
//! let report = exchange.run_and_verify().await?;
//! assert_eq!(report.sent, report.received);
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::{ExchangeConfig, SendTiming};
use crate::error::ExchangeError;
use crate::frame::CanFrame;
use crate::socket::RawCanSocket;

/// Progress of a single exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExchangeStage {
    Created,
    Resolved,
    Configured,
    Bound,
    Exchanged,
    Verified,
}

impl fmt::Display for ExchangeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Resolved => "resolved",
            Self::Configured => "configured",
            Self::Bound => "bound",
            Self::Exchanged => "exchanged",
            Self::Verified => "verified",
        };
        f.write_str(name)
    }
}

/// Result of a completed write/read exchange
#[derive(Debug, Clone)]
pub struct ExchangeReport {
    pub interface: String,
    pub ifindex: u32,
    pub sent: CanFrame,
    pub received: CanFrame,
}

impl ExchangeReport {
    /// True when all 16 bytes match
    pub fn is_match(&self) -> bool {
        self.sent.as_bytes() == self.received.as_bytes()
    }

    /// Compare the wire images, reporting both on mismatch
    pub fn verify(&self) -> Result<(), ExchangeError> {
        if self.is_match() {
            debug!(interface = %self.interface, stage = %ExchangeStage::Verified, "Frames match");
            return Ok(());
        }

        error!(
            interface = %self.interface,
            sent = ?self.sent.as_bytes(),
            received = ?self.received.as_bytes(),
            "Sent and received frames are not equal"
        );
        Err(ExchangeError::VerificationMismatch {
            sent: self.sent.into_bytes(),
            received: self.received.into_bytes(),
        })
    }
}

/// Send one frame on a bound raw CAN socket and read it back
#[derive(Debug, Clone)]
pub struct LoopbackExchange {
    config: ExchangeConfig,
}

impl LoopbackExchange {
    pub fn new(config: ExchangeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Open, resolve, configure and bind
    ///
    /// Returns the bound socket and the interface index it is bound to.
    pub fn prepare(&self) -> Result<(RawCanSocket, u32), ExchangeError> {
        let interface = self.config.interface.as_str();

        let socket = RawCanSocket::open().map_err(ExchangeError::SocketCreationFailed)?;
        debug!(stage = %ExchangeStage::Created, "Opened raw CAN socket");

        let ifindex = socket.interface_index(interface)?;
        debug!(stage = %ExchangeStage::Resolved, interface = %interface, ifindex, "Resolved interface");

        socket
            .set_recv_own_msgs(true)
            .map_err(ExchangeError::OptionConfigurationFailed)?;
        if let Some(timeout) = self.config.read_timeout() {
            socket
                .set_read_timeout(Some(timeout))
                .map_err(ExchangeError::OptionConfigurationFailed)?;
        }
        debug!(
            stage = %ExchangeStage::Configured,
            read_timeout_ms = ?self.config.read_timeout_ms,
            "Enabled reception of own messages"
        );

        socket
            .bind(ifindex)
            .map_err(|source| ExchangeError::BindFailed { ifindex, source })?;
        debug!(stage = %ExchangeStage::Bound, interface = %interface, ifindex, "Bound socket");

        Ok((socket, ifindex))
    }

    /// Run the exchange without judging the result
    pub async fn run(&self) -> Result<ExchangeReport, ExchangeError> {
        let outbound = self.config.frame.build()?;
        let (socket, ifindex) = self.prepare()?;
        let received = exchange_frames(Arc::new(socket), outbound, self.config.send).await?;

        info!(
            stage = %ExchangeStage::Exchanged,
            interface = %self.config.interface,
            "Sent: {:?} - Received: {:?}",
            outbound.as_bytes(),
            received.as_bytes()
        );

        Ok(ExchangeReport {
            interface: self.config.interface.clone(),
            ifindex,
            sent: outbound,
            received,
        })
    }

    /// Run the exchange and require byte-for-byte equality
    pub async fn run_and_verify(&self) -> Result<ExchangeReport, ExchangeError> {
        let report = self.run().await?;
        report.verify()?;
        Ok(report)
    }
}

/// One frame in, one frame out; the blocking halves of the exchange
trait FrameIo: Send + Sync + 'static {
    fn send(&self, frame: &CanFrame) -> io::Result<()>;
    fn recv(&self) -> io::Result<CanFrame>;
}

impl FrameIo for RawCanSocket {
    fn send(&self, frame: &CanFrame) -> io::Result<()> {
        RawCanSocket::send(self, frame)
    }

    fn recv(&self) -> io::Result<CanFrame> {
        RawCanSocket::recv(self)
    }
}

/// Write `outbound` per `timing` while blocking in a read on the same socket
///
/// A failed write explains a failed read, so it is reported first.
async fn exchange_frames<S: FrameIo>(
    socket: Arc<S>,
    outbound: CanFrame,
    timing: SendTiming,
) -> Result<CanFrame, ExchangeError> {
    let writer = match timing {
        SendTiming::BeforeRead => {
            send_blocking(Arc::clone(&socket), outbound).await?;
            None
        }
        SendTiming::AfterDelay { delay_ms } => {
            let socket = Arc::clone(&socket);
            Some(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                send_blocking(socket, outbound).await
            }))
        }
    };

    let reader = Arc::clone(&socket);
    let read_result = tokio::task::spawn_blocking(move || reader.recv())
        .await
        .map_err(|e| ExchangeError::TaskFailed(format!("Task join error: {}", e)))?;

    if let Some(writer) = writer {
        writer
            .await
            .map_err(|e| ExchangeError::TaskFailed(format!("Task join error: {}", e)))??;
    }
    read_result.map_err(ExchangeError::ReceiveFailed)
}

async fn send_blocking<S: FrameIo>(socket: Arc<S>, frame: CanFrame) -> Result<(), ExchangeError> {
    tokio::task::spawn_blocking(move || socket.send(&frame))
        .await
        .map_err(|e| ExchangeError::TaskFailed(format!("Task join error: {}", e)))?
        .map_err(ExchangeError::SendFailed)?;
    debug!(frame = %frame, "Frame written");
    Ok(())
}
