//! Raw CAN socket
//!
//! Reads and writes take `&self`, so one socket can be shared through an
//! `Arc` between a writer task and a blocked reader without a lock.

use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::ResolveError;
use crate::frame::{CanFrame, CAN_MTU};
use crate::ifindex::{self, DeviceControl, InterfaceRequest};
use crate::sys;

/// Shortest timeout the kernel can represent; anything below reads as "forever"
const MIN_READ_TIMEOUT: Duration = Duration::from_micros(1);

/// A `CAN_RAW` socket, closed on drop
#[derive(Debug)]
pub struct RawCanSocket {
    socket: Socket,
}

impl RawCanSocket {
    /// Open an unbound raw CAN socket
    pub fn open() -> io::Result<Self> {
        let socket = Socket::new(
            Domain::from(libc::AF_CAN),
            Type::from(libc::SOCK_RAW),
            Some(Protocol::from(sys::CAN_RAW)),
        )?;
        tracing::trace!(fd = socket.as_raw_fd(), "Opened raw CAN socket");
        Ok(Self { socket })
    }

    /// Resolve an interface name through this socket
    pub fn interface_index(&self, name: &str) -> Result<u32, ResolveError> {
        ifindex::resolve_index(self, name)
    }

    /// Receive frames this socket transmits (off by default in the kernel)
    pub fn set_recv_own_msgs(&self, enabled: bool) -> io::Result<()> {
        sys::setsockopt_int(
            self.socket.as_fd(),
            sys::SOL_CAN_RAW,
            sys::CAN_RAW_RECV_OWN_MSGS,
            enabled as libc::c_int,
        )
    }

    /// Bound how long [`RawCanSocket::recv`] blocks; `None` blocks forever
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        apply_read_timeout(&self.socket, timeout)
    }

    /// Bind to the interface with the given index
    pub fn bind(&self, ifindex: u32) -> io::Result<()> {
        sys::bind_can(self.socket.as_fd(), ifindex)
    }

    /// Write one frame
    pub fn send(&self, frame: &CanFrame) -> io::Result<()> {
        let written = (&self.socket).write(frame.as_bytes())?;
        if written != CAN_MTU {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {} of {} bytes", written, CAN_MTU),
            ));
        }
        Ok(())
    }

    /// Read one frame, blocking until it arrives
    pub fn recv(&self) -> io::Result<CanFrame> {
        let mut buf = [0u8; CAN_MTU];
        let read = (&self.socket).read(&mut buf)?;
        if read != CAN_MTU {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read: {} of {} bytes", read, CAN_MTU),
            ));
        }
        CanFrame::from_bytes(&buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Set `SO_RCVTIMEO`, keeping every non-zero timeout bounded
///
/// A zero `timeval` means "block forever" to the kernel, so a zero timeout
/// is refused and sub-microsecond timeouts are rounded up to 1 µs.
fn apply_read_timeout(socket: &Socket, timeout: Option<Duration>) -> io::Result<()> {
    let timeout = match timeout {
        Some(t) if t.is_zero() => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "zero read timeout would block forever",
            ));
        }
        Some(t) => Some(t.max(MIN_READ_TIMEOUT)),
        None => None,
    };
    socket.set_read_timeout(timeout)
}

impl DeviceControl for RawCanSocket {
    fn query_index(&self, request: &mut InterfaceRequest) -> io::Result<()> {
        sys::ioctl_get_ifindex(self.socket.as_fd(), request)
    }
}

impl AsFd for RawCanSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

impl AsRawFd for RawCanSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl From<RawCanSocket> for OwnedFd {
    fn from(socket: RawCanSocket) -> Self {
        socket.socket.into()
    }
}
