//! Thin system-call bindings for what socket2 does not cover
//!
//! Every `unsafe` block in the crate lives here: the `SIOCGIFINDEX` query,
//! the CAN-level socket option and `bind` with a `sockaddr_can`. Each
//! function takes borrowed Rust values, performs exactly one call and turns
//! the C return convention into an `io::Result`.

use std::io;
use std::mem::size_of;
use std::os::fd::{AsRawFd, BorrowedFd};

use libc::{c_int, c_void, socklen_t};

use crate::ifindex::InterfaceRequest;

// constants from <linux/can.h> and <linux/can/raw.h>
pub const CAN_RAW: c_int = 1;
pub const SOL_CAN_BASE: c_int = 100;
pub const SOL_CAN_RAW: c_int = SOL_CAN_BASE + CAN_RAW;
pub const CAN_RAW_RECV_OWN_MSGS: c_int = 4;

/// `struct sockaddr_can` with the transport-protocol union left zeroed
#[repr(C)]
#[allow(dead_code)]
struct CanAddr {
    can_family: libc::sa_family_t,
    can_ifindex: c_int,
    can_addr: [u64; 2],
}

fn cvt(ret: c_int) -> io::Result<c_int> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// `ioctl(fd, SIOCGIFINDEX, &mut ifreq)`
pub fn ioctl_get_ifindex(fd: BorrowedFd<'_>, request: &mut InterfaceRequest) -> io::Result<()> {
    // SAFETY: `request` is an exclusively borrowed, ifreq-sized #[repr(C)] buffer
    let ret = unsafe {
        libc::ioctl(
            fd.as_raw_fd(),
            libc::SIOCGIFINDEX as _,
            request as *mut InterfaceRequest as *mut c_void,
        )
    };
    cvt(ret).map(drop)
}

/// `setsockopt` with an `int` value
pub fn setsockopt_int(
    fd: BorrowedFd<'_>,
    level: c_int,
    name: c_int,
    value: c_int,
) -> io::Result<()> {
    let ret = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            level,
            name,
            &value as *const c_int as *const c_void,
            size_of::<c_int>() as socklen_t,
        )
    };
    cvt(ret).map(drop)
}

/// Bind a raw CAN socket to an interface index
pub fn bind_can(fd: BorrowedFd<'_>, ifindex: u32) -> io::Result<()> {
    let ifindex = c_int::try_from(ifindex)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface index out of range"))?;
    let addr = CanAddr {
        can_family: libc::AF_CAN as libc::sa_family_t,
        can_ifindex: ifindex,
        can_addr: [0; 2],
    };
    let ret = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            &addr as *const CanAddr as *const libc::sockaddr,
            size_of::<CanAddr>() as socklen_t,
        )
    };
    cvt(ret).map(drop)
}
