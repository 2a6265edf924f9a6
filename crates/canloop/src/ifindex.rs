//! Interface name to kernel interface index resolution
//!
//! The lookup is a single `SIOCGIFINDEX` device-control query issued through
//! any open socket. Names are validated before the query: Linux keeps the
//! NUL terminator inside the 16-byte name field, so at most 15 name bytes
//! are usable.

use std::io;
use std::os::fd::BorrowedFd;

use crate::error::ResolveError;
use crate::sys;

/// Size of the kernel's interface name field, terminator included
pub const IFNAMSIZ: usize = 16;

/// Longest usable interface name
pub const MAX_NAME_LEN: usize = IFNAMSIZ - 1;

/// Kernel `struct ifreq` as used by `SIOCGIFINDEX`
///
/// Only the name and the index member of the union are meaningful; the
/// reserved tail pads the record to the full 40-byte `ifreq` the kernel
/// copies in and out.
#[repr(C)]
#[derive(Debug)]
pub struct InterfaceRequest {
    name: [u8; IFNAMSIZ],
    index: i32,
    _reserved: [u8; 20],
}

impl InterfaceRequest {
    /// Validate `name` and lay it out zero-padded
    pub fn new(name: &str) -> Result<Self, ResolveError> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.contains(&0) {
            return Err(ResolveError::InvalidName(name.to_string()));
        }
        if bytes.len() > MAX_NAME_LEN {
            return Err(ResolveError::NameTooLong {
                name: name.to_string(),
                len: bytes.len(),
                max: MAX_NAME_LEN,
            });
        }

        let mut buf = [0u8; IFNAMSIZ];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            name: buf,
            index: 0,
            _reserved: [0; 20],
        })
    }

    /// Name bytes without the zero padding
    pub fn name(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(IFNAMSIZ);
        &self.name[..end]
    }

    /// Index written by the kernel, zero before a successful query
    pub fn index(&self) -> i32 {
        self.index
    }

    #[cfg(test)]
    pub(crate) fn set_index(&mut self, index: i32) {
        self.index = index;
    }
}

/// The kernel side of the lookup
#[cfg_attr(test, mockall::automock)]
pub trait DeviceControl {
    /// Issue `SIOCGIFINDEX`, filling `request`'s index on success
    fn query_index(&self, request: &mut InterfaceRequest) -> io::Result<()>;
}

impl DeviceControl for BorrowedFd<'_> {
    fn query_index(&self, request: &mut InterfaceRequest) -> io::Result<()> {
        sys::ioctl_get_ifindex(*self, request)
    }
}

/// Resolve `name` to its interface index
///
/// Names that do not fit are rejected without touching `device`. A failed
/// query is returned at once with the OS error attached; there is no retry.
pub fn resolve_index<D>(device: &D, name: &str) -> Result<u32, ResolveError>
where
    D: DeviceControl + ?Sized,
{
    let mut request = InterfaceRequest::new(name)?;

    device
        .query_index(&mut request)
        .map_err(|source| ResolveError::DeviceControlFailed {
            interface: name.to_string(),
            source,
        })?;

    let index = u32::try_from(request.index()).map_err(|_| ResolveError::DeviceControlFailed {
        interface: name.to_string(),
        source: io::Error::new(
            io::ErrorKind::InvalidData,
            format!("kernel reported negative index {}", request.index()),
        ),
    })?;

    tracing::debug!(interface = %name, ifindex = index, "Resolved interface index");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::net::UdpSocket;
    use std::os::fd::AsFd;

    #[test]
    fn test_request_layout_matches_ifreq() {
        assert_eq!(std::mem::size_of::<InterfaceRequest>(), 40);
    }

    #[test]
    fn test_request_name_is_zero_padded() {
        let req = InterfaceRequest::new("vcan0").unwrap();
        assert_eq!(req.name(), b"vcan0");
        assert_eq!(&req.name[5..], &[0u8; 11]);
        assert_eq!(req.index(), 0);
    }

    #[test]
    fn test_resolve_returns_kernel_index() {
        let mut mock = MockDeviceControl::new();
        mock.expect_query_index().times(1).returning(|req| {
            assert_eq!(req.name(), b"vcan0");
            req.set_index(7);
            Ok(())
        });

        assert_eq!(resolve_index(&mock, "vcan0").unwrap(), 7);
    }

    #[rstest]
    #[case("sixteen-bytes-xx")]
    #[case("a-very-long-interface-name")]
    fn test_too_long_name_makes_no_query(#[case] name: &str) {
        let mut mock = MockDeviceControl::new();
        mock.expect_query_index().times(0);

        match resolve_index(&mock, name) {
            Err(ResolveError::NameTooLong { len, max, .. }) => {
                assert_eq!(len, name.len());
                assert_eq!(max, MAX_NAME_LEN);
            }
            other => panic!("expected NameTooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_fifteen_byte_name_is_queried() {
        let name = "fifteen-bytes-x";
        assert_eq!(name.len(), MAX_NAME_LEN);

        let mut mock = MockDeviceControl::new();
        mock.expect_query_index().times(1).returning(|req| {
            req.set_index(42);
            Ok(())
        });

        assert_eq!(resolve_index(&mock, name).unwrap(), 42);
    }

    #[test]
    fn test_sixteen_byte_name_needs_room_for_terminator() {
        let name = "sixteen-bytes-xx";
        assert_eq!(name.len(), IFNAMSIZ);
        assert!(matches!(
            InterfaceRequest::new(name),
            Err(ResolveError::NameTooLong { .. })
        ));
    }

    #[rstest]
    #[case("")]
    #[case("vcan\0")]
    fn test_invalid_name_makes_no_query(#[case] name: &str) {
        let mut mock = MockDeviceControl::new();
        mock.expect_query_index().times(0);

        assert!(matches!(
            resolve_index(&mock, name),
            Err(ResolveError::InvalidName(_))
        ));
    }

    #[test]
    fn test_query_failure_keeps_os_error() {
        let mut mock = MockDeviceControl::new();
        mock.expect_query_index()
            .times(1)
            .returning(|_| Err(io::Error::from_raw_os_error(libc::ENODEV)));

        let err = resolve_index(&mock, "doesnotexist0").unwrap_err();
        assert_eq!(err.os_code(), Some(libc::ENODEV));
        assert!(err.to_string().contains("doesnotexist0"));
    }

    #[test]
    fn test_negative_index_is_not_success() {
        let mut mock = MockDeviceControl::new();
        mock.expect_query_index().times(1).returning(|req| {
            req.set_index(-1);
            Ok(())
        });

        assert!(matches!(
            resolve_index(&mock, "vcan0"),
            Err(ResolveError::DeviceControlFailed { .. })
        ));
    }

    // The query works on any socket, so these run without CAN support.

    #[test]
    fn test_resolve_loopback_through_kernel() {
        let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
        let index = resolve_index(&sock.as_fd(), "lo").unwrap();
        assert!(index >= 1);
    }

    #[test]
    fn test_resolve_missing_interface_through_kernel() {
        let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
        let err = resolve_index(&sock.as_fd(), "doesnotexist0").unwrap_err();
        assert_eq!(err.os_code(), Some(libc::ENODEV));
    }
}
