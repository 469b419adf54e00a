//! The network transport seam and descriptor setup.

use libc::{F_GETFL, F_SETFL, O_NONBLOCK, fcntl};
use std::io;
use std::net::UdpSocket;
use std::os::unix::io::{AsRawFd, RawFd};

/// Receive buffer size used unless the builder says otherwise.
pub const DEFAULT_RECEIVE_BUFFER: usize = 64 * 1024;

/// Source of inbound messages for the network channel.
///
/// The loop polls the descriptor and calls [`Transport::receive`] once per
/// network-ready notification, always into the same buffer. A receive that
/// would block is treated as a spurious wakeup.
pub trait Transport: AsRawFd {
    /// Reads one message into `buf`.
    ///
    /// # Returns
    /// The number of bytes written to `buf`. A message longer than `buf` is
    /// truncated to fit.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl Transport for UdpSocket {
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf)
    }
}

/// Puts a descriptor into non-blocking mode.
pub(crate) fn set_nonblocking(file_descriptor: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(file_descriptor, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    let res = unsafe { fcntl(file_descriptor, F_SETFL, flags | O_NONBLOCK) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonblocking_socket_reports_would_block() {
        let mut socket = UdpSocket::bind("127.0.0.1:0").expect("bind");
        set_nonblocking(socket.as_raw_fd()).expect("set non-blocking");

        let mut buf = [0u8; 16];
        let err = socket.receive(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn bad_descriptor_is_an_error() {
        let err = set_nonblocking(-1).unwrap_err();

        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn receive_reports_datagram_length() {
        let mut receiver = UdpSocket::bind("127.0.0.1:0").expect("bind receiver");
        let sender = UdpSocket::bind("127.0.0.1:0").expect("bind sender");

        sender
            .send_to(&[1, 2, 3, 4, 5], receiver.local_addr().unwrap())
            .expect("send");

        let mut buf = [0u8; 64];
        let n = receiver.receive(&mut buf).expect("receive");
        assert_eq!(&buf[..n], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn oversized_datagram_is_truncated_to_the_buffer() {
        let mut receiver = UdpSocket::bind("127.0.0.1:0").expect("bind receiver");
        let sender = UdpSocket::bind("127.0.0.1:0").expect("bind sender");

        sender
            .send_to(&[7u8; 32], receiver.local_addr().unwrap())
            .expect("send");

        let mut buf = [0u8; 8];
        assert_eq!(receiver.receive(&mut buf).expect("receive"), 8);
        assert_eq!(buf, [7u8; 8]);
    }
}
