//! Standard library UDP transport for the [`ntpclock`] library.
//!
//! This crate provides [`UdpTransport`], a non-blocking wrapper around
//! [`std::net::UdpSocket`] that implements the [`NtpTransport`] trait, so an
//! [`ntpclock::NtpClient`] can run on any host with a regular network stack.
//!
//! # Example
//!
//! ```no_run
//! use ntpclock::{ClientConfig, NtpClient, StdClock};
//! use ntpclock_net_std::UdpTransport;
//!
//! let config = ClientConfig::new("pool.ntp.org").with_request_version(4);
//! let mut client = NtpClient::new(config, UdpTransport::new(), StdClock::new());
//!
//! if client.update() {
//!     println!("{}", client.formatted_date(None));
//! }
//! ```

use ntpclock::{Error, NtpTransport, Result};

use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};

#[cfg(feature = "log")]
use log::debug;

// large enough for a NTP packet with extension fields
const PEEK_BUFFER_SIZE: usize = 1024;

/// Non-blocking [`NtpTransport`] over a [`std::net::UdpSocket`].
///
/// The socket is bound on [`NtpTransport::open`], unless one was handed over
/// with [`From<UdpSocket>`], and dropped on [`NtpTransport::close`]. Datagrams that do not come from the address the
/// last request was sent to are dropped while polling.
#[derive(Debug, Default)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    peer: Option<SocketAddr>,
}

impl UdpTransport {
    /// Creates a closed transport
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Local address of the bound socket, `None` while closed
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|socket| socket.local_addr().ok())
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket.as_ref().ok_or(Error::Network)
    }

    fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
        let mut addrs = (host, port)
            .to_socket_addrs()
            .map_err(|_| Error::AddressResolve)?;

        addrs.find(SocketAddr::is_ipv4).ok_or(Error::AddressResolve)
    }
}

impl From<UdpSocket> for UdpTransport {
    /// Wraps an already bound socket. [`NtpTransport::open`] keeps it instead of
    /// binding a new one and switches it to non-blocking mode.
    fn from(socket: UdpSocket) -> Self {
        UdpTransport {
            socket: Some(socket),
            peer: None,
        }
    }
}

impl NtpTransport for UdpTransport {
    fn open(&mut self, local_port: u16) -> Result<()> {
        if let Some(socket) = &self.socket {
            socket.set_nonblocking(true).map_err(|_| Error::Network)?;
            self.peer = None;
            return Ok(());
        }

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, local_port))
            .map_err(|_| Error::Network)?;

        socket.set_nonblocking(true).map_err(|_| Error::Network)?;
        #[cfg(feature = "log")]
        debug!("bound UDP socket on {:?}", socket.local_addr());

        self.socket = Some(socket);
        self.peer = None;
        Ok(())
    }

    fn close(&mut self) {
        self.socket = None;
        self.peer = None;
    }

    fn send_datagram(&mut self, host: &str, port: u16, buf: &[u8]) -> Result<usize> {
        let addr = Self::resolve(host, port)?;
        let socket = self.socket()?;

        socket.set_nonblocking(true).map_err(|_| Error::Network)?;

        match socket.send_to(buf, addr) {
            Ok(size) => {
                self.peer = Some(addr);
                Ok(size)
            }
            Err(_) => Err(Error::Network),
        }
    }

    fn available_datagram_size(&mut self) -> Result<usize> {
        let socket = self.socket()?;
        let mut buf = [0u8; PEEK_BUFFER_SIZE];

        match socket.peek_from(&mut buf) {
            Ok((size, src)) if self.peer.is_none_or(|peer| peer == src) => Ok(size),
            Ok((_, _src)) => {
                #[cfg(feature = "log")]
                debug!("dropping datagram from unexpected source {}", _src);
                // consume it so the next one can be inspected
                match socket.recv_from(&mut buf) {
                    Ok(_) => Ok(0),
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(0),
                    Err(_) => Err(Error::Network),
                }
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(_) => Err(Error::Network),
        }
    }

    fn read_datagram(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.socket()?.recv_from(buf) {
            Ok((size, _)) => Ok(size.min(buf.len())),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(_) => Err(Error::Network),
        }
    }
}
