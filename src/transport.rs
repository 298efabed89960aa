//! Datagram transports for reaching DNS servers.
//!
//! Resolvers are wired to a [`Dialer`] at construction time: the caching
//! resolver dials upstream servers over the host network, while a
//! tunnel-bound resolver is handed a dialer backed by an already
//! established userspace network stack. This crate never creates or
//! manages the tunnel itself.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;

/// Maximum size of a DNS packet (with some headroom).
pub const MAX_DNS_PACKET_SIZE: usize = 4096;

/// One connected datagram flow to a DNS server.
#[async_trait]
pub trait Datagram: Send + Sync {
    /// Send one datagram.
    async fn send(&self, buf: &[u8]) -> io::Result<usize>;

    /// Receive one datagram into `buf`, returning its length.
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Opens datagram connections to DNS servers.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Open a connected datagram flow to `server`.
    async fn dial(&self, server: SocketAddr) -> io::Result<Box<dyn Datagram>>;
}

/// Dials DNS servers directly over the host network.
///
/// Binds an ephemeral UDP socket of the matching address family and
/// connects it to the server, so `recv` only yields datagrams from the
/// dialed peer.
pub struct HostDialer;

#[async_trait]
impl Dialer for HostDialer {
    async fn dial(&self, server: SocketAddr) -> io::Result<Box<dyn Datagram>> {
        let bind_addr = if server.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server).await?;
        Ok(Box::new(socket))
    }
}

#[async_trait]
impl Datagram for UdpSocket {
    async fn send(&self, buf: &[u8]) -> io::Result<usize> {
        UdpSocket::send(self, buf).await
    }

    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        UdpSocket::recv(self, buf).await
    }
}
