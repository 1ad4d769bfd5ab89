use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

/// UDP socket bound for OLSR traffic, with broadcast enabled so HELLO/TC
/// packets reach every neighbor on the local segment without multicast
/// group management.
pub struct UdpTransport {
    sock: UdpSocket,
    recv_buf_size: usize,
    broadcast_addr: Ipv4Addr,
    port: u16,
}

impl UdpTransport {
    pub fn bind(
        bind_address: &str,
        bind_port: u16,
        broadcast_addr: Ipv4Addr,
        recv_buf_size: usize,
    ) -> io::Result<Self> {
        let sock = UdpSocket::bind((bind_address, bind_port))?;
        sock.set_broadcast(true)?;
        Ok(Self {
            sock,
            recv_buf_size,
            broadcast_addr,
            port: bind_port,
        })
    }

    pub fn recv(&self, timeout: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
        self.sock.set_read_timeout(Some(timeout))?;
        let mut buf = vec![0_u8; self.recv_buf_size];
        match self.sock.recv_from(&mut buf) {
            Ok((n, addr)) => {
                buf.truncate(n);
                Ok(Some((buf, addr)))
            }
            Err(err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Broadcast a packet to every OLSR node on the local segment.
    pub fn broadcast(&self, payload: &[u8]) -> io::Result<usize> {
        let dest = SocketAddrV4::new(self.broadcast_addr, self.port);
        self.sock.send_to(payload, dest)
    }
}
