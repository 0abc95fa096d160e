use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use socket2::{Domain, Protocol, Socket, Type};

use crate::constants::RECV_BUFFER_SIZE;

/// Creates and configures the inbound UDP socket for eHuB datagrams.
/// Handles both unicast and multicast addresses.
pub fn create_udp_socket(sock_addr: SocketAddr) -> anyhow::Result<Socket> {
    let ip = match sock_addr.ip() {
        IpAddr::V4(v4) => v4,
        _ => anyhow::bail!("only IPv4 is supported"),
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    // Datagrams queue here while the ArtNet rate limiter sleeps.
    if let Err(e) = socket.set_recv_buffer_size(RECV_BUFFER_SIZE) {
        tracing::warn!("could not enlarge receive buffer: {e}");
    }
    socket.bind(&sock_addr.into())?;

    // Join multicast group if the address is multicast
    if ip.is_multicast() {
        let iface = Ipv4Addr::UNSPECIFIED; // default interface
        socket.join_multicast_v4(&ip, &iface)?;
    }

    socket.set_nonblocking(true)?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binds_ephemeral_unicast() {
        let sock = create_udp_socket("127.0.0.1:0".parse().unwrap()).unwrap();
        let local = sock.local_addr().unwrap().as_socket().unwrap();
        assert_ne!(local.port(), 0);
    }

    #[test]
    fn test_rejects_ipv6() {
        assert!(create_udp_socket("[::1]:0".parse().unwrap()).is_err());
    }
}
