//! Host network identity

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tracing::debug;

/// Address used only to let the OS pick an outbound interface; nothing is sent
const PROBE_ADDR: &str = "8.8.8.8:80";

/// Outbound LAN address of this machine, `127.0.0.1` if undeterminable
pub fn local_ip() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(PROBE_ADDR)?;
        Ok(socket.local_addr()?.ip())
    };

    match probe() {
        Ok(ip) if !ip.is_unspecified() => ip,
        Ok(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Err(e) => {
            debug!("Local IP detection failed: {}", e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

/// Machine hostname, empty if unavailable
pub fn hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ip_is_specified() {
        assert!(!local_ip().is_unspecified());
    }
}
