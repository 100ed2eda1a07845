//! SOCKS5 address and port encoding (RFC 1928 §5, "Addressing").
//!
//! This module defines [`SocksAddr`], a tagged representation of a
//! destination or bound address (IPv4, IPv6, or a literal domain name), and
//! the codec functions [`decode_addr_port`]/[`encode_addr_port`] that read
//! and write the `ATYP` + address + port field shared by connection
//! requests, connection replies, and UDP datagram headers.
//!
//! The codec never performs DNS resolution; it only preserves the literal
//! form the peer supplied. Resolution lives in [`crate::resolve`].
//!
//! ```
//! use socksd::addr::{decode_addr_port, SocksAddr};
//!
//! let buf = [0x01, 127, 0, 0, 1, 0x1F, 0x90]; // ATYP=IPv4, 127.0.0.1:8080
//! let (addr, used) = decode_addr_port(&buf).unwrap();
//! assert_eq!(addr.to_string(), "127.0.0.1:8080");
//! assert_eq!(used, 7);
//! ```

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::error::SocksError;

/// SOCKS5 address-type discriminator (RFC 1928 §5).
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Atyp {
    V4 = 0x01,
    Dns = 0x03,
    V6 = 0x04,
}

impl fmt::Display for Atyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atyp::V4 => write!(f, "IPv4"),
            Atyp::Dns => write!(f, "Domain"),
            Atyp::V6 => write!(f, "IPv6"),
        }
    }
}

/// A destination or bound address and port, exactly as it appears on the
/// wire: IPv4, IPv6, or a literal (unresolved) domain name.
///
/// Domain names are kept as given; nothing in this module ever resolves
/// them. Keeping `Dns` distinct from `V4`/`V6` is what lets the UDP relay
/// (§4.6) echo back the identical name bytes a client used, rather than the
/// resolved literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SocksAddr {
    V4(Ipv4Addr, u16),
    V6(Ipv6Addr, u16),
    Dns(String, u16),
}

impl SocksAddr {
    /// The `ATYP` byte this address would serialize with.
    pub fn atyp(&self) -> Atyp {
        match self {
            SocksAddr::V4(..) => Atyp::V4,
            SocksAddr::V6(..) => Atyp::V6,
            SocksAddr::Dns(..) => Atyp::Dns,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            SocksAddr::V4(_, port) | SocksAddr::V6(_, port) | SocksAddr::Dns(_, port) => *port,
        }
    }

    /// A `SocksAddr` carrying the all-zeros IPv4 placeholder, used for
    /// best-effort error replies where the real bound address is
    /// unavailable or irrelevant (RFC 1928 §6 notes ATYP/ADDR are
    /// meaningful on success only).
    pub fn unspecified() -> Self {
        SocksAddr::V4(Ipv4Addr::UNSPECIFIED, 0)
    }
}

impl From<SocketAddr> for SocksAddr {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(a) => SocksAddr::V4(*a.ip(), a.port()),
            SocketAddr::V6(a) => SocksAddr::V6(*a.ip(), a.port()),
        }
    }
}

impl fmt::Display for SocksAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksAddr::V4(ip, port) => write!(f, "{ip}:{port}"),
            SocksAddr::V6(ip, port) => write!(f, "[{ip}]:{port}"),
            SocksAddr::Dns(name, port) => write!(f, "{name}:{port}"),
        }
    }
}

/// Reads a `ATYP | ADDR | PORT` field from `buf`, returning the decoded
/// address and the number of bytes consumed.
///
/// Fails with [`SocksError::RequestTooShort`] on a short buffer or
/// malformed IPv4/IPv6/DNS field, and with
/// [`SocksError::InvalidAddressType`] on an unrecognized `ATYP`.
pub fn decode_addr_port(buf: &[u8]) -> Result<(SocksAddr, usize), SocksError> {
    if buf.is_empty() {
        return Err(SocksError::RequestTooShort);
    }

    match buf[0] {
        0x01 => {
            if buf.len() < 1 + 4 + 2 {
                return Err(SocksError::RequestTooShort);
            }
            let ip = Ipv4Addr::new(buf[1], buf[2], buf[3], buf[4]);
            let port = u16::from_be_bytes([buf[5], buf[6]]);
            Ok((SocksAddr::V4(ip, port), 7))
        }
        0x04 => {
            if buf.len() < 1 + 16 + 2 {
                return Err(SocksError::RequestTooShort);
            }
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&buf[1..17]);
            let ip = Ipv6Addr::from(octets);
            let port = u16::from_be_bytes([buf[17], buf[18]]);
            Ok((SocksAddr::V6(ip, port), 19))
        }
        0x03 => {
            if buf.len() < 2 {
                return Err(SocksError::RequestTooShort);
            }
            let len = buf[1] as usize;
            if len == 0 {
                return Err(SocksError::InvalidDomain);
            }
            if buf.len() < 2 + len + 2 {
                return Err(SocksError::RequestTooShort);
            }
            let name_bytes = &buf[2..2 + len];
            if !name_bytes.is_ascii() {
                return Err(SocksError::InvalidDomain);
            }
            let name = String::from_utf8_lossy(name_bytes).into_owned();
            let port = u16::from_be_bytes([buf[2 + len], buf[2 + len + 1]]);
            Ok((SocksAddr::Dns(name, port), 2 + len + 2))
        }
        other => Err(SocksError::InvalidAddressType(other)),
    }
}

/// Serializes `addr` into its `ATYP | ADDR | PORT` wire form.
pub fn encode_addr_port(addr: &SocksAddr) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + 18 + 2);
    buf.push(addr.atyp() as u8);
    match addr {
        SocksAddr::V4(ip, port) => {
            buf.extend_from_slice(&ip.octets());
            buf.extend_from_slice(&port.to_be_bytes());
        }
        SocksAddr::V6(ip, port) => {
            buf.extend_from_slice(&ip.octets());
            buf.extend_from_slice(&port.to_be_bytes());
        }
        SocksAddr::Dns(name, port) => {
            buf.push(name.len() as u8);
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(&port.to_be_bytes());
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_v4() {
        let addr = SocksAddr::V4(Ipv4Addr::new(127, 0, 0, 1), 9);
        let bytes = encode_addr_port(&addr);
        let (decoded, used) = decode_addr_port(&bytes).unwrap();
        assert_eq!(decoded, addr);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn round_trips_v6() {
        let addr = SocksAddr::V6(Ipv6Addr::LOCALHOST, 443);
        let bytes = encode_addr_port(&addr);
        let (decoded, used) = decode_addr_port(&bytes).unwrap();
        assert_eq!(decoded, addr);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn round_trips_dns() {
        let addr = SocksAddr::Dns("localhost".into(), 7);
        let bytes = encode_addr_port(&addr);
        let (decoded, used) = decode_addr_port(&bytes).unwrap();
        assert_eq!(decoded, addr);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn rejects_short_v4() {
        let buf = [0x01, 127, 0, 0, 1, 0x00];
        assert!(matches!(
            decode_addr_port(&buf),
            Err(SocksError::RequestTooShort)
        ));
    }

    #[test]
    fn rejects_short_v6() {
        let mut buf = vec![0x04];
        buf.extend_from_slice(&[0u8; 10]);
        assert!(matches!(
            decode_addr_port(&buf),
            Err(SocksError::RequestTooShort)
        ));
    }

    #[test]
    fn rejects_truncated_dns_name() {
        let buf = [0x03, 5, b'a', b'b'];
        assert!(matches!(
            decode_addr_port(&buf),
            Err(SocksError::RequestTooShort)
        ));
    }

    #[test]
    fn rejects_truncated_dns_port() {
        let buf = [0x03, 2, b'a', b'b', 0x00];
        assert!(matches!(
            decode_addr_port(&buf),
            Err(SocksError::RequestTooShort)
        ));
    }

    #[test]
    fn rejects_unknown_atyp() {
        let buf = [0x7f, 0, 0, 0];
        assert!(matches!(
            decode_addr_port(&buf),
            Err(SocksError::InvalidAddressType(0x7f))
        ));
    }

    #[test]
    fn rejects_empty_buffer() {
        assert!(matches!(
            decode_addr_port(&[]),
            Err(SocksError::RequestTooShort)
        ));
    }
}
