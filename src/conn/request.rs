//! SOCKS5 client connection request (RFC 1928 §4).
//!
//! ```text
//! +----+-----+-------+------+----------+----------+
//! |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
//! +----+-----+-------+------+----------+----------+
//! | 1  |  1  | X'00' |  1   | Variable |    2     |
//! +----+-----+-------+------+----------+----------+
//! ```

use std::fmt;

use crate::addr::{decode_addr_port, encode_addr_port, SocksAddr};
use crate::error::SocksError;

/// The command (`CMD`) of a SOCKS5 request (RFC 1928 §4).
///
/// BIND (`0x02`) and any other value are not representable here: they are
/// rejected with `UnsupportedCommand` during parsing, before an address is
/// ever decoded (see `TryFrom` below).
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cmd {
    Connect = 0x01,
    UdpAssociate = 0x03,
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cmd::Connect => write!(f, "CONNECT"),
            Cmd::UdpAssociate => write!(f, "UDP_ASSOCIATE"),
        }
    }
}

/// A SOCKS5 connection request (RFC 1928 §4).
#[derive(Debug, Clone)]
pub struct ConnRequest {
    pub cmd: Cmd,
    pub dst: SocksAddr,
}

impl ConnRequest {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0x05, self.cmd as u8, 0x00];
        buf.extend(encode_addr_port(&self.dst));
        buf
    }
}

impl fmt::Display for ConnRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.cmd, self.dst)
    }
}

impl TryFrom<&[u8]> for ConnRequest {
    type Error = SocksError;

    fn try_from(buf: &[u8]) -> Result<Self, Self::Error> {
        if buf.len() < 4 {
            return Err(SocksError::RequestTooShort);
        }

        let ver = buf[0];
        if ver != 0x05 {
            return Err(SocksError::UnsupportedVersion(ver));
        }

        // Command is checked before anything past it is parsed: a BIND or
        // otherwise unsupported command must short-circuit to
        // `UnsupportedCommand` ahead of RSV/address validation, not fail
        // with whatever those happen to reject first.
        let cmd = match buf[1] {
            0x01 => Cmd::Connect,
            0x03 => Cmd::UdpAssociate,
            other => return Err(SocksError::UnsupportedCommand(other)),
        };

        if buf[2] != 0x00 {
            return Err(SocksError::InvalidReservedByte);
        }

        let (dst, _) = decode_addr_port(&buf[3..])?;

        Ok(ConnRequest { cmd, dst })
    }
}
