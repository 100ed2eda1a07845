//! Username/password authentication request (RFC 1929 §2).
//!
//! Sent by the client after `UsePass` is selected during method negotiation:
//!
//! ```text
//! +----+------+----------+------+----------+
//! |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
//! +----+------+----------+------+----------+
//! | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
//! +----+------+----------+------+----------+
//! ```

use crate::error::SocksError;

/// A username/password authentication request (RFC 1929 §2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub uname: String,
    pub passwd: String,
}

impl TryFrom<&[u8]> for AuthRequest {
    type Error = SocksError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < 2 {
            return Err(SocksError::AuthMessageMalformed("message too short"));
        }

        let ver = bytes[0];
        if ver != 0x01 {
            return Err(SocksError::UnsupportedAuthVersion(ver));
        }

        let ulen = bytes[1] as usize;
        if bytes.len() < 2 + ulen + 1 {
            return Err(SocksError::AuthMessageMalformed("truncated before username"));
        }

        let uname = String::from_utf8(bytes[2..2 + ulen].to_vec())
            .map_err(|_| SocksError::AuthMessageMalformed("invalid UTF-8 in username"))?;

        let plen_index = 2 + ulen;
        let plen = bytes[plen_index] as usize;

        if bytes.len() < plen_index + 1 + plen {
            return Err(SocksError::AuthMessageMalformed("truncated before password"));
        }

        let passwd = String::from_utf8(bytes[plen_index + 1..plen_index + 1 + plen].to_vec())
            .map_err(|_| SocksError::AuthMessageMalformed("invalid UTF-8 in password"))?;

        Ok(Self { uname, passwd })
    }
}
