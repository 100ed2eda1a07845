//! SOCKS5 error definitions.
//!
//! This module defines [`SocksError`], the unified error type used across the
//! SOCKS5 implementation. Errors are grouped by protocol phase:
//! - **Version / Method Selection** (RFC 1928 §3).
//! - **Authentication** (RFC 1929).
//! - **Connection requests and replies** (RFC 1928 §4–5).
//! - **General I/O errors** from the underlying transport.
//!
//! Each variant carries enough context to help diagnose protocol violations
//! or unexpected input during parsing, and maps onto exactly one SOCKS5
//! reply code via [`SocksError::reply_code`] so callers never re-derive the
//! errno-to-reply mapping at each call site.

use std::io;
use thiserror::Error;

/// SOCKS5 reply codes (RFC 1928 §6).
pub mod rep {
    pub const SUCCEEDED: u8 = 0x00;
    pub const GENERAL_FAILURE: u8 = 0x01;
    pub const NOT_ALLOWED: u8 = 0x02;
    pub const NETWORK_UNREACHABLE: u8 = 0x03;
    pub const HOST_UNREACHABLE: u8 = 0x04;
    pub const CONNECTION_REFUSED: u8 = 0x05;
    pub const TTL_EXPIRED: u8 = 0x06;
    pub const COMMAND_NOT_SUPPORTED: u8 = 0x07;
    pub const ADDRESS_TYPE_NOT_SUPPORTED: u8 = 0x08;
}

/// Represents all possible errors that can occur while running the SOCKS5 server.
#[derive(Debug, Error)]
pub enum SocksError {
    // ===== Version / Method Selection =====
    /// The client requested an unsupported SOCKS protocol version.
    #[error("unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// The client's version message was too short to contain mandatory fields.
    #[error("version message too short")]
    VersionMessageTooShort,

    /// The client's version message was truncated and missing method bytes.
    #[error("incomplete version message")]
    IncompleteVersionMessage,

    /// No method in the client's advertised list was acceptable.
    #[error("no acceptable authentication method")]
    NoAcceptableMethod,

    // ===== Authentication =====
    /// The client used an unsupported authentication sub-negotiation version.
    #[error("authentication version not supported: {0}")]
    UnsupportedAuthVersion(u8),

    /// The authentication message from the client was too short or truncated.
    #[error("authentication message malformed: {0}")]
    AuthMessageMalformed(&'static str),

    /// The client's username/password did not match the configured credentials.
    #[error("authentication failed for user")]
    AuthFailed,

    // ===== Connection / Address =====
    /// The client specified an invalid or unsupported address type.
    #[error("invalid address type: {0}")]
    InvalidAddressType(u8),

    /// The client provided an invalid or malformed domain name.
    #[error("invalid domain name")]
    InvalidDomain,

    /// The connection request or address field was too short to parse.
    #[error("request too short")]
    RequestTooShort,

    /// The request's reserved byte (RSV) was non-zero.
    #[error("non-zero reserved byte in request")]
    InvalidReservedByte,

    /// The client requested an unsupported command (e.g. BIND).
    #[error("unsupported command: {0}")]
    UnsupportedCommand(u8),

    /// Name resolution failed. SOCKS5 has no dedicated code for this, so it
    /// always maps to `GeneralFailure`.
    #[error("failed to resolve address")]
    ResolveFailure,

    /// A SOCKS5 UDP datagram carried a non-zero FRAG byte; fragmentation is
    /// unsupported. Callers must discard the datagram, not tear the relay
    /// down, on this error.
    #[error("fragmented UDP datagram (unsupported)")]
    UdpFragmentationUnsupported,

    // ===== General =====
    /// A general I/O error occurred in the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SocksError {
    /// Maps this error onto the SOCKS5 reply code (RFC 1928 §6) that best
    /// describes it, per §7 of the design.
    pub fn reply_code(&self) -> u8 {
        match self {
            SocksError::UnsupportedCommand(_) => rep::COMMAND_NOT_SUPPORTED,
            SocksError::InvalidAddressType(_) => rep::ADDRESS_TYPE_NOT_SUPPORTED,
            SocksError::ResolveFailure => rep::GENERAL_FAILURE,
            SocksError::Io(e) => io_error_reply_code(e),
            _ => rep::GENERAL_FAILURE,
        }
    }
}

/// Translates a `connect`/`socket` I/O error into a SOCKS5 reply code,
/// mirroring the `errno` switch in the reference implementation's
/// `connect_socks_target`/`udp_svc_setup`.
pub fn io_error_reply_code(e: &io::Error) -> u8 {
    use io::ErrorKind::*;
    match e.kind() {
        TimedOut => rep::TTL_EXPIRED,
        ConnectionRefused => rep::CONNECTION_REFUSED,
        AddrNotAvailable | Unsupported => rep::ADDRESS_TYPE_NOT_SUPPORTED,
        NetworkUnreachable => rep::NETWORK_UNREACHABLE,
        HostUnreachable => rep::HOST_UNREACHABLE,
        _ => rep::GENERAL_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_command_maps_to_command_not_supported() {
        assert_eq!(
            SocksError::UnsupportedCommand(0x02).reply_code(),
            rep::COMMAND_NOT_SUPPORTED
        );
    }

    #[test]
    fn invalid_address_type_maps_to_address_type_not_supported() {
        assert_eq!(
            SocksError::InvalidAddressType(0x7f).reply_code(),
            rep::ADDRESS_TYPE_NOT_SUPPORTED
        );
    }

    #[test]
    fn connection_refused_io_error_maps_correctly() {
        let e = SocksError::Io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(e.reply_code(), rep::CONNECTION_REFUSED);
    }

    #[test]
    fn generic_io_error_maps_to_general_failure() {
        let e = SocksError::Io(io::Error::other("boom"));
        assert_eq!(e.reply_code(), rep::GENERAL_FAILURE);
    }
}
