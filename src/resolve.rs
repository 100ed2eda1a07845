//! Resolver facade (§4.2): turns a [`SocksAddr`] plus a socket kind hint
//! into a concrete [`SocketAddr`] the I/O layer can `connect`/`bind` to.
//!
//! IPv4 and IPv6 literals short-circuit without touching the resolver.
//! Domain names go through the host's name resolution (`tokio::net::lookup_host`,
//! itself backed by the platform's `getaddrinfo`). There is no SOCKS5 reply
//! code for "DNS lookup failed", so any resolution failure is reported as
//! [`SocksError::ResolveFailure`], which maps to `GeneralFailure`.

use tokio::net::lookup_host;

use crate::addr::SocksAddr;
use crate::error::SocksError;

/// Which kind of socket the resolved address will be used for. The two
/// variants currently resolve identically (via `getaddrinfo` with no
/// socktype hint), but are kept distinct because a host resolver
/// implementation may legitimately special-case one kind (e.g. to prefer
/// `SOCK_DGRAM`-capable records for UDP).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Kind {
    Tcp,
    Udp,
}

/// Resolves `addr` to a concrete socket address usable for `connect`/`bind`.
pub async fn resolve(addr: &SocksAddr, _kind: Kind) -> Result<std::net::SocketAddr, SocksError> {
    match addr {
        SocksAddr::V4(ip, port) => Ok(std::net::SocketAddr::new((*ip).into(), *port)),
        SocksAddr::V6(ip, port) => Ok(std::net::SocketAddr::new((*ip).into(), *port)),
        SocksAddr::Dns(name, port) => lookup_host((name.as_str(), *port))
            .await
            .map_err(|_| SocksError::ResolveFailure)?
            .next()
            .ok_or(SocksError::ResolveFailure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn v4_literal_short_circuits() {
        let addr = SocksAddr::V4(Ipv4Addr::new(93, 184, 216, 34), 80);
        let resolved = resolve(&addr, Kind::Tcp).await.unwrap();
        assert_eq!(resolved.port(), 80);
        assert_eq!(resolved.ip(), std::net::IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)));
    }

    #[tokio::test]
    async fn dns_resolves_localhost() {
        let addr = SocksAddr::Dns("localhost".into(), 0);
        let resolved = resolve(&addr, Kind::Udp).await.unwrap();
        assert!(resolved.ip().is_loopback());
    }
}
