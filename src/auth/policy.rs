//! Authentication policy: which methods a session may negotiate, and the
//! "auth-once" IP allowlist that lets a client skip re-authenticating on a
//! later connection from an address that already authenticated successfully.
//!
//! Mirrors the reference server's `auth_ips` table (a mutex-guarded array of
//! peer addresses), reshaped into an `RwLock<HashSet<IpAddr>>` so concurrent
//! sessions can all take the read path on the common case of checking
//! membership, and only contend on the write path when recording a new
//! authenticated address.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::method::{FixedMethod, Method};

/// Username/password credentials the server will accept.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

/// Tracks peer addresses that have already completed username/password
/// authentication once, so that `auth_once` policy can let them reconnect
/// with `NoAuth` without weakening the password check itself.
#[derive(Debug, Clone, Default)]
pub struct AuthIpSet {
    inner: Arc<RwLock<HashSet<IpAddr>>>,
}

impl AuthIpSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, ip: IpAddr) -> bool {
        self.inner.read().await.contains(&ip)
    }

    pub async fn insert(&self, ip: IpAddr) {
        self.inner.write().await.insert(ip);
    }
}

/// Which methods a session is willing to negotiate.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    pub no_auth: bool,
    pub userpass: Option<Credentials>,
    /// When set alongside `userpass`, an address that has authenticated once
    /// is allowed to skip auth on subsequent connections.
    pub auth_once: bool,
    pub authed_ips: AuthIpSet,
}

impl AuthPolicy {
    pub fn no_auth_only() -> Self {
        Self {
            no_auth: true,
            userpass: None,
            auth_once: false,
            authed_ips: AuthIpSet::new(),
        }
    }

    pub fn user_pass(creds: Credentials, auth_once: bool) -> Self {
        Self {
            no_auth: false,
            userpass: Some(creds),
            auth_once,
            authed_ips: AuthIpSet::new(),
        }
    }

    /// Picks the method to select from the client's offered list, given the
    /// peer address (needed for the `auth_once` allowlist check).
    pub async fn select(&self, offered: &[Method], peer: IpAddr) -> Method {
        if self.auth_once
            && self.userpass.is_some()
            && offered.contains(&Method::Fixed(FixedMethod::NoAuth))
            && self.authed_ips.contains(peer).await
        {
            return Method::Fixed(FixedMethod::NoAuth);
        }

        if self.no_auth && offered.contains(&Method::Fixed(FixedMethod::NoAuth)) {
            return Method::Fixed(FixedMethod::NoAuth);
        }

        if self.userpass.is_some() && offered.contains(&Method::Fixed(FixedMethod::UsePass)) {
            return Method::Fixed(FixedMethod::UsePass);
        }

        Method::Fixed(FixedMethod::NoAcceptable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn peer() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    #[tokio::test]
    async fn no_auth_policy_selects_no_auth() {
        let policy = AuthPolicy::no_auth_only();
        let offered = [Method::Fixed(FixedMethod::NoAuth)];
        let selected = policy.select(&offered, peer()).await;
        assert_eq!(selected, Method::Fixed(FixedMethod::NoAuth));
    }

    #[tokio::test]
    async fn userpass_policy_rejects_no_auth_offer() {
        let creds = Credentials {
            username: "u".into(),
            password: "p".into(),
        };
        let policy = AuthPolicy::user_pass(creds, false);
        let offered = [Method::Fixed(FixedMethod::NoAuth)];
        let selected = policy.select(&offered, peer()).await;
        assert_eq!(selected, Method::Fixed(FixedMethod::NoAcceptable));
    }

    #[tokio::test]
    async fn auth_once_allows_no_auth_after_prior_success() {
        let creds = Credentials {
            username: "u".into(),
            password: "p".into(),
        };
        let policy = AuthPolicy::user_pass(creds, true);
        policy.authed_ips.insert(peer()).await;
        let offered = [Method::Fixed(FixedMethod::NoAuth)];
        let selected = policy.select(&offered, peer()).await;
        assert_eq!(selected, Method::Fixed(FixedMethod::NoAuth));
    }

    #[tokio::test]
    async fn auth_once_requires_prior_success() {
        let creds = Credentials {
            username: "u".into(),
            password: "p".into(),
        };
        let policy = AuthPolicy::user_pass(creds, true);
        let offered = [Method::Fixed(FixedMethod::NoAuth)];
        let selected = policy.select(&offered, peer()).await;
        assert_eq!(selected, Method::Fixed(FixedMethod::NoAcceptable));
    }
}
