//! Server configuration and its up-front validation (§4.8).
//!
//! A `Config` enforces the §4.3 preconditions at construction, so a
//! `Server` built from one can never observe an invalid auth combination —
//! whether the values came from the CLI binary, an embedding crate, or a
//! test harness.

use std::net::SocketAddr;

use thiserror::Error;

use crate::auth::policy::Credentials;

/// Rejects an invalid `Config` before any socket is opened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--user was given without --pass")]
    UserWithoutPass,
    #[error("--pass was given without --user")]
    PassWithoutUser,
    #[error("auth-once requires both --user and --pass")]
    AuthOnceWithoutCredentials,
}

/// Validated, immutable server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub credentials: Option<Credentials>,
    pub auth_once: bool,
    pub quiet: bool,
}

impl Config {
    /// Builds a `Config`, enforcing the §4.3 credential preconditions.
    pub fn new(
        listen_addr: SocketAddr,
        user: Option<String>,
        pass: Option<String>,
        auth_once: bool,
        quiet: bool,
    ) -> Result<Self, ConfigError> {
        let credentials = match (user, pass) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (Some(_), None) => return Err(ConfigError::UserWithoutPass),
            (None, Some(_)) => return Err(ConfigError::PassWithoutUser),
            (None, None) => None,
        };

        if auth_once && credentials.is_none() {
            return Err(ConfigError::AuthOnceWithoutCredentials);
        }

        Ok(Self {
            listen_addr,
            credentials,
            auth_once,
            quiet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "0.0.0.0:1080".parse().unwrap()
    }

    #[test]
    fn accepts_no_credentials() {
        let cfg = Config::new(addr(), None, None, false, false).unwrap();
        assert!(cfg.credentials.is_none());
    }

    #[test]
    fn accepts_matched_credentials() {
        let cfg = Config::new(addr(), Some("u".into()), Some("p".into()), false, false).unwrap();
        assert!(cfg.credentials.is_some());
    }

    #[test]
    fn rejects_user_without_pass() {
        let err = Config::new(addr(), Some("u".into()), None, false, false).unwrap_err();
        assert_eq!(err, ConfigError::UserWithoutPass);
    }

    #[test]
    fn rejects_pass_without_user() {
        let err = Config::new(addr(), None, Some("p".into()), false, false).unwrap_err();
        assert_eq!(err, ConfigError::PassWithoutUser);
    }

    #[test]
    fn rejects_auth_once_without_credentials() {
        let err = Config::new(addr(), None, None, true, false).unwrap_err();
        assert_eq!(err, ConfigError::AuthOnceWithoutCredentials);
    }
}
