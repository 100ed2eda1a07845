//! A small, multi-session async SOCKS5 proxy server core.
//!
//! Implements SOCKS5 negotiation and optional username/password
//! authentication (RFC 1928 / RFC 1929), the `CONNECT` command as a
//! bidirectional TCP relay, and `UDP ASSOCIATE` as a multi-destination UDP
//! relay. The binary in `src/main.rs` is a thin CLI wrapper around
//! [`config::Config`] and [`supervisor::run`]; everything else here is
//! usable as a library by any embedder that wants its own bootstrap.

pub mod addr;
pub mod auth;
pub mod conn;
pub mod config;
pub mod error;
pub mod method;
pub mod relay;
pub mod resolve;
pub mod session;
pub mod supervisor;
pub mod traffic;

pub use config::{Config, ConfigError};
pub use error::SocksError;
pub use traffic::TrafficCounters;
