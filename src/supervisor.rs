//! Session supervisor (§4.7): single accept loop, reaping finished
//! sessions, and bounding the failure rate of repeated accept/spawn errors.
//!
//! The reference implementation tracks a thread list and reaps with a
//! non-blocking `pthread_tryjoin_np` pass before each `accept`. A
//! `tokio::task::JoinSet` is the direct async-runtime analogue: it is the
//! supervisor's live-session list, and polling it opportunistically is the
//! reap pass, with the task runtime's own scheduler standing in for
//! `pthread_join`.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::auth::policy::AuthPolicy;
use crate::config::Config;
use crate::session::run_session;
use crate::traffic::TrafficCounters;

/// Pause applied after an accept or session-spawn failure, mirroring the
/// reference implementation's `FAILURE_TIMEOUT` back-off (default 64us).
const FAILURE_TIMEOUT: Duration = Duration::from_micros(64);

/// Builds the `AuthPolicy` a `Config`'s credentials imply.
fn policy_from_config(config: &Config) -> AuthPolicy {
    match &config.credentials {
        Some(creds) => AuthPolicy::user_pass(creds.clone(), config.auth_once),
        None => AuthPolicy::no_auth_only(),
    }
}

/// Runs the accept loop forever: binds `config.listen_addr`, then for each
/// accepted connection spawns a session task, reaping finished ones from
/// `sessions` opportunistically on every iteration.
pub async fn run(config: Config, counters: TrafficCounters) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "listening");

    let policy = policy_from_config(&config);
    let mut sessions: JoinSet<()> = JoinSet::new();

    loop {
        // Reap finished sessions (non-blocking): drain everything already
        // complete without awaiting new completions.
        while sessions.try_join_next().is_some() {}

        match listener.accept().await {
            Ok((stream, peer)) => {
                info!(%peer, "accepted connection");
                let policy = policy.clone();
                let counters = counters.clone();
                sessions.spawn(run_session(stream, peer, policy, counters));
            }
            Err(e) => {
                warn!(error = %e, "accept failed, backing off");
                tokio::time::sleep(FAILURE_TIMEOUT).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_auth_config_yields_no_auth_policy() {
        let config = Config::new("127.0.0.1:0".parse().unwrap(), None, None, false, false)
            .unwrap();
        let policy = policy_from_config(&config);
        assert!(policy.no_auth);
        assert!(policy.userpass.is_none());
    }

    #[test]
    fn credentialed_config_yields_userpass_policy() {
        let config = Config::new(
            "127.0.0.1:0".parse().unwrap(),
            Some("u".into()),
            Some("p".into()),
            true,
            false,
        )
        .unwrap();
        let policy = policy_from_config(&config);
        assert!(!policy.no_auth);
        assert!(policy.auth_once);
        assert!(policy.userpass.is_some());
    }
}
