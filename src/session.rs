//! Per-client session state machine (§4.4): negotiation, optional
//! authentication, request dispatch, and handoff into the matching relay.
//!
//! States `Connected -> NeedAuth | Authed -> Terminal` are not modeled as an
//! explicit enum; the linear `run` control flow below *is* the state
//! machine, since every transition is driven by exactly the next frame read
//! off the client socket and there is no point where a session revisits an
//! earlier state. Each `return` is a transition into `Terminal`.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::{info, warn};

use crate::addr::SocksAddr;
use crate::auth::policy::AuthPolicy;
use crate::auth::reply::{AuthReply, AuthStatus};
use crate::auth::request::AuthRequest;
use crate::conn::reply::ConnReply;
use crate::conn::request::{Cmd, ConnRequest};
use crate::error::{rep, SocksError};
use crate::method::{FixedMethod, Greeting, Method, MethodSelection};
use crate::relay::tcp::relay_tcp;
use crate::relay::udp::relay_udp;
use crate::resolve::{resolve, Kind};
use crate::traffic::TrafficCounters;

/// Runs one client session to completion. Never returns an error the caller
/// needs to relay further: every failure is either converted into a best-
/// effort wire reply before the session ends, or is unrepresentable on the
/// wire (mid-relay I/O error) and simply ends the session.
pub async fn run_session(
    client: TcpStream,
    peer: SocketAddr,
    policy: AuthPolicy,
    counters: TrafficCounters,
) {
    match run(client, peer, &policy, counters).await {
        Ok(()) => info!(%peer, "session ended"),
        Err(e) => warn!(%peer, error = %e, "session ended with error"),
    }
}

async fn run(
    mut client: TcpStream,
    peer: SocketAddr,
    policy: &AuthPolicy,
    counters: TrafficCounters,
) -> Result<(), SocksError> {
    let mut buf = [0u8; 1024];

    // Connected -> NeedAuth | Authed | Terminal
    let n = client.read(&mut buf).await?;
    let greeting = Greeting::try_from(&buf[..n])?;

    let selected = policy.select(&greeting.methods, peer.ip()).await;
    client
        .write_all(&MethodSelection(selected).to_bytes())
        .await?;

    if selected == Method::Fixed(FixedMethod::NoAcceptable) {
        return Err(SocksError::NoAcceptableMethod);
    }

    // NeedAuth -> Authed | Terminal
    if selected == Method::Fixed(FixedMethod::UsePass) {
        let n = client.read(&mut buf).await?;
        let auth_req = AuthRequest::try_from(&buf[..n])?;

        let creds = policy
            .userpass
            .as_ref()
            .expect("UsePass only selected when credentials are configured");

        if creds.matches(&auth_req.uname, &auth_req.passwd) {
            client
                .write_all(&AuthReply(AuthStatus::Success).to_bytes())
                .await?;
            if policy.auth_once {
                policy.authed_ips.insert(peer.ip()).await;
            }
        } else {
            client
                .write_all(&AuthReply(AuthStatus::Failure).to_bytes())
                .await?;
            return Err(SocksError::AuthFailed);
        }
    }

    // Authed: parse request, resolve, dispatch, terminate.
    let n = client.read(&mut buf).await?;
    let request = match ConnRequest::try_from(&buf[..n]) {
        Ok(req) => req,
        Err(e) => {
            let _ = client
                .write_all(&ConnReply::failure(e.reply_code()).to_bytes())
                .await;
            return Err(e);
        }
    };

    match request.cmd {
        Cmd::Connect => handle_connect(client, &request.dst, counters).await,
        Cmd::UdpAssociate => handle_udp_associate(client, &request.dst).await,
    }
}

async fn handle_connect(
    mut client: TcpStream,
    dst: &SocksAddr,
    counters: TrafficCounters,
) -> Result<(), SocksError> {
    let resolved = match resolve(dst, Kind::Tcp).await {
        Ok(addr) => addr,
        Err(e) => {
            let _ = client
                .write_all(&ConnReply::failure(e.reply_code()).to_bytes())
                .await;
            return Err(e);
        }
    };

    let target = match TcpStream::connect(resolved).await {
        Ok(stream) => stream,
        Err(e) => {
            let code = crate::error::io_error_reply_code(&e);
            let _ = client
                .write_all(&ConnReply::failure(code).to_bytes())
                .await;
            return Err(SocksError::Io(e));
        }
    };

    let local = target.local_addr()?;
    client
        .write_all(&ConnReply::new(rep::SUCCEEDED, SocksAddr::from(local)).to_bytes())
        .await?;

    relay_tcp(client, target, counters).await
}

async fn handle_udp_associate(mut client: TcpStream, dst: &SocksAddr) -> Result<(), SocksError> {
    let declared = resolve(dst, Kind::Udp)
        .await
        .unwrap_or_else(|_| "0.0.0.0:0".parse().expect("static literal always parses"));

    let bind_to_peer_later = declared.ip().is_unspecified();
    let bind_addr: SocketAddr = if declared.is_ipv4() {
        "0.0.0.0:0".parse().unwrap()
    } else {
        "[::]:0".parse().unwrap()
    };
    let session_sock = UdpSocket::bind(bind_addr).await?;

    if !bind_to_peer_later {
        session_sock.connect(declared).await?;
    }

    let local = session_sock.local_addr()?;
    client
        .write_all(&ConnReply::new(rep::SUCCEEDED, SocksAddr::from(local)).to_bytes())
        .await?;

    relay_udp(client, session_sock, bind_to_peer_later).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    #[tokio::test]
    async fn method_negotiation_rejects_when_no_method_matches() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(&[0x05, 0x01, 0x02]).await.unwrap();
            let mut reply = [0u8; 2];
            stream.read_exact(&mut reply).await.unwrap();
            reply
        });

        let (server_stream, peer) = listener.accept().await.unwrap();
        let policy = AuthPolicy::no_auth_only();
        let counters = TrafficCounters::default();
        let result = run(server_stream, peer, &policy, counters).await;

        assert!(matches!(result, Err(SocksError::NoAcceptableMethod)));
        let reply = client_task.await.unwrap();
        assert_eq!(reply, [0x05, 0xFF]);
    }
}
