//! UDP ASSOCIATE relay (§4.6).
//!
//! The session owns exactly one event loop (`tokio::select!` below) that
//! multiplexes three readiness sources: the controlling TCP socket (any
//! inbound byte, or EOF, ends the session), the client-facing session UDP
//! socket, and a fan-in channel fed by one receive task per upstream
//! destination socket. This mirrors the `mpsc`-fan-in idiom for
//! multiplexing N per-destination sockets into a single authoritative
//! loop, generalized here from TCP-stream forwarding to UDP datagrams, and
//! stands in for the reference implementation's single kqueue set: the
//! loop is still the only place the session's destination table is
//! mutated, and any fatal error tears every upstream socket down together.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::addr::{decode_addr_port, encode_addr_port, SocksAddr};
use crate::error::SocksError;
use crate::resolve::{resolve, Kind};

/// Max SOCKS5 UDP header (262 bytes) plus a generous payload allowance.
const BUF_SIZE: usize = 262 + 1024;

struct UpstreamReply {
    dest: SocksAddr,
    payload: Vec<u8>,
}

/// Per-session mapping of declared destination to the upstream socket
/// connected to it, keyed exactly as received on the wire (§3, §4.6) so a
/// DNS destination's reply is re-serialized with the original name.
struct UdpSessionTable {
    sockets: HashMap<SocksAddr, Arc<UdpSocket>>,
    readers: JoinSet<()>,
}

impl UdpSessionTable {
    fn new() -> Self {
        Self {
            sockets: HashMap::new(),
            readers: JoinSet::new(),
        }
    }

    /// Returns the upstream socket for `dest`, creating and registering one
    /// (with its own reply-forwarding task) if this is the first datagram
    /// to this destination in the session.
    async fn get_or_insert(
        &mut self,
        dest: &SocksAddr,
        reply_tx: mpsc::UnboundedSender<UpstreamReply>,
    ) -> Result<Arc<UdpSocket>, SocksError> {
        if let Some(sock) = self.sockets.get(dest) {
            return Ok(sock.clone());
        }

        let resolved = resolve(dest, Kind::Udp).await?;
        let bind_addr: SocketAddr = if resolved.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(resolved).await?;
        let socket = Arc::new(socket);

        self.sockets.insert(dest.clone(), socket.clone());

        let reader_socket = socket.clone();
        let key = dest.clone();
        self.readers.spawn(async move {
            let mut buf = vec![0u8; BUF_SIZE];
            loop {
                match reader_socket.recv(&mut buf).await {
                    Ok(n) => {
                        let payload = buf[..n].to_vec();
                        if reply_tx
                            .send(UpstreamReply {
                                dest: key.clone(),
                                payload,
                            })
                            .is_err()
                        {
                            return;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "upstream UDP socket read failed, stopping reader");
                        return;
                    }
                }
            }
        });

        Ok(socket)
    }
}

/// Runs the UDP ASSOCIATE relay until the controlling TCP socket closes, a
/// fatal protocol/I/O error occurs, or the session socket errors.
///
/// `session_sock` is already bound; it is connected to the client's
/// declared peer up front, or left unconnected with `bind_to_peer_later`
/// set when the client declared the wildcard address, per §4.6 setup.
pub async fn relay_udp(
    control: TcpStream,
    session_sock: UdpSocket,
    mut bind_to_peer_later: bool,
) -> Result<(), SocksError> {
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<UpstreamReply>();
    let mut table = UdpSessionTable::new();
    let mut recv_buf = vec![0u8; BUF_SIZE];
    let mut control_buf = [0u8; 64];

    loop {
        tokio::select! {
            res = control.peek(&mut control_buf) => {
                match res {
                    Ok(0) | Err(_) => {
                        debug!("control channel closed, ending UDP relay");
                        return Ok(());
                    }
                    Ok(_) => {
                        debug!("client-initiated teardown on control channel");
                        return Ok(());
                    }
                }
            }

            res = session_sock.recv_from(&mut recv_buf) => {
                let (n, peer) = res?;

                if bind_to_peer_later {
                    session_sock.connect(peer).await?;
                    bind_to_peer_later = false;
                }

                match handle_client_datagram(&recv_buf[..n], &mut table, reply_tx.clone()).await {
                    Ok(()) => {}
                    Err(SocksError::UdpFragmentationUnsupported) => {
                        debug!("discarding fragmented UDP datagram");
                    }
                    Err(e) => {
                        warn!(error = %e, "fatal error in UDP relay, tearing down session");
                        return Err(e);
                    }
                }
            }

            Some(reply) = reply_rx.recv() => {
                let mut datagram = vec![0x00, 0x00, 0x00];
                datagram.extend(encode_addr_port(&reply.dest));
                datagram.extend_from_slice(&reply.payload);
                session_sock.send(&datagram).await?;
            }
        }
    }
}

async fn handle_client_datagram(
    buf: &[u8],
    table: &mut UdpSessionTable,
    reply_tx: mpsc::UnboundedSender<UpstreamReply>,
) -> Result<(), SocksError> {
    if buf.len() < 4 {
        return Err(SocksError::RequestTooShort);
    }

    let frag = buf[2];
    if frag != 0 {
        return Err(SocksError::UdpFragmentationUnsupported);
    }

    let (dest, used) = decode_addr_port(&buf[3..])?;
    let payload = &buf[3 + used..];

    let socket = table.get_or_insert(&dest, reply_tx).await?;
    socket.send(payload).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn handle_datagram_rejects_fragmentation() {
        let mut table = UdpSessionTable::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let buf = [0x00, 0x00, 0x01, 0x01, 127, 0, 0, 1, 0, 9];
        let err = handle_client_datagram(&buf, &mut table, tx).await.unwrap_err();
        assert!(matches!(err, SocksError::UdpFragmentationUnsupported));
    }

    #[tokio::test]
    async fn handle_datagram_rejects_short_buffer() {
        let mut table = UdpSessionTable::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = handle_client_datagram(&[0x00, 0x00], &mut table, tx)
            .await
            .unwrap_err();
        assert!(matches!(err, SocksError::RequestTooShort));
    }

    #[tokio::test]
    async fn table_reuses_socket_for_same_destination() {
        let mut table = UdpSessionTable::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let dest = SocksAddr::V4(Ipv4Addr::new(127, 0, 0, 1), 9);
        let a = table.get_or_insert(&dest, tx.clone()).await.unwrap();
        let b = table.get_or_insert(&dest, tx).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
