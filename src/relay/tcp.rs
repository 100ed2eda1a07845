//! Bidirectional TCP relay loop (§4.5).
//!
//! Each direction runs as its own copy loop so the two make independent
//! forward progress; a chunk's traffic-counter update is only published
//! once that chunk's write loop has fully flushed. EOF or an I/O error on
//! either side ends the whole relay — `tokio::select!` below stands in for
//! the reference implementation's shared kqueue readiness set and
//! `goto`-style joint teardown.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::SocksError;
use crate::traffic::TrafficCounters;

const BUF_SIZE: usize = 16 * 1024;

async fn pump(
    mut reader: tokio::net::tcp::OwnedReadHalf,
    mut writer: tokio::net::tcp::OwnedWriteHalf,
    on_forwarded: impl Fn(u64),
) -> Result<(), SocksError> {
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
        on_forwarded(n as u64);
    }
}

/// Relays bytes between `client` and `target` until either side closes or
/// errors, recording each direction's forwarded bytes in `counters`.
pub async fn relay_tcp(
    client: TcpStream,
    target: TcpStream,
    counters: TrafficCounters,
) -> Result<(), SocksError> {
    let (client_rd, client_wr) = client.into_split();
    let (target_rd, target_wr) = target.into_split();

    let up_counters = counters.clone();
    let upload = pump(client_rd, target_wr, move |n| up_counters.add_upload(n));

    let down_counters = counters;
    let download = pump(target_rd, client_wr, move |n| down_counters.add_download(n));

    tokio::select! {
        res = upload => res,
        res = download => res,
    }
}
