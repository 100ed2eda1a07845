use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use socksd::{Config, TrafficCounters};

/// A small, multi-session SOCKS5 proxy server.
#[derive(Debug, Parser)]
#[command(name = "socksd", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(short = 'i', long = "listenip", default_value = "0.0.0.0")]
    listen_ip: IpAddr,

    /// Port to listen on.
    #[arg(short = 'p', long = "port", default_value_t = 1080)]
    port: u16,

    /// Username for username/password authentication (requires --pass).
    #[arg(short = 'u', long = "user")]
    user: Option<String>,

    /// Password for username/password authentication (requires --user).
    #[arg(short = 'P', long = "pass")]
    pass: Option<String>,

    /// Admit an address without re-authenticating once it has authenticated
    /// once (requires --user/--pass).
    #[arg(short = '1', long = "auth-once")]
    auth_once: bool,

    /// Suppress all but warnings and errors.
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();

    let listen_addr = SocketAddr::new(args.listen_ip, args.port);
    let config = match Config::new(listen_addr, args.user, args.pass, args.auth_once, args.quiet) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("socksd: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    init_logging(config.quiet);

    let counters = TrafficCounters::default();
    if let Err(e) = socksd::supervisor::run(config, counters).await {
        tracing::error!(error = %e, "server exited");
        return std::process::ExitCode::FAILURE;
    }

    std::process::ExitCode::SUCCESS
}

fn init_logging(quiet: bool) {
    let default_filter = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
