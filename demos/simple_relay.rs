//! Simple session relay server
//!
//! Run with: cargo run --example simple_relay [HOST]
//!
//! Examples:
//!   cargo run --example simple_relay               # binds to 0.0.0.0
//!   cargo run --example simple_relay 127.0.0.1     # binds to loopback
//!
//! The server listens on three fixed ports: the control channel (TCP) plus
//! one UDP relay per media class. Stop it with Ctrl-C; remaining
//! participants are disconnected with an RM broadcast on the way out.

use std::net::IpAddr;

use relay_rs::{RelayServer, ServerConfig};

#[tokio::main]
async fn main() -> relay_rs::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_rs=info".into()),
        )
        .init();

    let host: IpAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0".to_string())
        .parse()
        .expect("invalid host address");

    let server = RelayServer::bind(ServerConfig::with_host(host)).await?;

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
