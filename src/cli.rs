//! Process entrypoint CLI, matching the style of the other pack repos'
//! `clap`-derived option structs (env-overridable, sensible defaults).

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "nts-server", version, about = "Node Tracker Service")]
pub struct Cli {
    /// Path to a TOML configuration file (optional; env vars always apply).
    #[arg(long, env = "NTS_CONFIG_PATH")]
    pub config: Option<String>,

    /// Override the RPC bind address from the config file.
    #[arg(long, env = "NTS_BIND_ADDR")]
    pub bind: Option<std::net::SocketAddr>,

    /// Override the Prometheus metrics bind address.
    #[arg(long, env = "NTS_METRICS_BIND_ADDR")]
    pub metrics_bind: Option<std::net::SocketAddr>,
}
