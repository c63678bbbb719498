use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use lockstep_netd::config::{ChunkConfig, IdleConfig, ServerConfig};
use lockstep_netd::run_server;
use lockstep_netd::services::Services;
use lockstep_netd::session::Session;
use lockstep_netproto::constants::{DEFAULT_PAD_BUFFER_SIZE, PAD_MAPPING_GRACE_FRAMES};
use lockstep_netproto::messages::game::NetSettings;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Lockstep netplay session server
#[derive(Parser, Debug)]
#[command(name = "lockstep-netd")]
#[command(about = "Deterministic lockstep netplay session server", long_about = None)]
struct Args {
    /// TCP bind address
    #[arg(short, long, default_value = "0.0.0.0:2626")]
    bind: SocketAddr,

    /// Name shown in server notices
    #[arg(long, default_value = "lockstep")]
    server_name: String,

    /// Game catalog JSON file
    #[arg(long, default_value = "games_list.json")]
    catalog: PathBuf,

    /// JSON file with the host's emulation settings
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Bandwidth cap for chunked transfers in kbit/s (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    chunk_rate_kbps: u32,

    /// Seconds a participant may idle in the lobby (0 disables eviction)
    #[arg(long, default_value_t = 600)]
    idle_timeout_secs: u32,

    /// Frames of relayed input tolerated from unmapped slots after a remap
    #[arg(long, default_value_t = PAD_MAPPING_GRACE_FRAMES)]
    grace_frames: u32,

    /// Initial pad buffer depth
    #[arg(long, default_value_t = DEFAULT_PAD_BUFFER_SIZE)]
    pad_buffer: u32,

    /// Close sockets silent for this long
    #[arg(long, default_value_t = 30)]
    peer_timeout_secs: u64,

    /// Let participants other than the host change mappings
    #[arg(long)]
    allow_client_mapping_changes: bool,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            server_name: self.server_name.clone(),
            catalog_path: self.catalog.clone(),
            pad_buffer_size: self.pad_buffer,
            pad_mapping_grace_frames: self.grace_frames,
            allow_client_mapping_changes: self.allow_client_mapping_changes,
            chunk: ChunkConfig {
                rate_limit_kbps: (self.chunk_rate_kbps > 0).then_some(self.chunk_rate_kbps),
                ..ChunkConfig::default()
            },
            idle: (self.idle_timeout_secs > 0).then(|| IdleConfig {
                max_idle_ticks: self.idle_timeout_secs,
                ..IdleConfig::default()
            }),
            ..ServerConfig::default()
        }
    }
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<NetSettings> {
    let Some(path) = path else {
        return Ok(NetSettings::default());
    };
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = load_settings(args.settings.as_ref())?;
    let (session, runtime) = Session::new(args.server_config(), settings, Services::default());

    // Network layer -> session loop.
    let (tx, rx) = mpsc::channel(1024);
    let peer_timeout = Duration::from_secs(args.peer_timeout_secs);
    let bind = args.bind;
    tokio::spawn(async move {
        if let Err(e) = lockstep_netd::net::tcp::run_tcp_listener(bind, tx, peer_timeout).await {
            error!(error = %e, "TCP listener failed");
        }
    });

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
        }
        ctrl_c.cancel();
    });

    info!(bind = %args.bind, name = %args.server_name, "Netplay server started");
    run_server(session, runtime, rx, shutdown).await
}
