use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use emberward_server::ServerManager;
use emberward_store::MemoryDatabase;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory holding per-shard state (config, keepalive, store files).
    #[arg(long, default_value = "Saved")]
    base_dir: PathBuf,

    /// First port handed to dynamically created shards.
    #[arg(long, default_value_t = 50100)]
    port_range_start: u16,

    /// One past the last dynamic shard port.
    #[arg(long, default_value_t = 50400)]
    port_range_end: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // The bundled store keeps everything in memory; a deployment wanting
    // durability points this at its own `Database` implementation.
    let store = Arc::new(MemoryDatabase::new());

    let mut manager = ServerManager::new(
        args.base_dir,
        store,
        args.port_range_start..args.port_range_end,
    );
    manager.init()?;

    let (shutdown_tx, shutdown_rx) = flume::bounded(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
        }
        warn!("quit signal received, starting shutdown");
        let _ = shutdown_tx.try_send(());
    });

    manager.run(shutdown_rx).await;
    Ok(())
}
