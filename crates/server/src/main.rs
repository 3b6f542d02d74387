//! Blob Arena game server.

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Blob Arena Server v{}", env!("CARGO_PKG_VERSION"));

    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Ops port: {}", config.server.ops_port);
    info!("  World: {}x{}", config.world.size, config.world.size);
    info!("  Tick rate: {} Hz", config.server.tick_rate);

    server::run(config).await?;

    Ok(())
}
