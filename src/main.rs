use anyhow::Result;
use tracing_subscriber::EnvFilter;

use vlr_pickem::config::Config;
use vlr_pickem::server;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vlr_pickem=info")),
        )
        .init();

    let cfg = Config::from_env();
    server::run(cfg).await
}
