use std::net::SocketAddr;

use saathi_retrieval::RetrievalConfig;
use tracing_subscriber::EnvFilter;

/// Optional path to a TOML configuration file.
const CONFIG_ENV: &str = "SAATHI_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            tracing::info!("Loading configuration from {path}");
            RetrievalConfig::load(&path)?
        }
        Err(_) => RetrievalConfig::default(),
    };

    let port: u16 = match std::env::var("API_PORT") {
        Ok(p) => p.parse()?,
        Err(_) => 8000,
    };

    saathi_app_server::run(config, SocketAddr::from(([0, 0, 0, 0], port))).await
}
