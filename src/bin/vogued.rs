//! HTTP server binary for the vogue search engine.

use vogue::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local .env values lose to real environment variables.
    dotenvy::dotenv().ok();

    let config = ServerConfig::load()?;
    vogue::server::start_server(config).await?;

    Ok(())
}
