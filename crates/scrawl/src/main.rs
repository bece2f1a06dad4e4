use tracing_subscriber::EnvFilter;

use scrawl::{ScrawlError, ScrawlServer, Settings};

#[tokio::main]
async fn main() -> Result<(), ScrawlError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scrawl=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    tracing::info!(bind = %settings.bind_addr, ttl = settings.room_ttl_sec, "starting");

    let server = ScrawlServer::bind(settings).await?;
    server.run().await
}
