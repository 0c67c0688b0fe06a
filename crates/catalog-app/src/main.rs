//! Catalog command driver: JSON commands on stdin, JSON responses on stdout.

use catalog_app::{App, CatalogConfig, Driver};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = CatalogConfig::from_env()?;
    let app = App::build(&config).await?;

    let mut driver = Driver::new(&app);
    driver
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    app.shutdown().await;
    Ok(())
}
