//! News node server example
//!
//! Runs a node with the REST API until Ctrl+C or SIGTERM.
//!
//! ```text
//! cargo run --example serve -- [config.json]
//! ```
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:4000/swagger-ui
//! - Fetch every enabled source via GET http://localhost:4000/articles/fetch
//! - Poll a job via GET http://localhost:4000/jobs/{jobId}
//! - Stream events via GET http://localhost:4000/events or ws://localhost:4000/ws

use newsnode::{Config, NewsNode, run_with_shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("newsnode=info,tower_http=info")),
        )
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(std::path::Path::new(&path))?,
        None => Config::default(),
    };
    config.apply_env_overrides()?;

    let address = config.server.api.bind_address;
    let node = NewsNode::new(config.clone()).await?;

    println!("Starting newsnode on http://{}", address);
    println!("Swagger UI: http://{}/swagger-ui", address);
    println!();
    println!("Example commands:");
    println!("  curl http://{}/sources?withMeta=true", address);
    println!("  curl http://{}/articles/fetch", address);
    println!("  curl -N http://{}/events", address);

    run_with_shutdown(node, config).await?;
    Ok(())
}
