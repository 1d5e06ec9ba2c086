//! Peepin Node binary
//!
//! Serves the nearby-people API configured from `PEEPIN_*` environment variables.

use peepin_node::{NodeConfig, PeepinNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peepin_node=info,peepin_proximity=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Peepin Node");

    let config = NodeConfig::from_env()?;

    // Create and run node
    let node = PeepinNode::new(config).await?;
    node.run().await?;

    Ok(())
}
