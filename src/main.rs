use anyhow::Result;
use std::sync::Arc;
use trafficguard::config::Config;
use trafficguard::detector::BotDetector;
use trafficguard::middleware::GuardState;
use trafficguard::server::Server;
use trafficguard::storage::connect_storage;
use trafficguard::throttle::ThrottleGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("trafficguard={},tower_http=debug", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting TrafficGuard");

    let storage = connect_storage(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to set up storage: {}", e))?;

    let guard = ThrottleGuard::new(storage.clone(), config.policy())
        .map_err(|e| anyhow::anyhow!("Failed to build throttle guard: {}", e))?;

    let state = GuardState {
        guard: Arc::new(guard),
        detector: Arc::new(BotDetector::new()),
        storage,
    };

    Server::new(&config, state)
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
