//! Persistence port for client records and the startup backend selection.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod file;
pub mod redis;

pub use self::redis::RedisStorage;
pub use file::FileStorage;

use crate::config::{Config, StoreKind};
use crate::error::GuardResult;
use crate::record::ClientRecord;

/// How long the auto bootstrap waits for Redis before falling back to files.
const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Abstract load/save contract keyed by client identifier.
///
/// A backend is a pure key→value store for records and knows nothing about
/// throttling semantics. `load` on a never-seen identifier is `Ok(None)`,
/// not an error.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load(&self, identifier: &str) -> GuardResult<Option<ClientRecord>>;

    async fn save(&self, identifier: &str, record: &ClientRecord) -> GuardResult<()>;

    /// Liveness probe for health reporting.
    async fn ping(&self) -> GuardResult<()>;

    fn name(&self) -> &'static str;
}

/// Select and construct the persistence backend for this process.
///
/// `auto` tries Redis under a short connection timeout and falls back to the
/// file store when it is unreachable; an explicitly requested backend is
/// constructed directly and its failure is fatal.
pub async fn connect_storage(config: &Config) -> GuardResult<Arc<dyn Storage>> {
    match config.store {
        StoreKind::File => {
            let storage = FileStorage::new(&config.log_dir).await?;
            info!(dir = %config.log_dir.display(), "using file storage");
            Ok(Arc::new(storage))
        }
        StoreKind::Redis => {
            let storage = connect_redis(config).await?;
            info!(url = %config.redis_url, "using redis storage");
            Ok(Arc::new(storage))
        }
        StoreKind::Auto => {
            match tokio::time::timeout(REDIS_CONNECT_TIMEOUT, connect_redis(config)).await {
                Ok(Ok(storage)) => {
                    info!(url = %config.redis_url, "using redis storage");
                    Ok(Arc::new(storage))
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "redis unreachable, falling back to file storage");
                    let storage = FileStorage::new(&config.log_dir).await?;
                    Ok(Arc::new(storage))
                }
                Err(_) => {
                    warn!(
                        timeout_ms = REDIS_CONNECT_TIMEOUT.as_millis() as u64,
                        "redis connection timed out, falling back to file storage"
                    );
                    let storage = FileStorage::new(&config.log_dir).await?;
                    Ok(Arc::new(storage))
                }
            }
        }
    }
}

async fn connect_redis(config: &Config) -> GuardResult<RedisStorage> {
    RedisStorage::connect(
        &config.redis_url,
        config.redis_key_prefix.clone(),
        config.redis_key_ttl,
    )
    .await
}
