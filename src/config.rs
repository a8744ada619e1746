use envconfig::Envconfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::policy::ThrottlePolicy;

/// Which persistence backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Try Redis, fall back to file storage if unreachable
    Auto,
    Redis,
    File,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(StoreKind::Auto),
            "redis" => Ok(StoreKind::Redis),
            "file" => Ok(StoreKind::File),
            other => Err(format!(
                "unknown store kind '{other}', expected auto, redis, or file"
            )),
        }
    }
}

#[derive(Debug, Envconfig, Clone)]
pub struct Config {
    /// Server bind address
    #[envconfig(from = "BIND_ADDR", default = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Persistence backend selection
    #[envconfig(from = "STORE", default = "auto")]
    pub store: StoreKind,

    /// Redis connection URL
    #[envconfig(from = "REDIS_URL", default = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Namespace prefix for record keys in Redis
    #[envconfig(from = "REDIS_KEY_PREFIX", default = "trafficguard:ip:")]
    pub redis_key_prefix: String,

    /// Expiry for record keys in Redis, in seconds
    #[envconfig(from = "REDIS_KEY_TTL", default = "86400")]
    pub redis_key_ttl: u64,

    /// Directory for the file-backed store
    #[envconfig(from = "LOG_DIR", default = "logs")]
    pub log_dir: PathBuf,

    /// Max requests allowed per client inside the rolling one-second window
    #[envconfig(from = "LIMIT_PER_SECOND", default = "10")]
    pub limit_per_second: u32,

    /// Throttle timeout duration in seconds
    #[envconfig(from = "TIMEOUT_SECONDS", default = "10")]
    pub timeout_seconds: u64,

    /// Violations at or above which a client is blocked
    #[envconfig(from = "MAX_VIOLATIONS", default = "5")]
    pub max_violations: u32,

    /// Default log level for the service
    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Config::init_from_env()
    }

    /// The throttle policy described by this configuration.
    pub fn policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            limit_per_second: self.limit_per_second,
            timeout: Duration::from_secs(self.timeout_seconds),
            max_violations: self.max_violations,
            ..ThrottlePolicy::default()
        }
    }
}
