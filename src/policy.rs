use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GuardError, GuardResult};

/// Throttling policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottlePolicy {
    /// Max requests allowed inside the rolling window
    pub limit_per_second: u32,
    /// Rolling window over which `limit_per_second` applies
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// Duration of an active throttle window once triggered
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Violation count at or above which a client is blocked
    pub max_violations: u32,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            limit_per_second: 10,
            window: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
            max_violations: 5,
        }
    }
}

impl ThrottlePolicy {
    /// Reject non-positive knobs before any request is evaluated.
    pub fn validate(&self) -> GuardResult<()> {
        if self.limit_per_second == 0 {
            return Err(GuardError::Config(
                "limit_per_second must be greater than 0".to_string(),
            ));
        }
        if self.window.as_secs() == 0 {
            return Err(GuardError::Config(
                "window must be at least one second".to_string(),
            ));
        }
        if self.timeout.as_secs() == 0 {
            return Err(GuardError::Config(
                "timeout must be at least one second".to_string(),
            ));
        }
        if self.max_violations == 0 {
            return Err(GuardError::Config(
                "max_violations must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }
}
