//! The decision engine: loads a client record, folds in the current request,
//! evaluates the rate/violation policy, persists, and returns a decision.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

use crate::error::GuardResult;
use crate::identity::UNKNOWN_IDENTIFIER;
use crate::policy::ThrottlePolicy;
use crate::record::ClientRecord;
use crate::storage::Storage;

/// Outcome of one evaluation, consumed by the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Under the limit, let the request through
    Normal,
    /// Over the limit inside an open timeout window; the caller should
    /// respond with a rate-limit status and this retry hint
    Throttled { retry_after: Duration },
    /// Violations reached the configured maximum
    Blocked,
}

/// Everything one evaluation needs, passed explicitly so the engine reads no
/// ambient request state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identifier: String,
    pub user_agent: String,
    /// Unix seconds
    pub timestamp: u64,
}

impl RequestContext {
    pub fn new(identifier: String, user_agent: String, timestamp: u64) -> Self {
        Self {
            identifier,
            user_agent,
            timestamp,
        }
    }

    /// Context stamped with the current wall clock.
    pub fn now(identifier: String, user_agent: String) -> Self {
        Self::new(identifier, user_agent, unix_now())
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Per-client request throttle over a pluggable storage backend.
pub struct ThrottleGuard {
    storage: Arc<dyn Storage>,
    policy: ThrottlePolicy,
}

impl ThrottleGuard {
    /// Build a guard over `storage`. Invalid policy values are rejected here
    /// rather than at request time.
    pub fn new(storage: Arc<dyn Storage>, policy: ThrottlePolicy) -> GuardResult<Self> {
        policy.validate()?;
        Ok(Self { storage, policy })
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    /// Evaluate one request.
    ///
    /// Load and save are unsynchronized: concurrent evaluations for the same
    /// identifier can interleave and the last save wins. A load failure
    /// degrades to an empty record and a save failure is logged after the
    /// decision is computed, so a backend outage allows rather than blocks.
    pub async fn check(&self, ctx: &RequestContext) -> Decision {
        if ctx.identifier == UNKNOWN_IDENTIFIER {
            debug!("no usable client identifier, allowing");
            return Decision::Normal;
        }

        let mut record = match self.storage.load(&ctx.identifier).await {
            Ok(Some(record)) => record,
            Ok(None) => ClientRecord::new(),
            Err(err) => {
                warn!(
                    identifier = %ctx.identifier,
                    error = %err,
                    "record load failed, starting from empty state"
                );
                ClientRecord::new()
            }
        };

        record.prune_request_times(ctx.timestamp, self.policy.window_secs());
        record.push_request_time(ctx.timestamp);
        record.increment_user_agent(&ctx.user_agent);
        record.set_last_seen(ctx.timestamp);
        record.increment_total_requests();

        let limit_exceeded = record.request_times.len() as u64 > self.policy.limit_per_second as u64;
        if limit_exceeded {
            if record.timeout_active(ctx.timestamp, self.policy.timeout_secs()) {
                record.increment_violations();
            } else {
                record.start_timeout(ctx.timestamp);
            }
            debug!(
                identifier = %ctx.identifier,
                violations = record.violations,
                "rate limit exceeded"
            );
        }

        let decision = if record.violations >= self.policy.max_violations {
            Decision::Blocked
        } else if limit_exceeded {
            Decision::Throttled {
                retry_after: self.policy.timeout,
            }
        } else {
            Decision::Normal
        };

        self.persist(&ctx.identifier, &record).await;
        decision
    }

    /// Read-only fast path: whether stored state already marks the client as
    /// blocked. Absent or unreadable state is never blocked.
    pub async fn is_blocked(&self, identifier: &str) -> bool {
        match self.storage.load(identifier).await {
            Ok(Some(record)) => record.violations >= self.policy.max_violations,
            Ok(None) => false,
            Err(err) => {
                warn!(identifier, error = %err, "record load failed, treating as not blocked");
                false
            }
        }
    }

    async fn persist(&self, identifier: &str, record: &ClientRecord) {
        if let Err(err) = self.storage.save(identifier, record).await {
            error!(identifier, error = %err, "failed to persist client record");
        }
    }
}
