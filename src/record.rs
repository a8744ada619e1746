use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::GuardResult;

/// State tracked per client identifier.
///
/// The engine owns the in-memory mutation of a record for the duration of one
/// evaluation; storage backends treat it as an opaque value. All timestamps
/// are unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Timestamps of recent requests, insertion order = chronological order
    pub request_times: Vec<u64>,
    /// Occurrence count per raw user-agent string
    pub user_agents: HashMap<String, u64>,
    /// Timestamp of the most recent request
    pub last_seen: Option<u64>,
    /// Lifetime request total
    pub total_requests: u64,
    /// Start of the current rate-limit timeout window, if one is open
    pub timeout_start: Option<u64>,
    /// Rate-limit breaches recorded within the current timeout window
    pub violations: u32,
}

impl ClientRecord {
    pub fn new() -> Self {
        Self {
            request_times: Vec::new(),
            user_agents: HashMap::new(),
            last_seen: None,
            total_requests: 0,
            timeout_start: None,
            violations: 0,
        }
    }

    /// Drop request timestamps older than `window_secs` relative to `now`.
    pub fn prune_request_times(&mut self, now: u64, window_secs: u64) {
        self.request_times
            .retain(|&t| now.saturating_sub(t) < window_secs);
    }

    pub fn push_request_time(&mut self, timestamp: u64) {
        self.request_times.push(timestamp);
    }

    pub fn increment_user_agent(&mut self, user_agent: &str) {
        *self
            .user_agents
            .entry(user_agent.to_string())
            .or_insert(0) += 1;
    }

    pub fn set_last_seen(&mut self, timestamp: u64) {
        self.last_seen = Some(timestamp);
    }

    pub fn increment_total_requests(&mut self) {
        self.total_requests += 1;
    }

    /// Open a fresh timeout window. Resets the violation count to 1 rather
    /// than carrying over breaches from an expired window.
    pub fn start_timeout(&mut self, timestamp: u64) {
        self.timeout_start = Some(timestamp);
        self.violations = 1;
    }

    pub fn increment_violations(&mut self) {
        self.violations += 1;
    }

    /// Whether a timeout window is still open at `now`.
    pub fn timeout_active(&self, now: u64, timeout_secs: u64) -> bool {
        self.timeout_start
            .map(|start| now.saturating_sub(start) < timeout_secs)
            .unwrap_or(false)
    }

    /// Compact JSON, used for the distributed store.
    pub fn to_json(&self) -> GuardResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Pretty-printed JSON, used for the on-disk layout.
    pub fn to_json_pretty(&self) -> GuardResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Strict decode: a payload missing fields or carrying wrong types fails
    /// rather than producing a partially-populated record.
    pub fn from_json(payload: &str) -> GuardResult<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Build a record from a legacy plain field map, defaulting whatever the
    /// old payload did not carry. Returns `None` for non-object payloads.
    pub fn from_legacy(value: &Value) -> Option<Self> {
        let map = value.as_object()?;

        let request_times = map
            .get("request_times")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default();

        let user_agents = map
            .get("user_agents")
            .and_then(Value::as_object)
            .map(|o| {
                o.iter()
                    .filter_map(|(k, v)| v.as_u64().map(|n| (k.clone(), n)))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            request_times,
            user_agents,
            last_seen: map.get("last_seen").and_then(Value::as_u64),
            total_requests: map
                .get("total_requests")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            timeout_start: map.get("timeout_start").and_then(Value::as_u64),
            violations: map
                .get("violations")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32,
        })
    }
}

impl Default for ClientRecord {
    fn default() -> Self {
        Self::new()
    }
}
