//! Redis-backed storage: one JSON value per identifier under a namespace
//! prefix, written with a TTL so abandoned clients age out on their own.

use async_trait::async_trait;
use redis::aio::Connection;
use redis::Client;
use tracing::{error, warn};

use super::Storage;
use crate::error::{GuardError, GuardResult};
use crate::record::ClientRecord;

pub const DEFAULT_KEY_PREFIX: &str = "trafficguard:ip:";
pub const DEFAULT_KEY_TTL_SECS: u64 = 86_400;

/// Persists records in a shared Redis instance.
///
/// Read-modify-write is not transactional: two concurrent evaluations for
/// the same identifier can interleave and the last SETEX wins.
pub struct RedisStorage {
    client: Client,
    key_prefix: String,
    key_ttl_secs: u64,
}

impl RedisStorage {
    /// Open a client and verify the server is reachable with a PING.
    pub async fn connect(url: &str, key_prefix: String, key_ttl_secs: u64) -> GuardResult<Self> {
        let client = Client::open(url)?;
        let storage = Self {
            client,
            key_prefix,
            key_ttl_secs,
        };
        storage.ping().await?;
        Ok(storage)
    }

    async fn connection(&self) -> GuardResult<Connection> {
        Ok(self.client.get_async_connection().await?)
    }

    fn redis_key(&self, identifier: &str) -> String {
        format!("{}{}", self.key_prefix, identifier)
    }
}

/// Decode a stored payload, upgrading legacy plain field maps transparently.
fn decode_payload(payload: &str) -> GuardResult<ClientRecord> {
    match ClientRecord::from_json(payload) {
        Ok(record) => Ok(record),
        Err(decode_err) => {
            let value: serde_json::Value = serde_json::from_str(payload)?;
            match ClientRecord::from_legacy(&value) {
                Some(record) => {
                    warn!("upgraded legacy payload shape to client record");
                    Ok(record)
                }
                None => Err(decode_err),
            }
        }
    }
}

#[async_trait]
impl Storage for RedisStorage {
    async fn load(&self, identifier: &str) -> GuardResult<Option<ClientRecord>> {
        let key = self.redis_key(identifier);
        let mut conn = self.connection().await?;

        let payload: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;

        let payload = match payload {
            Some(payload) => payload,
            None => return Ok(None),
        };

        match decode_payload(&payload) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                error!(
                    identifier,
                    key, error = %err,
                    "unreadable record payload, treating as absent"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, identifier: &str, record: &ClientRecord) -> GuardResult<()> {
        let key = self.redis_key(identifier);
        let payload = record.to_json()?;
        let mut conn = self.connection().await?;

        redis::cmd("SETEX")
            .arg(&key)
            .arg(self.key_ttl_secs)
            .arg(payload)
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> GuardResult<()> {
        let mut conn = self.connection().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(GuardError::Backend(format!(
                "unexpected PING reply: {reply}"
            )))
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_current_payload() {
        let mut record = ClientRecord::new();
        record.push_request_time(100);
        record.start_timeout(100);

        let payload = record.to_json().unwrap();
        let decoded = decode_payload(&payload).unwrap();

        assert_eq!(decoded, record);
    }

    #[test]
    fn test_decode_upgrades_legacy_field_map() {
        let payload = r#"{"violations": 2, "total_requests": 17}"#;

        let decoded = decode_payload(payload).unwrap();

        assert_eq!(decoded.violations, 2);
        assert_eq!(decoded.total_requests, 17);
        assert!(decoded.request_times.is_empty());
        assert_eq!(decoded.timeout_start, None);
    }

    #[test]
    fn test_decode_rejects_non_map_payload() {
        assert!(decode_payload("[1, 2]").is_err());
        assert!(decode_payload("garbage").is_err());
    }

    #[test]
    fn test_redis_key_uses_namespace_prefix() {
        let storage = RedisStorage {
            client: Client::open("redis://127.0.0.1:6379").unwrap(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            key_ttl_secs: DEFAULT_KEY_TTL_SECS,
        };

        assert_eq!(
            storage.redis_key("192.168.1.1"),
            "trafficguard:ip:192.168.1.1"
        );
    }
}
