//! File-backed storage: one pretty-printed JSON file per identifier.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use super::Storage;
use crate::error::GuardResult;
use crate::record::ClientRecord;

const FILE_EXTENSION: &str = "json";

/// Persists one record per identifier as a file in `log_dir`.
///
/// Writes are full overwrites with no temp-file rename and no locking;
/// concurrent writers to the same identifier race and the last write wins.
pub struct FileStorage {
    log_dir: PathBuf,
}

impl FileStorage {
    /// Create the store, ensuring `log_dir` exists.
    pub async fn new(log_dir: impl AsRef<Path>) -> GuardResult<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();
        fs::create_dir_all(&log_dir).await?;
        Ok(Self { log_dir })
    }

    /// Map an identifier to its file path. `.` and `:` cover both IPv4 and
    /// IPv6 literals.
    fn file_path(&self, identifier: &str) -> PathBuf {
        let filename: String = identifier
            .chars()
            .map(|c| if c == '.' || c == ':' { '-' } else { c })
            .collect();
        self.log_dir
            .join(filename)
            .with_extension(FILE_EXTENSION)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self, identifier: &str) -> GuardResult<Option<ClientRecord>> {
        let path = self.file_path(identifier);

        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match ClientRecord::from_json(&contents) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                warn!(
                    identifier,
                    path = %path.display(),
                    error = %err,
                    "undecodable record file, treating as absent"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, identifier: &str, record: &ClientRecord) -> GuardResult<()> {
        let path = self.file_path(identifier);
        let payload = record.to_json_pretty()?;
        fs::write(&path, payload).await?;
        Ok(())
    }

    async fn ping(&self) -> GuardResult<()> {
        fs::metadata(&self.log_dir).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn test_storage() -> (FileStorage, PathBuf) {
        let dir = std::env::temp_dir().join(format!("trafficguard-test-{}", Uuid::new_v4()));
        let storage = FileStorage::new(&dir).await.unwrap();
        (storage, dir)
    }

    #[test]
    fn test_file_path_sanitizes_ipv4_and_ipv6() {
        let storage = FileStorage {
            log_dir: PathBuf::from("/tmp/logs"),
        };

        assert_eq!(
            storage.file_path("192.168.1.1"),
            PathBuf::from("/tmp/logs/192-168-1-1.json")
        );
        assert_eq!(
            storage.file_path("2001:db8::1"),
            PathBuf::from("/tmp/logs/2001-db8--1.json")
        );
    }

    #[tokio::test]
    async fn test_load_missing_identifier_is_absent() {
        let (storage, _dir) = test_storage().await;

        let loaded = storage.load("203.0.113.7").await.unwrap();

        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let (storage, _dir) = test_storage().await;

        let mut record = ClientRecord::new();
        record.push_request_time(100);
        record.increment_user_agent("curl/8.0");
        record.set_last_seen(100);
        record.increment_total_requests();

        storage.save("203.0.113.7", &record).await.unwrap();
        let loaded = storage.load("203.0.113.7").await.unwrap().unwrap();

        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_save_overwrites_prior_content() {
        let (storage, _dir) = test_storage().await;

        let mut first = ClientRecord::new();
        first.increment_total_requests();
        storage.save("203.0.113.7", &first).await.unwrap();

        let mut second = first.clone();
        second.increment_total_requests();
        storage.save("203.0.113.7", &second).await.unwrap();

        let loaded = storage.load("203.0.113.7").await.unwrap().unwrap();
        assert_eq!(loaded.total_requests, 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_as_absent() {
        let (storage, dir) = test_storage().await;

        fs::write(dir.join("203-0-113-7.json"), "{ not json")
            .await
            .unwrap();

        let loaded = storage.load("203.0.113.7").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_ping_checks_directory() {
        let (storage, dir) = test_storage().await;
        assert!(storage.ping().await.is_ok());

        fs::remove_dir_all(&dir).await.unwrap();
        assert!(storage.ping().await.is_err());
    }
}
