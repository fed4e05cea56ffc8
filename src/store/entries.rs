// Entry store
// One JSON document holding every journal entry, replaced wholesale on save

use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::ProxyError;
use crate::logger;

/// File-backed entry store
///
/// Every read and write holds `lock` for its whole duration, so concurrent
/// saves are applied one after another and never interleave on disk.
#[derive(Debug)]
pub struct EntryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl EntryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored entries; `[]` when nothing has been saved yet or the file is unreadable JSON
    pub async fn load(&self) -> Result<Value, ProxyError> {
        let _guard = self.lock.lock().await;
        self.read_unlocked().await
    }

    /// Replace the stored entries with `entries`
    pub async fn replace(&self, entries: &Value) -> Result<(), ProxyError> {
        let _guard = self.lock.lock().await;
        self.write_unlocked(entries).await
    }

    /// Create the data directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<(), ProxyError> {
        let Some(dir) = self.dir() else {
            return Ok(());
        };
        if fs::try_exists(dir).await.unwrap_or(false) {
            return Ok(());
        }
        fs::create_dir_all(dir)
            .await
            .map_err(|e| storage_error("create data directory", dir, &e))?;
        logger::log_store(&format!("Created data directory {}", dir.display()));
        Ok(())
    }

    async fn read_unlocked(&self) -> Result<Value, ProxyError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(empty()),
            Err(e) => return Err(storage_error("read", &self.path, &e)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(e) => {
                logger::log_store_warning(&format!(
                    "{} is not valid JSON ({e}); treating it as empty",
                    self.path.display()
                ));
                Ok(empty())
            }
        }
    }

    /// Write to a sibling temp file, fsync, then rename over the store
    async fn write_unlocked(&self, entries: &Value) -> Result<(), ProxyError> {
        self.ensure_dir().await?;

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| ProxyError::Storage(format!("Failed to encode entries: {e}")))?;
        let tmp = self.tmp_path();

        let write = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&json).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, &self.path).await
        };
        if let Err(e) = write.await {
            let _ = fs::remove_file(&tmp).await;
            return Err(storage_error("write", &self.path, &e));
        }

        if let Some(dir) = self.dir() {
            sync_dir(dir).await;
        }
        Ok(())
    }

    fn dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "entries".into(), |n| n.to_string_lossy());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

/// Number of entries reported back to the client after a save
pub fn entry_count(entries: &Value) -> usize {
    match entries {
        Value::Array(items) => items.len(),
        Value::Null => 0,
        _ => 1,
    }
}

/// Persist the rename itself; best effort
#[cfg(unix)]
async fn sync_dir(dir: &Path) {
    if let Ok(d) = fs::File::open(dir).await {
        let _ = d.sync_all().await;
    }
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) {}

fn empty() -> Value {
    Value::Array(Vec::new())
}

fn storage_error(action: &str, path: &Path, err: &io::Error) -> ProxyError {
    ProxyError::Storage(format!("Failed to {action} {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> EntryStore {
        EntryStore::new(dir.path().join("data").join("entries.json"))
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load().await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_round_trip_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let entries = json!([
            {"id": 1, "title": "今天", "mood": "calm", "tags": ["walk"]},
            {"id": 2, "title": "Tuesday", "body": "rain\nagain"}
        ]);

        store.replace(&entries).await.unwrap();
        assert!(dir.path().join("data").is_dir());
        assert_eq!(store.load().await.unwrap(), entries);

        let on_disk = std::fs::read_to_string(store.path()).unwrap();
        assert!(on_disk.contains("今天"), "non-ASCII text is stored verbatim");
    }

    #[tokio::test]
    async fn test_empty_list_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.replace(&json!([{"id": 1}])).await.unwrap();
        store.replace(&json!([])).await.unwrap();
        assert_eq!(store.load().await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_non_array_value_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let value = json!({"legacy": true, "n": 3.5});
        store.replace(&value).await.unwrap();
        assert_eq!(store.load().await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(store.path(), b"[{\"id\": 1,").unwrap();
        assert_eq!(store.load().await.unwrap(), json!([]));

        std::fs::write(store.path(), b"").unwrap();
        assert_eq!(store.load().await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.replace(&json!([1, 2, 3])).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path().join("data"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["entries.json"]);
    }

    #[tokio::test]
    async fn test_unreadable_path_is_storage_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be cannot be read as a file
        let store = EntryStore::new(dir.path());
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, ProxyError::Storage(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_never_mix() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));
        let payloads: Vec<Value> = (0..16)
            .map(|w| {
                Value::Array(
                    (0..200)
                        .map(|i| json!({"writer": w, "seq": i, "text": "x".repeat(64)}))
                        .collect(),
                )
            })
            .collect();

        let mut tasks = tokio::task::JoinSet::new();
        for payload in payloads.clone() {
            let store = Arc::clone(&store);
            tasks.spawn(async move {
                store.replace(&payload).await.unwrap();
                let seen = store.load().await.unwrap();
                assert!(seen.as_array().is_some_and(|a| a.len() == 200));
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }

        let raw = std::fs::read(store.path()).unwrap();
        let stored: Value = serde_json::from_slice(&raw).expect("store file is complete JSON");
        assert!(
            payloads.contains(&stored),
            "store must hold exactly one writer's payload"
        );
    }

    #[test]
    fn test_entry_count() {
        assert_eq!(entry_count(&json!([1, 2, 3])), 3);
        assert_eq!(entry_count(&json!([])), 0);
        assert_eq!(entry_count(&Value::Null), 0);
        assert_eq!(entry_count(&json!({"a": 1})), 1);
    }
}
