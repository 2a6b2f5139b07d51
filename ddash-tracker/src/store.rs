//! Tracking note persistence
//!
//! All notes live in a single JSON document (`{"records": [...]}`) that is read
//! whole, modified in memory and written back whole. Mutations are serialized
//! through `write_lock`, and every write lands in a sibling `.tmp` file that is
//! renamed over the original, so readers never observe a partial document.

use ddash_common::models::{TrackingEntry, TrackingFile};
use ddash_common::{time, Error, Result};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Outcome of a bulk append
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Entries written
    pub updated: usize,
    /// MRN records that did not exist before
    pub created: usize,
}

/// File-backed tracking note store
pub struct TrackingStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TrackingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document.
    ///
    /// A missing or blank file is an empty store. Malformed JSON is an error;
    /// the file is left untouched so it can be repaired by hand.
    pub async fn load(&self) -> Result<TrackingFile> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Tracking store {} not found, starting empty", self.path.display());
                return Ok(TrackingFile::default());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(TrackingFile::default());
        }

        serde_json::from_str(&content).map_err(|e| {
            Error::Internal(format!(
                "Tracking store {} is not valid JSON: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Entries recorded for `mrn`, newest first
    pub async fn entries_for(&self, mrn: &str) -> Result<Vec<TrackingEntry>> {
        let file = self.load().await?;
        Ok(file.entries_for(mrn).to_vec())
    }

    /// Prepend one entry to `mrn`'s history. Returns `true` if the MRN was new.
    pub async fn append(&self, mrn: &str, mut entry: TrackingEntry) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut file = self.load().await?;
        entry.complete_with(time::now_rfc3339);
        let created = file.prepend_entry(mrn, entry);
        self.save(&file).await?;

        info!(mrn = %mrn, created, "Tracking entry stored");
        Ok(created)
    }

    /// Apply several `(mrn, entry)` pairs in one read-modify-write cycle
    pub async fn append_bulk(&self, items: Vec<(String, TrackingEntry)>) -> Result<BulkOutcome> {
        let _guard = self.write_lock.lock().await;

        let mut file = self.load().await?;
        let mut outcome = BulkOutcome::default();

        for (mrn, mut entry) in items {
            entry.complete_with(time::now_rfc3339);
            if file.prepend_entry(&mrn, entry) {
                outcome.created += 1;
            }
            outcome.updated += 1;
        }

        self.save(&file).await?;

        info!(
            updated = outcome.updated,
            created = outcome.created,
            "Bulk tracking update stored"
        );
        Ok(outcome)
    }

    async fn save(&self, file: &TrackingFile) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(file)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!("Failed to remove {}: {}", tmp.display(), cleanup);
            }
            return Err(e.into());
        }

        debug!(
            records = file.records.len(),
            "Tracking store written to {}",
            self.path.display()
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn note(text: &str) -> TrackingEntry {
        TrackingEntry {
            note: Some(json!(text)),
            ..Default::default()
        }
    }

    fn store_in(dir: &TempDir) -> TrackingStore {
        TrackingStore::new(dir.path().join("tracking-data.json"))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.load().await.unwrap().records.is_empty());
        assert!(store.entries_for("X").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "  \n").unwrap();
        assert!(store.load().await.unwrap().records.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_is_error_and_untouched() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(store.load().await.is_err());
        assert!(store.append("X", note("a")).await.is_err());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{not json");
    }

    #[tokio::test]
    async fn test_append_prepends_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.append("X", note("a")).await.unwrap());
        assert!(!store.append("X", note("b")).await.unwrap());

        let entries = store.entries_for("X").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].note, Some(json!("b")));
        assert_eq!(entries[1].note, Some(json!("a")));
    }

    #[tokio::test]
    async fn test_append_stamps_timestamp() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append("X", note("a")).await.unwrap();

        let entries = store.entries_for("X").await.unwrap();
        let ts = entries[0].timestamp.as_ref().and_then(|t| t.as_str()).unwrap();
        assert!(time::parse_timestamp(ts).is_some());
    }

    #[tokio::test]
    async fn test_file_is_written_pretty_without_tmp_leftover() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append("X", note("a")).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  \"records\""));
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = TrackingStore::new(dir.path().join("nested/deeper/tracking.json"));
        store.append("X", note("a")).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_bulk_counts() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append("A", note("existing")).await.unwrap();

        let outcome = store
            .append_bulk(vec![
                ("A".to_string(), note("a2")),
                ("B".to_string(), note("b1")),
                ("C".to_string(), note("c1")),
                ("C".to_string(), note("c2")),
            ])
            .await
            .unwrap();

        assert_eq!(outcome, BulkOutcome { updated: 4, created: 2 });

        let file = store.load().await.unwrap();
        assert_eq!(file.records.len(), 3);
        assert_eq!(file.entries_for("C")[0].note, Some(json!("c2")));
        assert_eq!(file.entries_for("A").len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.append(&format!("MRN{}", i), note("n")).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await.unwrap().records.len(), 20);
    }

    #[tokio::test]
    async fn test_failed_rename_removes_tmp_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tracking-data.json");
        // A non-empty directory at the target path makes the rename fail
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("occupied"), "x").unwrap();
        let store = TrackingStore::new(target.clone());

        assert!(store.save(&TrackingFile::default()).await.is_err());
        assert!(!store.tmp_path().exists());
        assert!(target.join("occupied").exists());
    }

    #[tokio::test]
    async fn test_append_keeps_unknown_keys_in_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{"version": 2, "records": [
                {"MRN": "X", "tracking_records": [], "owner": "ops"},
                {"tracking_records": [{"note": "orphan"}]}
            ]}"#,
        )
        .unwrap();

        store.append("X", note("a")).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["version"], json!(2));
        assert_eq!(raw["records"][0]["owner"], json!("ops"));
        assert_eq!(raw["records"][0]["tracking_records"][0]["note"], json!("a"));
        assert_eq!(raw["records"][1]["tracking_records"][0]["note"], json!("orphan"));
        assert!(raw["records"][1].get("MRN").is_none());
    }
}
