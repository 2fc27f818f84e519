//! Pending-order store.
//!
//! Durable local bookkeeping of charges that were created but not yet
//! confirmed paid, so a customer who closes and reopens the app can be
//! reminded of the open charge. Records live in a single JSON file (a
//! sequence of [`PendingOrder`] values) under a well-known path, the
//! service-side analogue of the namespaced browser-storage key the web
//! client uses.
//!
//! Store failures are never fatal to a checkout session: callers log and
//! continue without recovery support. Staleness policy (hiding orders
//! older than N hours) belongs to the pending-orders view, not here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use folia_core::PendingOrder;

/// Errors that can occur reading or writing the pending-order file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored records could not be serialized or parsed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// File-backed store of pending orders, keyed by transaction id.
///
/// Cheaply cloneable; all clones share one in-memory map and one backing
/// file. Upserts are atomic from the caller's perspective: the file is
/// replaced wholesale via a temp-file rename, never partially written.
/// The map lock is held across the write, so concurrent saves are
/// serialized and the file always reflects the latest map.
#[derive(Clone)]
pub struct PendingOrderStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    orders: Mutex<HashMap<String, PendingOrder>>,
}

impl PendingOrderStore {
    /// Open the store at `path`, loading any previously saved records.
    ///
    /// A missing file is an empty store. An unreadable or unparsable file
    /// is logged and treated as empty rather than blocking checkout.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let orders = match load_records(&path) {
            Ok(orders) => orders,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load pending orders, starting empty");
                HashMap::new()
            }
        };

        Self {
            inner: Arc::new(StoreInner {
                path,
                orders: Mutex::new(orders),
            }),
        }
    }

    /// Upsert a pending order. Re-saving an existing transaction id
    /// overwrites the record rather than duplicating it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing file cannot be written. The
    /// in-memory record is kept either way.
    pub fn save(&self, order: PendingOrder) -> Result<(), StoreError> {
        let mut orders = self.lock();
        orders.insert(order.transaction_id.clone(), order);
        let snapshot = orders.values().cloned().collect::<Vec<_>>();
        self.persist(&snapshot)
    }

    /// Remove the record for a transaction id. A missing record is a
    /// no-op, since confirmation can race with manual removal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing file cannot be written.
    pub fn remove(&self, transaction_id: &str) -> Result<(), StoreError> {
        let mut orders = self.lock();
        if orders.remove(transaction_id).is_none() {
            return Ok(());
        }
        let snapshot = orders.values().cloned().collect::<Vec<_>>();
        self.persist(&snapshot)
    }

    /// All currently stored records, in no guaranteed order.
    #[must_use]
    pub fn list(&self) -> Vec<PendingOrder> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingOrder>> {
        self.inner
            .orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the backing file with the given records via temp-file
    /// rename, so readers never observe a partial write. Called with the
    /// map lock held; writes to the shared temp path never overlap.
    fn persist(&self, records: &[PendingOrder]) -> Result<(), StoreError> {
        if let Some(parent) = self.inner.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(records)?;
        let tmp_path = self.inner.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.inner.path)?;
        Ok(())
    }
}

/// Load saved records from the backing file into a map keyed by
/// transaction id.
fn load_records(path: &Path) -> Result<HashMap<String, PendingOrder>, StoreError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let json = std::fs::read_to_string(path)?;
    let records: Vec<PendingOrder> = serde_json::from_str(&json)?;
    Ok(records
        .into_iter()
        .map(|order| (order.transaction_id.clone(), order))
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use super::*;

    fn order(transaction_id: &str) -> PendingOrder {
        PendingOrder {
            transaction_id: transaction_id.to_string(),
            pix_code: "00020126...".to_string(),
            qr_code_url: String::new(),
            amount: dec!(19.90),
            items: Vec::new(),
            customer_name: "Maria".to_string(),
            created_at: Utc::now(),
        }
    }

    fn temp_store() -> (tempfile::TempDir, PendingOrderStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PendingOrderStore::open(dir.path().join("pending-orders.json"));
        (dir, store)
    }

    #[test]
    fn test_save_and_list() {
        let (_dir, store) = temp_store();

        store.save(order("tx_1")).unwrap();
        store.save(order("tx_2")).unwrap();

        let mut ids: Vec<String> = store
            .list()
            .into_iter()
            .map(|o| o.transaction_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["tx_1", "tx_2"]);
    }

    #[test]
    fn test_save_is_idempotent_upsert() {
        let (_dir, store) = temp_store();

        store.save(order("tx_1")).unwrap();
        let mut updated = order("tx_1");
        updated.customer_name = "João".to_string();
        store.save(updated).unwrap();

        let records = store.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].customer_name, "João");
    }

    #[test]
    fn test_remove_keeps_other_records() {
        let (_dir, store) = temp_store();

        store.save(order("tx_1")).unwrap();
        store.save(order("tx_2")).unwrap();
        store.remove("tx_1").unwrap();

        let records = store.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transaction_id, "tx_2");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let (_dir, store) = temp_store();
        store.save(order("tx_1")).unwrap();

        store.remove("tx_does_not_exist").unwrap();
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_concurrent_saves_lose_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending-orders.json");
        let store = PendingOrderStore::open(&path);

        std::thread::scope(|scope| {
            for i in 0..8 {
                let store = store.clone();
                scope.spawn(move || store.save(order(&format!("tx_{i}"))).unwrap());
            }
        });

        assert_eq!(store.list().len(), 8);

        // The backing file holds the full map, not a torn or stale write
        let reopened = PendingOrderStore::open(&path);
        assert_eq!(reopened.list().len(), 8);
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending-orders.json");

        let store = PendingOrderStore::open(&path);
        store.save(order("tx_1")).unwrap();
        drop(store);

        let reopened = PendingOrderStore::open(&path);
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.list()[0].transaction_id, "tx_1");
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending-orders.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = PendingOrderStore::open(&path);
        assert!(store.list().is_empty());
    }
}
