//! redb table definitions and storage manager
//!
//! Defines all tables used by the registry stores.

use std::path::PathBuf;

use parking_lot::Mutex;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use tracing::{debug, info, instrument};

use crate::error::StorageError;

/// Type alias for scan results to simplify complex type
pub type ScanResults = Vec<(Vec<u8>, Vec<u8>)>;

/// Every registry table maps raw byte keys to raw byte values.
pub type BytesTable = TableDefinition<'static, &'static [u8], &'static [u8]>;

// Table definitions
// Key: artifact id (u64 big-endian), Value: serialized ArtifactRecord
pub const ARTIFACTS: BytesTable = TableDefinition::new("artifacts");

// Key: (artifact id, principal) concatenated, Value: single flag byte
pub const ACCESS_MATRIX: BytesTable = TableDefinition::new("access_matrix");

// Key: artifact id (u64 big-endian), Value: serialized Vec<GuardianshipRecord>
pub const GUARDIANSHIP_HISTORY: BytesTable =
    TableDefinition::new("guardianship_history");

// Key: setting name, Value: raw bytes
pub const REGISTRY_META: BytesTable = TableDefinition::new("registry_meta");

/// Meta key holding the last issued artifact id.
pub const LAST_ARTIFACT_ID_KEY: &[u8] = b"last_artifact_id";
/// Meta key holding the deployer principal.
pub const DEPLOYER_KEY: &[u8] = b"deployer";

/// Configuration for redb storage
#[derive(Debug, Clone)]
pub struct RedbStorageConfig {
    /// Path to the database file
    pub db_path: PathBuf,
    /// Cache size in bytes
    pub cache_size: usize,
}

impl Default for RedbStorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/reliquary.redb"),
            cache_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl RedbStorageConfig {
    /// Create a configuration for a specific database file
    pub fn with_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Default::default()
        }
    }

    /// Set the cache size
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }
}

/// Main redb storage manager
///
/// Each call runs in its own write transaction unless a scope opened with
/// [`RedbStorage::atomically`] is active, in which case reads and writes go
/// through the scope's transaction and commit with it.
pub struct RedbStorage {
    db: Database,
    scope: Mutex<Option<WriteTransaction>>,
}

impl RedbStorage {
    /// Open or create the database
    #[instrument(skip(config), fields(path = %config.db_path.display()))]
    pub fn open(config: RedbStorageConfig) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::io)?;
        }

        let db = redb::Builder::new()
            .set_cache_size(config.cache_size)
            .create(&config.db_path)
            .map_err(StorageError::io)?;

        info!("Opened redb database");

        let storage = Self {
            db,
            scope: Mutex::new(None),
        };

        storage.init_tables()?;

        Ok(storage)
    }

    /// Initialize all tables
    fn init_tables(&self) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write().map_err(StorageError::io)?;

        for table in [ARTIFACTS, ACCESS_MATRIX, GUARDIANSHIP_HISTORY, REGISTRY_META] {
            write_txn.open_table(table).map_err(StorageError::io)?;
        }

        write_txn.commit().map_err(StorageError::io)?;

        debug!("Initialized redb tables");
        Ok(())
    }

    /// Run `f` inside one write transaction shared by every storage call it
    /// makes. Commits if `f` succeeds, aborts otherwise. Nested calls join
    /// the outer scope.
    pub fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce() -> Result<T, E>,
    {
        if self.scope.lock().is_some() {
            return f();
        }

        let write_txn = self.db.begin_write().map_err(StorageError::io)?;
        *self.scope.lock() = Some(write_txn);

        let outcome = f();

        let Some(write_txn) = self.scope.lock().take() else {
            return outcome;
        };
        match outcome {
            Ok(value) => {
                write_txn.commit().map_err(StorageError::io)?;
                Ok(value)
            }
            Err(e) => {
                write_txn.abort().map_err(StorageError::io)?;
                debug!("Rolled back write scope");
                Err(e)
            }
        }
    }

    /// Run `f` against the active scope's transaction, or a fresh one that
    /// commits on success.
    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&WriteTransaction) -> Result<T, E>,
    {
        let scope = self.scope.lock();
        if let Some(write_txn) = scope.as_ref() {
            return f(write_txn);
        }
        drop(scope);

        let write_txn = self.db.begin_write().map_err(StorageError::io)?;
        match f(&write_txn) {
            Ok(value) => {
                write_txn.commit().map_err(StorageError::io)?;
                Ok(value)
            }
            Err(e) => {
                write_txn.abort().map_err(StorageError::io)?;
                Err(e)
            }
        }
    }

    /// Put a key-value pair in a table
    pub fn put(
        &self,
        table: BytesTable,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), StorageError> {
        self.write::<(), StorageError, _>(|write_txn| {
            let mut table = write_txn.open_table(table).map_err(StorageError::io)?;
            table.insert(key, value).map_err(StorageError::io)?;
            Ok(())
        })
    }

    /// Get a value from a table
    pub fn get(
        &self,
        table: BytesTable,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let scope = self.scope.lock();
        if let Some(write_txn) = scope.as_ref() {
            let table = write_txn.open_table(table).map_err(StorageError::io)?;
            return read_value(&table, key);
        }
        drop(scope);

        let read_txn = self.db.begin_read().map_err(StorageError::io)?;
        let table = read_txn.open_table(table).map_err(StorageError::io)?;
        read_value(&table, key)
    }

    /// Delete a key from a table
    pub fn delete(
        &self,
        table: BytesTable,
        key: &[u8],
    ) -> Result<bool, StorageError> {
        self.write::<bool, StorageError, _>(|write_txn| {
            let mut table = write_txn.open_table(table).map_err(StorageError::io)?;
            let removed = table.remove(key).map_err(StorageError::io)?.is_some();
            Ok(removed)
        })
    }

    /// Read-modify-write a single key inside one write transaction.
    ///
    /// `f` sees the current value and returns the value to store, or `None`
    /// to leave the key untouched. An error from `f` aborts the transaction.
    /// Returns whether a value was written.
    pub fn update<E, F>(
        &self,
        table: BytesTable,
        key: &[u8],
        f: F,
    ) -> Result<bool, E>
    where
        E: From<StorageError>,
        F: FnOnce(Option<&[u8]>) -> Result<Option<Vec<u8>>, E>,
    {
        self.write::<bool, E, _>(|write_txn| {
            let mut table = write_txn.open_table(table).map_err(StorageError::io)?;
            let current = read_value(&table, key)?;
            match f(current.as_deref())? {
                Some(next) => {
                    table
                        .insert(key, next.as_slice())
                        .map_err(StorageError::io)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    /// Iterate over all entries in a table with a prefix
    pub fn scan_prefix(
        &self,
        table: BytesTable,
        prefix: &[u8],
    ) -> Result<ScanResults, StorageError> {
        let scope = self.scope.lock();
        if let Some(write_txn) = scope.as_ref() {
            let table = write_txn.open_table(table).map_err(StorageError::io)?;
            return scan_table(&table, prefix);
        }
        drop(scope);

        let read_txn = self.db.begin_read().map_err(StorageError::io)?;
        let table = read_txn.open_table(table).map_err(StorageError::io)?;
        scan_table(&table, prefix)
    }
}

fn read_value<T>(table: &T, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    Ok(table
        .get(key)
        .map_err(StorageError::io)?
        .map(|v| v.value().to_vec()))
}

fn scan_table<T>(table: &T, prefix: &[u8]) -> Result<ScanResults, StorageError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let mut results = Vec::new();

    // Use range to get all keys >= prefix
    let range = table.range(prefix..).map_err(StorageError::io)?;

    for entry in range {
        let (key, value) = entry.map_err(StorageError::io)?;
        let key_bytes = key.value();

        // Stop when we're past the prefix
        if !key_bytes.starts_with(prefix) {
            break;
        }

        results.push((key_bytes.to_vec(), value.value().to_vec()));
    }

    Ok(results)
}

/// Big-endian id key, so byte order matches numeric order.
pub fn artifact_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Decode a key produced by [`artifact_key`].
pub fn decode_artifact_key(table: &'static str, key: &[u8]) -> Result<u64, StorageError> {
    let bytes: [u8; 8] = key
        .get(..8)
        .and_then(|k| k.try_into().ok())
        .ok_or_else(|| StorageError::corrupt(table, format!("short key {}", hex::encode(key))))?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (RedbStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = RedbStorageConfig::with_path(temp_dir.path().join("test.redb"));
        let storage = RedbStorage::open(config).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_put_get() {
        let (storage, _temp) = create_test_storage();

        storage.put(REGISTRY_META, b"k", b"v").unwrap();

        assert_eq!(storage.get(REGISTRY_META, b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(storage.get(REGISTRY_META, b"missing").unwrap(), None);
    }

    #[test]
    fn test_delete_reports_presence() {
        let (storage, _temp) = create_test_storage();

        storage.put(ARTIFACTS, &artifact_key(1), b"x").unwrap();
        assert!(storage.delete(ARTIFACTS, &artifact_key(1)).unwrap());
        assert!(!storage.delete(ARTIFACTS, &artifact_key(1)).unwrap());
    }

    #[test]
    fn test_update_none_leaves_value() {
        let (storage, _temp) = create_test_storage();
        storage.put(REGISTRY_META, b"k", b"old").unwrap();

        let wrote = storage
            .update::<StorageError, _>(REGISTRY_META, b"k", |current| {
                assert_eq!(current, Some(&b"old"[..]));
                Ok(None)
            })
            .unwrap();
        assert!(!wrote);
        assert_eq!(storage.get(REGISTRY_META, b"k").unwrap(), Some(b"old".to_vec()));
    }

    #[test]
    fn test_update_error_aborts() {
        let (storage, _temp) = create_test_storage();

        let result = storage.update(REGISTRY_META, b"k", |_| {
            Err(StorageError::corrupt("registry_meta", "refused"))
        });
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
        assert_eq!(storage.get(REGISTRY_META, b"k").unwrap(), None);
    }

    #[test]
    fn test_scope_sees_and_commits_its_own_writes() {
        let (storage, _temp) = create_test_storage();

        storage
            .atomically::<_, StorageError, _>(|| {
                storage.put(ARTIFACTS, &artifact_key(1), b"record")?;
                assert_eq!(storage.get(ARTIFACTS, &artifact_key(1))?, Some(b"record".to_vec()));
                storage.put(REGISTRY_META, LAST_ARTIFACT_ID_KEY, &1u64.to_be_bytes())?;
                Ok(())
            })
            .unwrap();

        assert!(storage.get(ARTIFACTS, &artifact_key(1)).unwrap().is_some());
        assert!(storage.get(REGISTRY_META, LAST_ARTIFACT_ID_KEY).unwrap().is_some());
    }

    #[test]
    fn test_scope_error_discards_every_write() {
        let (storage, _temp) = create_test_storage();

        let result = storage.atomically::<(), StorageError, _>(|| {
            storage.put(ARTIFACTS, &artifact_key(1), b"record")?;
            storage.put(ACCESS_MATRIX, &artifact_key(1), &[1])?;
            Err(StorageError::corrupt("registry_meta", "counter write failed"))
        });
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));

        assert_eq!(storage.get(ARTIFACTS, &artifact_key(1)).unwrap(), None);
        assert!(storage.scan_prefix(ACCESS_MATRIX, &[]).unwrap().is_empty());

        // The storage is usable again once the scope has closed.
        storage.put(ARTIFACTS, &artifact_key(1), b"record").unwrap();
        assert!(storage.get(ARTIFACTS, &artifact_key(1)).unwrap().is_some());
    }

    #[test]
    fn test_scan_prefix_in_key_order() {
        let (storage, _temp) = create_test_storage();

        for id in [3u64, 1, 2, 300] {
            storage.put(ARTIFACTS, &artifact_key(id), b"x").unwrap();
        }

        let ids: Vec<u64> = storage
            .scan_prefix(ARTIFACTS, &[])
            .unwrap()
            .into_iter()
            .map(|(k, _)| decode_artifact_key("artifacts", &k).unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 300]);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("reopen.redb");
        {
            let storage = RedbStorage::open(RedbStorageConfig::with_path(&path)).unwrap();
            storage.put(REGISTRY_META, b"k", b"v").unwrap();
        }
        let storage = RedbStorage::open(RedbStorageConfig::with_path(&path)).unwrap();
        assert_eq!(storage.get(REGISTRY_META, b"k").unwrap(), Some(b"v".to_vec()));
    }
}
