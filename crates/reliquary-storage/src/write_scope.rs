//! Multi-store write scopes backed by one redb transaction.

use std::sync::Arc;

use reliquary_core::{RegistryError, WriteScope};

use super::tables::RedbStorage;

/// redb-backed [`WriteScope`]: every store call made inside `atomically`
/// shares one write transaction, committed only if all of them succeed.
pub struct RedbWriteScope {
    storage: Arc<RedbStorage>,
}

impl RedbWriteScope {
    pub fn new(storage: Arc<RedbStorage>) -> Self {
        Self { storage }
    }
}

impl WriteScope for RedbWriteScope {
    fn atomically<T>(
        &self,
        writes: impl FnOnce() -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        self.storage.atomically(writes)
    }
}
