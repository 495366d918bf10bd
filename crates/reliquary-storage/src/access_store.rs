//! Access grants in redb.

use std::sync::Arc;

use reliquary_core::{AccessMatrix, ArtifactId, Principal, RegistryError};
use tracing::debug;

use super::tables::{ACCESS_MATRIX, RedbStorage, artifact_key};
use crate::error::StorageError;

type Result<T> = std::result::Result<T, RegistryError>;

const GRANTED: u8 = 1;

/// redb-backed [`AccessMatrix`]
pub struct RedbAccessMatrix {
    storage: Arc<RedbStorage>,
}

impl RedbAccessMatrix {
    pub fn new(storage: Arc<RedbStorage>) -> Self {
        Self { storage }
    }

    /// Key format: artifact_id (8 bytes BE) + principal (32 bytes)
    fn make_key(id: ArtifactId, principal: &Principal) -> [u8; 40] {
        let mut key = [0u8; 40];
        key[..8].copy_from_slice(&artifact_key(id));
        key[8..].copy_from_slice(principal.as_bytes());
        key
    }

    /// Number of stored grants for an id, whether or not the artifact
    /// still exists.
    pub fn grant_count(&self, id: ArtifactId) -> Result<usize> {
        Ok(self
            .storage
            .scan_prefix(ACCESS_MATRIX, &artifact_key(id))?
            .len())
    }
}

impl AccessMatrix for RedbAccessMatrix {
    fn grant(&mut self, id: ArtifactId, principal: Principal) -> Result<()> {
        self.storage
            .put(ACCESS_MATRIX, &Self::make_key(id, &principal), &[GRANTED])?;
        debug!(artifact_id = id, principal = ?principal, "Granted access");
        Ok(())
    }

    fn is_authorized(&self, id: ArtifactId, principal: &Principal) -> Result<bool> {
        match self
            .storage
            .get(ACCESS_MATRIX, &Self::make_key(id, principal))?
        {
            Some(value) if value == [GRANTED] => Ok(true),
            Some(value) if value == [0] => Ok(false),
            Some(value) => Err(StorageError::corrupt(
                "access_matrix",
                format!("unexpected flag {}", hex::encode(value)),
            )
            .into()),
            None => Ok(false),
        }
    }
}
