//! The artifact id counter in redb.

use std::sync::Arc;

use reliquary_core::{ArtifactId, RegistryError, SequenceStore};

use super::tables::{LAST_ARTIFACT_ID_KEY, REGISTRY_META, RedbStorage};
use crate::error::StorageError;

type Result<T> = std::result::Result<T, RegistryError>;

fn decode_counter(bytes: &[u8]) -> std::result::Result<ArtifactId, StorageError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::corrupt("registry_meta", "counter is not 8 bytes"))?;
    Ok(u64::from_be_bytes(raw))
}

/// redb-backed [`SequenceStore`]
pub struct RedbSequence {
    storage: Arc<RedbStorage>,
}

impl RedbSequence {
    pub fn new(storage: Arc<RedbStorage>) -> Self {
        Self { storage }
    }
}

impl SequenceStore for RedbSequence {
    fn current(&self) -> Result<ArtifactId> {
        match self.storage.get(REGISTRY_META, LAST_ARTIFACT_ID_KEY)? {
            Some(bytes) => Ok(decode_counter(&bytes)?),
            None => Ok(0),
        }
    }

    fn advance_to(&mut self, id: ArtifactId) -> Result<()> {
        self.storage
            .update::<RegistryError, _>(REGISTRY_META, LAST_ARTIFACT_ID_KEY, |current| {
                let last = current.map(decode_counter).transpose()?.unwrap_or(0);
                if id <= last {
                    return Err(RegistryError::Duplicate(id));
                }
                Ok(Some(id.to_be_bytes().to_vec()))
            })?;
        Ok(())
    }
}
