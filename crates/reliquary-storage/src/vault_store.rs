//! Artifact records and guardianship history in redb.

use std::sync::Arc;

use reliquary_core::{
    ArtifactId, ArtifactRecord, ArtifactVault, GuardianshipRecord, Principal, RegistryError,
};
use tracing::debug;

use super::tables::{ARTIFACTS, GUARDIANSHIP_HISTORY, RedbStorage, artifact_key, decode_artifact_key};
use crate::error::StorageError;

type Result<T> = std::result::Result<T, RegistryError>;

fn encode_record(record: &ArtifactRecord) -> std::result::Result<Vec<u8>, StorageError> {
    postcard::to_allocvec(record).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode_record(bytes: &[u8]) -> std::result::Result<ArtifactRecord, StorageError> {
    Ok(postcard::from_bytes(bytes)?)
}

/// redb-backed [`ArtifactVault`]
pub struct RedbArtifactVault {
    storage: Arc<RedbStorage>,
}

impl RedbArtifactVault {
    pub fn new(storage: Arc<RedbStorage>) -> Self {
        Self { storage }
    }
}

impl ArtifactVault for RedbArtifactVault {
    fn insert(&mut self, id: ArtifactId, record: &ArtifactRecord) -> Result<()> {
        let value = encode_record(record)?;
        self.storage
            .update(ARTIFACTS, &artifact_key(id), |current| match current {
                Some(_) => Err(RegistryError::Duplicate(id)),
                None => Ok(Some(value)),
            })?;
        debug!(artifact_id = id, "Inserted artifact record");
        Ok(())
    }

    fn get(&self, id: ArtifactId) -> Result<ArtifactRecord> {
        match self.storage.get(ARTIFACTS, &artifact_key(id))? {
            Some(bytes) => Ok(decode_record(&bytes)?),
            None => Err(RegistryError::NotFound(id)),
        }
    }

    fn set(&mut self, id: ArtifactId, record: &ArtifactRecord) -> Result<()> {
        let value = encode_record(record)?;
        self.storage
            .update(ARTIFACTS, &artifact_key(id), |current| match current {
                Some(_) => Ok(Some(value)),
                None => Err(RegistryError::NotFound(id)),
            })?;
        debug!(artifact_id = id, "Updated artifact record");
        Ok(())
    }

    fn delete(&mut self, id: ArtifactId) -> Result<()> {
        if !self.storage.delete(ARTIFACTS, &artifact_key(id))? {
            return Err(RegistryError::NotFound(id));
        }
        debug!(artifact_id = id, "Deleted artifact record");
        Ok(())
    }

    fn exists(&self, id: ArtifactId) -> Result<bool> {
        Ok(self.storage.get(ARTIFACTS, &artifact_key(id))?.is_some())
    }

    fn list_by_guardian(&self, guardian: &Principal) -> Result<Vec<ArtifactId>> {
        let mut ids = Vec::new();
        for (key, value) in self.storage.scan_prefix(ARTIFACTS, &[])? {
            let record = decode_record(&value)?;
            if record.is_guardian(guardian) {
                ids.push(decode_artifact_key("artifacts", &key)?);
            }
        }
        Ok(ids)
    }

    fn record_guardianship_transfer(
        &mut self,
        id: ArtifactId,
        record: GuardianshipRecord,
    ) -> Result<()> {
        self.storage
            .update::<StorageError, _>(GUARDIANSHIP_HISTORY, &artifact_key(id), |current| {
                let mut history: Vec<GuardianshipRecord> = match current {
                    Some(bytes) => postcard::from_bytes(bytes).map_err(StorageError::from)?,
                    None => Vec::new(),
                };
                history.push(record);
                let encoded = postcard::to_allocvec(&history)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok::<_, StorageError>(Some(encoded))
            })?;
        Ok(())
    }

    fn guardianship_history(&self, id: ArtifactId) -> Result<Vec<GuardianshipRecord>> {
        match self.storage.get(GUARDIANSHIP_HISTORY, &artifact_key(id))? {
            Some(bytes) => Ok(postcard::from_bytes(&bytes).map_err(StorageError::from)?),
            None => Ok(Vec::new()),
        }
    }
}
