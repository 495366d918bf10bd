use std::collections::{BTreeMap, HashMap};

use crate::artifact::{ArtifactId, ArtifactRecord, GuardianshipRecord};
use crate::error::RegistryError;
use crate::principal::Principal;

type Result<T> = std::result::Result<T, RegistryError>;

// ---------------------------------------------------------------------------
// ArtifactVault
// ---------------------------------------------------------------------------

/// Canonical artifact state keyed by id.
///
/// Enforces key presence only; business rules live in the handlers.
pub trait ArtifactVault {
    /// Fails with `Duplicate` if `id` is already present.
    fn insert(&mut self, id: ArtifactId, record: &ArtifactRecord) -> Result<()>;
    /// Fails with `NotFound` if `id` is absent.
    fn get(&self, id: ArtifactId) -> Result<ArtifactRecord>;
    /// Overwrite an existing record. Fails with `NotFound` if `id` is absent.
    fn set(&mut self, id: ArtifactId, record: &ArtifactRecord) -> Result<()>;
    /// Fails with `NotFound` if `id` is absent.
    fn delete(&mut self, id: ArtifactId) -> Result<()>;
    fn exists(&self, id: ArtifactId) -> Result<bool>;
    /// Ids currently guarded by `guardian`, ascending.
    fn list_by_guardian(&self, guardian: &Principal) -> Result<Vec<ArtifactId>>;
    fn record_guardianship_transfer(
        &mut self,
        id: ArtifactId,
        record: GuardianshipRecord,
    ) -> Result<()>;
    fn guardianship_history(&self, id: ArtifactId) -> Result<Vec<GuardianshipRecord>>;
}

/// In-memory vault backed by a BTreeMap.
#[derive(Default)]
pub struct InMemoryVault {
    artifacts: BTreeMap<ArtifactId, ArtifactRecord>,
    guardianship_history: HashMap<ArtifactId, Vec<GuardianshipRecord>>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactVault for InMemoryVault {
    fn insert(&mut self, id: ArtifactId, record: &ArtifactRecord) -> Result<()> {
        if self.artifacts.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        self.artifacts.insert(id, record.clone());
        Ok(())
    }

    fn get(&self, id: ArtifactId) -> Result<ArtifactRecord> {
        self.artifacts
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    fn set(&mut self, id: ArtifactId, record: &ArtifactRecord) -> Result<()> {
        let slot = self
            .artifacts
            .get_mut(&id)
            .ok_or(RegistryError::NotFound(id))?;
        *slot = record.clone();
        Ok(())
    }

    fn delete(&mut self, id: ArtifactId) -> Result<()> {
        self.artifacts
            .remove(&id)
            .ok_or(RegistryError::NotFound(id))?;
        Ok(())
    }

    fn exists(&self, id: ArtifactId) -> Result<bool> {
        Ok(self.artifacts.contains_key(&id))
    }

    fn list_by_guardian(&self, guardian: &Principal) -> Result<Vec<ArtifactId>> {
        Ok(self
            .artifacts
            .values()
            .filter(|a| a.is_guardian(guardian))
            .map(|a| a.id)
            .collect())
    }

    fn record_guardianship_transfer(
        &mut self,
        id: ArtifactId,
        record: GuardianshipRecord,
    ) -> Result<()> {
        self.guardianship_history.entry(id).or_default().push(record);
        Ok(())
    }

    fn guardianship_history(&self, id: ArtifactId) -> Result<Vec<GuardianshipRecord>> {
        Ok(self
            .guardianship_history
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// AccessMatrix
// ---------------------------------------------------------------------------

/// Explicit read grants keyed by (artifact, principal).
///
/// Absence of an entry means "not authorized". There is no revoke.
pub trait AccessMatrix {
    /// Record `true` for the pair. Idempotent.
    fn grant(&mut self, id: ArtifactId, principal: Principal) -> Result<()>;
    fn is_authorized(&self, id: ArtifactId, principal: &Principal) -> Result<bool>;
}

#[derive(Default)]
pub struct InMemoryAccessMatrix {
    grants: HashMap<(ArtifactId, Principal), bool>,
}

impl InMemoryAccessMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including grants for destroyed artifacts.
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl AccessMatrix for InMemoryAccessMatrix {
    fn grant(&mut self, id: ArtifactId, principal: Principal) -> Result<()> {
        self.grants.insert((id, principal), true);
        Ok(())
    }

    fn is_authorized(&self, id: ArtifactId, principal: &Principal) -> Result<bool> {
        Ok(self
            .grants
            .get(&(id, *principal))
            .copied()
            .unwrap_or(false))
    }
}

// ---------------------------------------------------------------------------
// WriteScope
// ---------------------------------------------------------------------------

/// Groups the store writes a handler makes so they take effect together.
///
/// If `writes` fails, none of the writes it made remain visible.
pub trait WriteScope {
    fn atomically<T>(&self, writes: impl FnOnce() -> Result<T>) -> Result<T>;
}

/// Runs writes directly. For the in-memory stores, whose writes cannot fail
/// once a handler has validated and authorized the call.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectWrites;

impl WriteScope for DirectWrites {
    fn atomically<T>(&self, writes: impl FnOnce() -> Result<T>) -> Result<T> {
        writes()
    }
}
