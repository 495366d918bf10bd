use std::sync::Arc;

use reliquary_core::*;
use reliquary_storage::*;
use tempfile::TempDir;

const X: Principal = Principal::from_bytes([1u8; 32]);
const Y: Principal = Principal::from_bytes([2u8; 32]);
const DEPLOYER: Principal = Principal::from_bytes([9u8; 32]);

fn sunblade() -> ArtifactProperties {
    ArtifactProperties::new("Sunblade", 500, "ancient", vec!["fire".into()])
}

fn config(dir: &TempDir) -> RedbStorageConfig {
    RedbStorageConfig::with_path(dir.path().join("registry.redb")).with_cache_size(1024 * 1024)
}

#[test]
fn test_sunblade_lifecycle_on_redb() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(config(&dir), DEPLOYER).unwrap();
    let x = CallContext::new(X, 10);
    let y = CallContext::new(Y, 11);

    let id = registry.forge_new_artifact(&x, sunblade()).unwrap();
    assert_eq!(id, 1);
    assert_eq!(registry.check_entity_access(1, &X), Ok(true));
    assert_eq!(registry.check_entity_access(1, &Y), Ok(false));
    assert_eq!(registry.transfer_guardianship(&x, 1, Y), Ok(true));
    assert!(matches!(
        registry.destroy_artifact(&x, 1),
        Err(RegistryError::InsufficientPrivileges { .. })
    ));
    assert_eq!(registry.destroy_artifact(&y, 1), Ok(true));
    assert_eq!(registry.retrieve_artifact_lore(1), Err(RegistryError::NotFound(1)));

    // Grants and history outlive the record.
    assert_eq!(registry.check_entity_access(1, &X), Ok(true));
    assert_eq!(registry.access_matrix().grant_count(1), Ok(1));
    assert_eq!(
        registry.guardianship_history(1).unwrap(),
        vec![GuardianshipRecord { from: X, to: Y, height: 10 }]
    );
}

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let update = ArtifactProperties::new("Moonshard", 77, "cold light", vec!["ice".into(), "night".into()]);
    {
        let mut registry = open_registry(config(&dir), DEPLOYER).unwrap();
        let ctx = CallContext::new(X, 5);
        registry.forge_new_artifact(&ctx, sunblade()).unwrap();
        registry.forge_new_artifact(&ctx, sunblade()).unwrap();
        registry.modify_artifact_properties(&ctx, 2, update.clone()).unwrap();
    }

    let other_deployer = Principal::derive("someone-else");
    let mut registry = open_registry(config(&dir), other_deployer).unwrap();
    assert_eq!(registry.deployer(), &DEPLOYER);
    assert_eq!(registry.last_artifact_id(), Ok(2));
    assert_eq!(registry.retrieve_artifact_lore(2).unwrap(), "cold light");
    assert_eq!(registry.count_artifact_tags(2), Ok(2));
    assert_eq!(registry.get_artifact(2).unwrap().created_at, 5);
    assert_eq!(registry.artifacts_guarded_by(&X), Ok(vec![1, 2]));

    let next = registry
        .forge_new_artifact(&CallContext::new(Y, 6), sunblade())
        .unwrap();
    assert_eq!(next, 3);
}

#[test]
fn test_rejected_calls_do_not_touch_redb() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(config(&dir), DEPLOYER).unwrap();
    let id = registry
        .forge_new_artifact(&CallContext::new(X, 1), sunblade())
        .unwrap();
    let before = registry.get_artifact(id).unwrap();

    let bad = ArtifactProperties::new("Sunblade", 0, "ancient", vec!["fire".into()]);
    assert_eq!(
        registry
            .forge_new_artifact(&CallContext::new(X, 2), bad)
            .unwrap_err()
            .kind(),
        ErrorKind::RangeInvalid
    );
    assert_eq!(registry.last_artifact_id(), Ok(1));

    let intruder = CallContext::new(Y, 3);
    assert!(registry.modify_artifact_properties(&intruder, id, sunblade()).is_err());
    assert!(registry.transfer_guardianship(&intruder, id, Y).is_err());
    assert!(registry.destroy_artifact(&intruder, id).is_err());
    assert_eq!(registry.get_artifact(id).unwrap(), before);
}

#[test]
fn test_vault_and_sequence_presence_semantics() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(RedbStorage::open(config(&dir)).unwrap());
    let mut vault = RedbArtifactVault::new(Arc::clone(&storage));
    let mut sequence = RedbSequence::new(Arc::clone(&storage));

    let record = ArtifactRecord {
        id: 1,
        name: "Sunblade".into(),
        guardian: X,
        power_rating: 500,
        created_at: 1,
        lore: "ancient".into(),
        tags: vec!["fire".into()],
    };
    vault.insert(1, &record).unwrap();
    assert_eq!(vault.insert(1, &record), Err(RegistryError::Duplicate(1)));
    assert_eq!(vault.set(2, &record), Err(RegistryError::NotFound(2)));
    assert_eq!(vault.delete(2), Err(RegistryError::NotFound(2)));
    assert_eq!(vault.exists(1), Ok(true));

    assert_eq!(sequence.current(), Ok(0));
    sequence.advance_to(1).unwrap();
    assert_eq!(sequence.advance_to(1), Err(RegistryError::Duplicate(1)));
    assert_eq!(sequence.next_id(), Ok(2));
}

// ----------------------------------------------------------------------------
// Write scopes
// ----------------------------------------------------------------------------

/// Access matrix whose grants always fail, as if the disk filled up.
struct FailingGrants;

impl AccessMatrix for FailingGrants {
    fn grant(&mut self, _id: ArtifactId, _principal: Principal) -> Result<(), RegistryError> {
        Err(RegistryError::Store("disk full".into()))
    }

    fn is_authorized(&self, _id: ArtifactId, _principal: &Principal) -> Result<bool, RegistryError> {
        Ok(false)
    }
}

/// Vault whose history appends always fail.
struct FailingHistory(RedbArtifactVault);

impl ArtifactVault for FailingHistory {
    fn insert(&mut self, id: ArtifactId, record: &ArtifactRecord) -> Result<(), RegistryError> {
        self.0.insert(id, record)
    }
    fn get(&self, id: ArtifactId) -> Result<ArtifactRecord, RegistryError> {
        self.0.get(id)
    }
    fn set(&mut self, id: ArtifactId, record: &ArtifactRecord) -> Result<(), RegistryError> {
        self.0.set(id, record)
    }
    fn delete(&mut self, id: ArtifactId) -> Result<(), RegistryError> {
        self.0.delete(id)
    }
    fn exists(&self, id: ArtifactId) -> Result<bool, RegistryError> {
        self.0.exists(id)
    }
    fn list_by_guardian(&self, guardian: &Principal) -> Result<Vec<ArtifactId>, RegistryError> {
        self.0.list_by_guardian(guardian)
    }
    fn record_guardianship_transfer(
        &mut self,
        _id: ArtifactId,
        _record: GuardianshipRecord,
    ) -> Result<(), RegistryError> {
        Err(RegistryError::Store("disk full".into()))
    }
    fn guardianship_history(&self, id: ArtifactId) -> Result<Vec<GuardianshipRecord>, RegistryError> {
        self.0.guardianship_history(id)
    }
}

#[test]
fn test_failed_forge_leaves_no_partial_state() {
    let dir = TempDir::new().unwrap();
    let x = CallContext::new(X, 1);
    {
        let storage = Arc::new(RedbStorage::open(config(&dir)).unwrap());
        let mut faulty = Registry::with_write_scope(
            DEPLOYER,
            RedbArtifactVault::new(Arc::clone(&storage)),
            FailingGrants,
            RedbSequence::new(Arc::clone(&storage)),
            RedbWriteScope::new(Arc::clone(&storage)),
        );
        for _ in 0..3 {
            assert_eq!(
                faulty.forge_new_artifact(&x, sunblade()),
                Err(RegistryError::Store("disk full".into()))
            );
            assert_eq!(faulty.vault().exists(1), Ok(false));
            assert_eq!(faulty.last_artifact_id(), Ok(0));
        }
    }

    let mut registry = open_registry(config(&dir), DEPLOYER).unwrap();
    assert_eq!(registry.forge_new_artifact(&x, sunblade()), Ok(1));
    assert_eq!(registry.forge_new_artifact(&x, sunblade()), Ok(2));
    assert_eq!(registry.check_entity_access(1, &X), Ok(true));
}

#[test]
fn test_failed_transfer_keeps_old_guardian() {
    let dir = TempDir::new().unwrap();
    let x = CallContext::new(X, 1);
    {
        let mut registry = open_registry(config(&dir), DEPLOYER).unwrap();
        registry.forge_new_artifact(&x, sunblade()).unwrap();
    }

    let storage = Arc::new(RedbStorage::open(config(&dir)).unwrap());
    let mut faulty = Registry::with_write_scope(
        DEPLOYER,
        FailingHistory(RedbArtifactVault::new(Arc::clone(&storage))),
        RedbAccessMatrix::new(Arc::clone(&storage)),
        RedbSequence::new(Arc::clone(&storage)),
        RedbWriteScope::new(Arc::clone(&storage)),
    );
    assert!(faulty.transfer_guardianship(&x, 1, Y).is_err());
    assert_eq!(faulty.get_artifact(1).unwrap().guardian, X);
    assert_eq!(faulty.guardianship_history(1), Ok(vec![]));
}
