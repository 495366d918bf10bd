//! Durable storage for the reliquary artifact registry
//!
//! Backs the registry's vault, access matrix and id counter with a single
//! redb database. A store operation runs in its own redb transaction unless
//! the registry has opened a [`RedbWriteScope`], in which case all of a
//! handler's writes share one transaction and commit or abort together.
//! Presence checks (duplicate insert, update or delete of a missing id) are
//! made inside the same transaction as the write.
//!
//! ```ignore
//! use reliquary_core::{ArtifactProperties, CallContext, Principal};
//! use reliquary_storage::{open_registry, RedbStorageConfig};
//!
//! let deployer = Principal::derive("deployer");
//! let mut registry = open_registry(RedbStorageConfig::with_path("./reliquary.redb"), deployer)?;
//! let smith = CallContext::new(Principal::derive("smith"), 1);
//! let id = registry.forge_new_artifact(
//!     &smith,
//!     ArtifactProperties::new("Sunblade", 500, "ancient", vec!["fire".into()]),
//! )?;
//! ```

pub mod access_store;
pub mod error;
pub mod sequence_store;
pub mod tables;
pub mod vault_store;
pub mod write_scope;

use std::sync::Arc;

use reliquary_core::{Principal, Registry};
use tracing::{info, warn};

pub use access_store::RedbAccessMatrix;
pub use error::StorageError;
pub use sequence_store::RedbSequence;
pub use tables::{RedbStorage, RedbStorageConfig};
pub use vault_store::RedbArtifactVault;
pub use write_scope::RedbWriteScope;

use tables::{DEPLOYER_KEY, REGISTRY_META};

/// A registry whose state lives in redb.
pub type RedbRegistry =
    Registry<RedbArtifactVault, RedbAccessMatrix, RedbSequence, RedbWriteScope>;

/// Open (or create) a durable registry.
///
/// The deployer is recorded the first time a database is opened. Later
/// opens keep the stored deployer and ignore the argument.
pub fn open_registry(
    config: RedbStorageConfig,
    deployer: Principal,
) -> Result<RedbRegistry, StorageError> {
    let storage = Arc::new(RedbStorage::open(config)?);
    let deployer = load_or_record_deployer(&storage, deployer)?;

    Ok(Registry::with_write_scope(
        deployer,
        RedbArtifactVault::new(Arc::clone(&storage)),
        RedbAccessMatrix::new(Arc::clone(&storage)),
        RedbSequence::new(Arc::clone(&storage)),
        RedbWriteScope::new(storage),
    ))
}

fn load_or_record_deployer(
    storage: &RedbStorage,
    deployer: Principal,
) -> Result<Principal, StorageError> {
    let mut stored = None;
    storage.update::<StorageError, _>(REGISTRY_META, DEPLOYER_KEY, |current| match current {
        Some(bytes) => {
            let raw: [u8; 32] = bytes
                .try_into()
                .map_err(|_| StorageError::corrupt("registry_meta", "deployer is not 32 bytes"))?;
            stored = Some(Principal::from_bytes(raw));
            Ok(None)
        }
        None => Ok(Some(deployer.as_bytes().to_vec())),
    })?;

    match stored {
        Some(existing) => {
            if existing != deployer {
                warn!(stored = ?existing, requested = ?deployer, "Keeping recorded deployer");
            }
            Ok(existing)
        }
        None => {
            info!(deployer = ?deployer, "Recorded registry deployer");
            Ok(deployer)
        }
    }
}
