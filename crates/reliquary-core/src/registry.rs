use tracing::{debug, info};

use crate::artifact::*;
use crate::error::RegistryError;
use crate::principal::Principal;
use crate::sequence::{InMemorySequence, SequenceStore};
use crate::store::{
    AccessMatrix, ArtifactVault, DirectWrites, InMemoryAccessMatrix, InMemoryVault, WriteScope,
};
use crate::validation;

type Result<T> = std::result::Result<T, RegistryError>;

/// The artifact registry: command handlers over a vault, an access matrix
/// and an id sequence.
///
/// Generic over storage backends. Use `Registry::in_memory()` for testing.
/// Every handler validates and authorizes before its first write, so a
/// rejected call leaves all three stores untouched. Handlers that write more
/// than one store do so inside the [`WriteScope`], so a failing write undoes
/// the ones before it.
pub struct Registry<V, M, S, W = DirectWrites>
where
    V: ArtifactVault,
    M: AccessMatrix,
    S: SequenceStore,
    W: WriteScope,
{
    /// Recorded at deployment. Holds no special rights over artifacts.
    deployer: Principal,
    vault: V,
    access: M,
    sequence: S,
    scope: W,
}

pub type InMemoryRegistry = Registry<InMemoryVault, InMemoryAccessMatrix, InMemorySequence>;

impl Registry<InMemoryVault, InMemoryAccessMatrix, InMemorySequence> {
    pub fn in_memory(deployer: Principal) -> Self {
        Self::new(
            deployer,
            InMemoryVault::new(),
            InMemoryAccessMatrix::new(),
            InMemorySequence::new(),
        )
    }
}

impl<V: ArtifactVault, M: AccessMatrix, S: SequenceStore> Registry<V, M, S> {
    pub fn new(deployer: Principal, vault: V, access: M, sequence: S) -> Self {
        Self::with_write_scope(deployer, vault, access, sequence, DirectWrites)
    }
}

impl<V, M, S, W> Registry<V, M, S, W>
where
    V: ArtifactVault,
    M: AccessMatrix,
    S: SequenceStore,
    W: WriteScope,
{
    pub fn with_write_scope(deployer: Principal, vault: V, access: M, sequence: S, scope: W) -> Self {
        Self {
            deployer,
            vault,
            access,
            sequence,
            scope,
        }
    }

    pub fn deployer(&self) -> &Principal {
        &self.deployer
    }

    // -----------------------------------------------------------------------
    // Mutating handlers
    // -----------------------------------------------------------------------

    /// Create an artifact guarded by the caller and grant the caller access.
    /// Returns the new id, which is also the counter's new value.
    pub fn forge_new_artifact(
        &mut self,
        ctx: &CallContext,
        props: ArtifactProperties,
    ) -> Result<ArtifactId> {
        if let Err(e) = validation::check_properties(&props) {
            debug!(caller = ?ctx.caller, error = %e, "rejected artifact creation");
            return Err(e);
        }
        let id = self.sequence.next_id()?;
        let record = ArtifactRecord::forge(id, ctx.caller, ctx.height, props);

        let Self {
            vault,
            access,
            sequence,
            scope,
            ..
        } = self;
        scope.atomically(|| {
            vault.insert(id, &record)?;
            access.grant(id, ctx.caller)?;
            sequence.advance_to(id)
        })?;

        info!(artifact_id = id, guardian = ?ctx.caller, height = ctx.height, "forged artifact");
        Ok(id)
    }

    /// Hand guardianship to `new_guardian`. Guardian-only.
    pub fn transfer_guardianship(
        &mut self,
        ctx: &CallContext,
        artifact_id: ArtifactId,
        new_guardian: Principal,
    ) -> Result<bool> {
        let mut record = self.require_guardian(ctx, artifact_id)?;
        let transfer = GuardianshipRecord {
            from: record.guardian,
            to: new_guardian,
            height: ctx.height,
        };
        record.guardian = new_guardian;
        let Self { vault, scope, .. } = self;
        scope.atomically(|| {
            vault.set(artifact_id, &record)?;
            vault.record_guardianship_transfer(artifact_id, transfer)
        })?;

        info!(artifact_id, from = ?ctx.caller, to = ?new_guardian, "transferred guardianship");
        Ok(true)
    }

    /// Overwrite name, rating, lore and tags. Guardian-only.
    pub fn modify_artifact_properties(
        &mut self,
        ctx: &CallContext,
        artifact_id: ArtifactId,
        props: ArtifactProperties,
    ) -> Result<bool> {
        if let Err(e) = validation::check_properties(&props) {
            debug!(artifact_id, caller = ?ctx.caller, error = %e, "rejected modification");
            return Err(e);
        }
        let mut record = self.require_guardian(ctx, artifact_id)?;
        record.apply(props);
        self.vault.set(artifact_id, &record)?;

        info!(artifact_id, guardian = ?ctx.caller, "modified artifact");
        Ok(true)
    }

    /// Remove the artifact. Guardian-only. Access grants for the id are
    /// left in place.
    pub fn destroy_artifact(&mut self, ctx: &CallContext, artifact_id: ArtifactId) -> Result<bool> {
        self.require_guardian(ctx, artifact_id)?;
        self.vault.delete(artifact_id)?;

        info!(artifact_id, guardian = ?ctx.caller, "destroyed artifact");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn retrieve_artifact_lore(&self, artifact_id: ArtifactId) -> Result<String> {
        Ok(self.vault.get(artifact_id)?.lore)
    }

    /// Answers from grant presence alone; the artifact itself need not exist.
    pub fn check_entity_access(&self, artifact_id: ArtifactId, principal: &Principal) -> Result<bool> {
        self.access.is_authorized(artifact_id, principal)
    }

    pub fn count_artifact_tags(&self, artifact_id: ArtifactId) -> Result<usize> {
        Ok(self.vault.get(artifact_id)?.tag_count())
    }

    pub fn verify_identifier_structure(&self, name: &str) -> bool {
        validation::verify_identifier_structure(name)
    }

    pub fn get_artifact(&self, artifact_id: ArtifactId) -> Result<ArtifactRecord> {
        self.vault.get(artifact_id)
    }

    pub fn artifacts_guarded_by(&self, guardian: &Principal) -> Result<Vec<ArtifactId>> {
        self.vault.list_by_guardian(guardian)
    }

    /// Transfers recorded for an id, oldest first. Survives destroy.
    pub fn guardianship_history(&self, artifact_id: ArtifactId) -> Result<Vec<GuardianshipRecord>> {
        self.vault.guardianship_history(artifact_id)
    }

    /// Id of the most recently created artifact, 0 if none.
    pub fn last_artifact_id(&self) -> Result<ArtifactId> {
        self.sequence.current()
    }

    // -----------------------------------------------------------------------
    // Access to stores
    // -----------------------------------------------------------------------

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub fn access_matrix(&self) -> &M {
        &self.access
    }

    pub fn sequence(&self) -> &S {
        &self.sequence
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn require_guardian(&self, ctx: &CallContext, artifact_id: ArtifactId) -> Result<ArtifactRecord> {
        let record = self.vault.get(artifact_id)?;
        if !record.is_guardian(&ctx.caller) {
            debug!(artifact_id, caller = ?ctx.caller, "caller is not the guardian");
            return Err(RegistryError::InsufficientPrivileges {
                artifact_id,
                caller: ctx.caller,
            });
        }
        Ok(record)
    }
}
