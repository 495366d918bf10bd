use anyhow::Context;
use reliquary_core::{
    ArtifactProperties, ArtifactRecord, CallContext, ErrorKind, GuardianshipRecord, Principal,
    RegistryError,
};
use reliquary_storage::{RedbRegistry, open_registry};
use serde::Serialize;
use tracing::debug;

use crate::config::{Command, Settings};

/// JSON shape of an artifact record, with principals rendered as hex.
#[derive(Debug, Serialize)]
pub struct ArtifactView {
    pub id: u64,
    pub name: String,
    pub guardian: String,
    pub power_rating: u64,
    pub created_at: u64,
    pub lore: String,
    pub tags: Vec<String>,
}

impl From<ArtifactRecord> for ArtifactView {
    fn from(record: ArtifactRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            guardian: record.guardian.to_hex(),
            power_rating: record.power_rating,
            created_at: record.created_at,
            lore: record.lore,
            tags: record.tags,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransferView {
    pub from: String,
    pub to: String,
    pub height: u64,
}

impl From<GuardianshipRecord> for TransferView {
    fn from(record: GuardianshipRecord) -> Self {
        Self {
            from: record.from.to_hex(),
            to: record.to.to_hex(),
            height: record.height,
        }
    }
}

/// Open the configured registry and run one command. Returns the text to
/// print on success.
pub fn run(command: &Command, settings: &Settings) -> anyhow::Result<String> {
    // No database needed.
    if let Command::Principal { label } = command {
        return Ok(Principal::derive(label).to_hex());
    }

    let mut registry = open_registry(settings.storage.clone(), settings.deployer)
        .with_context(|| format!("opening {}", settings.storage.db_path.display()))?;
    debug!(?command, height = settings.height, "running command");
    execute(&mut registry, command, settings)
}

fn execute(
    registry: &mut RedbRegistry,
    command: &Command,
    settings: &Settings,
) -> anyhow::Result<String> {
    let output = match command {
        Command::Forge {
            name,
            power_rating,
            lore,
            tags,
        } => {
            let props = ArtifactProperties::new(name.as_str(), *power_rating, lore.as_str(), tags.clone());
            registry.forge_new_artifact(&call_context(settings)?, props)?.to_string()
        }
        Command::Lore { id } => registry.retrieve_artifact_lore(*id)?,
        Command::Access { id, principal } => registry
            .check_entity_access(*id, principal)?
            .to_string(),
        Command::Tags { id } => registry.count_artifact_tags(*id)?.to_string(),
        Command::VerifyName { name } => registry.verify_identifier_structure(name).to_string(),
        Command::Transfer { id, new_guardian } => registry
            .transfer_guardianship(&call_context(settings)?, *id, *new_guardian)?
            .to_string(),
        Command::Modify {
            id,
            name,
            power_rating,
            lore,
            tags,
        } => {
            let props = ArtifactProperties::new(name.as_str(), *power_rating, lore.as_str(), tags.clone());
            registry
                .modify_artifact_properties(&call_context(settings)?, *id, props)?
                .to_string()
        }
        Command::Destroy { id } => registry
            .destroy_artifact(&call_context(settings)?, *id)?
            .to_string(),
        Command::Show { id } => {
            serde_json::to_string_pretty(&ArtifactView::from(registry.get_artifact(*id)?))?
        }
        Command::History { id } => {
            let history: Vec<TransferView> = registry
                .guardianship_history(*id)?
                .into_iter()
                .map(TransferView::from)
                .collect();
            serde_json::to_string_pretty(&history)?
        }
        Command::Owned { principal } => {
            let owner = match principal {
                Some(p) => *p,
                None => call_context(settings)?.caller,
            };
            registry
                .artifacts_guarded_by(&owner)?
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::LastId => registry.last_artifact_id()?.to_string(),
        Command::Principal { label } => Principal::derive(label).to_hex(),
    };
    Ok(output)
}

fn call_context(settings: &Settings) -> anyhow::Result<CallContext> {
    let caller = settings
        .caller
        .context("this command needs a caller (--caller or `caller` in the config file)")?;
    Ok(CallContext::new(caller, settings.height))
}

/// Process exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RegistryError>().map(RegistryError::kind) {
        Some(ErrorKind::FormatInvalid | ErrorKind::RangeInvalid) => 3,
        Some(ErrorKind::NotFound) => 4,
        Some(ErrorKind::InsufficientPrivileges) => 5,
        Some(ErrorKind::Duplicate | ErrorKind::SequenceExhausted) => 6,
        Some(ErrorKind::Store) | None => 1,
    }
}
