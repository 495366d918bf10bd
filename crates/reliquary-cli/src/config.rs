use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use reliquary_core::{ArtifactId, BlockHeight, Principal};
use reliquary_logging::{FileConfig, LogConfig, RotationStrategy};
use reliquary_storage::RedbStorageConfig;
use serde::Deserialize;

/// Label hashed into the deployer principal when nothing else is known.
const FALLBACK_DEPLOYER_LABEL: &str = "deployer";

/// Prefix that forces a principal argument to be read as a label.
const LABEL_PREFIX: &str = "label:";

/// Hex length of an encoded principal.
const PRINCIPAL_HEX_LEN: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "reliquary", about = "Artifact registry with single-guardian ownership")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Registry database file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Calling principal: 64 hex digits, or a label (`label:<text>` forces one)
    #[arg(long, global = true, value_parser = parse_principal)]
    pub caller: Option<Principal>,
    /// Block height for this call (defaults to the current Unix time)
    #[arg(long, global = true)]
    pub height: Option<BlockHeight>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    /// Human-readable logs instead of JSONL
    #[arg(long, global = true)]
    pub pretty: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a new artifact guarded by the caller
    Forge {
        #[arg(long)]
        name: String,
        #[arg(long)]
        power_rating: u64,
        #[arg(long)]
        lore: String,
        /// Repeat for each tag
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Print an artifact's lore
    Lore { id: ArtifactId },
    /// Whether a principal holds an access grant for an artifact
    Access {
        id: ArtifactId,
        #[arg(value_parser = parse_principal)]
        principal: Principal,
    },
    /// Print how many tags an artifact carries
    Tags { id: ArtifactId },
    /// Check whether a name is an acceptable artifact name
    VerifyName { name: String },
    /// Hand guardianship to another principal
    Transfer {
        id: ArtifactId,
        #[arg(value_parser = parse_principal)]
        new_guardian: Principal,
    },
    /// Replace an artifact's name, rating, lore and tags
    Modify {
        id: ArtifactId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        power_rating: u64,
        #[arg(long)]
        lore: String,
        /// Repeat for each tag
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Remove an artifact
    Destroy { id: ArtifactId },
    /// Print an artifact record as JSON
    Show { id: ArtifactId },
    /// Print an artifact's guardianship transfers as JSON
    History { id: ArtifactId },
    /// List artifacts guarded by a principal (defaults to the caller)
    Owned {
        #[arg(value_parser = parse_principal)]
        principal: Option<Principal>,
    },
    /// Print the id of the most recently created artifact
    LastId,
    /// Print the principal derived from a label
    Principal { label: String },
}

/// Settings read from the `--config` file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub db_path: Option<PathBuf>,
    pub cache_size: Option<usize>,
    pub log_level: Option<String>,
    pub pretty_logs: Option<bool>,
    /// Also write JSONL logs under this directory
    pub log_dir: Option<PathBuf>,
    pub log_rotation: Option<RotationStrategy>,
    pub caller: Option<String>,
    pub deployer: Option<String>,
}

impl FileSettings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Effective settings after layering flags over the file over defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub storage: RedbStorageConfig,
    pub log: LogConfig,
    pub log_file: Option<FileConfig>,
    pub caller: Option<Principal>,
    /// Recorded only when the database is created.
    pub deployer: Principal,
    pub height: BlockHeight,
}

impl Settings {
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => FileSettings::load(path)?,
            None => FileSettings::default(),
        };

        let mut storage = match cli.db.clone().or(file.db_path) {
            Some(path) => RedbStorageConfig::with_path(path),
            None => RedbStorageConfig::default(),
        };
        if let Some(cache_size) = file.cache_size {
            storage = storage.with_cache_size(cache_size);
        }

        let mut log = if cli.pretty || file.pretty_logs.unwrap_or(false) {
            LogConfig::development()
        } else {
            LogConfig::quiet()
        };
        if let Some(level) = cli.log_level.clone().or(file.log_level) {
            log.default_level = level;
        }
        let log_file = file.log_dir.map(|directory| FileConfig {
            directory,
            rotation: file.log_rotation.unwrap_or_default(),
            ..FileConfig::default()
        });

        let caller = match (cli.caller, file.caller.as_deref()) {
            (Some(caller), _) => Some(caller),
            (None, Some(raw)) => Some(parse_principal(raw).context("`caller` in the config file")?),
            (None, None) => None,
        };
        let deployer = match file.deployer.as_deref() {
            Some(raw) => parse_principal(raw).context("`deployer` in the config file")?,
            None => caller.unwrap_or_else(|| Principal::derive(FALLBACK_DEPLOYER_LABEL)),
        };

        let height = match cli.height {
            Some(h) => h,
            None => chrono::Utc::now()
                .timestamp()
                .try_into()
                .context("system clock is before the Unix epoch")?,
        };

        Ok(Self {
            storage,
            log,
            log_file,
            caller,
            deployer,
            height,
        })
    }
}

/// Read a principal argument.
///
/// `label:<text>` always derives from `<text>`. Input that is 64 characters
/// long or made only of hex digits must be a well-formed hex principal, so a
/// mistyped key is rejected instead of naming someone else. Anything else is
/// a label.
pub fn parse_principal(s: &str) -> anyhow::Result<Principal> {
    if let Some(label) = s.strip_prefix(LABEL_PREFIX) {
        return Ok(Principal::derive(label));
    }
    if s.len() == PRINCIPAL_HEX_LEN || s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return s.parse::<Principal>().with_context(|| {
            format!(
                "{s:?} is not a {PRINCIPAL_HEX_LEN}-digit hex principal (use `{LABEL_PREFIX}{s}` to derive one from a label)"
            )
        });
    }
    Ok(Principal::derive(s))
}
