use std::fmt;

use thiserror::Error;

use crate::artifact::ArtifactId;
use crate::principal::Principal;

/// Which caller-supplied value failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Name,
    Lore,
    Tags,
    Tag { index: usize },
    PowerRating,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Name => write!(f, "name"),
            Field::Lore => write!(f, "lore"),
            Field::Tags => write!(f, "tags"),
            Field::Tag { index } => write!(f, "tag #{index}"),
            Field::PowerRating => write!(f, "power rating"),
        }
    }
}

/// Coarse classification of a [`RegistryError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Duplicate,
    FormatInvalid,
    RangeInvalid,
    InsufficientPrivileges,
    SequenceExhausted,
    Store,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("artifact {0} not found")]
    NotFound(ArtifactId),
    #[error("artifact {0} already exists")]
    Duplicate(ArtifactId),
    #[error("{field} length {len} outside {min}..={max}")]
    FormatInvalid {
        field: Field,
        len: usize,
        min: usize,
        max: usize,
    },
    #[error("{field} {value} outside {min}..{max_exclusive}")]
    RangeInvalid {
        field: Field,
        value: u64,
        min: u64,
        max_exclusive: u64,
    },
    #[error("{caller:?} is not the guardian of artifact {artifact_id}")]
    InsufficientPrivileges {
        artifact_id: ArtifactId,
        caller: Principal,
    },
    #[error("artifact id sequence exhausted")]
    SequenceExhausted,
    #[error("store error: {0}")]
    Store(String),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Duplicate(_) => ErrorKind::Duplicate,
            Self::FormatInvalid { .. } => ErrorKind::FormatInvalid,
            Self::RangeInvalid { .. } => ErrorKind::RangeInvalid,
            Self::InsufficientPrivileges { .. } => ErrorKind::InsufficientPrivileges,
            Self::SequenceExhausted => ErrorKind::SequenceExhausted,
            Self::Store(_) => ErrorKind::Store,
        }
    }
}
