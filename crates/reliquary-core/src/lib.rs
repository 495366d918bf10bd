pub mod artifact;
pub mod error;
pub mod principal;
pub mod registry;
pub mod sequence;
pub mod shared;
pub mod store;
pub mod validation;

pub use artifact::*;
pub use error::{ErrorKind, Field, RegistryError};
pub use principal::{Principal, PrincipalParseError};
pub use registry::{InMemoryRegistry, Registry};
pub use sequence::{InMemorySequence, SequenceStore};
pub use shared::SharedRegistry;
pub use store::{
    AccessMatrix, ArtifactVault, DirectWrites, InMemoryAccessMatrix, InMemoryVault, WriteScope,
};
pub use validation::{
    validate_power_rating, validate_tag, validate_tag_collection, validate_text_bounds,
    verify_identifier_structure,
};
