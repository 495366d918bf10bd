use crate::artifact::ArtifactId;
use crate::error::RegistryError;

type Result<T> = std::result::Result<T, RegistryError>;

/// The process-wide artifact id counter.
///
/// `current()` is the id of the most recently created artifact (0 before the
/// first one). Ids are proposed with [`next_id`](SequenceStore::next_id) and
/// only committed with [`advance_to`](SequenceStore::advance_to) once the
/// creation has succeeded, so failed attempts never consume an id.
pub trait SequenceStore {
    fn current(&self) -> Result<ArtifactId>;

    /// Move the counter forward to `id`. Rejects ids at or below the current
    /// value with `Duplicate`.
    fn advance_to(&mut self, id: ArtifactId) -> Result<()>;

    fn next_id(&self) -> Result<ArtifactId> {
        self.current()?
            .checked_add(1)
            .ok_or(RegistryError::SequenceExhausted)
    }
}

#[derive(Debug, Default)]
pub struct InMemorySequence {
    last: ArtifactId,
}

impl InMemorySequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a known last-issued id.
    pub fn starting_at(last: ArtifactId) -> Self {
        Self { last }
    }
}

impl SequenceStore for InMemorySequence {
    fn current(&self) -> Result<ArtifactId> {
        Ok(self.last)
    }

    fn advance_to(&mut self, id: ArtifactId) -> Result<()> {
        if id <= self.last {
            return Err(RegistryError::Duplicate(id));
        }
        self.last = id;
        Ok(())
    }
}
