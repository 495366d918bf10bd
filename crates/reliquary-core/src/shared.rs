//! Serialized access to a registry from many threads.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::registry::Registry;
use crate::sequence::SequenceStore;
use crate::store::{AccessMatrix, ArtifactVault, DirectWrites, WriteScope};

/// Cloneable handle that runs one handler at a time against a shared
/// registry. Each locked section sees a consistent snapshot and commits
/// before the next one starts.
pub struct SharedRegistry<V, M, S, W = DirectWrites>
where
    V: ArtifactVault,
    M: AccessMatrix,
    S: SequenceStore,
    W: WriteScope,
{
    inner: Arc<Mutex<Registry<V, M, S, W>>>,
}

impl<V, M, S, W> SharedRegistry<V, M, S, W>
where
    V: ArtifactVault,
    M: AccessMatrix,
    S: SequenceStore,
    W: WriteScope,
{
    pub fn new(registry: Registry<V, M, S, W>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Run `f` with exclusive access to the registry.
    pub fn with<R>(&self, f: impl FnOnce(&mut Registry<V, M, S, W>) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    pub fn lock(&self) -> MutexGuard<'_, Registry<V, M, S, W>> {
        self.inner.lock()
    }
}

impl<V, M, S, W> Clone for SharedRegistry<V, M, S, W>
where
    V: ArtifactVault,
    M: AccessMatrix,
    S: SequenceStore,
    W: WriteScope,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactProperties, CallContext};
    use crate::principal::Principal;

    #[test]
    fn test_concurrent_forges_get_distinct_gapless_ids() {
        let shared = SharedRegistry::new(Registry::in_memory(Principal::derive("deployer")));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    let ctx = CallContext::new(Principal::derive(&format!("smith-{t}")), t);
                    (0..25)
                        .map(|i| {
                            let props = ArtifactProperties::new(
                                format!("blade-{t}-{i}"),
                                100,
                                "tempered",
                                vec!["steel".into()],
                            );
                            shared.with(|r| r.forge_new_artifact(&ctx, props)).unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=200).collect::<Vec<u64>>());
        assert_eq!(shared.lock().last_artifact_id(), Ok(200));
    }
}
