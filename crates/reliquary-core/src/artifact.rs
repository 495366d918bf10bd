use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// Sequential artifact identifier. The first artifact is `1`.
pub type ArtifactId = u64;

/// Ledger height supplied by the host at call time.
pub type BlockHeight = u64;

/// Who is calling, and at which height. Supplied by the host per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Principal,
    pub height: BlockHeight,
}

impl CallContext {
    pub fn new(caller: Principal, height: BlockHeight) -> Self {
        Self { caller, height }
    }
}

/// Caller-controlled fields of an artifact, written by create and modify.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactProperties {
    pub name: String,
    pub power_rating: u64,
    pub lore: String,
    pub tags: Vec<String>,
}

impl ArtifactProperties {
    pub fn new(
        name: impl Into<String>,
        power_rating: u64,
        lore: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            power_rating,
            lore: lore.into(),
            tags,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: ArtifactId,
    pub name: String,
    pub guardian: Principal,
    pub power_rating: u64,
    pub created_at: BlockHeight,
    pub lore: String,
    pub tags: Vec<String>,
}

impl ArtifactRecord {
    pub(crate) fn forge(
        id: ArtifactId,
        guardian: Principal,
        created_at: BlockHeight,
        props: ArtifactProperties,
    ) -> Self {
        Self {
            id,
            name: props.name,
            guardian,
            power_rating: props.power_rating,
            created_at,
            lore: props.lore,
            tags: props.tags,
        }
    }

    /// Overwrite the caller-controlled fields. `id`, `guardian` and
    /// `created_at` are left alone.
    pub(crate) fn apply(&mut self, props: ArtifactProperties) {
        self.name = props.name;
        self.power_rating = props.power_rating;
        self.lore = props.lore;
        self.tags = props.tags;
    }

    pub fn properties(&self) -> ArtifactProperties {
        ArtifactProperties {
            name: self.name.clone(),
            power_rating: self.power_rating,
            lore: self.lore.clone(),
            tags: self.tags.clone(),
        }
    }

    pub fn is_guardian(&self, principal: &Principal) -> bool {
        &self.guardian == principal
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}

/// Record of a guardianship transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianshipRecord {
    pub from: Principal,
    pub to: Principal,
    pub height: BlockHeight,
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEEPER: Principal = Principal::from_bytes([1u8; 32]);

    fn sunblade() -> ArtifactProperties {
        ArtifactProperties::new("Sunblade", 500, "ancient", vec!["fire".into()])
    }

    #[test]
    fn test_forge_sets_identity_fields() {
        let record = ArtifactRecord::forge(3, KEEPER, 42, sunblade());
        assert_eq!(record.id, 3);
        assert_eq!(record.guardian, KEEPER);
        assert_eq!(record.created_at, 42);
        assert_eq!(record.properties(), sunblade());
        assert!(record.is_guardian(&KEEPER));
    }

    #[test]
    fn test_apply_keeps_identity_fields() {
        let mut record = ArtifactRecord::forge(3, KEEPER, 42, sunblade());
        record.apply(ArtifactProperties::new(
            "Moonshard",
            7,
            "cold",
            vec!["ice".into(), "night".into()],
        ));
        assert_eq!(record.id, 3);
        assert_eq!(record.guardian, KEEPER);
        assert_eq!(record.created_at, 42);
        assert_eq!(record.name, "Moonshard");
        assert_eq!(record.tag_count(), 2);
    }
}
