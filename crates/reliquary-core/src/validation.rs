//! Bounds checks applied before any registry mutation.
//!
//! The predicates are pure and total. [`check_properties`] composes them and
//! reports the first violation it finds as a typed error.

use crate::artifact::ArtifactProperties;
use crate::error::{Field, RegistryError};

pub const NAME_MIN_LEN: usize = 1;
pub const NAME_MAX_LEN: usize = 64;
pub const LORE_MIN_LEN: usize = 1;
pub const LORE_MAX_LEN: usize = 128;
pub const TAG_MIN_LEN: usize = 1;
pub const TAG_MAX_LEN: usize = 32;
pub const TAGS_MIN_COUNT: usize = 1;
pub const TAGS_MAX_COUNT: usize = 10;
pub const POWER_RATING_MIN: u64 = 1;
/// Exclusive upper bound.
pub const POWER_RATING_CEILING: u64 = 1_000_000_000;

/// Length in Unicode scalar values.
fn text_len(s: &str) -> usize {
    s.chars().count()
}

pub fn validate_text_bounds(s: &str, min: usize, max: usize) -> bool {
    let len = text_len(s);
    min <= len && len <= max
}

pub fn validate_tag(tag: &str) -> bool {
    validate_text_bounds(tag, TAG_MIN_LEN, TAG_MAX_LEN)
}

pub fn validate_tag_collection<S: AsRef<str>>(tags: &[S]) -> bool {
    (TAGS_MIN_COUNT..=TAGS_MAX_COUNT).contains(&tags.len())
        && tags.iter().all(|t| validate_tag(t.as_ref()))
}

pub fn validate_power_rating(rating: u64) -> bool {
    (POWER_RATING_MIN..POWER_RATING_CEILING).contains(&rating)
}

/// Whether `name` is acceptable as an artifact name.
pub fn verify_identifier_structure(name: &str) -> bool {
    validate_text_bounds(name, NAME_MIN_LEN, NAME_MAX_LEN)
}

fn check_text(field: Field, s: &str, min: usize, max: usize) -> Result<(), RegistryError> {
    if validate_text_bounds(s, min, max) {
        Ok(())
    } else {
        Err(RegistryError::FormatInvalid {
            field,
            len: text_len(s),
            min,
            max,
        })
    }
}

/// Validate every caller-supplied field of an artifact.
pub fn check_properties(props: &ArtifactProperties) -> Result<(), RegistryError> {
    check_text(Field::Name, &props.name, NAME_MIN_LEN, NAME_MAX_LEN)?;
    if !validate_power_rating(props.power_rating) {
        return Err(RegistryError::RangeInvalid {
            field: Field::PowerRating,
            value: props.power_rating,
            min: POWER_RATING_MIN,
            max_exclusive: POWER_RATING_CEILING,
        });
    }
    check_text(Field::Lore, &props.lore, LORE_MIN_LEN, LORE_MAX_LEN)?;

    let count = props.tags.len();
    if !(TAGS_MIN_COUNT..=TAGS_MAX_COUNT).contains(&count) {
        return Err(RegistryError::FormatInvalid {
            field: Field::Tags,
            len: count,
            min: TAGS_MIN_COUNT,
            max: TAGS_MAX_COUNT,
        });
    }
    for (index, tag) in props.tags.iter().enumerate() {
        check_text(Field::Tag { index }, tag, TAG_MIN_LEN, TAG_MAX_LEN)?;
    }
    Ok(())
}
