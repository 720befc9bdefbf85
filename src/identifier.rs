//! Study, contrast, gene, and sample identifiers.
//!
//! Generated identifiers follow fixed conventions:
//!  - a study is `gsf<tag>` where `<tag>` is a fixed length base-36 string,
//!  - contrast `i` of a study is `gsc<tag>_<i>`, so it is traceable to its study without a lookup, and
//!  - sample `i` of a study is `sample_<i>`.
//!
//! Study tags are random, see [`IdentifierGenerator`].
//! Uniqueness is probabilistic and only checked within one generator.

use std::collections::HashSet;

use thiserror::Error;

use crate::{config::global_config, rng::SplitMix64};

const STUDY_PREFIX: &str = "gsf";
const CONTRAST_PREFIX: &str = "gsc";
const CONTRAST_SEPARATOR: char = '_';
const SAMPLE_PREFIX: &str = "sample_";
const TAG_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// An identifier error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// A generated identifier was already issued.
    #[error("identifier {0} was already issued")]
    Collision(String),
    /// An identifier is not valid.
    #[error("invalid identifier {0}")]
    Invalid(String),
}

/// An identifier is printable ASCII without `/`, so it can be stored as a coordinate.
fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .bytes()
            .all(|b| b.is_ascii_graphic() && b != b'/')
}

fn is_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

/// Split a contrast identifier into its study tag and ordinal.
fn split_contrast(identifier: &str) -> Option<(&str, &str)> {
    let (tag, ordinal) = identifier
        .strip_prefix(CONTRAST_PREFIX)?
        .split_once(CONTRAST_SEPARATOR)?;
    (is_tag(tag) && !ordinal.is_empty() && ordinal.bytes().all(|b| b.is_ascii_digit()))
        .then_some((tag, ordinal))
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $validate:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from `identifier`.
            ///
            /// # Errors
            /// Returns [`IdentifierError::Invalid`] if `identifier` is not valid.
            pub fn new(identifier: impl Into<String>) -> Result<Self, IdentifierError> {
                let identifier = identifier.into();
                let validate: fn(&str) -> bool = $validate;
                if validate(&identifier) {
                    Ok(Self(identifier))
                } else {
                    Err(IdentifierError::Invalid(identifier))
                }
            }

            /// The identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdentifierError;

            fn try_from(identifier: &str) -> Result<Self, IdentifierError> {
                Self::new(identifier)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier!(
    /// A study identifier, `gsf<tag>`.
    StudyId,
    |identifier| identifier.strip_prefix(STUDY_PREFIX).is_some_and(is_tag)
);

identifier!(
    /// A contrast identifier, `gsc<tag>_<ordinal>`.
    ContrastId,
    |identifier| split_contrast(identifier).is_some()
);

identifier!(
    /// A gene identifier.
    GeneId,
    is_valid_identifier
);

identifier!(
    /// A sample identifier.
    SampleId,
    is_valid_identifier
);

impl StudyId {
    /// The random tag of the study.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.0[STUDY_PREFIX.len()..]
    }
}

impl ContrastId {
    /// Returns true if the contrast identifier was derived from `study`.
    #[must_use]
    pub fn belongs_to(&self, study: &StudyId) -> bool {
        split_contrast(&self.0).is_some_and(|(tag, _)| tag == study.tag())
    }
}

/// Derive the identifiers of the `n` contrasts of `study`.
#[must_use]
pub fn contrast_ids(study: &StudyId, n: usize) -> Vec<ContrastId> {
    (0..n)
        .map(|ordinal| ContrastId(format!("{CONTRAST_PREFIX}{}{CONTRAST_SEPARATOR}{ordinal}", study.tag())))
        .collect()
}

/// Positional sample identifiers `sample_0` to `sample_<n - 1>`.
#[must_use]
pub fn sample_ids(n: usize) -> Vec<SampleId> {
    (0..n)
        .map(|i| SampleId(format!("{SAMPLE_PREFIX}{i}")))
        .collect()
}

/// Generates study identifiers.
///
/// A generator remembers the tags it issued and reports a repeated tag as an [`IdentifierError::Collision`] rather than retrying.
#[derive(Debug)]
pub struct IdentifierGenerator {
    rng: SplitMix64,
    tag_length: usize,
    issued: HashSet<String>,
}

impl IdentifierGenerator {
    /// Create a generator from `seed` with the [study tag length](crate::config::Config#study-tag-length) of the global configuration.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_rng(SplitMix64::new(seed))
    }

    /// Create a generator seeded from the system clock.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::with_rng(SplitMix64::from_entropy())
    }

    fn with_rng(rng: SplitMix64) -> Self {
        Self {
            rng,
            tag_length: global_config().study_tag_length(),
            issued: HashSet::new(),
        }
    }

    /// Set the tag length, clamped to at least 1.
    #[must_use]
    pub fn tag_length(mut self, tag_length: usize) -> Self {
        self.tag_length = tag_length.max(1);
        self
    }

    /// Generate a new study identifier.
    ///
    /// # Errors
    /// Returns [`IdentifierError::Collision`] if the generated tag was already issued by this generator.
    pub fn new_study_id(&mut self) -> Result<StudyId, IdentifierError> {
        let tag: String = (0..self.tag_length)
            .map(|_| char::from(TAG_ALPHABET[self.rng.below(36) as usize]))
            .collect();
        let study_id = StudyId(format!("{STUDY_PREFIX}{tag}"));
        if self.issued.insert(tag) {
            Ok(study_id)
        } else {
            tracing::warn!(study = %study_id, "study identifier collision");
            Err(IdentifierError::Collision(study_id.0))
        }
    }

    /// The number of identifiers issued.
    #[must_use]
    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(StudyId::new("gsfab12").is_ok());
        assert!(StudyId::new("gsf").is_err());
        assert!(StudyId::new("gscab12").is_err());
        assert!(StudyId::new("gsfAB").is_err());
        assert!(ContrastId::new("gscab12_0").is_ok());
        assert!(ContrastId::new("gscab120").is_err());
        assert!(ContrastId::new("gscab12_").is_err());
        assert!(ContrastId::new("gsc_0").is_err());
        assert!(GeneId::new("ENSG00000141510").is_ok());
        assert!(GeneId::new("").is_err());
        assert!(GeneId::new("a/b").is_err());
        assert!(GeneId::new("gène").is_err());
        assert!(SampleId::try_from("sample_0").is_ok());
        assert_eq!(
            GeneId::new("a b").unwrap_err(),
            IdentifierError::Invalid("a b".to_string())
        );
    }

    #[test]
    fn contrast_ids_traceable() {
        let study = StudyId::new("gsf1234").unwrap();
        let contrasts = contrast_ids(&study, 12);
        assert_eq!(contrasts[0].as_str(), "gsc1234_0");
        assert_eq!(contrasts[11].as_str(), "gsc1234_11");
        assert!(contrasts.iter().all(|contrast| contrast.belongs_to(&study)));
        assert!(!contrasts[0].belongs_to(&StudyId::new("gsf4321").unwrap()));
        assert!(!contrasts[0].belongs_to(&StudyId::new("gsf123").unwrap()));
        assert!(!contrasts[11].belongs_to(&StudyId::new("gsf12341").unwrap()));
        assert!(contrast_ids(&study, 0).is_empty());
    }

    #[test]
    fn sample_ids_positional() {
        let samples = sample_ids(3);
        assert_eq!(
            samples.iter().map(SampleId::as_str).collect::<Vec<_>>(),
            ["sample_0", "sample_1", "sample_2"]
        );
    }

    #[test]
    fn study_ids_unique() {
        let mut generator = IdentifierGenerator::new(1).tag_length(8);
        let ids: HashSet<StudyId> = (0..10_000)
            .map(|_| generator.new_study_id().unwrap())
            .collect();
        assert_eq!(ids.len(), 10_000);
        assert!(ids.iter().all(|id| id.tag().len() == 8));
    }

    #[test]
    fn study_id_collision() {
        // a single character tag exhausts after 36 identifiers
        let mut generator = IdentifierGenerator::new(3).tag_length(1);
        let collision = (0..100)
            .map(|_| generator.new_study_id())
            .find_map(Result::err);
        assert!(matches!(collision, Some(IdentifierError::Collision(_))));
        assert!(generator.issued() <= 36);
    }

    #[test]
    fn study_ids_reproducible() {
        let mut a = IdentifierGenerator::new(9);
        let mut b = IdentifierGenerator::new(9);
        assert_eq!(a.new_study_id().unwrap(), b.new_study_id().unwrap());
    }
}
