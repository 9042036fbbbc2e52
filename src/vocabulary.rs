//! Vocabulary sets.
//!
//! A vocabulary set maps vocabulary URIs to whether they are required. For
//! dialects that predate `$vocabulary` the dialect URI itself is the single
//! vocabulary.

use std::collections::BTreeMap;

use serde::Serialize;

pub const CORE_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/core";
pub const APPLICATOR_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/applicator";
pub const UNEVALUATED_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/unevaluated";
pub const VALIDATION_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/validation";
pub const META_DATA_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/meta-data";
pub const FORMAT_ANNOTATION_2020_12: &str =
    "https://json-schema.org/draft/2020-12/vocab/format-annotation";
pub const FORMAT_ASSERTION_2020_12: &str =
    "https://json-schema.org/draft/2020-12/vocab/format-assertion";
pub const CONTENT_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/content";

pub const CORE_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/core";
pub const APPLICATOR_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/applicator";
pub const VALIDATION_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/validation";
pub const META_DATA_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/meta-data";
pub const FORMAT_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/format";
pub const CONTENT_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/content";
pub const HYPER_SCHEMA_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/hyper-schema";

pub const DRAFT_7: &str = "http://json-schema.org/draft-07/schema#";
pub const DRAFT_7_HYPER: &str = "http://json-schema.org/draft-07/hyper-schema#";
pub const DRAFT_6: &str = "http://json-schema.org/draft-06/schema#";
pub const DRAFT_6_HYPER: &str = "http://json-schema.org/draft-06/hyper-schema#";
pub const DRAFT_4: &str = "http://json-schema.org/draft-04/schema#";
pub const DRAFT_4_HYPER: &str = "http://json-schema.org/draft-04/hyper-schema#";
pub const DRAFT_3: &str = "http://json-schema.org/draft-03/schema#";
pub const DRAFT_3_HYPER: &str = "http://json-schema.org/draft-03/hyper-schema#";
pub const DRAFT_2: &str = "http://json-schema.org/draft-02/schema#";
pub const DRAFT_2_HYPER: &str = "http://json-schema.org/draft-02/hyper-schema#";
pub const DRAFT_1: &str = "http://json-schema.org/draft-01/schema#";
pub const DRAFT_1_HYPER: &str = "http://json-schema.org/draft-01/hyper-schema#";
pub const DRAFT_0: &str = "http://json-schema.org/draft-00/schema#";
pub const DRAFT_0_HYPER: &str = "http://json-schema.org/draft-00/hyper-schema#";

/// Vocabulary URI to required (`true`) or optional (`false`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Vocabularies(BTreeMap<String, bool>);

impl Vocabularies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vocabulary, replacing any previous required flag.
    pub fn insert(&mut self, uri: impl Into<String>, required: bool) {
        self.0.insert(uri.into(), required);
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.0.contains_key(uri)
    }

    /// Whether any of `uris` is present.
    pub fn contains_any(&self, uris: &[&str]) -> bool {
        uris.iter().any(|uri| self.contains(uri))
    }

    /// `Some(true)` if required, `Some(false)` if optional.
    pub fn get(&self, uri: &str) -> Option<bool> {
        self.0.get(uri).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(uri, required)| (uri.as_str(), *required))
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for Vocabularies {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        let mut vocabularies = Vocabularies::new();
        for (uri, required) in iter {
            vocabularies.insert(uri, required);
        }
        vocabularies
    }
}
