//! Keyword traversal strategies.
//!
//! A walker tells the frame which keyword values hold subschemas. It is
//! consulted with the vocabularies active at each subschema, since nested
//! schemas may use a different dialect than their parent.

use serde::Serialize;

use crate::vocabulary::{self as v, Vocabularies};

/// How a keyword's value relates to subschemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Strategy {
    /// Opaque value, no recursion.
    None,
    /// The value is a single subschema.
    Value,
    /// The value is an array of subschemas.
    Elements,
    /// The value is an object whose member values are subschemas.
    Members,
    /// A subschema or an array of subschemas, depending on its type.
    ValueOrElements,
    /// An array of subschemas or an object of subschemas, depending on its type.
    ElementsOrMembers,
}

/// Maps a keyword and the active vocabularies to a [`Strategy`].
pub trait Walker {
    fn walk(&self, keyword: &str, vocabularies: &Vocabularies) -> Strategy;
}

impl<F> Walker for F
where
    F: Fn(&str, &Vocabularies) -> Strategy,
{
    fn walk(&self, keyword: &str, vocabularies: &Vocabularies) -> Strategy {
        self(keyword, vocabularies)
    }
}

/// Never recurses.
pub fn null_walker(_keyword: &str, _vocabularies: &Vocabularies) -> Strategy {
    Strategy::None
}

/// Keywords whose members are definitions rather than in-place applicators.
pub fn is_definitions_container(keyword: &str) -> bool {
    keyword == "$defs" || keyword == "definitions"
}

const MODERN_APPLICATORS_2020_12: &[(&str, Strategy)] = &[
    ("allOf", Strategy::Elements),
    ("anyOf", Strategy::Elements),
    ("oneOf", Strategy::Elements),
    ("not", Strategy::Value),
    ("if", Strategy::Value),
    ("then", Strategy::Value),
    ("else", Strategy::Value),
    ("dependentSchemas", Strategy::Members),
    ("prefixItems", Strategy::Elements),
    ("items", Strategy::Value),
    ("contains", Strategy::Value),
    ("properties", Strategy::Members),
    ("patternProperties", Strategy::Members),
    ("additionalProperties", Strategy::Value),
    ("propertyNames", Strategy::Value),
];

const MODERN_APPLICATORS_2019_09: &[(&str, Strategy)] = &[
    ("allOf", Strategy::Elements),
    ("anyOf", Strategy::Elements),
    ("oneOf", Strategy::Elements),
    ("not", Strategy::Value),
    ("if", Strategy::Value),
    ("then", Strategy::Value),
    ("else", Strategy::Value),
    ("dependentSchemas", Strategy::Members),
    ("items", Strategy::ValueOrElements),
    ("additionalItems", Strategy::Value),
    ("contains", Strategy::Value),
    ("properties", Strategy::Members),
    ("patternProperties", Strategy::Members),
    ("additionalProperties", Strategy::Value),
    ("propertyNames", Strategy::Value),
    ("unevaluatedItems", Strategy::Value),
    ("unevaluatedProperties", Strategy::Value),
];

const LINK_DESCRIPTION: &[(&str, Strategy)] = &[
    ("links", Strategy::Elements),
    ("hrefSchema", Strategy::Value),
    ("targetSchema", Strategy::Value),
    ("headerSchema", Strategy::Value),
    ("submissionSchema", Strategy::Value),
];

const DRAFT_7: &[(&str, Strategy)] = &[
    ("definitions", Strategy::Members),
    ("allOf", Strategy::Elements),
    ("anyOf", Strategy::Elements),
    ("oneOf", Strategy::Elements),
    ("not", Strategy::Value),
    ("if", Strategy::Value),
    ("then", Strategy::Value),
    ("else", Strategy::Value),
    ("items", Strategy::ValueOrElements),
    ("additionalItems", Strategy::Value),
    ("contains", Strategy::Value),
    ("properties", Strategy::Members),
    ("patternProperties", Strategy::Members),
    ("additionalProperties", Strategy::Value),
    ("dependencies", Strategy::Members),
    ("propertyNames", Strategy::Value),
];

const DRAFT_6: &[(&str, Strategy)] = &[
    ("definitions", Strategy::Members),
    ("allOf", Strategy::Elements),
    ("anyOf", Strategy::Elements),
    ("oneOf", Strategy::Elements),
    ("not", Strategy::Value),
    ("items", Strategy::ValueOrElements),
    ("additionalItems", Strategy::Value),
    ("contains", Strategy::Value),
    ("properties", Strategy::Members),
    ("patternProperties", Strategy::Members),
    ("additionalProperties", Strategy::Value),
    ("dependencies", Strategy::Members),
    ("propertyNames", Strategy::Value),
];

const DRAFT_4: &[(&str, Strategy)] = &[
    ("definitions", Strategy::Members),
    ("allOf", Strategy::Elements),
    ("anyOf", Strategy::Elements),
    ("oneOf", Strategy::Elements),
    ("not", Strategy::Value),
    ("items", Strategy::ValueOrElements),
    ("additionalItems", Strategy::Value),
    ("properties", Strategy::Members),
    ("patternProperties", Strategy::Members),
    ("additionalProperties", Strategy::Value),
    ("dependencies", Strategy::Members),
];

const DRAFT_4_HYPER: &[(&str, Strategy)] = &[
    ("links", Strategy::Elements),
    ("schema", Strategy::Value),
    ("targetSchema", Strategy::Value),
];

const DRAFT_3: &[(&str, Strategy)] = &[
    ("extends", Strategy::ValueOrElements),
    ("type", Strategy::Elements),
    ("disallow", Strategy::Elements),
    ("items", Strategy::ValueOrElements),
    ("additionalItems", Strategy::Value),
    ("properties", Strategy::Members),
    ("patternProperties", Strategy::Members),
    ("additionalProperties", Strategy::Value),
    ("dependencies", Strategy::Members),
];

const DRAFT_3_HYPER: &[(&str, Strategy)] = &[
    ("links", Strategy::Elements),
    ("targetSchema", Strategy::Value),
];

const DRAFT_0_TO_2: &[(&str, Strategy)] = &[
    ("extends", Strategy::ValueOrElements),
    ("type", Strategy::Elements),
    ("items", Strategy::ValueOrElements),
    ("properties", Strategy::Members),
    ("additionalProperties", Strategy::Value),
    ("requires", Strategy::Value),
];

const DRAFT_0_TO_2_HYPER: &[(&str, Strategy)] = &[
    ("links", Strategy::Elements),
    ("alternate", Strategy::Elements),
    ("targetSchema", Strategy::Value),
];

fn lookup(table: &[(&str, Strategy)], keyword: &str) -> Option<Strategy> {
    table
        .iter()
        .find(|(name, _)| *name == keyword)
        .map(|(_, strategy)| *strategy)
}

/// Traversal table for every official dialect from draft 0 to 2020-12.
pub fn official_walker(keyword: &str, vocabularies: &Vocabularies) -> Strategy {
    let has = |uri: &str| vocabularies.contains(uri);

    // 2020-12
    if has(v::CORE_2020_12) && is_definitions_container(keyword) {
        return Strategy::Members;
    }
    if has(v::APPLICATOR_2020_12) {
        if let Some(strategy) = lookup(MODERN_APPLICATORS_2020_12, keyword) {
            return strategy;
        }
    }
    if has(v::UNEVALUATED_2020_12)
        && (keyword == "unevaluatedItems" || keyword == "unevaluatedProperties")
    {
        return Strategy::Value;
    }
    if has(v::CONTENT_2020_12) && keyword == "contentSchema" {
        return Strategy::Value;
    }

    // 2019-09
    if has(v::CORE_2019_09) && is_definitions_container(keyword) {
        return Strategy::Members;
    }
    if has(v::APPLICATOR_2019_09) {
        if let Some(strategy) = lookup(MODERN_APPLICATORS_2019_09, keyword) {
            return strategy;
        }
    }
    if has(v::CONTENT_2019_09) && keyword == "contentSchema" {
        return Strategy::Value;
    }
    if has(v::HYPER_SCHEMA_2019_09) {
        if let Some(strategy) = lookup(LINK_DESCRIPTION, keyword) {
            return strategy;
        }
    }

    // Draft 7 and 6
    if has(v::DRAFT_7) || has(v::DRAFT_7_HYPER) {
        if let Some(strategy) = lookup(DRAFT_7, keyword) {
            return strategy;
        }
    }
    if has(v::DRAFT_7_HYPER) {
        if let Some(strategy) = lookup(LINK_DESCRIPTION, keyword) {
            return strategy;
        }
    }
    if has(v::DRAFT_6) || has(v::DRAFT_6_HYPER) {
        if let Some(strategy) = lookup(DRAFT_6, keyword) {
            return strategy;
        }
    }
    if has(v::DRAFT_6_HYPER) {
        if let Some(strategy) = lookup(LINK_DESCRIPTION, keyword) {
            return strategy;
        }
    }

    // Draft 4 and 3
    if has(v::DRAFT_4) || has(v::DRAFT_4_HYPER) {
        if let Some(strategy) = lookup(DRAFT_4, keyword) {
            return strategy;
        }
    }
    if has(v::DRAFT_4_HYPER) {
        if let Some(strategy) = lookup(DRAFT_4_HYPER, keyword) {
            return strategy;
        }
    }
    if has(v::DRAFT_3) || has(v::DRAFT_3_HYPER) {
        if let Some(strategy) = lookup(DRAFT_3, keyword) {
            return strategy;
        }
    }
    if has(v::DRAFT_3_HYPER) {
        if let Some(strategy) = lookup(DRAFT_3_HYPER, keyword) {
            return strategy;
        }
    }

    // Draft 2, 1 and 0
    let legacy = [
        v::DRAFT_2,
        v::DRAFT_2_HYPER,
        v::DRAFT_1,
        v::DRAFT_1_HYPER,
        v::DRAFT_0,
        v::DRAFT_0_HYPER,
    ];
    if vocabularies.contains_any(&legacy) {
        if let Some(strategy) = lookup(DRAFT_0_TO_2, keyword) {
            return strategy;
        }
    }
    if vocabularies.contains_any(&[v::DRAFT_2_HYPER, v::DRAFT_1_HYPER, v::DRAFT_0_HYPER]) {
        if let Some(strategy) = lookup(DRAFT_0_TO_2_HYPER, keyword) {
            return strategy;
        }
    }

    Strategy::None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabularies(uris: &[&str]) -> Vocabularies {
        uris.iter().map(|uri| (*uri, true)).collect()
    }

    #[test]
    fn modern_applicators() {
        let vocabularies = vocabularies(&[v::CORE_2020_12, v::APPLICATOR_2020_12]);
        assert_eq!(official_walker("$defs", &vocabularies), Strategy::Members);
        assert_eq!(official_walker("allOf", &vocabularies), Strategy::Elements);
        assert_eq!(official_walker("items", &vocabularies), Strategy::Value);
        assert_eq!(official_walker("prefixItems", &vocabularies), Strategy::Elements);
        assert_eq!(official_walker("type", &vocabularies), Strategy::None);
        // Not part of the active vocabularies
        assert_eq!(official_walker("unevaluatedProperties", &vocabularies), Strategy::None);
    }

    #[test]
    fn items_shape_depends_on_dialect() {
        let modern = vocabularies(&[v::CORE_2019_09, v::APPLICATOR_2019_09]);
        assert_eq!(official_walker("items", &modern), Strategy::ValueOrElements);
        let legacy = vocabularies(&[v::DRAFT_4]);
        assert_eq!(official_walker("items", &legacy), Strategy::ValueOrElements);
        assert_eq!(official_walker("dependencies", &legacy), Strategy::Members);
        assert_eq!(official_walker("if", &legacy), Strategy::None);
    }

    #[test]
    fn legacy_drafts() {
        let draft3 = vocabularies(&[v::DRAFT_3]);
        assert_eq!(official_walker("extends", &draft3), Strategy::ValueOrElements);
        assert_eq!(official_walker("disallow", &draft3), Strategy::Elements);
        let draft0 = vocabularies(&[v::DRAFT_0_HYPER]);
        assert_eq!(official_walker("requires", &draft0), Strategy::Value);
        assert_eq!(official_walker("targetSchema", &draft0), Strategy::Value);
    }

    #[test]
    fn closures_are_walkers() {
        let walker = |keyword: &str, _: &Vocabularies| {
            if keyword == "custom" {
                Strategy::Value
            } else {
                Strategy::None
            }
        };
        assert_eq!(walker.walk("custom", &Vocabularies::new()), Strategy::Value);
        assert_eq!(null_walker("allOf", &Vocabularies::new()), Strategy::None);
    }
}
