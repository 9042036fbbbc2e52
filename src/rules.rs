//! Built-in lint and canonicalization rules.
//!
//! Every rule checks the vocabularies in force before looking at keywords,
//! so the same keyword name in an unrelated dialect is left alone. Rules that
//! delete or move subschemas skip positions that a reference lands on.

use serde_json::{Map, Value};

use crate::pointer::Pointer;
use crate::transform::{Payload, RuleContext, RuleOutcome, TransformRule, Transformer};
use crate::vocabulary as v;

const CONDITIONAL_VOCABULARIES: &[&str] = &[
    v::APPLICATOR_2020_12,
    v::APPLICATOR_2019_09,
    v::DRAFT_7,
    v::DRAFT_7_HYPER,
];

const MODERN_APPLICATORS: &[&str] = &[v::APPLICATOR_2020_12, v::APPLICATOR_2019_09];

const ALLOF_VOCABULARIES: &[&str] = &[
    v::APPLICATOR_2020_12,
    v::APPLICATOR_2019_09,
    v::DRAFT_7,
    v::DRAFT_7_HYPER,
    v::DRAFT_6,
    v::DRAFT_6_HYPER,
    v::DRAFT_4,
    v::DRAFT_4_HYPER,
];

const VALIDATION_VOCABULARIES: &[&str] = &[
    v::VALIDATION_2020_12,
    v::VALIDATION_2019_09,
    v::DRAFT_7,
    v::DRAFT_7_HYPER,
    v::DRAFT_6,
    v::DRAFT_6_HYPER,
    v::DRAFT_4,
    v::DRAFT_4_HYPER,
];

const CONST_VOCABULARIES: &[&str] = &[
    v::VALIDATION_2020_12,
    v::VALIDATION_2019_09,
    v::DRAFT_7,
    v::DRAFT_7_HYPER,
    v::DRAFT_6,
    v::DRAFT_6_HYPER,
];

const MODERN_VALIDATION: &[&str] = &[v::VALIDATION_2020_12, v::VALIDATION_2019_09];

/// Keywords that give a subschema an identity of its own. Subschemas that
/// carry them are never merged into their parent.
const IDENTITY_KEYWORDS: &[&str] = &[
    "$id",
    "id",
    "$schema",
    "$anchor",
    "$dynamicAnchor",
    "$recursiveAnchor",
    "$defs",
    "definitions",
];

/// Keywords still meaningful next to `$ref` in draft 7 and older.
const REF_SIBLINGS: &[&str] = &["$ref", "$schema", "definitions", "$comment"];

/// Every built-in rule, in the order they are tried.
pub fn canonical_rules() -> Transformer {
    let mut transformer = Transformer::new();
    for rule in all() {
        transformer.add(rule);
    }
    transformer
}

fn all() -> Vec<TransformRule> {
    vec![
        else_false(),
        else_empty(),
        then_empty(),
        else_without_if(),
        then_without_if(),
        if_without_then_else(),
        empty_allof_branches(),
        duplicate_allof_branches(),
        duplicate_enum_values(),
        single_type_array(),
        const_with_enum(),
        min_contains_without_contains(),
        max_contains_without_contains(),
        additional_properties_default(),
        draft_ref_siblings(),
    ]
}

fn remove_keywords(schema: &mut Value, keywords: &[&str]) {
    if let Some(object) = schema.as_object_mut() {
        for keyword in keywords {
            object.shift_remove(*keyword);
        }
    }
}

fn is_trivial(value: &Value) -> bool {
    match value {
        Value::Bool(true) => true,
        Value::Object(object) => object.is_empty(),
        _ => false,
    }
}

/// `if` with `else: false` and no `then` is the `if` subschema itself.
pub fn else_false() -> TransformRule {
    TransformRule::new(
        "else_false",
        "An `if` without `then` and with `else: false` is equivalent to the `if` schema",
        |context| {
            if !context.has_vocabulary(CONDITIONAL_VOCABULARIES)
                || context.defines("then")
                || context.keyword("else") != Some(&Value::Bool(false))
                || context.is_referenced_within("if")
            {
                return RuleOutcome::NoMatch;
            }
            match context.keyword("if") {
                Some(Value::Bool(true)) => RuleOutcome::Match,
                Some(Value::Object(condition)) => RuleOutcome::when(can_merge(context, condition)),
                _ => RuleOutcome::NoMatch,
            }
        },
        |schema, _| {
            let Some(object) = schema.as_object_mut() else {
                return;
            };
            object.shift_remove("else");
            if let Some(Value::Object(condition)) = object.shift_remove("if") {
                for (keyword, value) in condition {
                    object.insert(keyword, value);
                }
            }
        },
    )
}

fn can_merge(context: &RuleContext<'_>, condition: &Map<String, Value>) -> bool {
    let Some(parent) = context.schema.as_object() else {
        return false;
    };
    let ref_overrides = context.base_dialect.ref_overrides_siblings();
    condition.keys().all(|keyword| {
        !IDENTITY_KEYWORDS.contains(&keyword.as_str())
            && !parent.contains_key(keyword)
            && !(ref_overrides && keyword == "$ref")
    }) && !(ref_overrides && parent.contains_key("$ref"))
}

pub fn else_empty() -> TransformRule {
    TransformRule::new(
        "else_empty",
        "An empty or `true` `else` has no effect",
        |context| {
            RuleOutcome::when(
                context.has_vocabulary(CONDITIONAL_VOCABULARIES)
                    && context.defines("if")
                    && context.keyword("else").is_some_and(is_trivial)
                    && !context.is_referenced_within("else"),
            )
        },
        |schema, _| remove_keywords(schema, &["else"]),
    )
}

pub fn then_empty() -> TransformRule {
    TransformRule::new(
        "then_empty",
        "An empty or `true` `then` has no effect",
        |context| {
            RuleOutcome::when(
                context.has_vocabulary(CONDITIONAL_VOCABULARIES)
                    && context.defines("if")
                    && context.keyword("then").is_some_and(is_trivial)
                    && !context.is_referenced_within("then"),
            )
        },
        |schema, _| remove_keywords(schema, &["then"]),
    )
}

pub fn else_without_if() -> TransformRule {
    TransformRule::new(
        "else_without_if",
        "`else` has no effect without `if`",
        |context| {
            RuleOutcome::when(
                context.has_vocabulary(CONDITIONAL_VOCABULARIES)
                    && context.defines("else")
                    && !context.defines("if")
                    && !context.is_referenced_within("else"),
            )
        },
        |schema, _| remove_keywords(schema, &["else"]),
    )
}

pub fn then_without_if() -> TransformRule {
    TransformRule::new(
        "then_without_if",
        "`then` has no effect without `if`",
        |context| {
            RuleOutcome::when(
                context.has_vocabulary(CONDITIONAL_VOCABULARIES)
                    && context.defines("then")
                    && !context.defines("if")
                    && !context.is_referenced_within("then"),
            )
        },
        |schema, _| remove_keywords(schema, &["then"]),
    )
}

pub fn if_without_then_else() -> TransformRule {
    TransformRule::new(
        "if_without_then_else",
        "`if` has no effect without `then` or `else`",
        |context| {
            RuleOutcome::when(
                context.has_vocabulary(CONDITIONAL_VOCABULARIES)
                    && context.defines("if")
                    && !context.defines("then")
                    && !context.defines("else")
                    // `if` annotations feed the unevaluated keywords
                    && !context.defines("unevaluatedProperties")
                    && !context.defines("unevaluatedItems")
                    && !context.is_referenced_within("if"),
            )
        },
        |schema, _| remove_keywords(schema, &["if"]),
    )
}

fn branches<'a>(context: &RuleContext<'a>) -> Option<&'a Vec<Value>> {
    if !context.has_vocabulary(ALLOF_VOCABULARIES) || context.is_referenced_within("allOf") {
        return None;
    }
    context.keyword("allOf").and_then(Value::as_array)
}

pub fn empty_allof_branches() -> TransformRule {
    TransformRule::new(
        "empty_allof_branches",
        "Empty or `true` `allOf` branches have no effect",
        |context| {
            let Some(branches) = branches(context) else {
                return RuleOutcome::NoMatch;
            };
            let locations: Vec<Pointer> = branches
                .iter()
                .enumerate()
                .filter(|(_, branch)| is_trivial(branch))
                .map(|(index, _)| Pointer::root().join("allOf").join(index))
                .collect();
            if locations.is_empty() {
                RuleOutcome::NoMatch
            } else {
                RuleOutcome::MatchWith(Payload {
                    locations,
                    message: None,
                })
            }
        },
        |schema, _| {
            let Some(object) = schema.as_object_mut() else {
                return;
            };
            let now_empty = match object.get_mut("allOf") {
                Some(Value::Array(branches)) => {
                    branches.retain(|branch| !is_trivial(branch));
                    branches.is_empty()
                }
                _ => false,
            };
            if now_empty {
                object.shift_remove("allOf");
            }
        },
    )
}

pub fn duplicate_allof_branches() -> TransformRule {
    TransformRule::new(
        "duplicate_allof_branches",
        "Repeated `allOf` branches are redundant",
        |context| {
            let Some(branches) = branches(context) else {
                return RuleOutcome::NoMatch;
            };
            let locations = duplicates(branches, "allOf");
            if locations.is_empty() {
                RuleOutcome::NoMatch
            } else {
                RuleOutcome::MatchWith(Payload {
                    locations,
                    message: None,
                })
            }
        },
        |schema, _| dedupe(schema, "allOf"),
    )
}

fn duplicates(items: &[Value], keyword: &str) -> Vec<Pointer> {
    items
        .iter()
        .enumerate()
        .filter(|(index, item)| items[..*index].contains(*item))
        .map(|(index, _)| Pointer::root().join(keyword).join(index))
        .collect()
}

fn dedupe(schema: &mut Value, keyword: &str) {
    if let Some(Value::Array(items)) = schema.get_mut(keyword) {
        let mut unique: Vec<Value> = Vec::with_capacity(items.len());
        for item in items.drain(..) {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        *items = unique;
    }
}

pub fn duplicate_enum_values() -> TransformRule {
    TransformRule::new(
        "duplicate_enum_values",
        "Repeated `enum` values are redundant",
        |context| {
            if !context.has_vocabulary(VALIDATION_VOCABULARIES) {
                return RuleOutcome::NoMatch;
            }
            let Some(Value::Array(values)) = context.keyword("enum") else {
                return RuleOutcome::NoMatch;
            };
            let locations = duplicates(values, "enum");
            if locations.is_empty() {
                RuleOutcome::NoMatch
            } else {
                RuleOutcome::MatchWith(Payload {
                    locations,
                    message: None,
                })
            }
        },
        |schema, _| dedupe(schema, "enum"),
    )
}

pub fn single_type_array() -> TransformRule {
    TransformRule::new(
        "single_type_array",
        "A `type` array with a single entry can be a plain string",
        |context| {
            RuleOutcome::when(
                context.has_vocabulary(VALIDATION_VOCABULARIES)
                    && matches!(
                        context.keyword("type"),
                        Some(Value::Array(types)) if types.len() == 1 && types[0].is_string()
                    ),
            )
        },
        |schema, _| {
            let Some(object) = schema.as_object_mut() else {
                return;
            };
            let single = match object.get_mut("type") {
                Some(Value::Array(types)) if types.len() == 1 => types.pop(),
                _ => None,
            };
            if let Some(single) = single {
                object.insert("type".to_string(), single);
            }
        },
    )
}

pub fn const_with_enum() -> TransformRule {
    TransformRule::new(
        "const_with_enum",
        "An `enum` that includes the `const` value adds nothing",
        |context| {
            if !context.has_vocabulary(CONST_VOCABULARIES) {
                return RuleOutcome::NoMatch;
            }
            match (context.keyword("const"), context.keyword("enum")) {
                (Some(constant), Some(Value::Array(values))) => {
                    RuleOutcome::when(values.contains(constant))
                }
                _ => RuleOutcome::NoMatch,
            }
        },
        |schema, _| remove_keywords(schema, &["enum"]),
    )
}

pub fn min_contains_without_contains() -> TransformRule {
    TransformRule::new(
        "min_contains_without_contains",
        "`minContains` has no effect without `contains`",
        |context| {
            RuleOutcome::when(
                context.has_vocabulary(MODERN_VALIDATION)
                    && context.has_vocabulary(MODERN_APPLICATORS)
                    && context.defines("minContains")
                    && !context.defines("contains"),
            )
        },
        |schema, _| remove_keywords(schema, &["minContains"]),
    )
}

pub fn max_contains_without_contains() -> TransformRule {
    TransformRule::new(
        "max_contains_without_contains",
        "`maxContains` has no effect without `contains`",
        |context| {
            RuleOutcome::when(
                context.has_vocabulary(MODERN_VALIDATION)
                    && context.has_vocabulary(MODERN_APPLICATORS)
                    && context.defines("maxContains")
                    && !context.defines("contains"),
            )
        },
        |schema, _| remove_keywords(schema, &["maxContains"]),
    )
}

pub fn additional_properties_default() -> TransformRule {
    TransformRule::new(
        "additional_properties_default",
        "An empty or `true` `additionalProperties` is the default",
        |context| {
            if !context.has_vocabulary(ALLOF_VOCABULARIES)
                || !context.keyword("additionalProperties").is_some_and(is_trivial)
                || context.is_referenced_within("additionalProperties")
            {
                return RuleOutcome::NoMatch;
            }
            // Its annotations are observable through `unevaluatedProperties`
            let unevaluated = context.frame.subschemas().any(|location| {
                location
                    .pointer
                    .last()
                    .and_then(|token| token.as_property())
                    == Some("unevaluatedProperties")
            });
            RuleOutcome::when(!unevaluated && !context.defines("unevaluatedProperties"))
        },
        |schema, _| remove_keywords(schema, &["additionalProperties"]),
    )
}

pub fn draft_ref_siblings() -> TransformRule {
    TransformRule::new(
        "draft_ref_siblings",
        "Keywords next to `$ref` are ignored in this dialect",
        |context| {
            if !context.base_dialect.ref_overrides_siblings() || !context.defines("$ref") {
                return RuleOutcome::NoMatch;
            }
            let Some(object) = context.schema.as_object() else {
                return RuleOutcome::NoMatch;
            };
            let ignored: Vec<&String> = object
                .keys()
                .filter(|keyword| !REF_SIBLINGS.contains(&keyword.as_str()))
                .collect();
            if ignored.is_empty()
                || ignored
                    .iter()
                    .any(|keyword| context.is_referenced_within(keyword))
            {
                return RuleOutcome::NoMatch;
            }
            RuleOutcome::MatchWith(Payload {
                locations: ignored
                    .into_iter()
                    .map(|keyword| Pointer::root().join(keyword.as_str()))
                    .collect(),
                message: None,
            })
        },
        |schema, _| {
            if let Some(object) = schema.as_object_mut() {
                object.retain(|keyword, _| REF_SIBLINGS.contains(&keyword.as_str()));
            }
        },
    )
}
