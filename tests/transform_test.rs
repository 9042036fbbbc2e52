//! Integration tests for the transformation engine and built-in rules.

use serde_json::{json, Value};
use schema_frame::{
    official_walker, rules, OfficialResolver, Payload, Pointer, RuleMatch, RuleOutcome,
    SchemaError, TransformRule, Transformer,
};

const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";
const DRAFT_7: &str = "http://json-schema.org/draft-07/schema#";

fn check(transformer: &Transformer, document: &Value) -> (bool, Vec<RuleMatch>) {
    let mut matches = Vec::new();
    let clean = transformer
        .check(
            document,
            &official_walker,
            &OfficialResolver,
            &mut |found| matches.push(found.clone()),
            None,
            None,
        )
        .unwrap();
    (clean, matches)
}

fn apply(transformer: &Transformer, document: &mut Value) -> usize {
    transformer
        .apply(document, &official_walker, &OfficialResolver, None, None)
        .unwrap()
        .applied
}

fn messy() -> Value {
    json!({
        "$schema": DRAFT_2020_12,
        "$id": "https://example.com/messy",
        "type": ["object"],
        "properties": {
            "kind": {"enum": ["a", "b", "a"], "const": "a"},
            "tags": {"type": "array", "minContains": 1},
            "value": {"if": {"type": "number"}, "else": false},
            "extra": {"allOf": [{}, {"minimum": 0}, {"minimum": 0}]}
        },
        "additionalProperties": true
    })
}

// === Fixed point ===

mod fixed_point {
    use super::*;

    #[test]
    fn canonicalizes_messy_schema() {
        let mut document = messy();
        let report = rules::canonical_rules()
            .apply(&mut document, &official_walker, &OfficialResolver, None, None)
            .unwrap();
        assert!(report.applied > 0);
        assert_eq!(
            document,
            json!({
                "$schema": DRAFT_2020_12,
                "$id": "https://example.com/messy",
                "type": "object",
                "properties": {
                    "kind": {"const": "a"},
                    "tags": {"type": "array"},
                    "value": {"type": "number"},
                    "extra": {"allOf": [{"minimum": 0}]}
                }
            })
        );
    }

    #[test]
    fn apply_is_idempotent() {
        let transformer = rules::canonical_rules();
        let mut once = messy();
        assert!(apply(&transformer, &mut once) > 0);

        let mut twice = once.clone();
        assert_eq!(apply(&transformer, &mut twice), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn check_is_clean_iff_nothing_applies() {
        let transformer = rules::canonical_rules();
        let documents = vec![
            messy(),
            json!({"$schema": DRAFT_2020_12, "id": "https://example.com/x", "type": "string"}),
            json!({"$schema": DRAFT_7, "$ref": "#/definitions/a", "title": "x", "definitions": {"a": {}}}),
            json!({"$schema": DRAFT_2020_12, "type": "string"}),
        ];

        for document in documents {
            let (clean, matches) = check(&transformer, &document);
            assert_eq!(clean, matches.is_empty());

            let mut rewritten = document.clone();
            let applied = apply(&transformer, &mut rewritten);
            assert_eq!(clean, applied == 0, "document: {}", document);
            assert_eq!(clean, rewritten == document);

            let (clean, matches) = check(&transformer, &rewritten);
            assert!(clean);
            assert!(matches.is_empty());
        }
    }

    #[test]
    fn check_does_not_modify() {
        let document = messy();
        let copy = document.clone();
        check(&rules::canonical_rules(), &document);
        assert_eq!(document, copy);
    }

    #[test]
    fn matches_report_pointer_and_dialect() {
        let document = json!({
            "$schema": DRAFT_7,
            "properties": {"a": {"$ref": "#/definitions/b", "type": "string"}},
            "definitions": {"b": {"type": "string"}}
        });
        let (_, matches) = check(&rules::canonical_rules(), &document);
        let found = matches
            .iter()
            .find(|found| found.rule == "draft_ref_siblings")
            .unwrap();
        assert_eq!(found.pointer, Pointer::parse("/properties/a").unwrap());
        assert_eq!(found.dialect, DRAFT_7);
    }
}

// === Custom rules ===

mod custom_rules {
    use super::*;

    fn rename_title() -> TransformRule {
        TransformRule::new(
            "rename_title",
            "Use `title` instead of `name`",
            |context| {
                if context.defines("name") && !context.defines("title") {
                    RuleOutcome::MatchWith(Payload {
                        locations: vec![Pointer::root().join("name")],
                        message: None,
                    })
                } else {
                    RuleOutcome::NoMatch
                }
            },
            |schema, outcome| {
                let Some(payload) = outcome.payload() else {
                    return;
                };
                assert_eq!(payload.locations.len(), 1);
                if let Some(object) = schema.as_object_mut() {
                    if let Some(value) = object.shift_remove("name") {
                        object.insert("title".to_string(), value);
                    }
                }
            },
        )
    }

    fn set_marker(name: &'static str, from: &'static str, to: &'static str) -> TransformRule {
        TransformRule::new(
            name,
            "swaps a marker",
            move |context| RuleOutcome::when(context.pointer.is_root() && context.defines(from)),
            move |schema, _| {
                if let Some(object) = schema.as_object_mut() {
                    object.shift_remove(from);
                    object.insert(to.to_string(), json!(true));
                }
            },
        )
    }

    #[test]
    fn payload_reaches_transform() {
        let mut transformer = Transformer::new();
        transformer.add(rename_title());
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "name": "root",
            "items": {"name": "item"}
        });
        assert_eq!(apply(&transformer, &mut document), 2);
        assert_eq!(document["title"], "root");
        assert_eq!(document["items"]["title"], "item");
    }

    #[test]
    fn payload_locations_are_reported() {
        let mut transformer = Transformer::new();
        transformer.add(rename_title());
        let document = json!({"$schema": DRAFT_2020_12, "items": {"name": "item"}});
        let (clean, matches) = check(&transformer, &document);
        assert!(!clean);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pointer, Pointer::parse("/items").unwrap());
        assert_eq!(matches[0].message, "Use `title` instead of `name`");
        assert_eq!(matches[0].locations, vec![Pointer::parse("/name").unwrap()]);
    }

    #[test]
    fn non_converging_rule() {
        let mut transformer = Transformer::new();
        transformer.add(TransformRule::new(
            "grow",
            "always matches",
            |context| RuleOutcome::when(context.pointer.is_root()),
            |schema, _| {
                if let Some(object) = schema.as_object_mut() {
                    object.insert("title".to_string(), json!("again"));
                }
            },
        ));
        let mut document = json!({"$schema": DRAFT_2020_12});
        let result = transformer.apply(&mut document, &official_walker, &OfficialResolver, None, None);
        match result {
            Err(SchemaError::RuleNonConvergence { rule, pointer }) => {
                assert_eq!(rule, "grow");
                assert_eq!(pointer, "");
            }
            other => panic!("expected non-convergence, got {:?}", other),
        }
    }

    #[test]
    fn rule_applied_twice_at_same_pointer() {
        let mut transformer = Transformer::new();
        transformer.add(set_marker("flip", "x", "y"));
        transformer.add(set_marker("flop", "y", "x"));
        let mut document = json!({"$schema": DRAFT_2020_12, "x": true});
        let result = transformer.apply(&mut document, &official_walker, &OfficialResolver, None, None);
        assert!(matches!(result, Err(SchemaError::RuleReapplied { .. })));
    }

    #[test]
    fn rules_can_be_removed() {
        let mut transformer = rules::canonical_rules();
        assert!(transformer.remove("else_false"));

        let mut document = json!({"$schema": DRAFT_2020_12, "if": {"type": "string"}, "else": false});
        let original = document.clone();
        assert_eq!(apply(&transformer, &mut document), 0);
        assert_eq!(document, original);
    }
}
