//! Integration tests for dependency discovery and bundling.

use serde_json::{json, Value};
use schema_frame::{
    bundle, bundled, dependencies, official_walker, BundleOptions, FileResolver, MapResolver,
    OfficialResolver, Pointer, Resolver, SchemaError,
};
use tempfile::TempDir;

const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";
const DRAFT_7: &str = "http://json-schema.org/draft-07/schema#";

type Call = (Option<String>, String, String);

fn collect(document: &Value, resolver: &dyn Resolver) -> schema_frame::Result<Vec<Call>> {
    let mut calls = Vec::new();
    dependencies(
        document,
        &official_walker,
        resolver,
        &mut |origin, pointer, destination| {
            calls.push((
                origin.map(str::to_string),
                pointer.to_string(),
                destination.to_string(),
            ))
        },
        None,
        None,
        &[],
    )?;
    Ok(calls)
}

fn registry() -> MapResolver<OfficialResolver> {
    MapResolver::new(OfficialResolver)
        .with(
            "https://example.com/b",
            json!({"$schema": DRAFT_2020_12, "$id": "https://example.com/b", "$ref": "c"}),
        )
        .with(
            "https://example.com/c",
            json!({"$schema": DRAFT_2020_12, "$id": "https://example.com/c", "type": "string"}),
        )
}

// === Dependencies ===

mod dependency_discovery {
    use super::*;

    #[test]
    fn single_external_reference() {
        let document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/a",
            "$ref": "https://example.com/c"
        });
        let calls = collect(&document, &registry()).unwrap();
        assert_eq!(
            calls,
            vec![(
                Some("https://example.com/a".to_string()),
                "/$ref".to_string(),
                "https://example.com/c".to_string()
            )]
        );
    }

    #[test]
    fn transitive_references_are_followed() {
        let document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/a",
            "properties": {"x": {"$ref": "b"}}
        });
        let calls = collect(&document, &registry()).unwrap();
        let destinations: Vec<_> = calls.iter().map(|(_, _, d)| d.as_str()).collect();
        assert_eq!(
            destinations,
            vec!["https://example.com/b", "https://example.com/c"]
        );
        assert_eq!(calls[1].0.as_deref(), Some("https://example.com/b"));
        assert_eq!(calls[1].1, "/$ref");
    }

    #[test]
    fn unresolvable_dependency() {
        let document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/a",
            "$ref": "https://example.com/missing"
        });
        match collect(&document, &OfficialResolver) {
            Err(SchemaError::Resolution(error)) => {
                assert_eq!(error.identifier, "https://example.com/missing");
            }
            other => panic!("expected a resolution error, got {:?}", other),
        }
    }

    #[test]
    fn destination_that_is_not_a_schema() {
        let resolver =
            MapResolver::new(OfficialResolver).with("https://example.com/array", json!([1, 2, 3]));
        let document = json!({
            "$schema": DRAFT_2020_12,
            "properties": {"foo": {"$ref": "https://example.com/array"}}
        });
        match collect(&document, &resolver) {
            Err(SchemaError::UnresolvedReference {
                destination,
                pointer,
                ..
            }) => {
                assert_eq!(destination, "https://example.com/array");
                assert_eq!(pointer, "/properties/foo/$ref");
            }
            other => panic!("expected an unresolved reference, got {:?}", other),
        }
    }

    #[test]
    fn destination_without_dialect() {
        let resolver = MapResolver::new(OfficialResolver)
            .with("https://example.com/no-dialect", json!({"type": "string"}));
        let document = json!({
            "$schema": DRAFT_2020_12,
            "properties": {"foo": {"$ref": "https://example.com/no-dialect"}}
        });
        assert!(matches!(
            collect(&document, &resolver),
            Err(SchemaError::UnresolvedReference { .. })
        ));

        let mut calls = 0;
        dependencies(
            &document,
            &official_walker,
            &resolver,
            &mut |_, _, _| calls += 1,
            Some(DRAFT_2020_12),
            None,
            &[],
        )
        .unwrap();
        assert_eq!(calls, 1);
    }

    #[test]
    fn dangling_fragments_under_a_known_resource() {
        for target in ["#/$defs/missing", "#nope"] {
            let document = json!({
                "$schema": DRAFT_2020_12,
                "$id": "https://example.com",
                "properties": {"foo": {"$ref": target}}
            });
            match collect(&document, &OfficialResolver) {
                Err(SchemaError::UnresolvedReference { pointer, .. }) => {
                    assert_eq!(pointer, "/properties/foo/$ref");
                }
                other => panic!("expected an unresolved reference, got {:?}", other),
            }
        }
    }

    #[test]
    fn dangling_pointer_in_anonymous_document() {
        let document = json!({"$schema": DRAFT_2020_12, "items": {"$ref": "#/$defs/missing"}});
        assert!(matches!(
            collect(&document, &OfficialResolver),
            Err(SchemaError::UnresolvedReference { .. })
        ));

        let resolved = json!({
            "$schema": DRAFT_2020_12,
            "items": {"$ref": "#/$defs/present"},
            "$defs": {"present": {"type": "string"}}
        });
        assert!(collect(&resolved, &OfficialResolver).unwrap().is_empty());
    }

    #[test]
    fn pointers_are_relative_to_the_document_root() {
        let document = json!({
            "components": {
                "schemas": {
                    "a": {
                        "$schema": DRAFT_2020_12,
                        "$id": "https://example.com/a",
                        "properties": {"x": {"$ref": "c"}}
                    }
                }
            }
        });
        let mut calls = Vec::new();
        dependencies(
            &document,
            &official_walker,
            &registry(),
            &mut |origin, pointer, destination| {
                calls.push((
                    origin.map(str::to_string),
                    pointer.to_string(),
                    destination.to_string(),
                ))
            },
            None,
            None,
            &[Pointer::parse("/components/schemas/a").unwrap()],
        )
        .unwrap();
        assert_eq!(
            calls,
            vec![(
                Some("https://example.com/a".to_string()),
                "/components/schemas/a/properties/x/$ref".to_string(),
                "https://example.com/c".to_string()
            )]
        );
    }

    #[test]
    fn metaschemas_are_not_dependencies() {
        let document = json!({"$schema": DRAFT_7, "type": "string"});
        assert!(collect(&document, &OfficialResolver).unwrap().is_empty());
    }
}

// === Bundling ===

mod bundling {
    use super::*;

    #[test]
    fn embeds_transitive_externals() {
        let document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/a",
            "$ref": "b"
        });
        let result = bundled(
            &document,
            &official_walker,
            &registry(),
            &BundleOptions::new(),
        )
        .unwrap();

        let defs = result["$defs"].as_object().unwrap();
        assert_eq!(
            defs.keys().collect::<Vec<_>>(),
            vec!["https://example.com/b", "https://example.com/c"]
        );
        assert_eq!(result["$ref"], "b");
        assert_eq!(defs["https://example.com/c"]["type"], "string");
    }

    #[test]
    fn bundled_document_has_no_dependencies() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/a",
            "items": {"$ref": "b"}
        });
        bundle(
            &mut document,
            &official_walker,
            &registry(),
            &BundleOptions::new(),
        )
        .unwrap();

        // Any remaining external reference would fail to resolve here.
        assert!(collect(&document, &OfficialResolver).unwrap().is_empty());
    }

    #[test]
    fn bundling_twice_is_stable() {
        let document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/a",
            "$ref": "b"
        });
        let once = bundled(&document, &official_walker, &registry(), &BundleOptions::new()).unwrap();
        let twice = bundled(&once, &official_walker, &registry(), &BundleOptions::new()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn invalid_destinations_are_not_embedded() {
        let resolver =
            MapResolver::new(OfficialResolver).with("https://example.com/array", json!([1, 2, 3]));
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "properties": {"foo": {"$ref": "https://example.com/array"}}
        });
        let original = document.clone();
        let result = bundle(&mut document, &official_walker, &resolver, &BundleOptions::new());
        assert!(matches!(result, Err(SchemaError::UnresolvedReference { .. })));
        assert_eq!(document, original);
    }

    #[test]
    fn dangling_anchor_is_an_error() {
        let document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com",
            "properties": {"bar": {"$ref": "#nope"}}
        });
        let result = bundled(&document, &official_walker, &OfficialResolver, &BundleOptions::new());
        assert!(matches!(result, Err(SchemaError::UnresolvedReference { .. })));
    }

    #[test]
    fn bundle_selected_path() {
        let mut document = json!({
            "components": {
                "schemas": {
                    "a": {"$schema": DRAFT_2020_12, "$id": "https://example.com/a", "$ref": "c"}
                }
            }
        });
        let options = BundleOptions::new().path(Pointer::parse("/components/schemas/a").unwrap());
        bundle(&mut document, &official_walker, &registry(), &options).unwrap();
        assert_eq!(
            document["components"]["schemas"]["a"]["$defs"]["https://example.com/c"]["$id"],
            "https://example.com/c"
        );
    }

    #[test]
    fn default_dialect_and_id() {
        let mut document = json!({"properties": {"x": {"$ref": "c"}}});
        let options = BundleOptions::new()
            .default_dialect(DRAFT_2020_12)
            .default_id("https://example.com/root");
        bundle(&mut document, &official_walker, &registry(), &options).unwrap();
        assert!(document["$defs"]["https://example.com/c"].is_object());
        assert!(document.get("$id").is_none());
    }
}

// === File and HTTP resolution ===

mod file_resolver {
    use super::*;

    #[test]
    fn remote_base_maps_onto_local_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("types")).unwrap();
        std::fs::write(
            dir.path().join("types/name.json"),
            r#"{
                "$schema": "http://json-schema.org/draft-07/schema#",
                "$id": "https://example.com/schemas/types/name.json",
                "type": "string"
            }"#,
        )
        .unwrap();

        let resolver =
            FileResolver::new(dir.path()).with_remote_base("https://example.com/schemas/");
        let mut document = json!({
            "$schema": DRAFT_7,
            "$id": "https://example.com/schemas/person.json",
            "properties": {"name": {"$ref": "types/name.json"}}
        });
        bundle(&mut document, &official_walker, &resolver, &BundleOptions::new()).unwrap();

        let embedded = &document["definitions"]["https://example.com/schemas/types/name.json"];
        assert_eq!(embedded["type"], "string");
    }

    #[test]
    fn relative_references_without_identifier() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.json"), r#"{"type": "integer"}"#).unwrap();

        let resolver = FileResolver::new(dir.path());
        assert_eq!(resolver.path_for("b.json"), Some(dir.path().join("b.json")));
        assert_eq!(resolver.resolve("b.json"), Some(json!({"type": "integer"})));
        assert!(resolver.resolve(DRAFT_2020_12).is_some());
        assert!(resolver.resolve("missing.json").is_none());
    }

    #[cfg(feature = "remote")]
    #[test]
    fn fetches_over_http_when_allowed() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/b.json")
            .with_status(200)
            .with_body(r#"{"$schema": "https://json-schema.org/draft/2020-12/schema", "type": "string"}"#)
            .create();

        let dir = TempDir::new().unwrap();
        let destination = format!("{}/b.json", server.url());
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": format!("{}/a.json", server.url()),
            "$ref": "b.json"
        });

        let offline = FileResolver::new(dir.path());
        let result = bundled(&document, &official_walker, &offline, &BundleOptions::new());
        assert!(matches!(result, Err(SchemaError::Resolution(_))));

        let online = FileResolver::new(dir.path()).allow_remote(true);
        bundle(&mut document, &official_walker, &online, &BundleOptions::new()).unwrap();
        mock.assert();

        let embedded = &document["$defs"][destination.as_str()];
        assert_eq!(embedded["$id"], destination.as_str());
        assert_eq!(embedded["type"], "string");
    }
}
