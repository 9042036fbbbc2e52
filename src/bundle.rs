//! Embedding external dependencies into a schema document.

use serde_json::{Map, Value};
use tracing::debug;

use crate::dependencies;
use crate::dialect;
use crate::error::{Result, SchemaError};
use crate::pointer::{Pointer, Token};
use crate::resolver::Resolver;
use crate::uri;
use crate::vocabulary::{self as v, Vocabularies};
use crate::walker::Walker;

/// Suffix appended to a container key until it no longer collides.
const COLLISION_SUFFIX: &str = "/x";

/// Options for [`bundle`].
///
/// # Example
///
/// ```
/// use schema_frame::{BundleOptions, Pointer};
///
/// let options = BundleOptions::new()
///     .default_dialect("https://json-schema.org/draft/2020-12/schema")
///     .container(Pointer::parse("/components/schemas").unwrap());
/// assert!(options.paths.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    pub default_dialect: Option<String>,
    pub default_id: Option<String>,
    /// Where externals are embedded, relative to the bundled root. Chosen
    /// from the root's vocabularies when unset.
    pub container: Option<Pointer>,
    /// Restrict bundling to these subschemas of a larger document.
    pub paths: Vec<Pointer>,
}

impl BundleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.default_dialect = Some(dialect.into());
        self
    }

    pub fn default_id(mut self, identifier: impl Into<String>) -> Self {
        self.default_id = Some(identifier.into());
        self
    }

    pub fn container(mut self, container: Pointer) -> Self {
        self.container = Some(container);
        self
    }

    pub fn path(mut self, path: Pointer) -> Self {
        self.paths.push(path);
        self
    }
}

struct External {
    identifier: String,
    dialect: String,
    document: Value,
}

/// Embed every transitive external dependency of `document` into it.
///
/// Object externals are re-identified with their absolute identifier so they
/// stay self-describing once embedded. Existing container entries are never
/// overwritten. When there is nothing to embed the document is left
/// untouched.
///
/// # Errors
///
/// Fails with a resolution error when a dependency cannot be fetched, with
/// [`SchemaError::UnresolvedReference`] when a reference lands nowhere or on
/// a document that is not a schema, with
/// [`SchemaError::UnsupportedBundleDialect`] when no container can be chosen,
/// and with [`SchemaError::ContainerNotObject`] when the container path runs
/// through a non-object value.
pub fn bundle(
    document: &mut Value,
    walker: &dyn Walker,
    resolver: &dyn Resolver,
    options: &BundleOptions,
) -> Result<()> {
    let mut externals: Vec<External> = Vec::new();
    dependencies::collect(
        document,
        walker,
        resolver,
        options.default_dialect.as_deref(),
        options.default_id.as_deref(),
        &options.paths,
        &mut |dependency| {
            if let Some(fetched) = &dependency.fetched {
                externals.push(External {
                    identifier: dependency.destination.clone(),
                    dialect: fetched.dialect.clone(),
                    document: fetched.document.clone(),
                });
            }
        },
    )?;

    if externals.is_empty() {
        debug!("no external dependencies to bundle");
        return Ok(());
    }

    let root = options.paths.first().cloned().unwrap_or_default();
    let root_schema = root
        .get(document)
        .ok_or_else(|| SchemaError::MissingLocation {
            pointer: root.to_string(),
        })?;
    let root_dialect = dialect::dialect(root_schema, options.default_dialect.as_deref());
    let container = match &options.container {
        Some(container) => root.concat(container),
        None => {
            let vocabularies = dialect::vocabularies_of(
                root_schema,
                resolver,
                options.default_dialect.as_deref(),
            )?;
            root.join(container_keyword(&vocabularies)?)
        }
    };

    for mut external in externals {
        if external.document.is_object() {
            let inherited = root_dialect
                .as_deref()
                .is_some_and(|root| uri::canonicalize(root) == uri::canonicalize(&external.dialect));
            if external.document.get("$schema").is_none() && !inherited {
                if let Some(object) = external.document.as_object_mut() {
                    object.insert(
                        "$schema".to_string(),
                        Value::String(external.dialect.clone()),
                    );
                }
            }
            dialect::reidentify(
                &mut external.document,
                &external.identifier,
                resolver,
                Some(&external.dialect),
            )?;
        }
        embed(document, &container, &external.identifier, external.document)?;
    }
    Ok(())
}

/// Like [`bundle`], on a copy of `document`.
pub fn bundled(
    document: &Value,
    walker: &dyn Walker,
    resolver: &dyn Resolver,
    options: &BundleOptions,
) -> Result<Value> {
    let mut copy = document.clone();
    bundle(&mut copy, walker, resolver, options)?;
    Ok(copy)
}

fn container_keyword(vocabularies: &Vocabularies) -> Result<&'static str> {
    if vocabularies.contains_any(&[v::CORE_2020_12, v::CORE_2019_09]) {
        return Ok("$defs");
    }
    if vocabularies.contains_any(&[
        v::DRAFT_7,
        v::DRAFT_7_HYPER,
        v::DRAFT_6,
        v::DRAFT_6_HYPER,
        v::DRAFT_4,
        v::DRAFT_4_HYPER,
    ]) {
        return Ok("definitions");
    }
    Err(SchemaError::UnsupportedBundleDialect)
}

fn embed(document: &mut Value, container: &Pointer, key: &str, schema: Value) -> Result<()> {
    let mut current = document;
    let mut walked = Pointer::root();
    for token in container.tokens() {
        walked.push(token.clone());
        let name = match token {
            Token::Property(name) => name.clone(),
            Token::Index(index) => index.to_string(),
        };
        let Value::Object(object) = current else {
            return Err(SchemaError::ContainerNotObject {
                pointer: walked.to_string(),
            });
        };
        current = object
            .entry(name)
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let Value::Object(object) = current else {
        return Err(SchemaError::ContainerNotObject {
            pointer: container.to_string(),
        });
    };
    let mut key = key.to_string();
    while object.contains_key(&key) {
        key.push_str(COLLISION_SUFFIX);
    }
    debug!(container = %container, key = %key, "embedding external schema");
    object.insert(key, schema);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{MapResolver, OfficialResolver};
    use crate::walker::official_walker;
    use serde_json::json;

    const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";
    const DRAFT_7: &str = "http://json-schema.org/draft-07/schema#";

    fn resolver() -> MapResolver<OfficialResolver> {
        MapResolver::new(OfficialResolver).with(
            "https://example.com/b",
            json!({"$id": "https://example.com/b", "type": "string"}),
        )
    }

    #[test]
    fn embeds_under_defs() {
        let mut document = json!({"$id": "https://example.com/a", "$ref": "https://example.com/b"});
        let options = BundleOptions::new().default_dialect(DRAFT_2020_12);
        bundle(&mut document, &official_walker, &resolver(), &options).unwrap();
        assert_eq!(
            document,
            json!({
                "$id": "https://example.com/a",
                "$ref": "https://example.com/b",
                "$defs": {
                    "https://example.com/b": {"$id": "https://example.com/b", "type": "string"}
                }
            })
        );
    }

    #[test]
    fn no_externals_is_a_no_op() {
        let document = json!({"$schema": DRAFT_2020_12, "type": "string"});
        let result = bundled(
            &document,
            &official_walker,
            &OfficialResolver,
            &BundleOptions::new(),
        )
        .unwrap();
        assert_eq!(result, document);
    }

    #[test]
    fn draft7_uses_definitions() {
        let mut document = json!({
            "$schema": DRAFT_7,
            "$id": "https://example.com/a",
            "items": {"$ref": "b"}
        });
        let options = BundleOptions::new().default_dialect(DRAFT_7);
        bundle(&mut document, &official_walker, &resolver(), &options).unwrap();
        assert_eq!(
            document["definitions"]["https://example.com/b"]["$id"],
            "https://example.com/b"
        );
    }

    #[test]
    fn unsupported_dialect_without_override() {
        let mut document = json!({
            "$schema": "http://json-schema.org/draft-03/schema#",
            "id": "https://example.com/a",
            "items": {"$ref": "https://example.com/b"}
        });
        let resolver = MapResolver::new(OfficialResolver).with(
            "https://example.com/b",
            json!({"$schema": DRAFT_2020_12, "$id": "https://example.com/b"}),
        );
        let result = bundle(&mut document, &official_walker, &resolver, &BundleOptions::new());
        assert!(matches!(result, Err(SchemaError::UnsupportedBundleDialect)));
    }

    #[test]
    fn explicit_container_and_collisions() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/a",
            "$ref": "https://example.com/b",
            "components": {"schemas": {"https://example.com/b": {"type": "null"}}}
        });
        let options = BundleOptions::new()
            .default_dialect(DRAFT_2020_12)
            .container(Pointer::parse("/components/schemas").unwrap());
        bundle(&mut document, &official_walker, &resolver(), &options).unwrap();
        let schemas = &document["components"]["schemas"];
        assert_eq!(schemas["https://example.com/b"], json!({"type": "null"}));
        assert_eq!(schemas["https://example.com/b/x"]["$id"], "https://example.com/b");
    }

    #[test]
    fn container_through_non_object() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$ref": "https://example.com/b",
            "components": []
        });
        let options = BundleOptions::new()
            .default_dialect(DRAFT_2020_12)
            .container(Pointer::parse("/components/x").unwrap());
        let result = bundle(&mut document, &official_walker, &resolver(), &options);
        assert!(matches!(result, Err(SchemaError::ContainerNotObject { .. })));
    }

    #[test]
    fn external_in_other_dialect_keeps_its_dialect() {
        let resolver = MapResolver::new(OfficialResolver).with(
            "https://example.com/legacy",
            json!({"$schema": "http://json-schema.org/draft-07/schema#", "type": "integer"}),
        );
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$ref": "https://example.com/legacy"
        });
        bundle(&mut document, &official_walker, &resolver, &BundleOptions::new()).unwrap();
        let embedded = &document["$defs"]["https://example.com/legacy"];
        assert_eq!(embedded["$id"], "https://example.com/legacy");
        assert_eq!(embedded["$schema"], "http://json-schema.org/draft-07/schema#");
    }
}
