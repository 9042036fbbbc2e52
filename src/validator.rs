//! Schema validation against its own metaschema.

use std::collections::{HashMap, VecDeque};

use jsonschema::{Draft, Retrieve, Uri};
use serde_json::Value;

use crate::dialect::{self, BaseDialect};
use crate::error::{MetaschemaError, SchemaError, Violation};
use crate::resolver::Resolver;
use crate::uri;

const REFERENCE_KEYWORDS: &[&str] = &["$ref", "$schema", "$dynamicRef", "$recursiveRef"];

/// Serves documents collected up front from a [`Resolver`], since the
/// validator requires an owned, thread-safe retriever.
struct CollectedRetriever {
    documents: HashMap<String, Value>,
}

impl Retrieve for CollectedRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let canonical = uri::canonicalize(uri::without_fragment(uri.as_str()));
        self.documents
            .get(&canonical)
            .cloned()
            .ok_or_else(|| format!("schema not found: {}", canonical).into())
    }
}

/// Validate a schema document against the metaschema of its dialect.
///
/// # Errors
///
/// Returns `MetaschemaError::Schema` if the dialect cannot be determined,
/// `MetaschemaError::Unsupported` for dialects the validator cannot compile
/// (draft 3 and earlier), or `MetaschemaError::Invalid` with every violation.
pub fn validate_against_metaschema(
    schema: &Value,
    resolver: &dyn Resolver,
    default_dialect: Option<&str>,
) -> Result<(), MetaschemaError> {
    let dialect = dialect::dialect(schema, default_dialect).ok_or(SchemaError::UnknownDialect)?;
    let base = dialect::base_dialect(schema, resolver, default_dialect)?
        .ok_or(SchemaError::UnknownBaseDialect)?;
    let draft = draft_for(base).ok_or_else(|| MetaschemaError::Unsupported {
        dialect: dialect.clone(),
        message: "no validator is available for this dialect".to_string(),
    })?;
    let metaschema = dialect::metaschema(schema, resolver, default_dialect)?;

    let mut opts = jsonschema::options();
    opts.with_draft(draft);
    opts.with_retriever(CollectedRetriever {
        documents: collect(&dialect, &metaschema, resolver),
    });
    let validator = opts
        .build(&metaschema)
        .map_err(|e| MetaschemaError::Unsupported {
            dialect: dialect.clone(),
            message: e.to_string(),
        })?;

    let errors: Vec<Violation> = validator
        .iter_errors(schema)
        .map(|e| Violation {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(MetaschemaError::Invalid { errors })
    }
}

fn draft_for(base: BaseDialect) -> Option<Draft> {
    match base {
        BaseDialect::Draft202012 | BaseDialect::Draft202012Hyper => Some(Draft::Draft202012),
        BaseDialect::Draft201909 | BaseDialect::Draft201909Hyper => Some(Draft::Draft201909),
        BaseDialect::Draft7 | BaseDialect::Draft7Hyper => Some(Draft::Draft7),
        BaseDialect::Draft6 | BaseDialect::Draft6Hyper => Some(Draft::Draft6),
        BaseDialect::Draft4 | BaseDialect::Draft4Hyper => Some(Draft::Draft4),
        _ => None,
    }
}

/// The metaschema and every document it references, transitively.
fn collect(dialect: &str, metaschema: &Value, resolver: &dyn Resolver) -> HashMap<String, Value> {
    let mut documents = HashMap::new();
    let mut queue = VecDeque::from([(uri::canonicalize(dialect), metaschema.clone())]);

    while let Some((identifier, document)) = queue.pop_front() {
        if documents.contains_key(&identifier) {
            continue;
        }
        let mut references = Vec::new();
        referenced(&document, &mut references);
        for reference in references {
            let target = uri::canonicalize(uri::without_fragment(&uri::resolve(&identifier, &reference)));
            if target.is_empty() || target == identifier || documents.contains_key(&target) {
                continue;
            }
            if let Some(found) = resolver.resolve(&target) {
                queue.push_back((target, found));
            }
        }
        documents.insert(identifier, document);
    }
    documents
}

fn referenced(value: &Value, references: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match child {
                    Value::String(text) if REFERENCE_KEYWORDS.contains(&key.as_str()) => {
                        references.push(text.clone())
                    }
                    _ => referenced(child, references),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                referenced(item, references);
            }
        }
        _ => {}
    }
}
