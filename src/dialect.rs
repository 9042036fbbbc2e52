//! Dialect detection and identifier handling.
//!
//! Every official metaschema generation belongs to one [`BaseDialect`], which
//! decides the identifier keyword, anchor support and how `$ref` interacts
//! with its siblings. Custom metaschemas are classified by climbing their
//! `$schema` chain through a [`Resolver`] until an official one is reached.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Result, SchemaError, SchemaResolutionError};
use crate::resolver::Resolver;
use crate::uri;
use crate::vocabulary::{self, Vocabularies};

/// The keyword-semantics generation a dialect belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BaseDialect {
    Draft202012,
    Draft202012Hyper,
    Draft201909,
    Draft201909Hyper,
    Draft7,
    Draft7Hyper,
    Draft6,
    Draft6Hyper,
    Draft4,
    Draft4Hyper,
    Draft3,
    Draft3Hyper,
    Draft2Hyper,
    Draft1Hyper,
    Draft0Hyper,
}

const ALL: [BaseDialect; 15] = [
    BaseDialect::Draft202012,
    BaseDialect::Draft202012Hyper,
    BaseDialect::Draft201909,
    BaseDialect::Draft201909Hyper,
    BaseDialect::Draft7,
    BaseDialect::Draft7Hyper,
    BaseDialect::Draft6,
    BaseDialect::Draft6Hyper,
    BaseDialect::Draft4,
    BaseDialect::Draft4Hyper,
    BaseDialect::Draft3,
    BaseDialect::Draft3Hyper,
    BaseDialect::Draft2Hyper,
    BaseDialect::Draft1Hyper,
    BaseDialect::Draft0Hyper,
];

impl BaseDialect {
    /// The metaschema URI naming this base dialect.
    pub fn uri(self) -> &'static str {
        match self {
            BaseDialect::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
            BaseDialect::Draft202012Hyper => "https://json-schema.org/draft/2020-12/hyper-schema",
            BaseDialect::Draft201909 => "https://json-schema.org/draft/2019-09/schema",
            BaseDialect::Draft201909Hyper => "https://json-schema.org/draft/2019-09/hyper-schema",
            BaseDialect::Draft7 => vocabulary::DRAFT_7,
            BaseDialect::Draft7Hyper => vocabulary::DRAFT_7_HYPER,
            BaseDialect::Draft6 => vocabulary::DRAFT_6,
            BaseDialect::Draft6Hyper => vocabulary::DRAFT_6_HYPER,
            BaseDialect::Draft4 => vocabulary::DRAFT_4,
            BaseDialect::Draft4Hyper => vocabulary::DRAFT_4_HYPER,
            BaseDialect::Draft3 => vocabulary::DRAFT_3,
            BaseDialect::Draft3Hyper => vocabulary::DRAFT_3_HYPER,
            BaseDialect::Draft2Hyper => vocabulary::DRAFT_2_HYPER,
            BaseDialect::Draft1Hyper => vocabulary::DRAFT_1_HYPER,
            BaseDialect::Draft0Hyper => vocabulary::DRAFT_0_HYPER,
        }
    }

    /// Match a dialect URI, with or without the legacy empty fragment.
    pub fn from_uri(dialect: &str) -> Option<BaseDialect> {
        let canonical = uri::canonicalize(dialect);
        ALL.into_iter()
            .find(|base| uri::canonicalize(base.uri()) == canonical)
    }

    /// `$id` from draft 6 onwards, `id` before.
    pub fn identifier_keyword(self) -> &'static str {
        match self {
            BaseDialect::Draft202012
            | BaseDialect::Draft202012Hyper
            | BaseDialect::Draft201909
            | BaseDialect::Draft201909Hyper
            | BaseDialect::Draft7
            | BaseDialect::Draft7Hyper
            | BaseDialect::Draft6
            | BaseDialect::Draft6Hyper => "$id",
            _ => "id",
        }
    }

    /// In drafts 3 to 7 a `$ref` overrides every sibling keyword, identifiers
    /// included.
    pub fn ref_overrides_siblings(self) -> bool {
        matches!(
            self,
            BaseDialect::Draft7
                | BaseDialect::Draft7Hyper
                | BaseDialect::Draft6
                | BaseDialect::Draft6Hyper
                | BaseDialect::Draft4
                | BaseDialect::Draft4Hyper
                | BaseDialect::Draft3
                | BaseDialect::Draft3Hyper
        )
    }

    pub fn is_2020_12(self) -> bool {
        matches!(self, BaseDialect::Draft202012 | BaseDialect::Draft202012Hyper)
    }

    pub fn is_2019_09(self) -> bool {
        matches!(self, BaseDialect::Draft201909 | BaseDialect::Draft201909Hyper)
    }

    /// Whether `$ref` exists at all. It was introduced in draft 3.
    pub fn has_ref(self) -> bool {
        !matches!(
            self,
            BaseDialect::Draft2Hyper | BaseDialect::Draft1Hyper | BaseDialect::Draft0Hyper
        )
    }

    /// The core vocabulary for dialects that declare `$vocabulary`.
    pub fn core_vocabulary(self) -> Option<&'static str> {
        if self.is_2020_12() {
            Some(vocabulary::CORE_2020_12)
        } else if self.is_2019_09() {
            Some(vocabulary::CORE_2019_09)
        } else {
            None
        }
    }
}

/// The dialect declared by `$schema`, or the default.
pub fn dialect(schema: &Value, default_dialect: Option<&str>) -> Option<String> {
    match schema.get("$schema") {
        Some(Value::String(declared)) if schema.is_object() => Some(declared.clone()),
        _ => default_dialect.map(str::to_string),
    }
}

/// Determine the base dialect of a schema, consulting the resolver for custom
/// metaschemas.
pub fn base_dialect(
    schema: &Value,
    resolver: &dyn Resolver,
    default_dialect: Option<&str>,
) -> Result<Option<BaseDialect>> {
    let mut visited = HashSet::new();
    climb(schema, resolver, default_dialect, &mut visited)
}

fn climb(
    schema: &Value,
    resolver: &dyn Resolver,
    default_dialect: Option<&str>,
    visited: &mut HashSet<String>,
) -> Result<Option<BaseDialect>> {
    let Some(effective) = dialect(schema, default_dialect) else {
        return Ok(None);
    };

    // Draft 0 to 2 schema dialects are defined on top of their hyper-schemas,
    // so they go through the resolver like any custom metaschema.
    if let Some(base) = BaseDialect::from_uri(&effective) {
        return Ok(Some(base));
    }

    let canonical = uri::canonicalize(&effective);
    if let Some(Value::String(id)) = schema.get("$id") {
        if uri::canonicalize(id) == canonical {
            return Err(SchemaError::UnrecognizedDialect { dialect: effective });
        }
    }

    if !visited.insert(canonical) {
        return Err(SchemaError::UnrecognizedDialect { dialect: effective });
    }

    let metaschema = fetch_metaschema(resolver, &effective)?;
    climb(&metaschema, resolver, Some(&effective), visited)
}

fn fetch_metaschema(resolver: &dyn Resolver, dialect: &str) -> Result<Value> {
    match resolver.resolve(dialect) {
        Some(metaschema) => Ok(metaschema),
        None if !uri::is_absolute(dialect) => Err(SchemaError::RelativeMetaschema {
            dialect: dialect.to_string(),
        }),
        None => Err(SchemaResolutionError::new(
            dialect,
            "could not resolve the metaschema of the schema",
        )
        .into()),
    }
}

/// The metaschema document of a schema.
pub fn metaschema(
    schema: &Value,
    resolver: &dyn Resolver,
    default_dialect: Option<&str>,
) -> Result<Value> {
    let effective = dialect(schema, default_dialect).ok_or(SchemaError::UnknownDialect)?;
    fetch_metaschema(resolver, &effective)
}

/// The vocabulary set in force for a schema.
pub fn vocabularies_of(
    schema: &Value,
    resolver: &dyn Resolver,
    default_dialect: Option<&str>,
) -> Result<Vocabularies> {
    let base = base_dialect(schema, resolver, default_dialect)?
        .ok_or(SchemaError::UnknownBaseDialect)?;
    let effective = dialect(schema, default_dialect).ok_or(SchemaError::UnknownDialect)?;
    vocabularies(resolver, base, &effective)
}

/// The vocabulary set of `dialect`, whose base dialect is `base`.
pub fn vocabularies(
    resolver: &dyn Resolver,
    base: BaseDialect,
    dialect: &str,
) -> Result<Vocabularies> {
    if BaseDialect::from_uri(dialect) == Some(base) {
        match base {
            BaseDialect::Draft202012 => {
                return Ok([
                    (vocabulary::CORE_2020_12, true),
                    (vocabulary::APPLICATOR_2020_12, true),
                    (vocabulary::UNEVALUATED_2020_12, true),
                    (vocabulary::VALIDATION_2020_12, true),
                    (vocabulary::META_DATA_2020_12, true),
                    (vocabulary::FORMAT_ANNOTATION_2020_12, true),
                    (vocabulary::CONTENT_2020_12, true),
                ]
                .into_iter()
                .collect())
            }
            BaseDialect::Draft201909 => {
                return Ok([
                    (vocabulary::CORE_2019_09, true),
                    (vocabulary::APPLICATOR_2019_09, true),
                    (vocabulary::VALIDATION_2019_09, true),
                    (vocabulary::META_DATA_2019_09, true),
                    (vocabulary::FORMAT_2019_09, false),
                    (vocabulary::CONTENT_2019_09, true),
                ]
                .into_iter()
                .collect())
            }
            _ => {}
        }
    }

    // Pre-vocabulary dialects are their own single vocabulary.
    if let Some(legacy) = legacy_vocabulary(dialect) {
        return Ok([(legacy, true)].into_iter().collect());
    }
    let Some(core) = base.core_vocabulary() else {
        return Ok([(base.uri(), true)].into_iter().collect());
    };

    let metaschema = fetch_metaschema(resolver, dialect)?;
    let mut result = Vocabularies::new();
    match metaschema.get("$vocabulary") {
        Some(Value::Object(declared)) => {
            for (uri, required) in declared {
                result.insert(uri.clone(), required.as_bool().unwrap_or(false));
            }
        }
        _ => result.insert(core, true),
    }

    match result.get(core) {
        None => Err(SchemaError::CoreVocabularyMissing),
        Some(false) => Err(SchemaError::CoreVocabularyOptional),
        Some(true) => Ok(result),
    }
}

fn legacy_vocabulary(dialect: &str) -> Option<&'static str> {
    const LEGACY: [&str; 7] = [
        vocabulary::DRAFT_7,
        vocabulary::DRAFT_6,
        vocabulary::DRAFT_4,
        vocabulary::DRAFT_3,
        vocabulary::DRAFT_2,
        vocabulary::DRAFT_1,
        vocabulary::DRAFT_0,
    ];
    let canonical = uri::canonicalize(dialect);
    LEGACY
        .into_iter()
        .find(|legacy| uri::canonicalize(legacy) == canonical)
}

/// The identifier a schema declares, falling back to `default_id`.
pub fn identify(
    schema: &Value,
    resolver: &dyn Resolver,
    default_dialect: Option<&str>,
    default_id: Option<&str>,
) -> Result<Option<String>> {
    match base_dialect(schema, resolver, default_dialect) {
        Ok(Some(base)) => identify_with(schema, base, default_id),
        Ok(None) => Ok(default_id.map(str::to_string)),
        Err(SchemaError::Resolution(_)) if default_id.is_some() => {
            Ok(default_id.map(str::to_string))
        }
        Err(error) => Err(error),
    }
}

/// Like [`identify`] when the base dialect is already known.
pub fn identify_with(
    schema: &Value,
    base: BaseDialect,
    default_id: Option<&str>,
) -> Result<Option<String>> {
    let fallback = || default_id.map(str::to_string);
    let Some(object) = schema.as_object() else {
        return Ok(fallback());
    };
    let keyword = base.identifier_keyword();
    let Some(identifier) = object.get(keyword) else {
        return Ok(fallback());
    };
    let identifier = match identifier {
        Value::String(text) if !text.is_empty() => text,
        _ => {
            return Err(SchemaError::InvalidIdentifier {
                pointer: format!("/{}", keyword),
                message: "the schema identifier property is invalid".to_string(),
            })
        }
    };

    if object.contains_key("$ref") && base.ref_overrides_siblings() {
        return Ok(fallback());
    }
    Ok(Some(identifier.clone()))
}

/// Remove the identifier keyword of a schema.
pub fn anonymize(schema: &mut Value, base: BaseDialect) {
    if let Some(object) = schema.as_object_mut() {
        object.remove(base.identifier_keyword());
    }
}

/// Set the identifier of a schema, determining its base dialect first.
pub fn reidentify(
    schema: &mut Value,
    identifier: &str,
    resolver: &dyn Resolver,
    default_dialect: Option<&str>,
) -> Result<()> {
    let base = base_dialect(schema, resolver, default_dialect)?
        .ok_or(SchemaError::UnknownBaseDialect)?;
    reidentify_with(schema, identifier, base)
}

/// Set the identifier of a schema of a known base dialect.
pub fn reidentify_with(schema: &mut Value, identifier: &str, base: BaseDialect) -> Result<()> {
    let Some(object) = schema.as_object_mut() else {
        return Ok(());
    };
    object.insert(
        base.identifier_keyword().to_string(),
        Value::String(identifier.to_string()),
    );

    if object.contains_key("$ref") && identify_with(schema, base, None)?.is_none() {
        return Err(SchemaError::ReferenceObjectResource {
            identifier: identifier.to_string(),
        });
    }
    Ok(())
}

/// A 2020-12 schema that references `identifier`.
pub fn wrap(identifier: &str) -> Value {
    json!({
        "$schema": BaseDialect::Draft202012.uri(),
        "$ref": identifier,
    })
}
