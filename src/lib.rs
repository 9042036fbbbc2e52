//! Schema Frame
//!
//! Reference framing, bundling and rule-based rewriting of JSON Schema
//! documents across every official dialect, from draft 0 to 2020-12.
//!
//! The [`Frame`] of a document maps every identifier, anchor and pointer it
//! declares to a [`Location`], and records every reference it makes. The rest
//! of the crate builds on it: [`dependencies`] follows external references,
//! [`bundle`] embeds them, and a [`Transformer`] rewrites subschemas until no
//! rule matches.
//!
//! # Example
//!
//! ```
//! use schema_frame::{official_walker, rules, OfficialResolver};
//! use serde_json::json;
//!
//! let mut schema = json!({
//!     "$schema": "https://json-schema.org/draft/2020-12/schema",
//!     "if": { "type": "string" },
//!     "else": false
//! });
//!
//! let report = rules::canonical_rules()
//!     .apply(&mut schema, &official_walker, &OfficialResolver, None, None)
//!     .unwrap();
//!
//! assert_eq!(report.applied, 1);
//! assert_eq!(
//!     schema,
//!     json!({
//!         "$schema": "https://json-schema.org/draft/2020-12/schema",
//!         "type": "string"
//!     })
//! );
//! ```
//!
//! # Pieces supplied by the caller
//!
//! | Piece | Role |
//! |-------|------|
//! | [`Walker`] | Tells the engine where subschemas live under each keyword |
//! | [`Resolver`] | Produces documents (and metaschemas) by identifier |
//! | default dialect | Dialect assumed when a schema declares no `$schema` |
//! | default id | Identifier assumed for a root that declares none |

mod bundle;
mod dependencies;
mod dialect;
mod error;
mod frame;
mod lint;
mod loader;
mod pointer;
mod resolver;
pub mod rules;
mod transform;
mod uri;
mod validator;
pub mod vocabulary;
mod walker;

pub use bundle::{bundle, bundled, BundleOptions};
pub use dependencies::dependencies;
pub use dialect::{
    anonymize, base_dialect, dialect, identify, metaschema, reidentify, vocabularies,
    vocabularies_of, wrap, BaseDialect,
};
pub use error::{
    LoadError, MetaschemaError, Result, SchemaError, SchemaResolutionError, Violation,
};
pub use frame::{
    AnchorKind, Frame, Location, LocationKind, Mode, Reference, ReferenceKind, Scope,
};
pub use lint::{
    lint, lint_file, lint_value, Diagnostic, FileResult, FileStatus, LintOptions, LintResult,
    Severity,
};
pub use loader::{is_url, load_schema, load_schema_auto, load_schema_str};
pub use pointer::{Pointer, PointerParseError, Token};
pub use resolver::{FileResolver, MapResolver, OfficialResolver, Resolver};
pub use transform::{
    ApplyReport, Payload, RuleContext, RuleMatch, RuleOutcome, TransformRule, Transformer,
};
pub use validator::validate_against_metaschema;
pub use vocabulary::Vocabularies;
pub use walker::{is_definitions_container, null_walker, official_walker, Strategy, Walker};

#[cfg(feature = "remote")]
pub use loader::load_schema_url;
