//! Error types for schema framing, bundling and transformation.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results produced by the analysis engine.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised while analysing or rewriting a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("identifier {identifier} is declared more than once")]
    DuplicateIdentifier { identifier: String },

    #[error("anchor {anchor} is declared more than once in the same resource")]
    DuplicateAnchor { anchor: String },

    #[error("invalid identifier at {pointer}: {message}")]
    InvalidIdentifier { pointer: String, message: String },

    #[error("invalid reference at {pointer}: {message}")]
    InvalidReference { pointer: String, message: String },

    #[error("could not resolve {destination} referenced at {pointer}: {message}")]
    UnresolvedReference {
        destination: String,
        pointer: String,
        message: String,
    },

    #[error("could not determine the dialect of the schema")]
    UnknownDialect,

    #[error("could not determine the base dialect of the schema")]
    UnknownBaseDialect,

    #[error("unrecognized base dialect: {dialect}")]
    UnrecognizedDialect { dialect: String },

    #[error("relative metaschema reference {dialect} cannot be resolved")]
    RelativeMetaschema { dialect: String },

    #[error("the core vocabulary must always be present")]
    CoreVocabularyMissing,

    #[error("the core vocabulary must always be required")]
    CoreVocabularyOptional,

    #[error("could not determine how to perform bundling in this dialect")]
    UnsupportedBundleDialect,

    #[error("bundling container at {pointer} is not an object")]
    ContainerNotObject { pointer: String },

    #[error("cannot reidentify {identifier}: a sibling $ref overrides the identifier")]
    ReferenceObjectResource { identifier: String },

    #[error("rule {rule} still matches at {pointer} after being applied")]
    RuleNonConvergence { rule: String, pointer: String },

    #[error("rule {rule} was applied more than once at {pointer}")]
    RuleReapplied { rule: String, pointer: String },

    #[error("pointer {pointer} does not resolve to a schema")]
    MissingLocation { pointer: String },

    #[error(transparent)]
    Resolution(#[from] SchemaResolutionError),
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SchemaError::Resolution(_) => 3, // IO
            _ => 2,                          // Schema error
        }
    }
}

/// A required external document could not be produced by the resolver.
#[derive(Debug, Clone, Error)]
#[error("could not resolve {identifier}: {message}")]
pub struct SchemaResolutionError {
    pub identifier: String,
    pub message: String,
}

impl SchemaResolutionError {
    pub fn new(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            message: message.into(),
        }
    }
}

/// Errors while loading schema documents from disk or the network.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

/// Errors when checking a schema against its own metaschema.
#[derive(Debug, Error)]
pub enum MetaschemaError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("metaschema {dialect} cannot be compiled: {message}")]
    Unsupported { dialect: String, message: String },

    #[error("schema does not conform to its metaschema: {} error(s)", errors.len())]
    Invalid { errors: Vec<Violation> },
}

impl MetaschemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            MetaschemaError::Schema(e) => e.exit_code(),
            MetaschemaError::Unsupported { .. } => 2,
            MetaschemaError::Invalid { .. } => 1,
        }
    }
}

/// Single metaschema violation with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Violation {
    /// JSON Pointer (RFC 6901) to the offending keyword.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_exit_codes() {
        let err = SchemaError::DuplicateIdentifier {
            identifier: "https://example.com/dup".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err: SchemaError = SchemaResolutionError::new("https://example.com/b", "not found").into();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn resolution_error_is_transparent() {
        let err: SchemaError = SchemaResolutionError::new("https://example.com/b", "not found").into();
        assert_eq!(
            err.to_string(),
            "could not resolve https://example.com/b: not found"
        );
    }

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("schema.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(LoadError::InvalidJson { source }.exit_code(), 2);
    }

    #[test]
    fn metaschema_error_exit_codes() {
        let err = MetaschemaError::Invalid {
            errors: vec![Violation {
                path: "/type".into(),
                message: "\"strin\" is not valid".into(),
            }],
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            MetaschemaError::Schema(SchemaError::UnknownDialect).exit_code(),
            2
        );
    }

    #[test]
    fn violation_display() {
        let err = Violation {
            path: "/properties/id/type".into(),
            message: "expected string".into(),
        };
        assert_eq!(err.to_string(), "/properties/id/type: expected string");
    }
}
