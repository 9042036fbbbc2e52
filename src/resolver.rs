//! Schema resolvers.
//!
//! A resolver maps an absolute identifier to a schema document. The engine
//! only ever asks for documents by identifier and treats `None` as a
//! resolution failure, so resolvers decide for themselves where documents
//! live (embedded data, memory, disk or HTTP).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use url::Url;

use crate::loader::load_schema;
use crate::uri;

#[cfg(feature = "remote")]
use crate::loader::{is_url, load_schema_url};

/// Produces schema documents by identifier.
pub trait Resolver {
    fn resolve(&self, identifier: &str) -> Option<Value>;
}

impl<F> Resolver for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn resolve(&self, identifier: &str) -> Option<Value> {
        self(identifier)
    }
}

/// Embedded metaschemas, keyed by canonical identifier.
const OFFICIAL: &[(&str, &str)] = &[
    (
        "https://json-schema.org/draft/2020-12/schema",
        include_str!("metaschemas/2020-12-schema.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/hyper-schema",
        include_str!("metaschemas/2020-12-hyper-schema.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/core",
        include_str!("metaschemas/2020-12-meta-core.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/applicator",
        include_str!("metaschemas/2020-12-meta-applicator.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/unevaluated",
        include_str!("metaschemas/2020-12-meta-unevaluated.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/validation",
        include_str!("metaschemas/2020-12-meta-validation.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/meta-data",
        include_str!("metaschemas/2020-12-meta-meta-data.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/format-annotation",
        include_str!("metaschemas/2020-12-meta-format-annotation.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/format-assertion",
        include_str!("metaschemas/2020-12-meta-format-assertion.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/content",
        include_str!("metaschemas/2020-12-meta-content.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/hyper-schema",
        include_str!("metaschemas/2020-12-meta-hyper-schema.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/schema",
        include_str!("metaschemas/2019-09-schema.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/hyper-schema",
        include_str!("metaschemas/2019-09-hyper-schema.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/core",
        include_str!("metaschemas/2019-09-meta-core.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/applicator",
        include_str!("metaschemas/2019-09-meta-applicator.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/validation",
        include_str!("metaschemas/2019-09-meta-validation.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/meta-data",
        include_str!("metaschemas/2019-09-meta-meta-data.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/format",
        include_str!("metaschemas/2019-09-meta-format.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/content",
        include_str!("metaschemas/2019-09-meta-content.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/hyper-schema",
        include_str!("metaschemas/2019-09-meta-hyper-schema.json"),
    ),
    (
        "http://json-schema.org/draft-07/schema",
        include_str!("metaschemas/draft-07-schema.json"),
    ),
    (
        "http://json-schema.org/draft-07/hyper-schema",
        include_str!("metaschemas/draft-07-hyper-schema.json"),
    ),
    (
        "http://json-schema.org/draft-06/schema",
        include_str!("metaschemas/draft-06-schema.json"),
    ),
    (
        "http://json-schema.org/draft-06/hyper-schema",
        include_str!("metaschemas/draft-06-hyper-schema.json"),
    ),
    (
        "http://json-schema.org/draft-04/schema",
        include_str!("metaschemas/draft-04-schema.json"),
    ),
    (
        "http://json-schema.org/draft-04/hyper-schema",
        include_str!("metaschemas/draft-04-hyper-schema.json"),
    ),
    (
        "http://json-schema.org/draft-03/schema",
        include_str!("metaschemas/draft-03-schema.json"),
    ),
    (
        "http://json-schema.org/draft-03/hyper-schema",
        include_str!("metaschemas/draft-03-hyper-schema.json"),
    ),
    (
        "http://json-schema.org/draft-02/schema",
        include_str!("metaschemas/draft-02-schema.json"),
    ),
    (
        "http://json-schema.org/draft-02/hyper-schema",
        include_str!("metaschemas/draft-02-hyper-schema.json"),
    ),
    (
        "http://json-schema.org/draft-01/schema",
        include_str!("metaschemas/draft-01-schema.json"),
    ),
    (
        "http://json-schema.org/draft-01/hyper-schema",
        include_str!("metaschemas/draft-01-hyper-schema.json"),
    ),
    (
        "http://json-schema.org/draft-00/schema",
        include_str!("metaschemas/draft-00-schema.json"),
    ),
    (
        "http://json-schema.org/draft-00/hyper-schema",
        include_str!("metaschemas/draft-00-hyper-schema.json"),
    ),
    (
        "https://spec.openapis.org/oas/3.1/dialect/base",
        include_str!("metaschemas/oas-3.1-dialect-base.json"),
    ),
    (
        "https://spec.openapis.org/oas/3.1/meta/base",
        include_str!("metaschemas/oas-3.1-meta-base.json"),
    ),
];

/// Serves the official JSON Schema metaschemas (draft 0 to 2020-12) and the
/// OpenAPI 3.1 base dialect from embedded data.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfficialResolver;

impl OfficialResolver {
    /// Whether `identifier` names an embedded metaschema. A trailing empty
    /// fragment is ignored.
    pub fn is_official(identifier: &str) -> bool {
        Self::lookup(identifier).is_some()
    }

    fn lookup(identifier: &str) -> Option<&'static str> {
        let canonical = uri::canonicalize(identifier);
        OFFICIAL
            .iter()
            .find(|(id, _)| *id == canonical)
            .map(|(_, text)| *text)
    }
}

impl Resolver for OfficialResolver {
    fn resolve(&self, identifier: &str) -> Option<Value> {
        let text = Self::lookup(identifier)?;
        match serde_json::from_str(text) {
            Ok(schema) => Some(schema),
            Err(e) => {
                tracing::warn!(identifier, error = %e, "embedded metaschema is not valid JSON");
                None
            }
        }
    }
}

/// In-memory registry of schemas that defers to another resolver for
/// identifiers it does not hold.
#[derive(Debug, Clone, Default)]
pub struct MapResolver<R> {
    schemas: HashMap<String, Value>,
    fallback: R,
}

impl<R: Resolver> MapResolver<R> {
    pub fn new(fallback: R) -> Self {
        Self {
            schemas: HashMap::new(),
            fallback,
        }
    }

    /// Builder form of [`MapResolver::add`].
    pub fn with(mut self, identifier: impl AsRef<str>, schema: Value) -> Self {
        self.add(identifier, schema);
        self
    }

    /// Register `schema` under `identifier`, replacing any previous entry.
    pub fn add(&mut self, identifier: impl AsRef<str>, schema: Value) {
        self.schemas
            .insert(uri::canonicalize(identifier.as_ref()), schema);
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl<R: Resolver> Resolver for MapResolver<R> {
    fn resolve(&self, identifier: &str) -> Option<Value> {
        match self.schemas.get(&uri::canonicalize(identifier)) {
            Some(schema) => Some(schema.clone()),
            None => self.fallback.resolve(identifier),
        }
    }
}

/// Resolves identifiers to files under a local directory.
///
/// Relative identifiers are joined to `local_base`. Absolute identifiers that
/// start with `remote_base` are mapped onto `local_base` as well, so a tree of
/// schemas published under a URL prefix can be resolved from a checkout:
///
/// ```text
/// remote_base = "https://example.com/schemas"
/// local_base  = "site"
/// https://example.com/schemas/types/a.json -> site/types/a.json
/// ```
///
/// `file://` URLs are read directly. Other absolute identifiers are fetched
/// over HTTP when the `remote` feature is enabled and fetching is allowed.
/// Official metaschemas are always served from embedded data.
#[derive(Debug, Clone)]
pub struct FileResolver {
    local_base: PathBuf,
    remote_base: Option<String>,
    allow_remote: bool,
}

impl FileResolver {
    pub fn new(local_base: impl Into<PathBuf>) -> Self {
        Self {
            local_base: local_base.into(),
            remote_base: None,
            allow_remote: false,
        }
    }

    /// Map identifiers starting with `remote_base` onto the local directory.
    pub fn with_remote_base(mut self, remote_base: impl Into<String>) -> Self {
        self.remote_base = Some(remote_base.into());
        self
    }

    /// Allow fetching unmapped `http(s)` identifiers over the network.
    pub fn allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    pub fn local_base(&self) -> &Path {
        &self.local_base
    }

    pub fn remote_allowed(&self) -> bool {
        self.allow_remote
    }

    /// The local file an identifier maps to, if any.
    pub fn path_for(&self, identifier: &str) -> Option<PathBuf> {
        let document = uri::without_fragment(identifier);
        if document.is_empty() {
            return None;
        }

        if let Some(remote_base) = &self.remote_base {
            if let Some(remainder) = document.strip_prefix(remote_base.as_str()) {
                return Some(self.local_base.join(remainder.trim_start_matches('/')));
            }
        }

        if document.starts_with("file:") {
            return Url::parse(document).ok()?.to_file_path().ok();
        }

        if uri::is_absolute(document) {
            return None;
        }
        Some(self.local_base.join(document))
    }
}

impl Resolver for FileResolver {
    fn resolve(&self, identifier: &str) -> Option<Value> {
        if let Some(schema) = OfficialResolver.resolve(identifier) {
            return Some(schema);
        }

        if let Some(path) = self.path_for(identifier) {
            return match load_schema(&path) {
                Ok(schema) => Some(schema),
                Err(e) => {
                    tracing::debug!(identifier, path = %path.display(), error = %e, "could not load schema file");
                    None
                }
            };
        }

        #[cfg(feature = "remote")]
        {
            if self.allow_remote && is_url(identifier) {
                return match load_schema_url(uri::without_fragment(identifier)) {
                    Ok(schema) => Some(schema),
                    Err(e) => {
                        tracing::debug!(identifier, error = %e, "could not fetch schema");
                        None
                    }
                };
            }
        }

        None
    }
}
