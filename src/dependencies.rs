//! Transitive discovery of external schema dependencies.

use std::collections::{HashSet, VecDeque};

use serde_json::Value;
use tracing::debug;

use crate::dialect;
use crate::error::{Result, SchemaError, SchemaResolutionError};
use crate::frame::{Frame, Mode, Reference, ReferenceKind};
use crate::pointer::Pointer;
use crate::resolver::{OfficialResolver, Resolver};
use crate::walker::Walker;

/// One external dependency found while scanning.
#[derive(Debug, Clone)]
pub(crate) struct Dependency {
    pub origin: Option<String>,
    pub pointer: Pointer,
    pub destination: String,
    /// The destination, on its first occurrence only.
    pub fetched: Option<Fetched>,
}

#[derive(Debug, Clone)]
pub(crate) struct Fetched {
    pub document: Value,
    pub dialect: String,
}

/// Report every external dependency of `document`, transitively.
///
/// The callback receives the identifier of the resource that makes the
/// reference (if any), the pointer to the reference keyword from the root of
/// the document that holds it, and the destination without its fragment.
/// References to metaschemas served by [`OfficialResolver`] are never
/// reported. Each destination is fetched once; cycles terminate.
///
/// `paths` restricts scanning of the top-level document only.
///
/// # Errors
///
/// Returns [`SchemaError::Resolution`] when a destination cannot be fetched,
/// [`SchemaError::UnresolvedReference`] when a reference lands nowhere inside
/// a resource the documents declare or the fetched destination is not a
/// schema of a known dialect, and any framing error of the documents
/// involved.
pub fn dependencies(
    document: &Value,
    walker: &dyn Walker,
    resolver: &dyn Resolver,
    callback: &mut dyn FnMut(Option<&str>, &Pointer, &str),
    default_dialect: Option<&str>,
    default_id: Option<&str>,
    paths: &[Pointer],
) -> Result<()> {
    collect(
        document,
        walker,
        resolver,
        default_dialect,
        default_id,
        paths,
        &mut |dependency| {
            callback(
                dependency.origin.as_deref(),
                &dependency.pointer,
                &dependency.destination,
            )
        },
    )
}

struct Pending {
    document: Value,
    dialect: Option<String>,
    identifier: Option<String>,
    top_level: bool,
}

/// Breadth-first walk over the dependency graph. The callback sees every
/// external reference; `fetched` holds the destination the first time it is
/// met.
pub(crate) fn collect(
    document: &Value,
    walker: &dyn Walker,
    resolver: &dyn Resolver,
    default_dialect: Option<&str>,
    default_id: Option<&str>,
    paths: &[Pointer],
    callback: &mut dyn FnMut(&Dependency),
) -> Result<()> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue = VecDeque::from([Pending {
        document: document.clone(),
        dialect: default_dialect.map(str::to_string),
        identifier: default_id.map(str::to_string),
        top_level: true,
    }]);
    if let Some(identifier) = default_id {
        visited.insert(crate::uri::canonicalize(identifier));
    }

    while let Some(pending) = queue.pop_front() {
        let mut frame = Frame::new(Mode::References);
        let scan: &[Pointer] = if pending.top_level { paths } else { &[] };
        frame.analyse_paths(
            &pending.document,
            walker,
            resolver,
            pending.dialect.as_deref(),
            pending.identifier.as_deref(),
            scan,
        )?;
        if let Some(root) = frame.root() {
            visited.insert(root.to_string());
        }

        for reference in frame.references() {
            if !frame.is_external(reference) {
                // Anonymous scan roots share the empty base, so a fragment
                // cannot tell them apart.
                let ambiguous = scan.len() > 1 && reference.base.is_none();
                if reference.kind == ReferenceKind::Static && !ambiguous {
                    ensure_resolves(&frame, &pending.document, reference)?;
                }
                continue;
            }
            let Some(destination) = reference.base.as_deref() else {
                continue;
            };
            if OfficialResolver::is_official(destination) {
                continue;
            }

            let fetched = if visited.insert(destination.to_string()) {
                Some(fetch(resolver, destination, reference, default_dialect)?)
            } else {
                None
            };

            let origin = frame.root().map(str::to_string);
            debug!(origin = ?origin, destination, "external dependency");
            callback(&Dependency {
                origin,
                pointer: reference.origin.clone(),
                destination: destination.to_string(),
                fetched: fetched.clone(),
            });

            if let Some(fetched) = fetched {
                queue.push_back(Pending {
                    document: fetched.document,
                    dialect: Some(fetched.dialect),
                    identifier: Some(destination.to_string()),
                    top_level: false,
                });
            }
        }
    }
    Ok(())
}

fn fetch(
    resolver: &dyn Resolver,
    destination: &str,
    reference: &Reference,
    default_dialect: Option<&str>,
) -> Result<Fetched> {
    let document = resolver.resolve(destination).ok_or_else(|| {
        SchemaResolutionError::new(destination, "could not resolve the referenced schema")
    })?;
    let invalid = |message: &str| SchemaError::UnresolvedReference {
        destination: destination.to_string(),
        pointer: reference.origin.to_string(),
        message: message.to_string(),
    };

    if !document.is_object() && !document.is_boolean() {
        return Err(invalid("the referenced document is not a schema"));
    }
    let dialect = dialect::dialect(&document, default_dialect)
        .ok_or_else(|| invalid("could not determine the dialect of the referenced schema"))?;
    Ok(Fetched { document, dialect })
}

/// A reference into a resource the document declares must land inside it.
fn ensure_resolves(frame: &Frame, document: &Value, reference: &Reference) -> Result<()> {
    let found = frame
        .traverse(&reference.destination)
        .is_some_and(|location| location.pointer.get(document).is_some());
    if found {
        return Ok(());
    }
    Err(SchemaError::UnresolvedReference {
        destination: reference.destination.clone(),
        pointer: reference.origin.to_string(),
        message: "no such location in the document".to_string(),
    })
}
