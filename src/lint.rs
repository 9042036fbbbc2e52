//! Schema linting - static analysis of schema files.
//!
//! Validates schema files for:
//! - JSON syntax errors
//! - Framing errors (duplicate identifiers, unknown dialects, bad anchors)
//! - Broken references (unresolvable documents, missing targets)
//! - Matches of the built-in rules
//! - Identifier keywords that the dialect in force ignores
//!
//! With `fix` enabled the canonicalization rules are applied and the file is
//! rewritten before it is checked.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::dialect::BaseDialect;
use crate::frame::{Frame, Mode, Reference, ReferenceKind};
use crate::loader::load_schema;
use crate::resolver::{FileResolver, OfficialResolver, Resolver};
use crate::rules::canonical_rules;
use crate::uri;
use crate::walker::official_walker;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON Pointer to the issue (e.g., "/properties/id/$ref")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    /// Rule applications performed by `fix`.
    #[serde(skip_serializing_if = "is_zero")]
    pub fixed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Options for [`lint`].
#[derive(Debug, Clone)]
pub struct LintOptions {
    /// Treat warnings as failures.
    pub strict: bool,
    /// Apply the canonicalization rules and rewrite files.
    pub fix: bool,
    /// Dialect for schemas without `$schema`.
    pub default_dialect: Option<String>,
    /// URL prefix served from each file's directory. Derived from the
    /// schema's own identifier when unset.
    pub remote_base: Option<String>,
    /// Fetch unmapped HTTP(S) references over the network.
    pub allow_remote: bool,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            strict: false,
            fix: false,
            default_dialect: Some(BaseDialect::Draft202012.uri().to_string()),
            remote_base: None,
            allow_remote: false,
        }
    }
}

impl LintOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn fix(mut self, fix: bool) -> Self {
        self.fix = fix;
        self
    }

    pub fn default_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.default_dialect = Some(dialect.into());
        self
    }

    pub fn remote_base(mut self, base: impl Into<String>) -> Self {
        self.remote_base = Some(base.into());
        self
    }

    pub fn allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is set, warnings are treated as errors.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, options: &LintOptions) -> LintResult {
    let files = collect_schema_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path, options);
        total_errors += count(&file_result.diagnostics, Severity::Error);
        total_warnings += count(&file_result.diagnostics, Severity::Warning);
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if options.strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

/// Lint a single schema file.
pub fn lint_file(file: &Path, base_path: &Path, options: &LintOptions) -> FileResult {
    let display = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();

    // Try to load the file (checks syntax)
    let mut schema = match load_schema(file) {
        Ok(s) => s,
        Err(e) => {
            return FileResult {
                file: display,
                status: FileStatus::Error,
                fixed: 0,
                diagnostics: vec![diagnostic(
                    Severity::Error,
                    "E001",
                    file,
                    "",
                    format!("syntax error: {}", e),
                )],
            };
        }
    };

    let resolver = resolver_for(file, &schema, options);
    let mut fixed = 0;
    let mut diagnostics = Vec::new();

    if options.fix {
        match fix_file(file, &mut schema, &resolver, options) {
            Ok(applied) => fixed = applied,
            Err(d) => diagnostics.push(d),
        }
    }

    diagnostics.extend(lint_value(&schema, file, &resolver, options));

    let status = if count(&diagnostics, Severity::Error) > 0 {
        FileStatus::Error
    } else if count(&diagnostics, Severity::Warning) > 0 {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: display,
        status,
        fixed,
        diagnostics,
    }
}

/// Lint an in-memory schema. `file` only labels the diagnostics.
pub fn lint_value(
    schema: &Value,
    file: &Path,
    resolver: &dyn Resolver,
    options: &LintOptions,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let default_dialect = options.default_dialect.as_deref();

    let mut frame = Frame::new(Mode::References);
    if let Err(e) = frame.analyse(schema, &official_walker, resolver, default_dialect, None) {
        diagnostics.push(diagnostic(
            Severity::Error,
            "E004",
            file,
            "",
            format!("invalid schema: {}", e),
        ));
        return diagnostics;
    }

    let mut externals = ExternalCache::default();
    for reference in frame.references() {
        if let Some(message) = check_reference(schema, &frame, reference, resolver, &mut externals)
        {
            let (code, message) = message;
            diagnostics.push(diagnostic(
                Severity::Error,
                code,
                file,
                &reference.origin.to_string(),
                message,
            ));
        }
    }

    // Check for missing identifier (warning)
    if frame.root().is_none() {
        diagnostics.push(diagnostic(
            Severity::Warning,
            "W002",
            file,
            "",
            "schema does not declare an identifier".to_string(),
        ));
    }

    let rules = canonical_rules();
    let checked = rules.check(
        schema,
        &official_walker,
        resolver,
        &mut |found| {
            diagnostics.push(diagnostic(
                Severity::Warning,
                "W001",
                file,
                &found.pointer.to_string(),
                format!("{} ({})", found.message, found.rule),
            ))
        },
        default_dialect,
        None,
    );
    if let Err(e) = checked {
        diagnostics.push(diagnostic(
            Severity::Error,
            "E004",
            file,
            "",
            format!("invalid schema: {}", e),
        ));
        return diagnostics;
    }

    check_identifier_keywords(schema, resolver, default_dialect, file, &mut diagnostics);
    diagnostics
}

/// Warn about `id` under dialects that use `$id`, and the reverse.
fn check_identifier_keywords(
    schema: &Value,
    resolver: &dyn Resolver,
    default_dialect: Option<&str>,
    file: &Path,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut frame = Frame::new(Mode::Locations);
    if frame
        .analyse(schema, &official_walker, resolver, default_dialect, None)
        .is_err()
    {
        return;
    }

    for location in frame.subschemas() {
        let expected = location.base_dialect.identifier_keyword();
        let other = if expected == "$id" { "id" } else { "$id" };
        let declared = location
            .pointer
            .get(schema)
            .and_then(|subschema| subschema.get(other));
        if let Some(Value::String(_)) = declared {
            diagnostics.push(diagnostic(
                Severity::Warning,
                "W003",
                file,
                &location.pointer.join(other).to_string(),
                format!(
                    "`{}` is not an identifier in this dialect, use `{}`",
                    other, expected
                ),
            ));
        }
    }
}

#[derive(Default)]
struct ExternalCache {
    documents: HashMap<String, Option<Value>>,
}

impl ExternalCache {
    fn get(&mut self, identifier: &str, resolver: &dyn Resolver) -> Option<&Value> {
        self.documents
            .entry(identifier.to_string())
            .or_insert_with(|| resolver.resolve(identifier))
            .as_ref()
    }
}

/// Returns the error code and message for a broken reference.
fn check_reference(
    schema: &Value,
    frame: &Frame,
    reference: &Reference,
    resolver: &dyn Resolver,
    externals: &mut ExternalCache,
) -> Option<(&'static str, String)> {
    // Dynamic references are resolved during evaluation
    if reference.kind == ReferenceKind::Dynamic {
        return None;
    }
    if reference.keyword() == Some("$schema") && OfficialResolver::is_official(&reference.destination)
    {
        return None;
    }

    if !frame.is_external(reference) {
        let found = frame
            .traverse(&reference.destination)
            .is_some_and(|location| location.pointer.get(schema).is_some());
        return (!found).then(|| ("E003", format!("reference target not found: {}", reference.raw)));
    }

    let base = reference.base.as_deref().unwrap_or_default();
    let Some(document) = externals.get(base, resolver) else {
        return Some(("E002", format!("could not resolve {}", base)));
    };

    let mut external = Frame::new(Mode::References);
    let dialect = frame
        .locations()
        .next()
        .map(|location| location.dialect.clone());
    if let Err(e) = external.analyse(
        document,
        &official_walker,
        resolver,
        dialect.as_deref(),
        Some(base),
    ) {
        return Some(("E002", format!("invalid schema {}: {}", base, e)));
    }
    let found = external
        .traverse(&reference.destination)
        .is_some_and(|location| location.pointer.get(document).is_some());
    (!found).then(|| {
        (
            "E003",
            format!("reference target not found in {}: {}", base, reference.raw),
        )
    })
}

fn fix_file(
    file: &Path,
    schema: &mut Value,
    resolver: &dyn Resolver,
    options: &LintOptions,
) -> Result<usize, Diagnostic> {
    let report = canonical_rules()
        .apply(
            schema,
            &official_walker,
            resolver,
            options.default_dialect.as_deref(),
            None,
        )
        .map_err(|e| {
            diagnostic(
                Severity::Error,
                "E004",
                file,
                "",
                format!("could not fix schema: {}", e),
            )
        })?;

    if report.applied > 0 {
        debug!(file = %file.display(), applied = report.applied, "rewriting schema");
        let write_error = |message: String| {
            diagnostic(
                Severity::Error,
                "E005",
                file,
                "",
                format!("could not write fixed schema: {}", message),
            )
        };
        let mut content =
            serde_json::to_string_pretty(schema).map_err(|e| write_error(e.to_string()))?;
        content.push('\n');
        std::fs::write(file, content).map_err(|e| write_error(e.to_string()))?;
    }
    Ok(report.applied)
}

/// Resolve references from the file's directory. Without an explicit remote
/// base, the directory of the schema's own absolute identifier maps there.
fn resolver_for(file: &Path, schema: &Value, options: &LintOptions) -> FileResolver {
    let local_base = file.parent().unwrap_or(Path::new(".")).to_path_buf();
    let remote_base = options.remote_base.clone().or_else(|| {
        schema
            .get("$id")
            .or_else(|| schema.get("id"))
            .and_then(Value::as_str)
            .filter(|id| uri::is_absolute(id))
            .map(|id| uri::resolve(id, "."))
    });

    let resolver = FileResolver::new(local_base).allow_remote(options.allow_remote);
    match remote_base {
        Some(base) => resolver.with_remote_base(base),
        None => resolver,
    }
}

fn diagnostic(
    severity: Severity,
    code: &str,
    file: &Path,
    path: &str,
    message: String,
) -> Diagnostic {
    Diagnostic {
        severity,
        code: code.to_string(),
        file: file.to_path_buf(),
        path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        message,
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}
