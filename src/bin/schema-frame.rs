//! CLI for schema framing, bundling and linting.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use schema_frame::{
    bundle, dependencies, lint, load_schema_auto, official_walker, validate_against_metaschema,
    BundleOptions, FileResolver, FileStatus, Frame, LintOptions, MetaschemaError, Mode, Pointer,
};

#[derive(Parser)]
#[command(name = "schema-frame")]
#[command(about = "Frame, bundle and lint JSON Schema documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the reference frame of a schema (locations, references, anchors)
    Frame {
        /// Schema source: file path or URL
        schema: String,

        #[command(flatten)]
        resolution: ResolutionArgs,

        /// Only frame the subschemas at these JSON Pointers
        #[arg(long = "path", value_parser = parse_pointer)]
        paths: Vec<Pointer>,

        /// Record every subschema and JSON position, not only resources and anchors
        #[arg(long)]
        all_locations: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the external documents a schema depends on, transitively
    Dependencies {
        /// Schema source: file path or URL
        schema: String,

        #[command(flatten)]
        resolution: ResolutionArgs,

        /// Only follow references from the subschemas at these JSON Pointers
        #[arg(long = "path", value_parser = parse_pointer)]
        paths: Vec<Pointer>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Embed every external dependency into the schema
    Bundle {
        /// Schema source: file path or URL
        schema: String,

        #[command(flatten)]
        resolution: ResolutionArgs,

        /// Only bundle the subschemas at these JSON Pointers
        #[arg(long = "path", value_parser = parse_pointer)]
        paths: Vec<Pointer>,

        /// JSON Pointer, relative to the bundled root, to embed externals under
        #[arg(long, value_parser = parse_pointer)]
        container: Option<Pointer>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Lint schema files for errors (syntax, broken refs, rule matches)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Apply canonicalization rules and rewrite files in place
        #[arg(long)]
        fix: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,

        /// Dialect assumed for schemas without $schema
        #[arg(long)]
        default_dialect: Option<String>,

        /// URL prefix mapped onto each file's directory
        #[arg(long)]
        remote_base: Option<String>,

        /// Fetch unmapped http(s) references over the network
        #[arg(long)]
        allow_remote: bool,
    },

    /// Validate a schema against the metaschema of its dialect
    Metaschema {
        /// Schema source: file path or URL
        schema: String,

        #[command(flatten)]
        resolution: ResolutionArgs,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ResolutionArgs {
    /// Dialect assumed for schemas without $schema
    #[arg(long)]
    default_dialect: Option<String>,

    /// Identifier assumed for a root without $id
    #[arg(long)]
    default_id: Option<String>,

    /// Directory relative references resolve against (defaults to the schema's directory)
    #[arg(long)]
    local_base: Option<PathBuf>,

    /// URL prefix mapped onto the local base (e.g., https://example.com/schemas)
    #[arg(long, requires = "local_base")]
    remote_base: Option<String>,

    /// Fetch unmapped http(s) references over the network
    #[arg(long)]
    allow_remote: bool,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (default: stdout)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Frame {
            schema,
            resolution,
            paths,
            all_locations,
            output,
        } => run_frame(&schema, &resolution, &paths, all_locations, &output),

        Commands::Dependencies {
            schema,
            resolution,
            paths,
            output,
        } => run_dependencies(&schema, &resolution, &paths, &output),

        Commands::Bundle {
            schema,
            resolution,
            paths,
            container,
            output,
        } => run_bundle(&schema, &resolution, paths, container, &output),

        Commands::Lint {
            path,
            format,
            strict,
            fix,
            quiet,
            default_dialect,
            remote_base,
            allow_remote,
        } => {
            let mut options = LintOptions::new()
                .strict(strict)
                .fix(fix)
                .allow_remote(allow_remote);
            if let Some(dialect) = default_dialect {
                options = options.default_dialect(dialect);
            }
            if let Some(base) = remote_base {
                options = options.remote_base(base);
            }
            run_lint(&path, &format, quiet, &options)
        }

        Commands::Metaschema {
            schema,
            resolution,
            json,
        } => run_metaschema(&schema, &resolution, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn parse_pointer(text: &str) -> Result<Pointer, String> {
    Pointer::parse(text).map_err(|e| e.to_string())
}

fn load(source: &str) -> Result<Value, u8> {
    load_schema_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn resolver_for(source: &str, args: &ResolutionArgs) -> FileResolver {
    let local_base = args.local_base.clone().unwrap_or_else(|| {
        if schema_frame::is_url(source) {
            PathBuf::from(".")
        } else {
            Path::new(source)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        }
    });
    let resolver = FileResolver::new(local_base).allow_remote(args.allow_remote);
    match &args.remote_base {
        Some(base) => resolver.with_remote_base(base.clone()),
        None => resolver,
    }
}

fn write_output(value: &Value, output: &OutputArgs) -> Result<(), u8> {
    let json_output = if output.pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match &output.output {
        Some(path) => {
            std::fs::write(path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }
    Ok(())
}

fn run_frame(
    source: &str,
    args: &ResolutionArgs,
    paths: &[Pointer],
    all_locations: bool,
    output: &OutputArgs,
) -> Result<(), u8> {
    let schema = load(source)?;
    let resolver = resolver_for(source, args);
    let mode = if all_locations {
        Mode::Locations
    } else {
        Mode::References
    };

    let mut frame = Frame::new(mode);
    frame
        .analyse_paths(
            &schema,
            &official_walker,
            &resolver,
            args.default_dialect.as_deref(),
            args.default_id.as_deref(),
            paths,
        )
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    write_output(&frame.to_json(), output)
}

fn run_dependencies(
    source: &str,
    args: &ResolutionArgs,
    paths: &[Pointer],
    output: &OutputArgs,
) -> Result<(), u8> {
    let schema = load(source)?;
    let resolver = resolver_for(source, args);

    let mut found = Vec::new();
    dependencies(
        &schema,
        &official_walker,
        &resolver,
        &mut |origin, pointer, destination| {
            found.push(json!({
                "origin": origin,
                "pointer": pointer,
                "destination": destination,
            }));
        },
        args.default_dialect.as_deref(),
        args.default_id.as_deref(),
        paths,
    )
    .map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&Value::Array(found), output)
}

fn run_bundle(
    source: &str,
    args: &ResolutionArgs,
    paths: Vec<Pointer>,
    container: Option<Pointer>,
    output: &OutputArgs,
) -> Result<(), u8> {
    let mut schema = load(source)?;
    let resolver = resolver_for(source, args);

    let options = BundleOptions {
        default_dialect: args.default_dialect.clone(),
        default_id: args.default_id.clone(),
        container,
        paths,
    };
    bundle(&mut schema, &official_walker, &resolver, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&schema, output)
}

fn run_metaschema(source: &str, args: &ResolutionArgs, json_output: bool) -> Result<(), u8> {
    let schema = load(source)?;
    let resolver = resolver_for(source, args);

    match validate_against_metaschema(&schema, &resolver, args.default_dialect.as_deref()) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(MetaschemaError::Invalid { errors }) => {
            if json_output {
                let output = json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            if json_output {
                println!("{}", json!({"valid": false, "error": e.to_string()}));
            } else {
                eprintln!("Error: {}", e);
            }
            Err(e.exit_code() as u8)
        }
    }
}

fn run_lint(path: &Path, format: &str, quiet: bool, options: &LintOptions) -> Result<(), u8> {
    use schema_frame::Severity;

    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, options);
    let passed = result.is_ok() && (!options.strict || result.warnings == 0);

    if format == "json" {
        let rendered = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                if file_result.fixed > 0 {
                    println!(
                        "  {} {} ({} fixed)",
                        status_icon,
                        file_result.file.display(),
                        file_result.fixed
                    );
                } else {
                    println!("  {} {}", status_icon, file_result.file.display());
                }
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if passed {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if passed {
        Ok(())
    } else {
        Err(1)
    }
}
