#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::Parser;
use specwatch_core::output::safe_output_escape;
use specwatch_core::spec::split::{route_label, split_with_prefix, DEFAULT_EXTENSION_PREFIX};
use specwatch_core::spec::{diff, parse_document, render_diff};
use specwatch_core::{
    compare_units, ChangeStatus, Error, HttpGenerationClient, Pipeline, PipelineConfig,
    PipelineResult, ProviderRegistry,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "specwatch",
    version,
    about = "Track provider OpenAPI documents and classify route changes"
)]
struct Cli {
    /// Log format on stderr: text or json
    #[arg(long, env = "SPECWATCH_LOG_FORMAT", default_value = "text", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Fetch documents, classify route changes and update the ledger
    Check(CheckArgs),
    /// Compare two local documents route by route
    Diff(DiffArgs),
    /// Split a local document into route units
    Split(SplitArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Directory holding specs/ and changelog/
    #[arg(long, env = "SPECWATCH_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Provider registry file
    #[arg(long, env = "SPECWATCH_PROVIDERS", default_value = "providers.yaml")]
    providers: PathBuf,

    /// Only check this provider
    #[arg(long, env = "SPECWATCH_PROVIDER")]
    provider: Option<String>,

    /// Document URL (overrides the registry, requires --provider)
    #[arg(long, env = "SPECWATCH_URL")]
    url: Option<String>,

    /// Classification calls in flight at once
    #[arg(long, env = "SPECWATCH_CONCURRENCY", default_value_t = 5)]
    concurrency: usize,

    /// Date stamped on change records (YYYY-MM-DD, default: today)
    #[arg(long, env = "SPECWATCH_DATE")]
    date: Option<String>,

    /// Structured-generation endpoint
    #[arg(long, env = "SPECWATCH_GENERATION_URL")]
    generation_url: Option<String>,

    /// Bearer token for the generation endpoint
    #[arg(long, env = "SPECWATCH_GENERATION_TOKEN", hide_env_values = true)]
    generation_token: Option<String>,

    /// Model name forwarded to the generation endpoint
    #[arg(long, env = "SPECWATCH_GENERATION_MODEL")]
    generation_model: Option<String>,

    /// Output format: gha, json, text (default: auto-detect)
    #[arg(long, env = "SPECWATCH_OUTPUT_FORMAT")]
    output_format: Option<String>,
}

#[derive(clap::Args)]
struct DiffArgs {
    /// Older document
    old: PathBuf,
    /// Newer document
    new: PathBuf,
}

#[derive(clap::Args)]
struct SplitArgs {
    /// Document to split
    document: PathBuf,

    /// Write units below this directory instead of listing them
    #[arg(long)]
    out: Option<PathBuf>,

    /// Extension key prefix to drop before splitting
    #[arg(long, default_value = DEFAULT_EXTENSION_PREFIX)]
    extension_prefix: String,
}

/// Output format for the CLI
enum OutputFormat {
    /// GitHub Actions: write to $GITHUB_OUTPUT + summary to stdout
    Gha,
    /// Full JSON to stdout
    Json,
    /// Human-readable text to stdout
    Text,
}

impl OutputFormat {
    fn detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("gha") => OutputFormat::Gha,
            Some("json") => OutputFormat::Json,
            Some("text") => OutputFormat::Text,
            _ => {
                if std::env::var("GITHUB_ACTIONS").is_ok() {
                    OutputFormat::Gha
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_format);

    let code = match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Diff(args) => run_diff(args),
        Commands::Split(args) => run_split(args),
    };
    std::process::exit(code);
}

fn init_logging(format: &str) {
    let filter =
        EnvFilter::try_from_env("SPECWATCH_LOG").unwrap_or_else(|_| EnvFilter::new("specwatch=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Filter empty string from Option (env vars may produce "" for empty values)
fn clean_opt(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

/// Providers to check, in name order
fn resolve_targets(args: &CheckArgs) -> Result<Vec<(String, String)>, Error> {
    let provider = clean_opt(&args.provider);
    if let Some(url) = clean_opt(&args.url) {
        let provider = provider
            .ok_or_else(|| Error::Config("--url requires --provider".to_string()))?;
        return Ok(vec![(provider.to_string(), url.to_string())]);
    }

    let registry = ProviderRegistry::load(&args.providers)?;
    match provider {
        Some(name) => {
            let url = registry.url(name).ok_or_else(|| {
                Error::Config(format!(
                    "provider '{}' not found in {}",
                    name,
                    args.providers.display()
                ))
            })?;
            Ok(vec![(name.to_string(), url.to_string())])
        }
        None => Ok(registry
            .iter()
            .map(|(name, url)| (name.to_string(), url.to_string()))
            .collect()),
    }
}

fn run_check(args: CheckArgs) -> i32 {
    let output_format = OutputFormat::detect(args.output_format.as_deref());

    let targets = match resolve_targets(&args) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    if targets.is_empty() {
        eprintln!("Error: no providers configured");
        return 1;
    }

    let endpoint = match clean_opt(&args.generation_url) {
        Some(url) => url.to_string(),
        None => {
            eprintln!("Error: --generation-url (SPECWATCH_GENERATION_URL) is required");
            return 1;
        }
    };
    let backend = HttpGenerationClient::new(
        endpoint,
        clean_opt(&args.generation_token).map(str::to_string),
        clean_opt(&args.generation_model).map(str::to_string),
    );

    let mut config = PipelineConfig {
        data_dir: args.data_dir.clone(),
        concurrency: args.concurrency,
        ..Default::default()
    };
    if let Some(date) = clean_opt(&args.date) {
        config.date = date.to_string();
    }

    let pipeline = match Pipeline::new(config, backend) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build();
    let rt = match rt {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create runtime: {e}");
            return 1;
        }
    };

    let mut results = Vec::with_capacity(targets.len());
    let mut failed = false;
    for (provider, url) in &targets {
        match rt.block_on(pipeline.run(provider, url)) {
            Ok(result) => {
                info!(provider = %provider, has_changes = result.has_changes, "provider done");
                results.push((provider.as_str(), result));
            }
            Err(e) => {
                error!(provider = %provider, error = %e, "provider failed");
                eprintln!("Error: {provider}: {e}");
                failed = true;
            }
        }
    }

    match output_format {
        OutputFormat::Gha => write_gha_output(&results),
        OutputFormat::Json => write_json_output(&results),
        OutputFormat::Text => write_text_output(&results),
    }

    if failed {
        1
    } else {
        0
    }
}

fn result_json(provider: &str, result: &PipelineResult) -> serde_json::Value {
    let mut value = serde_json::to_value(result).unwrap_or(serde_json::Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.insert("provider".to_string(), serde_json::json!(provider));
    }
    value
}

/// One object for a single provider, an array otherwise
fn write_json_output(results: &[(&str, PipelineResult)]) {
    let output = match results {
        [(provider, result)] => result_json(provider, result),
        _ => serde_json::Value::Array(
            results
                .iter()
                .map(|(provider, result)| result_json(provider, result))
                .collect(),
        ),
    };

    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let _ = serde_json::to_writer(&mut lock, &output);
    let _ = writeln!(lock);
}

/// Write outputs using GitHub Actions multiline syntax to $GITHUB_OUTPUT
fn write_gha_output(results: &[(&str, PipelineResult)]) {
    let output_file = match std::env::var("GITHUB_OUTPUT") {
        Ok(f) => f,
        Err(_) => {
            eprintln!("Warning: GITHUB_OUTPUT not set, falling back to stdout");
            write_json_output(results);
            return;
        }
    };

    let mut f = match std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&output_file)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: cannot open GITHUB_OUTPUT ({output_file}): {e}");
            return;
        }
    };

    let delim = "SPECWATCH_EOF";
    let has_changes = results.iter().any(|(_, r)| r.has_changes);
    let changed: usize = results.iter().map(|(_, r)| r.changed_routes.len()).sum();
    let title = results
        .iter()
        .filter(|(_, r)| r.has_changes)
        .map(|(_, r)| r.title.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let body = results
        .iter()
        .filter(|(_, r)| r.has_changes)
        .map(|(_, r)| r.body.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let json: Vec<serde_json::Value> = results
        .iter()
        .map(|(provider, result)| result_json(provider, result))
        .collect();
    let json = serde_json::to_string(&json).unwrap_or_else(|_| "[]".to_string());

    let _ = writeln!(f, "has_changes={has_changes}");
    let _ = writeln!(f, "changed_routes_count={changed}");
    let _ = writeln!(f, "title={}", safe_output_escape(&title));
    let _ = writeln!(f, "body<<{delim}");
    let _ = writeln!(f, "{}", body.trim_end());
    let _ = writeln!(f, "{delim}");
    let _ = writeln!(f, "results<<{delim}");
    let _ = writeln!(f, "{}", safe_output_escape(&json));
    let _ = writeln!(f, "{delim}");

    // Summary to stdout (visible in job log)
    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    for (_, result) in results {
        let _ = writeln!(w, "{}", result.title);
    }
    let _ = writeln!(w, "Has changes: {has_changes}");
}

/// Write human-readable text to stdout
fn write_text_output(results: &[(&str, PipelineResult)]) {
    let stdout = std::io::stdout();
    let mut w = stdout.lock();

    for (_, result) in results {
        let _ = writeln!(w, "{}", result.title);
        let _ = writeln!(w, "{}", "=".repeat(result.title.chars().count()));
        for route in &result.changed_routes {
            let label = route_label(&route.relative_path)
                .unwrap_or_else(|_| route.relative_path.clone());
            match route.operation_id {
                Some(ref id) => {
                    let _ = writeln!(w, "  {} {label} ({id})", route.status.as_str());
                }
                None => {
                    let _ = writeln!(w, "  {} {label}", route.status.as_str());
                }
            }
        }
        if !result.body.is_empty() {
            let _ = writeln!(w);
            let _ = write!(w, "{}", result.body);
        }
        let _ = writeln!(w);
    }
}

fn read_document(path: &Path) -> Result<serde_json::Value, Error> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    parse_document(&raw)
}

fn run_diff(args: DiffArgs) -> i32 {
    let result = read_document(&args.old).and_then(|old| Ok((old, read_document(&args.new)?)));
    let (old_doc, new_doc) = match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let old_units = split_with_prefix(&old_doc, DEFAULT_EXTENSION_PREFIX);
    let new_units = split_with_prefix(&new_doc, DEFAULT_EXTENSION_PREFIX);
    let changed = compare_units(&old_units, &new_units);

    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    let _ = writeln!(w, "Routes changed: {}", changed.len());

    for route in &changed {
        let label =
            route_label(&route.relative_path).unwrap_or_else(|_| route.relative_path.clone());
        let _ = writeln!(w, "\n{} {label}", route.status.as_str());

        if route.status != ChangeStatus::Modified {
            continue;
        }
        let parse = |units: &specwatch_core::spec::UnitMap| {
            units
                .get(&route.relative_path)
                .and_then(|s| parse_document(s).ok())
                .unwrap_or(serde_json::Value::Null)
        };
        let entries = diff(&parse(&old_units), &parse(&new_units), "");
        for line in render_diff(&entries).lines() {
            let _ = writeln!(w, "  {line}");
        }
    }

    0
}

fn run_split(args: SplitArgs) -> i32 {
    let document = match read_document(&args.document) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let units = split_with_prefix(&document, &args.extension_prefix);

    let stdout = std::io::stdout();
    let mut w = stdout.lock();

    let Some(out) = args.out else {
        for id in units.keys() {
            let _ = writeln!(w, "{id}");
        }
        return 0;
    };

    for (id, content) in &units {
        let target = out.join(id);
        let written = target
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| std::fs::write(&target, content));
        if let Err(e) = written {
            eprintln!("Error: cannot write {}: {e}", target.display());
            return 1;
        }
    }
    let _ = writeln!(w, "Wrote {} units to {}", units.len(), out.display());
    0
}
