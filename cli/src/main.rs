use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Once};

static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "fen::machine=debug,fen::rt=debug,fen_core=info,fen_cli=info";

use anyhow::Context;
use clap::{Parser, Subcommand};
use fen_core::{ExecContext, FormatOptions, Program, RuntimeConfig, RuntimeError, Value};

mod repl;
mod rpn;

#[derive(Debug, Parser)]
#[command(name = "fen", author, version, about = "CLI for the Fen runtime core", long_about = None)]
struct CliArgs {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Runtime settings (TOML): force_mode, step_limit, [show]
    #[arg(long, global = true, value_name = "FILE", value_parser = parse_sanitized_path)]
    config: Option<PathBuf>,

    /// Abort after this many instructions (overrides the config file)
    #[arg(long, global = true, value_name = "N")]
    step_limit: Option<u64>,

    /// Format spec for printed results, e.g. `f2`, `x` or `q`
    #[arg(long, global = true, value_name = "SPEC")]
    format: Option<String>,

    /// Print results as JSON (forcing lazy parts) and runtime errors as JSON diagnostics
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a serialized program (.json, .yaml or .yml)
    Run {
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
    },
    /// Evaluate a postfix expression, e.g. `fen eval "1 2L +"`
    Eval {
        #[arg(value_name = "EXPR")]
        expr: String,
    },
    /// Interactive postfix evaluator
    Repl,
}

fn read_file_content(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

fn sanitize_path(raw: &str) -> anyhow::Result<PathBuf> {
    if raw.trim().is_empty() {
        anyhow::bail!("File path must not be empty.");
    }
    let candidate = PathBuf::from(raw);
    if candidate.components().any(|component| matches!(component, Component::ParentDir)) {
        anyhow::bail!("Parent directory components ('..') are not allowed in file paths.");
    }
    Ok(candidate)
}

fn parse_sanitized_path(raw: &str) -> Result<PathBuf, String> {
    sanitize_path(raw).map_err(|err| err.to_string())
}

fn env_toggle_enabled(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    !(trimmed.eq_ignore_ascii_case("0") || trimmed.eq_ignore_ascii_case("false") || trimmed.eq_ignore_ascii_case("off"))
}

fn filter_expr_from(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("1")
        || trimmed.eq_ignore_ascii_case("true")
        || trimmed.eq_ignore_ascii_case("on")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn maybe_init_tracing() {
    let raw = match std::env::var("FEN_TRACE") {
        Ok(value) => value,
        Err(_) => return,
    };

    if !env_toggle_enabled(&raw) {
        return;
    }

    TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let filter_expr = filter_expr_from(&raw).or_else(|| std::env::var("RUST_LOG").ok());

        let builder = fmt().with_writer(std::io::stderr);

        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(DEFAULT_TRACE_FILTER),
        };

        let _ = builder.try_init();
    });
}

/// Config file first, then command-line overrides.
fn load_config(path: Option<&Path>, step_limit: Option<u64>, format: Option<&str>) -> anyhow::Result<RuntimeConfig> {
    let mut config = match path {
        Some(path) => {
            let text = read_file_content(path)?;
            toml::from_str::<RuntimeConfig>(&text).with_context(|| format!("Invalid config file: {}", path.display()))?
        }
        None => RuntimeConfig::default(),
    };
    if step_limit.is_some() {
        config.step_limit = step_limit;
    }
    if let Some(spec) = format {
        let parsed = FormatOptions::parse(spec).ok_or_else(|| anyhow::anyhow!("Invalid format spec '{spec}'"))?;
        config.show = FormatOptions {
            max_items: config.show.max_items,
            ..parsed
        };
    }
    Ok(config)
}

fn load_program(path: &Path) -> anyhow::Result<Arc<Program>> {
    let text = read_file_content(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Program::from_json(&text),
        Some("yaml") | Some("yml") => Program::from_yaml(&text),
        _ => anyhow::bail!("Unsupported program file '{}': expected .json, .yaml or .yml", path.display()),
    }
}

pub(crate) fn evaluate(program: &Arc<Program>, config: &RuntimeConfig) -> anyhow::Result<Value> {
    let mut ctx = config.context();
    let mut machine = config.machine();
    let value = machine.run(program, &mut ctx)?;
    tracing::debug!(target: "fen_cli", steps = machine.steps(), "program finished");
    Ok(value)
}

/// Renders a result with the configured show options, or as JSON.
pub(crate) fn render(value: &Value, config: &RuntimeConfig, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string(&value.to_json()?)?);
    }
    // the cooperative loop is done; remaining lazy parts are forced eagerly
    let mut ctx = ExecContext::new().with_format(config.show.clone());
    let shown = value.show(&config.show, &mut ctx);
    ctx.finish(shown)
}

fn report(err: &anyhow::Error, json: bool) {
    match err.downcast_ref::<RuntimeError>() {
        Some(runtime) if json => match serde_json::to_string(runtime) {
            Ok(text) => eprintln!("{text}"),
            Err(_) => eprintln!("Error: {err:#}"),
        },
        _ => eprintln!("Error: {err:#}"),
    }
}

fn main() -> anyhow::Result<()> {
    maybe_init_tracing();

    let CliArgs {
        command,
        config,
        step_limit,
        format,
        json,
    } = CliArgs::parse();

    let config = match load_config(config.as_deref(), step_limit, format.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(2);
        }
    };

    let outcome = match command {
        None | Some(Commands::Repl) => return repl::run(&config),
        Some(Commands::Run { file }) => load_program(&file),
        Some(Commands::Eval { expr }) => rpn::compile(&expr),
    }
    .and_then(|program| evaluate(&program, &config))
    .and_then(|value| render(&value, &config, json));

    match outcome {
        Ok(text) => {
            println!("{text}");
            Ok(())
        }
        Err(err) => {
            report(&err, json);
            std::process::exit(1);
        }
    }
}
