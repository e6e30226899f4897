use crate::{
    config::Config,
    pipeline::{self, Backend},
    runtime::{ModelServer, OllamaServer},
    util::ensure_dir,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command as ProcessCommand;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "patient-intake")]
#[command(about = "Patient order form extractor (OCR + LLM structured fields)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./patient-intake.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the OCR tools and model backends are available.
    Doctor {},
    /// Run OCR only and print the cleaned text.
    Ocr {
        #[arg(long)]
        input: PathBuf,
    },
    /// Run the full pipeline and print the extracted fields as JSON.
    Extract {
        #[arg(long)]
        input: PathBuf,
        /// Use the local model process instead of the hosted API.
        #[arg(long)]
        local: bool,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::Ocr { input } => ocr(&cfg, input),
        Command::Extract { input, local } => extract(&cfg, input, *local),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("patient-intake.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("patient-intake.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

#[derive(Debug, Serialize)]
struct Diagnostics {
    pdftoppm: Option<String>,
    tesseract: Option<String>,
    ollama_reachable: bool,
    api_key_present: bool,
    ok: bool,
}

fn doctor(cfg: &Config) -> Result<()> {
    let pdftoppm = tool_version(&cfg.ocr.pdftoppm_exe, "-v");
    let tesseract = tool_version(&cfg.ocr.tesseract_exe, "--version");
    let ollama_reachable = OllamaServer::new(cfg).probe();
    let api_key_present = std::env::var(&cfg.openai.api_key_env).is_ok();

    let diag = Diagnostics {
        ok: pdftoppm.is_some() && tesseract.is_some() && (ollama_reachable || api_key_present),
        pdftoppm,
        tesseract,
        ollama_reachable,
        api_key_present,
    };
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

/// First line of the tool's version banner, or None if it can't run.
fn tool_version(exe: &str, flag: &str) -> Option<String> {
    let output = ProcessCommand::new(exe).arg(flag).output().ok()?;
    // pdftoppm prints its banner to stderr, tesseract to stdout.
    let banner = if output.stdout.is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    String::from_utf8_lossy(&banner)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
}

fn ocr(cfg: &Config, input: &Path) -> Result<()> {
    validate_input(cfg, input)?;
    let raw = crate::ocr::extract_text(cfg, input)?;
    let text = crate::postprocess::clean_text(cfg, &raw)?;
    println!("{text}");
    Ok(())
}

fn extract(cfg: &Config, input: &Path, local: bool) -> Result<()> {
    validate_input(cfg, input)?;

    let backend = if local {
        Backend::Local
    } else {
        Backend::Remote
    };

    match pipeline::extract_patient_data(cfg, input, backend) {
        Some(fields) => {
            println!("{}", serde_json::to_string_pretty(&fields)?);
            if cfg.global.print_summary {
                eprintln!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "input": input,
                        "backend": if local { "local" } else { "remote" },
                        "finished": crate::util::now_rfc3339(),
                        "status": "ok",
                    }))?
                );
            }
            Ok(())
        }
        None => bail!("failed to extract data"),
    }
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        bail!("URL inputs are disabled: {input_str}");
    }

    if !input.exists() {
        bail!("input does not exist: {}", input.display());
    }

    if let Some(ext) = input.extension().and_then(|s| s.to_str()) {
        if ext.to_ascii_lowercase() != "pdf" {
            bail!("input is not a PDF: {}", input.display());
        }
    } else {
        warn!("input has no extension; assuming PDF: {}", input.display());
    }

    Ok(())
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(PathBuf::from(&cfg.paths.out_dir).join("patient-intake.log"))
}
