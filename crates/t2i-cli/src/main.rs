use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use t2i_contracts::GenerationRequest;
use t2i_engine::{
    ImageGenerator, SyncGenerator, SyncProviderConfig, TaskGenerator, TaskProviderConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "t2i-rs", version, about = "Text-to-image provider client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// One-shot multimodal generation
    Sync(SyncArgs),
    /// Submit a task and poll until it settles
    Task(TaskArgs),
}

#[derive(Debug, Parser)]
struct SyncArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    size: Option<String>,
    #[arg(long)]
    aspect_ratio: Option<String>,
    #[arg(long)]
    negative_prompt: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct TaskArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    size: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("t2i-rs error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Sync(args) => run_sync(args),
        Command::Task(args) => run_task(args),
    }
}

fn run_sync(args: SyncArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SyncProviderConfig::from_json_str(&read_config(path)?)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => SyncProviderConfig::default(),
    };
    apply_sync_env(&mut config, non_empty_env);

    let mut request = GenerationRequest::new(args.prompt);
    request.model = args.model;
    request.size = args.size;
    request.aspect_ratio = args.aspect_ratio;
    request.negative_prompt = args.negative_prompt;

    let generator = SyncGenerator::new(config);
    write_output(&generator, &request, args.out)
}

fn run_task(args: TaskArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => TaskProviderConfig::from_json_str(&read_config(path)?)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => TaskProviderConfig::default(),
    };
    apply_task_env(&mut config, non_empty_env);

    let mut request = GenerationRequest::new(args.prompt);
    request.model = args.model;
    request.size = args.size;

    let generator = TaskGenerator::new(config);
    write_output(&generator, &request, args.out)
}

fn write_output(
    generator: &dyn ImageGenerator,
    request: &GenerationRequest,
    out: Option<PathBuf>,
) -> Result<()> {
    let bytes = generator
        .generate(request)
        .with_context(|| format!("{} generation failed", generator.name()))?;
    let out = out.unwrap_or_else(default_output_path);
    if let Some(parent) = out.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&out, &bytes).with_context(|| format!("failed to write {}", out.display()))?;
    tracing::info!(path = %out.display(), bytes = bytes.len(), "image written");
    println!("{} ({} bytes)", out.display(), bytes.len());
    Ok(())
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))
}

/// Environment wins over the config file for the credential and base URL.
fn apply_sync_env(config: &mut SyncProviderConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = lookup("DASHSCOPE_API_KEY") {
        config.api_key = Some(SecretString::from(key));
    }
    if let Some(base_url) = lookup("DASHSCOPE_BASE_URL") {
        config.base_url = Some(base_url);
    }
}

fn apply_task_env(config: &mut TaskProviderConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = lookup("MODELSCOPE_API_KEY") {
        config.api_key = Some(SecretString::from(key));
    }
    if let Some(base_url) = lookup("MODELSCOPE_BASE_URL") {
        config.base_url = Some(base_url);
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from(format!(
        "t2i-{}.png",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ))
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
