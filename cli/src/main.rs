//! `slack-watchman` - scans a Slack Enterprise Grid for exposed secrets.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use watchman_api::{ApiClient, SlackApi};
use watchman_core::{pool, ApiToken, AppConfig, LoadPolicy, Lookback};
use watchman_scanner::{
    load_replacement_text, JsonSink, ResultSink, RunOptions, TerminalSink, Watchman,
};
use watchman_signatures::{SignatureLoader, SignatureRegistry};
use watchman_slack::Fetcher;

/// Monitors a Slack Enterprise Grid for exposed secrets and sensitive data.
///
/// The discovery API token is read from `SLACK_WATCHMAN_EG_TOKEN`.
#[derive(Debug, Parser)]
#[command(name = "slack-watchman", version, about)]
struct Cli {
    /// Hours to look back (1-24)
    #[arg(long)]
    hours: Option<u32>,

    /// Minutes to look back (1-60), added to --hours
    #[arg(long)]
    minutes: Option<u32>,

    /// Worker count (1-12), limited to the available CPUs
    #[arg(long)]
    cores: Option<usize>,

    /// How notifications are written
    #[arg(long, value_enum, default_value_t = OutputFormat::Terminal)]
    output: OutputFormat,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Notify every user in the enterprise
    #[arg(long)]
    users: bool,

    /// Notify every workspace in the enterprise
    #[arg(long)]
    workspaces: bool,

    /// Notify every conversation created in the window
    #[arg(long)]
    conversations: bool,

    /// Use only the sandbox signatures
    #[arg(long)]
    sandbox: bool,

    /// Replace matched messages and files with a tombstone
    #[arg(long)]
    tombstone: bool,

    /// File with custom tombstone text
    #[arg(long, value_name = "PATH", requires = "tombstone")]
    tombstone_text_file: Option<PathBuf>,

    /// Root directory of the signature tree
    #[arg(long, value_name = "PATH")]
    signatures: Option<PathBuf>,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Fail with every invalid signature file instead of the first
    #[arg(long)]
    strict_signatures: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Terminal,
    Json,
}

/// Initialize tracing subscriber for logging
fn init_tracing(debug: bool, output: OutputFormat) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,watchman=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match output {
        OutputFormat::Terminal => registry.with(fmt::layer().with_target(true)).init(),
        // Notifications own stdout in JSON mode.
        OutputFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

/// Configuration file, then environment, then flags.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("failed to load config")?,
    };
    config.apply_env_overrides(|key| std::env::var(key).ok());

    if let Some(dir) = &cli.signatures {
        config.signatures.dir.clone_from(dir);
    }
    if cli.cores.is_some() {
        config.scanning.cores = cli.cores;
    }
    if cli.strict_signatures {
        config.signatures.policy = LoadPolicy::Aggregate;
    }
    Ok(config)
}

fn signature_loader(cli: &Cli, config: &AppConfig) -> Result<SignatureLoader> {
    let dir = &config.signatures.dir;
    let loader = if cli.sandbox {
        SignatureLoader::sandbox(dir)
    } else {
        SignatureLoader::new(dir)
    };
    let loader =
        loader.with_context(|| format!("no signatures found under {}", dir.display()))?;

    Ok(loader
        .with_policy(config.signatures.policy)
        .with_self_test(config.signatures.self_test))
}

fn run_options(cli: &Cli) -> RunOptions {
    let replacement_text = cli
        .tombstone_text_file
        .as_deref()
        .and_then(|path| match load_replacement_text(path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "using the default tombstone text");
                None
            }
        });

    RunOptions {
        enumerate_users: cli.users,
        enumerate_workspaces: cli.workspaces,
        enumerate_conversations: cli.conversations,
        tombstone: cli.tombstone,
        replacement_text,
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting Slack Watchman v{}", env!("CARGO_PKG_VERSION"));

    let config = resolve_config(&cli)?;
    let token = ApiToken::from_env()?;

    let registry = SignatureRegistry::load_from(&signature_loader(&cli, &config)?)
        .context("failed to load signatures")?;

    let lookback = Lookback::from_parts(cli.hours, cli.minutes);
    let cores = pool::resolve_cores(config.scanning.cores, pool::detected_cores());
    info!(minutes = lookback.minutes(), cores, "run window");

    let client = ApiClient::from_config(&config.api, token)?;
    let fetcher = Fetcher::new(SlackApi::new(client), lookback.oldest(), cores);

    let sink: Arc<dyn ResultSink> = match cli.output {
        OutputFormat::Terminal => Arc::new(TerminalSink),
        OutputFormat::Json => Arc::new(JsonSink::stdout()),
    };

    let summary = Watchman::new(fetcher, run_options(&cli))
        .run(&registry, sink.as_ref())
        .await?;

    info!(
        run_id = %summary.run_id,
        results = summary.results,
        signatures = summary.signatures,
        "Slack Watchman finished"
    );
    if let Some(report) = &summary.remediation {
        info!(
            tombstoned = report.tombstoned,
            failed = report.failures.len(),
            "remediation summary"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.output);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "critical error");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("slack-watchman").chain(args.iter().copied()))
            .expect("parse arguments")
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.output, OutputFormat::Terminal);
        assert!(!cli.tombstone);
        assert!(cli.hours.is_none());
    }

    #[test]
    fn test_text_file_requires_tombstone() {
        let result = Cli::try_parse_from([
            "slack-watchman",
            "--tombstone-text-file",
            "text.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_options_from_flags() {
        let cli = parse(&["--users", "--conversations", "--tombstone", "--output", "json"]);
        let options = run_options(&cli);

        assert!(options.enumerate_users);
        assert!(!options.enumerate_workspaces);
        assert!(options.enumerate_conversations);
        assert!(options.tombstone);
        assert!(options.replacement_text.is_none());
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_unreadable_text_file_falls_back() {
        let cli = parse(&["--tombstone", "--tombstone-text-file", "/nonexistent/text.txt"]);
        assert!(run_options(&cli).replacement_text.is_none());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::TempDir::new().expect("create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scanning]\ncores = 2\n\n[signatures]\ndir = \"rules\"\n")
            .expect("write config");

        let path_arg = path.display().to_string();
        let cli = parse(&[
            "--config",
            &path_arg,
            "--cores",
            "4",
            "--signatures",
            "/opt/signatures",
            "--strict-signatures",
        ]);
        let config = resolve_config(&cli).expect("resolve config");

        assert_eq!(config.scanning.cores, Some(4));
        assert_eq!(config.signatures.dir, PathBuf::from("/opt/signatures"));
        assert_eq!(config.signatures.policy, LoadPolicy::Aggregate);
    }
}
