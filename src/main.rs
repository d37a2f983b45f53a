//! mvn-publish CLI
//!
//! Entry point for the `mvn-publish` command-line tool. Every option can
//! also be supplied through the matching `PLUGIN_*` environment variable.

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use mvn_publish::report::generate_run_id;
use mvn_publish::{
    plan, ConfigError, ConfigOverrides, GnuPg, PlanReport, ProcessRunner, PublishConfig,
    PublishError, PublishOutcome, PublishReport, Publisher, ReportError, Verbosity,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mvn-publish")]
#[command(about = "Deploy build artifacts to a Maven repository")]
struct Cli {
    /// Path to config file (default: .mvn-publish.toml if present)
    #[arg(long, short = 'c', global = true, env = "PLUGIN_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: OverrideArgs,

    /// Defaults to `publish`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and deploy artifacts
    Publish {
        /// Write a JSON publish report to this path
        #[arg(long, env = "PLUGIN_REPORT")]
        report: Option<PathBuf>,
    },

    /// Resolve artifacts and print the batches as JSON without deploying
    Plan,
}

#[derive(Debug, Args)]
struct OverrideArgs {
    /// Base directory the source glob is evaluated against
    #[arg(long, global = true, env = "PLUGIN_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Repository username
    #[arg(long, global = true, env = "PLUGIN_USERNAME")]
    username: Option<String>,

    /// Repository password
    #[arg(long, global = true, env = "PLUGIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Repository URL
    #[arg(long, global = true, env = "PLUGIN_URL")]
    url: Option<String>,

    /// Default groupId
    #[arg(long, global = true, env = "PLUGIN_GROUP")]
    group: Option<String>,

    /// Default artifactId
    #[arg(long, global = true, env = "PLUGIN_ARTIFACT")]
    artifact: Option<String>,

    /// Default version
    #[arg(long, global = true, env = "PLUGIN_VERSION")]
    version: Option<String>,

    /// Default classifier
    #[arg(long, global = true, env = "PLUGIN_CLASSIFIER")]
    classifier: Option<String>,

    /// Default packaging type
    #[arg(long, global = true, env = "PLUGIN_EXTENSION")]
    extension: Option<String>,

    /// Artifact file glob
    #[arg(long, global = true, env = "PLUGIN_SOURCE")]
    source: Option<String>,

    /// Regexp with named groups (group, artifact, version, classifier, extension)
    #[arg(long, global = true, env = "PLUGIN_REGEXP")]
    regexp: Option<String>,

    /// Verbose output
    #[arg(
        long,
        global = true,
        env = "PLUGIN_DEBUG",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    debug: bool,

    /// Quiet output; wins over --debug
    #[arg(
        long,
        global = true,
        env = "PLUGIN_QUIET",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    quiet: bool,

    /// ASCII-armored GPG private key; enables signing
    #[arg(long, global = true, env = "PLUGIN_GPG_PRIVATE_KEY", hide_env_values = true)]
    gpg_private_key: Option<String>,

    /// GPG private key passphrase
    #[arg(long, global = true, env = "PLUGIN_GPG_PASSPHRASE", hide_env_values = true)]
    gpg_passphrase: Option<String>,
}

impl From<OverrideArgs> for ConfigOverrides {
    fn from(args: OverrideArgs) -> Self {
        ConfigOverrides {
            workspace: args.workspace,
            username: args.username,
            password: args.password,
            url: args.url,
            group: args.group,
            artifact: args.artifact,
            version: args.version,
            classifier: args.classifier,
            extension: args.extension,
            source: args.source,
            regexp: args.regexp,
            debug: args.debug.then_some(true),
            quiet: args.quiet.then_some(true),
            gpg_private_key: args.gpg_private_key,
            gpg_passphrase: args.gpg_passphrase,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("failed to write report: {0}")]
    Report(#[from] ReportError),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let overrides = ConfigOverrides::from(cli.overrides);

    let config = PublishConfig::load(cli.config.as_deref()).map(|c| c.with_overrides(overrides));
    init_logging(config.as_ref().map(|c| c.verbosity()).unwrap_or_default());

    let result = config.map_err(CliError::from).and_then(|config| match cli.command {
        None => run_publish(&config, None),
        Some(Commands::Publish { report }) => run_publish(&config, report),
        Some(Commands::Plan) => run_plan(&config),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbosity: Verbosity) {
    let default = match verbosity {
        Verbosity::Quiet => "warn",
        Verbosity::Normal => "info",
        Verbosity::Debug => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}

fn run_publish(config: &PublishConfig, report: Option<PathBuf>) -> Result<(), CliError> {
    let verbosity = config.verbosity();
    let runner = ProcessRunner::new(verbosity);
    let keyrings = GnuPg::new(config.args.gpg_command.clone(), verbosity);

    let outcome = Publisher::new(config, &runner, &keyrings).publish()?;
    if let PublishOutcome::Published(run) = &outcome {
        info!(batches = run.deployed.len(), signed = run.signed, "publish complete");
    }

    if let Some(path) = report {
        PublishReport::new(generate_run_id(), &outcome).write_to_file(&path)?;
        info!(path = %path.display(), "wrote publish report");
    }
    Ok(())
}

fn run_plan(config: &PublishConfig) -> Result<(), CliError> {
    let resolution = plan(config)?;
    let report = PlanReport::from_resolution(&resolution)?;
    println!("{}", report.to_json()?);
    Ok(())
}
