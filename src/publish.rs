//! Publish orchestration
//!
//! A run moves through
//! `Idle → Validated → (SigningSetup) → SettingsPrepared → Deploying* → Done`
//! and moves to `Failed` at the first error. The settings file and keyring are scoped
//! to the run and removed on every exit path.

use std::cell::Cell;
use std::path::PathBuf;

use mvn_resolve::{BatchKey, ExtractionPattern, ResolveError, Resolution};

use crate::config::{ConfigError, PublishConfig};
use crate::deploy::{CommandRunner, DeployCommand, DeployContext, DeployError};
use crate::settings::{MavenSettings, SettingsError};
use crate::signing::{KeyringProvider, SigningError};

/// Errors that abort a publish run
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("signing setup failed: {0}")]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

/// Progress of a publish run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validated,
    SigningSetup,
    SettingsPrepared,
    Deploying,
    Done,
    Failed,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Credentials were absent; nothing was deployed.
    Skipped,
    Published(PublishRun),
}

impl PublishOutcome {
    pub fn deployed(&self) -> &[DeployedBatch] {
        match self {
            PublishOutcome::Skipped => &[],
            PublishOutcome::Published(run) => &run.deployed,
        }
    }
}

/// Record of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRun {
    pub signed: bool,
    pub deployed: Vec<DeployedBatch>,
}

/// One batch that was deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedBatch {
    pub key: BatchKey,
    pub primary: PathBuf,
    pub artifacts: usize,
    pub command: DeployCommand,
}

/// Resolve the configured sources into batches without deploying anything.
pub fn plan(config: &PublishConfig) -> Result<Resolution, PublishError> {
    if config.args.source.is_empty() {
        return Err(PublishError::Configuration("source is required".to_string()));
    }
    let pattern = ExtractionPattern::optional(&config.args.regexp)?;
    let resolution = mvn_resolve::resolve_sources(
        config.workspace(),
        &config.args.source,
        pattern.as_ref(),
        &config.artifact,
    )?;
    Ok(resolution)
}

/// Drives one publish run against its collaborators.
pub struct Publisher<'a> {
    config: &'a PublishConfig,
    runner: &'a dyn CommandRunner,
    keyrings: &'a dyn KeyringProvider,
    stage: Cell<Stage>,
    failed_at: Cell<Option<Stage>>,
}

impl<'a> Publisher<'a> {
    pub fn new(
        config: &'a PublishConfig,
        runner: &'a dyn CommandRunner,
        keyrings: &'a dyn KeyringProvider,
    ) -> Self {
        Self {
            config,
            runner,
            keyrings,
            stage: Cell::new(Stage::Idle),
            failed_at: Cell::new(None),
        }
    }

    /// Current stage; `Failed` once a run has returned an error.
    pub fn stage(&self) -> Stage {
        self.stage.get()
    }

    /// Stage that was running when the run failed.
    pub fn failed_at(&self) -> Option<Stage> {
        self.failed_at.get()
    }

    pub fn publish(&self) -> Result<PublishOutcome, PublishError> {
        let result = self.run();
        if let Err(e) = &result {
            let stage = self.stage();
            tracing::debug!(?stage, error = %e, "publish failed");
            self.failed_at.set(Some(stage));
            self.stage.set(Stage::Failed);
        }
        result
    }

    fn enter(&self, stage: Stage) {
        tracing::debug!(?stage, "publish stage");
        self.stage.set(stage);
    }

    fn run(&self) -> Result<PublishOutcome, PublishError> {
        let repository = &self.config.repository;
        let verbosity = self.config.verbosity();

        // Forks typically build without deploy secrets.
        if !repository.has_credentials() {
            tracing::info!("username or password is empty, skipping publish");
            return Ok(PublishOutcome::Skipped);
        }
        if repository.url.is_empty() {
            return Err(PublishError::Configuration(
                "repository url is required".to_string(),
            ));
        }
        self.enter(Stage::Validated);

        let resolution = plan(self.config)?;
        tracing::info!(
            batches = resolution.len(),
            artifacts = resolution.artifact_count(),
            "resolved artifacts"
        );

        let keyring = if self.config.gpg.is_enabled() {
            self.enter(Stage::SigningSetup);
            Some(self.keyrings.prepare(&self.config.gpg)?)
        } else {
            None
        };

        let passphrase = keyring
            .as_ref()
            .map(|_| self.config.gpg.passphrase.as_str());
        let settings = MavenSettings::for_run(&repository.username, &repository.password, passphrase)
            .write_temp()?;
        self.enter(Stage::SettingsPrepared);
        tracing::debug!(path = %settings.path().display(), "wrote maven settings");

        let context = DeployContext {
            program: &self.config.args.mvn_command,
            url: &repository.url,
            settings: settings.path(),
            verbosity,
            keyring: keyring.as_ref(),
        };

        let mut deployed = Vec::with_capacity(resolution.len());
        for (key, batch) in &resolution {
            self.enter(Stage::Deploying);
            let command = context.command(batch);
            if !verbosity.is_quiet() {
                tracing::info!("$ {}", command);
            }
            self.runner.run(&command)?;
            deployed.push(DeployedBatch {
                key: key.clone(),
                primary: batch.primary().file().to_path_buf(),
                artifacts: batch.artifact_count(),
                command,
            });
        }

        self.enter(Stage::Done);
        Ok(PublishOutcome::Published(PublishRun {
            signed: keyring.is_some(),
            deployed,
        }))
    }
}
