//! Publish report (publish_report.json) and plan output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mvn_resolve::{ArtifactCoordinate, Resolution};

use crate::publish::{DeployedBatch, PublishOutcome};

/// Schema version for publish reports
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for publish reports
pub const REPORT_SCHEMA_ID: &str = "mvn-publish/report@1";

/// Errors writing or reading reports
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Generate a new run_id using ULID (sortable, filesystem-safe)
pub fn generate_run_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Published,
    Skipped,
}

/// One deployed batch in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// `group:artifact:version`
    pub key: String,

    pub primary: PathBuf,

    /// Number of attached (non-primary) artifacts
    pub attachments: usize,

    /// Program followed by its arguments
    pub argv: Vec<String>,
}

impl From<&DeployedBatch> for BatchReport {
    fn from(batch: &DeployedBatch) -> Self {
        let mut argv = Vec::with_capacity(batch.command.args.len() + 1);
        argv.push(batch.command.program.clone());
        argv.extend(batch.command.args.iter().cloned());
        Self {
            key: batch.key.to_string(),
            primary: batch.primary.clone(),
            attachments: batch.artifacts.saturating_sub(1),
            argv,
        }
    }
}

/// Publish report (publish_report.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    pub schema_version: u32,
    pub schema_id: String,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub outcome: Outcome,

    /// Whether artifacts were deployed with signatures
    pub signed: bool,

    /// Batches in deploy order
    pub batches: Vec<BatchReport>,
}

impl PublishReport {
    pub fn new(run_id: String, outcome: &PublishOutcome) -> Self {
        let (outcome, signed, batches) = match outcome {
            PublishOutcome::Skipped => (Outcome::Skipped, false, Vec::new()),
            PublishOutcome::Published(run) => (
                Outcome::Published,
                run.signed,
                run.deployed.iter().map(BatchReport::from).collect(),
            ),
        };
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            schema_id: REPORT_SCHEMA_ID.to_string(),
            run_id,
            created_at: Utc::now(),
            outcome,
            signed,
            batches,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write atomically to file (write-then-rename)
    pub fn write_to_file(&self, path: &Path) -> Result<(), ReportError> {
        let json = self.to_json()?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self, ReportError> {
        let json = fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }
}

/// A resolved artifact with its on-disk size and digest.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedArtifact {
    #[serde(flatten)]
    pub coordinate: ArtifactCoordinate,
    pub size: u64,
    pub sha256: String,
}

impl PlannedArtifact {
    fn inspect(coordinate: &ArtifactCoordinate) -> io::Result<Self> {
        let contents = fs::read(coordinate.file())?;
        let sha256 = {
            let mut hasher = Sha256::new();
            hasher.update(&contents);
            hex::encode(hasher.finalize())
        };
        Ok(Self {
            coordinate: coordinate.clone(),
            size: contents.len() as u64,
            sha256,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedBatch {
    pub key: String,

    /// Primary first, then attachments in resolution order
    pub artifacts: Vec<PlannedArtifact>,
}

/// Output of `mvn-publish plan`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub batches: Vec<PlannedBatch>,
}

impl PlanReport {
    pub fn from_resolution(resolution: &Resolution) -> Result<Self, ReportError> {
        let mut batches = Vec::with_capacity(resolution.len());
        for (key, batch) in resolution {
            let artifacts = batch
                .artifacts()
                .iter()
                .map(PlannedArtifact::inspect)
                .collect::<io::Result<Vec<_>>>()?;
            batches.push(PlannedBatch {
                key: key.to_string(),
                artifacts,
            });
        }
        Ok(Self { batches })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
