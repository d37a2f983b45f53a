//! mvn-publish - deploy CI build outputs to a Maven repository
//!
//! Files selected by a glob are parsed into Maven coordinates (see the
//! `mvn-resolve` crate), grouped into batches that share
//! `group:artifact:version`, and deployed with one `mvn deploy-file` call per
//! batch, optionally signed with an ephemeral GnuPG keyring.

pub mod config;
pub mod deploy;
pub mod publish;
pub mod report;
pub mod settings;
pub mod signing;

pub use config::{ConfigError, ConfigOverrides, PublishConfig, Verbosity};
pub use deploy::{CommandRunner, DeployCommand, DeployError, ProcessRunner, RecordingRunner};
pub use publish::{plan, PublishError, PublishOutcome, Publisher, Stage};
pub use report::{PlanReport, PublishReport, ReportError};
pub use signing::{GnuPg, Keyring, KeyringProvider, SigningError};
