//! Publish configuration
//!
//! One value carries everything a run needs: the target repository, the
//! default coordinate, the source selection and the optional signing key.
//! It is loaded from a TOML file and then overridden by CLI flags and
//! `PLUGIN_*` environment variables (see [`ConfigOverrides`]).

mod load;

pub use load::{ConfigError, ConfigOverrides, DEFAULT_CONFIG_FILE};

use std::fmt;
use std::path::{Path, PathBuf};

use mvn_resolve::DefaultCoordinate;
use serde::Deserialize;

/// Complete configuration of a publish run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Base directory the source glob and regexp are evaluated against
    pub workspace: PathBuf,

    /// Target Maven repository
    pub repository: RepositoryConfig,

    /// Fallback coordinate for fields the regexp does not capture
    pub artifact: DefaultCoordinate,

    /// Source selection and output options
    pub args: RunArgs,

    /// Signing key material (signing is off when the key is empty)
    pub gpg: GpgConfig,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            repository: RepositoryConfig::default(),
            artifact: DefaultCoordinate::default(),
            args: RunArgs::default(),
            gpg: GpgConfig::default(),
        }
    }
}

impl PublishConfig {
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn verbosity(&self) -> Verbosity {
        self.args.verbosity()
    }
}

/// Target Maven repository configuration.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub username: String,
    pub password: String,
    pub url: String,
}

impl RepositoryConfig {
    /// Both username and password are set.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("url", &self.url)
            .finish()
    }
}

/// Source selection and output options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunArgs {
    /// Artifact file glob, relative to the workspace
    pub source: String,

    /// Regexp with named groups that parses matched paths into coordinates.
    /// Required when `source` matches more than one file.
    pub regexp: String,

    /// Verbose output, including every external command line
    pub debug: bool,

    /// Suppress tool output; takes precedence over `debug`
    pub quiet: bool,

    /// Deploy executable
    pub mvn_command: String,

    /// Signing executable
    pub gpg_command: String,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            source: String::new(),
            regexp: String::new(),
            debug: false,
            quiet: false,
            mvn_command: "mvn".to_string(),
            gpg_command: "gpg".to_string(),
        }
    }
}

impl RunArgs {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// GnuPG key material used for signing releases.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct GpgConfig {
    /// ASCII-armored private key
    pub private_key: String,

    /// Private key passphrase (optional)
    pub passphrase: String,
}

impl GpgConfig {
    pub fn is_enabled(&self) -> bool {
        !self.private_key.is_empty()
    }
}

impl fmt::Debug for GpgConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpgConfig")
            .field("private_key", &redacted(&self.private_key))
            .field("passphrase", &redacted(&self.passphrase))
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "[REDACTED]"
    }
}

/// Output level threaded through every component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Only errors; external tools run with their quiet flag
    Quiet,
    #[default]
    Normal,
    /// External tools run with their debug flag
    Debug,
}

impl Verbosity {
    pub fn is_quiet(self) -> bool {
        self == Verbosity::Quiet
    }
}
