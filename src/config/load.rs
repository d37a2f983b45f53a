//! Config file loading and override layering.

use std::path::{Path, PathBuf};

use super::PublishConfig;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".mvn-publish.toml";

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

impl PublishConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists, or
    /// fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load from a specific TOML file, which must exist.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply command-line and environment overrides on top of file values.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        overrides.apply(&mut self);
        self
    }
}

/// Values supplied on the command line or through `PLUGIN_*` variables.
///
/// `None` keeps the file value; `Some` replaces it.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workspace: Option<PathBuf>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
    pub group: Option<String>,
    pub artifact: Option<String>,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub extension: Option<String>,
    pub source: Option<String>,
    pub regexp: Option<String>,
    pub debug: Option<bool>,
    pub quiet: Option<bool>,
    pub gpg_private_key: Option<String>,
    pub gpg_passphrase: Option<String>,
}

impl ConfigOverrides {
    fn apply(self, config: &mut PublishConfig) {
        set(&mut config.workspace, self.workspace);
        set(&mut config.repository.username, self.username);
        set(&mut config.repository.password, self.password);
        set(&mut config.repository.url, self.url);
        set(&mut config.artifact.group_id, self.group);
        set(&mut config.artifact.artifact_id, self.artifact);
        set(&mut config.artifact.version, self.version);
        set(&mut config.artifact.classifier, self.classifier);
        set(&mut config.artifact.extension, self.extension);
        set(&mut config.args.source, self.source);
        set(&mut config.args.regexp, self.regexp);
        set(&mut config.args.debug, self.debug);
        set(&mut config.args.quiet, self.quiet);
        set(&mut config.gpg.private_key, self.gpg_private_key);
        set(&mut config.gpg.passphrase, self.gpg_passphrase);
    }
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}
