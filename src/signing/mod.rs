//! Signing collaborator
//!
//! Signing itself is done by the deploy tool; this module only prepares an
//! ephemeral GnuPG home holding the configured private key and reports
//! where it lives and which key id to sign with. Nothing is written to the
//! user's own GnuPG home.

mod gpg;

pub use gpg::{parse_secret_key_id, GnuPg};

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

use crate::config::GpgConfig;

pub(crate) const PUBLIC_RING: &str = "public.gpg";
pub(crate) const SECRET_RING: &str = "secret.gpg";

/// Errors from keyring preparation
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{program} failed: {detail}")]
    ExternalTool { program: String, detail: String },

    #[error("could not find private key in keyring")]
    KeyNotFound,

    #[error("malformed key listing line '{0}'")]
    MalformedListing(String),
}

/// An ephemeral keyring. The directory is removed when this is dropped,
/// after stopping any gpg-agent serving it.
#[derive(Debug)]
pub struct Keyring {
    dir: TempDir,
    public_ring: PathBuf,
    secret_ring: PathBuf,
    key_id: String,
    gpgconf: Option<String>,
}

impl Keyring {
    pub fn new(dir: TempDir, key_id: impl Into<String>) -> Self {
        let public_ring = dir.path().join(PUBLIC_RING);
        let secret_ring = dir.path().join(SECRET_RING);
        Self {
            dir,
            public_ring,
            secret_ring,
            key_id: key_id.into(),
            gpgconf: None,
        }
    }

    /// Stop the gpg-agent for this home with `gpgconf` on drop.
    pub fn with_agent_control(mut self, gpgconf: impl Into<String>) -> Self {
        self.gpgconf = Some(gpgconf.into());
        self
    }

    /// A keyring in a fresh temp directory, with no keys imported yet.
    pub fn in_temp_dir(key_id: impl Into<String>) -> io::Result<Self> {
        Ok(Self::new(keyring_dir()?, key_id))
    }

    /// Keyring directory; detached signatures are written here too.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn public_ring(&self) -> &Path {
        &self.public_ring
    }

    pub fn secret_ring(&self) -> &Path {
        &self.secret_ring
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl Drop for Keyring {
    fn drop(&mut self) {
        let Some(gpgconf) = &self.gpgconf else {
            return;
        };
        let status = Command::new(gpgconf)
            .arg("--homedir")
            .arg(self.dir.path())
            .args(["--kill", "gpg-agent"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::debug!(%status, "gpgconf --kill gpg-agent failed"),
            Err(e) => tracing::debug!(error = %e, "could not run {}", gpgconf),
        }
    }
}

/// Materializes a keyring from configured key material.
pub trait KeyringProvider {
    fn prepare(&self, gpg: &GpgConfig) -> Result<Keyring, SigningError>;
}

/// Create the temp directory a keyring lives in.
pub(crate) fn keyring_dir() -> io::Result<TempDir> {
    tempfile::Builder::new().prefix("mvn-publish-keydir").tempdir()
}
