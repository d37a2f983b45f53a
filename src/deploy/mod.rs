//! Deploy command construction
//!
//! Each batch becomes one `mvn deploy-file` (or `sign-and-deploy-file`)
//! invocation: the primary artifact's full coordinate plus, when there are
//! attachments, position-aligned `files`/`classifiers`/`types` lists.

mod runner;

pub use runner::{CommandRunner, ProcessRunner, RecordingRunner};

use std::fmt;
use std::path::Path;

use mvn_resolve::Batch;
use serde::Serialize;

use crate::config::Verbosity;
use crate::settings::{DEPLOY_REPO_ID, GPG_SERVER_ID};
use crate::signing::Keyring;

/// Plain deploy goal.
pub const MAVEN_DEPLOY: &str = "org.apache.maven.plugins:maven-deploy-plugin:2.8.2:deploy-file";

/// Sign-and-deploy goal.
pub const MAVEN_GPG: &str = "org.apache.maven.plugins:maven-gpg-plugin:1.6:sign-and-deploy-file";

/// Errors from running deploy commands
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command `{command}` failed: {detail}")]
    ExternalTool { command: String, detail: String },
}

/// A fully built external deploy invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl DeployCommand {
    /// `true` if `arg` appears verbatim in the argument list.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Value of the first `-D<name>=` property, if present.
    pub fn property(&self, name: &str) -> Option<&str> {
        let prefix = format!("-D{}=", name);
        self.args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))
    }
}

impl fmt::Display for DeployCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Everything shared by the deploy commands of one run.
#[derive(Debug, Clone, Copy)]
pub struct DeployContext<'a> {
    pub program: &'a str,
    pub url: &'a str,
    pub settings: &'a Path,
    pub verbosity: Verbosity,
    pub keyring: Option<&'a Keyring>,
}

impl DeployContext<'_> {
    /// Build the invocation for `batch`.
    pub fn command(&self, batch: &Batch) -> DeployCommand {
        let mut args = vec!["-B".to_string()];

        match self.verbosity {
            Verbosity::Quiet => args.push("-q".to_string()),
            Verbosity::Debug => args.push("-X".to_string()),
            Verbosity::Normal => {}
        }

        args.push("--settings".to_string());
        args.push(self.settings.display().to_string());

        match self.keyring {
            Some(keyring) => {
                args.push(MAVEN_GPG.to_string());
                args.push(format!("-Dgpg.homedir={}", keyring.dir().display()));
                args.push("-Dgpg.defaultKeyring=false".to_string());
                args.push(format!("-Dgpg.publicKeyring={}", keyring.public_ring().display()));
                args.push(format!("-Dgpg.secretKeyring={}", keyring.secret_ring().display()));
                args.push(format!("-Dgpg.keyname={}", keyring.key_id()));
                args.push(format!("-Dgpg.passphraseServerId={}", GPG_SERVER_ID));
                args.push(format!("-Dgpg.ascDirectory={}", keyring.dir().display()));
            }
            None => args.push(MAVEN_DEPLOY.to_string()),
        }

        let primary = batch.primary();
        args.push(format!("-Durl={}", self.url));
        args.push(format!("-DrepositoryId={}", DEPLOY_REPO_ID));
        args.push(format!("-DgroupId={}", primary.group_id));
        args.push(format!("-DartifactId={}", primary.artifact_id));
        args.push(format!("-Dversion={}", primary.version));
        args.push(format!("-Dfile={}", primary.file.display()));
        if !primary.extension.is_empty() {
            args.push(format!("-Dpackaging={}", primary.extension));
        }
        if !primary.classifier.is_empty() {
            args.push(format!("-Dclassifier={}", primary.classifier));
        }

        let attached = batch.attached();
        if !attached.is_empty() {
            let join = |field: fn(&mvn_resolve::ArtifactCoordinate) -> String| {
                attached.iter().map(field).collect::<Vec<_>>().join(",")
            };
            args.push(format!("-Dfiles={}", join(|a| a.file.display().to_string())));
            args.push(format!("-Dclassifiers={}", join(|a| a.classifier.clone())));
            args.push(format!("-Dtypes={}", join(|a| a.extension.clone())));
        }

        DeployCommand {
            program: self.program.to_string(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvn_resolve::ArtifactCoordinate;

    fn artifact(file: &str, classifier: &str, extension: &str) -> ArtifactCoordinate {
        ArtifactCoordinate {
            group_id: "com.test".to_string(),
            artifact_id: "app-client".to_string(),
            version: "0.1.4".to_string(),
            classifier: classifier.to_string(),
            extension: extension.to_string(),
            file: file.into(),
        }
    }

    fn context(verbosity: Verbosity) -> DeployContext<'static> {
        DeployContext {
            program: "mvn",
            url: "https://repo.example.com",
            settings: Path::new("/tmp/settings.xml"),
            verbosity,
            keyring: None,
        }
    }

    #[test]
    fn test_single_artifact_command() {
        let batch = Batch::new(artifact("/ws/app.zip", "", "zip"));
        let command = context(Verbosity::Normal).command(&batch);

        assert_eq!(command.program, "mvn");
        assert_eq!(
            command.args,
            vec![
                "-B",
                "--settings",
                "/tmp/settings.xml",
                MAVEN_DEPLOY,
                "-Durl=https://repo.example.com",
                "-DrepositoryId=deploy-repo",
                "-DgroupId=com.test",
                "-DartifactId=app-client",
                "-Dversion=0.1.4",
                "-Dfile=/ws/app.zip",
                "-Dpackaging=zip",
            ]
        );
    }

    #[test]
    fn test_verbosity_flags() {
        let batch = Batch::new(artifact("/ws/app.zip", "", "zip"));
        assert_eq!(context(Verbosity::Quiet).command(&batch).args[1], "-q");
        assert_eq!(context(Verbosity::Debug).command(&batch).args[1], "-X");
        assert_eq!(context(Verbosity::Normal).command(&batch).args[1], "--settings");
    }

    #[test]
    fn test_attached_lists_are_aligned() {
        let mut batch = Batch::new(artifact("/ws/app-linux.tar.gz", "linux-amd64", "tar.gz"));
        batch.attach(artifact("/ws/app.pom", "", "pom"));
        batch.attach(artifact("/ws/app-win.zip", "windows-amd64", "zip"));

        let command = context(Verbosity::Normal).command(&batch);
        assert_eq!(command.property("file"), Some("/ws/app-linux.tar.gz"));
        assert_eq!(command.property("classifier"), Some("linux-amd64"));
        assert_eq!(command.property("packaging"), Some("tar.gz"));
        assert_eq!(command.property("files"), Some("/ws/app.pom,/ws/app-win.zip"));
        assert_eq!(command.property("classifiers"), Some(",windows-amd64"));
        assert_eq!(command.property("types"), Some("pom,zip"));
    }

    #[test]
    fn test_no_attachment_lists_for_single_artifact() {
        let batch = Batch::new(artifact("/ws/app.zip", "bin", "zip"));
        let command = context(Verbosity::Normal).command(&batch);
        assert_eq!(command.property("classifier"), Some("bin"));
        assert!(command.property("files").is_none());
        assert!(command.property("classifiers").is_none());
        assert!(command.property("types").is_none());
    }

    #[test]
    fn test_signing_uses_gpg_goal_and_keyring() {
        let keyring = Keyring::in_temp_dir("3AA5C34371567BD2").unwrap();
        let ctx = DeployContext {
            keyring: Some(&keyring),
            ..context(Verbosity::Normal)
        };
        let command = ctx.command(&Batch::new(artifact("/ws/app.zip", "", "zip")));

        assert!(command.has_arg(MAVEN_GPG));
        assert!(!command.has_arg(MAVEN_DEPLOY));
        assert_eq!(
            command.property("gpg.homedir"),
            Some(keyring.dir().to_str().unwrap())
        );
        assert_eq!(command.property("gpg.defaultKeyring"), Some("false"));
        assert_eq!(command.property("gpg.keyname"), Some("3AA5C34371567BD2"));
        assert_eq!(command.property("gpg.passphraseServerId"), Some("gpg-auth"));
        assert_eq!(
            command.property("gpg.secretKeyring"),
            Some(keyring.secret_ring().to_str().unwrap())
        );
        assert_eq!(
            command.property("gpg.ascDirectory"),
            Some(keyring.dir().to_str().unwrap())
        );
    }

    #[test]
    fn test_display_is_command_line() {
        let command = DeployCommand {
            program: "mvn".to_string(),
            args: vec!["-B".to_string(), "-q".to_string()],
        };
        assert_eq!(command.to_string(), "mvn -B -q");
    }
}
