//! Transient Maven `settings.xml`
//!
//! Carries the credentials for the deploy repository and, when signing, the
//! GnuPG passphrase. The file lives in the system temp dir and is deleted
//! when the [`SettingsFile`] is dropped.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Server id the deploy credentials are registered under.
pub const DEPLOY_REPO_ID: &str = "deploy-repo";

/// Server id the signing passphrase is registered under.
pub const GPG_SERVER_ID: &str = "gpg-auth";

/// Errors writing the settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to write settings file: {0}")]
    Io(#[from] io::Error),
}

/// A `<server>` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Server {
    pub id: String,
    pub username: String,
    pub password: String,
    pub passphrase: String,
}

/// Root of the settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MavenSettings {
    pub servers: Vec<Server>,
}

impl MavenSettings {
    /// Settings for one publish run.
    ///
    /// `gpg_passphrase` is `Some` only when signing is active.
    pub fn for_run(username: &str, password: &str, gpg_passphrase: Option<&str>) -> Self {
        let mut servers = vec![Server {
            id: DEPLOY_REPO_ID.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            ..Default::default()
        }];
        if let Some(passphrase) = gpg_passphrase {
            servers.push(Server {
                id: GPG_SERVER_ID.to_string(),
                passphrase: passphrase.to_string(),
                ..Default::default()
            });
        }
        Self { servers }
    }

    /// Render as an indented XML document. Empty optional elements are omitted.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<settings>\n    <servers>\n");
        for server in &self.servers {
            out.push_str("        <server>\n");
            push_element(&mut out, "id", &server.id);
            for (name, value) in [
                ("username", &server.username),
                ("password", &server.password),
                ("passphrase", &server.passphrase),
            ] {
                if !value.is_empty() {
                    push_element(&mut out, name, value);
                }
            }
            out.push_str("        </server>\n");
        }
        out.push_str("    </servers>\n</settings>\n");
        out
    }

    /// Write to a fresh temp file that is removed on drop.
    pub fn write_temp(&self) -> Result<SettingsFile, SettingsError> {
        let mut file = tempfile::Builder::new()
            .prefix("mvn-publish-settings")
            .suffix(".xml")
            .tempfile()?;
        file.write_all(self.to_xml().as_bytes())?;
        file.flush()?;
        Ok(SettingsFile { file })
    }
}

fn push_element(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(out, "            <{name}>{}</{name}>", escape_xml(value));
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Settings written to disk for the lifetime of a run.
#[derive(Debug)]
pub struct SettingsFile {
    file: NamedTempFile,
}

impl SettingsFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_server_only() {
        let xml = MavenSettings::for_run("u", "p", None).to_xml();
        assert_eq!(
            xml,
            "<settings>\n    <servers>\n        <server>\n            <id>deploy-repo</id>\n            <username>u</username>\n            <password>p</password>\n        </server>\n    </servers>\n</settings>\n"
        );
    }

    #[test]
    fn test_signing_server_added() {
        let settings = MavenSettings::for_run("u", "p", Some("pass"));
        assert_eq!(settings.servers.len(), 2);
        assert_eq!(settings.servers[1].id, GPG_SERVER_ID);

        let xml = settings.to_xml();
        assert!(xml.contains("<id>gpg-auth</id>"));
        assert!(xml.contains("<passphrase>pass</passphrase>"));
    }

    #[test]
    fn test_empty_passphrase_omitted() {
        let xml = MavenSettings::for_run("u", "p", Some("")).to_xml();
        assert!(xml.contains("<id>gpg-auth</id>"));
        assert!(!xml.contains("<passphrase>"));
    }

    #[test]
    fn test_values_escaped() {
        let xml = MavenSettings::for_run("a&b", "<p>\"'", None).to_xml();
        assert!(xml.contains("<username>a&amp;b</username>"));
        assert!(xml.contains("<password>&lt;p&gt;&#34;&#39;</password>"));
    }

    #[test]
    fn test_temp_file_removed_on_drop() {
        let file = MavenSettings::for_run("u", "p", None).write_temp().unwrap();
        let path = file.path().to_path_buf();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<id>deploy-repo</id>"));

        drop(file);
        assert!(!path.exists());
    }
}
