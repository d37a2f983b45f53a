//! GnuPG command-line keyring setup

use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use super::{keyring_dir, Keyring, KeyringProvider, SigningError, PUBLIC_RING, SECRET_RING};
use crate::config::{GpgConfig, Verbosity};

/// Imports keys with the `gpg` CLI into a throwaway GnuPG home.
#[derive(Debug, Clone)]
pub struct GnuPg {
    program: String,
    gpgconf: String,
    verbosity: Verbosity,
}

impl GnuPg {
    /// `gpgconf` is looked up next to `program` when it is a path.
    pub fn new(program: impl Into<String>, verbosity: Verbosity) -> Self {
        let program = program.into();
        let gpgconf = gpgconf_for(&program);
        Self {
            program,
            gpgconf,
            verbosity,
        }
    }

    /// Arguments for a gpg invocation against the home in `dir`.
    pub fn args(&self, dir: &Path, extra: &[&str]) -> Vec<String> {
        let mut args = vec![
            "--homedir".to_string(),
            dir.display().to_string(),
            "--batch".to_string(),
            "--quiet".to_string(),
            "--no-default-keyring".to_string(),
            format!("--secret-keyring={}", dir.join(SECRET_RING).display()),
            format!("--keyring={}", dir.join(PUBLIC_RING).display()),
        ];
        args.extend(extra.iter().map(|a| a.to_string()));
        args
    }

    fn command(&self, dir: &Path, extra: &[&str]) -> Command {
        let args = self.args(dir, extra);
        if self.verbosity == Verbosity::Debug {
            tracing::info!("$ {} {}", self.program, args.join(" "));
        }
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd
    }

    fn tool_output(&self) -> Stdio {
        if self.verbosity.is_quiet() {
            Stdio::null()
        } else {
            Stdio::inherit()
        }
    }

    fn tool_error(&self, detail: impl Into<String>) -> SigningError {
        SigningError::ExternalTool {
            program: self.program.clone(),
            detail: detail.into(),
        }
    }

    /// Run gpg with `input` on stdin.
    ///
    /// A scoped thread writes the input and closes stdin while this thread
    /// waits on the child. A child that exits without reading is not an
    /// error by itself; its exit status decides.
    fn run_with_input(
        &self,
        dir: &Path,
        extra: &[&str],
        input: &[u8],
        what: &str,
    ) -> Result<(), SigningError> {
        let mut child = self
            .command(dir, extra)
            .stdin(Stdio::piped())
            .stdout(self.tool_output())
            .stderr(self.tool_output())
            .spawn()
            .map_err(|e| self.tool_error(format!("failed to start: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.tool_error("stdin was not captured"))?;

        let (status, written): (io::Result<ExitStatus>, io::Result<()>) = thread::scope(|scope| {
            let writer = scope.spawn(move || {
                stdin.write_all(input)?;
                stdin.flush()
            });
            let status = child.wait();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("input writer panicked")));
            (status, written)
        });

        let status = status?;
        if !status.success() {
            return Err(self.tool_error(format!("{} exited with {}", what, status)));
        }
        match written {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                Err(self.tool_error(format!("writing input to {}: {}", what, e)))
            }
            _ => Ok(()),
        }
    }

    /// Feed the armored key to `gpg --import`.
    fn import_key(&self, dir: &Path, key: &str) -> Result<(), SigningError> {
        self.run_with_input(dir, &["--import"], key.as_bytes(), "--import")
    }

    /// Write the secret key to `secret_ring`.
    ///
    /// GnuPG 2.1 and later keep secret keys under `private-keys-v1.d` and
    /// ignore `--secret-keyring`, so the ring file has to be exported.
    fn export_secret_key(
        &self,
        dir: &Path,
        key_id: &str,
        passphrase: &str,
        secret_ring: &Path,
    ) -> Result<(), SigningError> {
        let output = secret_ring.display().to_string();
        let input = format!("{}\n", passphrase);
        self.run_with_input(
            dir,
            &[
                "--pinentry-mode",
                "loopback",
                "--passphrase-fd",
                "0",
                "--yes",
                "--output",
                &output,
                "--export-secret-keys",
                key_id,
            ],
            input.as_bytes(),
            "--export-secret-keys",
        )
    }

    /// Id of the first secret key in the keyring.
    fn secret_key_id(&self, dir: &Path) -> Result<String, SigningError> {
        let output = self
            .command(dir, &["--list-secret-keys", "--with-colons"])
            .stdin(Stdio::null())
            .stderr(self.tool_output())
            .output()
            .map_err(|e| self.tool_error(format!("failed to start: {}", e)))?;

        if !output.status.success() {
            return Err(self.tool_error(format!(
                "--list-secret-keys exited with {}",
                output.status
            )));
        }
        parse_secret_key_id(&String::from_utf8_lossy(&output.stdout))
    }
}

impl KeyringProvider for GnuPg {
    fn prepare(&self, gpg: &GpgConfig) -> Result<Keyring, SigningError> {
        // Built up front so a failed import still stops the agent and
        // removes the directory.
        let mut keyring = Keyring::new(keyring_dir()?, "").with_agent_control(self.gpgconf.clone());
        let dir = keyring.dir().to_path_buf();

        self.import_key(&dir, &gpg.private_key)?;
        keyring.key_id = self.secret_key_id(&dir)?;

        if !keyring.secret_ring().is_file() {
            let secret_ring = keyring.secret_ring().to_path_buf();
            self.export_secret_key(&dir, &keyring.key_id, &gpg.passphrase, &secret_ring)?;
        }
        tracing::info!(key_id = %keyring.key_id, "imported signing key");
        Ok(keyring)
    }
}

fn gpgconf_for(program: &str) -> String {
    let path = Path::new(program);
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.join("gpgconf").display().to_string()
        }
        _ => "gpgconf".to_string(),
    }
}

/// Find the key id of the first `sec` record in `--with-colons` output.
pub fn parse_secret_key_id(listing: &str) -> Result<String, SigningError> {
    for line in listing.lines().filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 5 {
            return Err(SigningError::MalformedListing(line.to_string()));
        }
        if fields[0] == "sec" {
            if fields[4].is_empty() {
                break;
            }
            return Ok(fields[4].to_string());
        }
    }
    Err(SigningError::KeyNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LISTING: &str = "\
sec:u:4096:1:3AA5C34371567BD2:1460000000:::u:::scESC:::+:::23::0:
fpr:::::::::B9F4BB3C1A9E0D5AE3AAB0FF3AA5C34371567BD2:
grp:::::::::0FA3D8F55E6C2B1D3D2A0F1E1C4B3A2D1E0F9A8B:
uid:u::::1460000000::A1B2C3::Release Bot <release@example.com>::::::::::0:
ssb:u:4096:1:42B317FD4BA89E7A:1460000000::::::e:::+:::23:
";

    #[test]
    fn test_parse_first_secret_key() {
        assert_eq!(parse_secret_key_id(LISTING).unwrap(), "3AA5C34371567BD2");
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let listing = format!("\n{}\n\n", LISTING);
        assert_eq!(parse_secret_key_id(&listing).unwrap(), "3AA5C34371567BD2");
    }

    #[test]
    fn test_parse_no_secret_key() {
        let listing = "pub:u:4096:1:3AA5C34371567BD2:1460000000:::u:::scESC:\n";
        assert!(matches!(
            parse_secret_key_id(listing),
            Err(SigningError::KeyNotFound)
        ));
        assert!(matches!(parse_secret_key_id(""), Err(SigningError::KeyNotFound)));
    }

    #[test]
    fn test_parse_malformed_line() {
        let err = parse_secret_key_id("sec:u:4096\n").unwrap_err();
        assert!(matches!(err, SigningError::MalformedListing(ref l) if l == "sec:u:4096"));
    }

    #[test]
    fn test_args_target_ephemeral_home() {
        let gpg = GnuPg::new("gpg", Verbosity::Normal);
        let args = gpg.args(Path::new("/tmp/keys"), &["--import"]);
        assert_eq!(
            args,
            vec![
                "--homedir",
                "/tmp/keys",
                "--batch",
                "--quiet",
                "--no-default-keyring",
                "--secret-keyring=/tmp/keys/secret.gpg",
                "--keyring=/tmp/keys/public.gpg",
                "--import",
            ]
        );
    }

    #[test]
    fn test_gpgconf_next_to_program() {
        assert_eq!(gpgconf_for("gpg"), "gpgconf");
        assert_eq!(gpgconf_for("/opt/gnupg/bin/gpg2"), "/opt/gnupg/bin/gpgconf");
    }

    #[test]
    fn test_missing_program_is_external_tool_error() {
        let gpg = GnuPg::new("/nonexistent/mvn-publish-gpg", Verbosity::Quiet);
        let config = GpgConfig {
            private_key: "KEY".to_string(),
            passphrase: String::new(),
        };
        let err = gpg.prepare(&config).unwrap_err();
        match err {
            SigningError::ExternalTool { program, detail } => {
                assert_eq!(program, "/nonexistent/mvn-publish-gpg");
                assert!(detail.contains("failed to start"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn gpg(home: &Path, args: &[&str]) -> Option<std::process::Output> {
        let output = Command::new("gpg")
            .arg("--homedir")
            .arg(home)
            .args(["--batch", "--pinentry-mode", "loopback", "--passphrase", ""])
            .args(args)
            .stdin(Stdio::null())
            .output()
            .ok()?;
        output.status.success().then_some(output)
    }

    fn stop_agent(home: &Path) {
        let _ = Command::new("gpgconf")
            .arg("--homedir")
            .arg(home)
            .args(["--kill", "gpg-agent"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }

    /// Generate an unprotected key in `home`; `None` when gpg is unavailable.
    fn generate_key(home: &Path) -> Option<(String, String)> {
        gpg(
            home,
            &["--quick-gen-key", "Release Bot <release@example.com>", "default", "default", "never"],
        )?;
        let armored = gpg(home, &["--armor", "--export-secret-keys"])?;
        let listing = gpg(home, &["--list-secret-keys", "--with-colons"])?;
        let key_id = parse_secret_key_id(&String::from_utf8_lossy(&listing.stdout)).ok()?;
        Some((String::from_utf8(armored.stdout).ok()?, key_id))
    }

    #[test]
    fn test_prepare_keeps_key_out_of_default_home() {
        let source = TempDir::new().unwrap();
        let Some((armored, expected_id)) = generate_key(source.path()) else {
            stop_agent(source.path());
            eprintln!("gpg with --quick-gen-key not available, skipping");
            return;
        };
        stop_agent(source.path());

        let default_home = TempDir::new().unwrap();
        std::env::set_var("GNUPGHOME", default_home.path());

        let config = GpgConfig {
            private_key: armored,
            passphrase: String::new(),
        };
        let keyring = GnuPg::new("gpg", Verbosity::Quiet).prepare(&config).unwrap();
        assert_eq!(keyring.key_id(), expected_id);
        assert!(keyring.public_ring().is_file());
        assert!(keyring.secret_ring().is_file());
        assert!(fs::metadata(keyring.secret_ring()).unwrap().len() > 0);

        let dir = keyring.dir().to_path_buf();
        drop(keyring);
        assert!(!dir.exists());

        let default_keys = default_home.path().join("private-keys-v1.d");
        let leaked = fs::read_dir(&default_keys)
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leaked, 0, "secret key written to {}", default_keys.display());
    }
}
