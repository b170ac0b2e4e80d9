//! Repository profiles and the credential/environment contract.
//!
//! Every restic invocation receives its repository location and exactly one
//! credential-resolution variable through the environment. A literal
//! password never crosses this boundary; [`CredentialSource`] has no
//! variant that could carry one.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::{ResticError, ResticResult};

pub const ENV_REPOSITORY: &str = "RESTIC_REPOSITORY";
pub const ENV_PASSWORD_FILE: &str = "RESTIC_PASSWORD_FILE";
pub const ENV_PASSWORD_COMMAND: &str = "RESTIC_PASSWORD_COMMAND";

/// Shell metacharacters that disqualify a password command outright.
const COMMAND_METACHARACTERS: &[char] =
    &[';', '|', '&', '`', '$', '(', ')', '<', '>', '\n', '\r'];

/// Program names never accepted as a password command's first word.
const DENIED_PROGRAMS: &[&str] = &["rm", "del", "format", "mkfs", "dd", "shred", "wget", "curl"];

/// How the repository password is resolved at spawn time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Path to a file whose content is the password.
    PasswordFile(PathBuf),
    /// Command executed by restic itself; its stdout is the password.
    PasswordCommand(String),
}

impl CredentialSource {
    /// Environment variable name and value for this source.
    pub fn env_var(&self) -> (&'static str, String) {
        match self {
            Self::PasswordFile(path) => (ENV_PASSWORD_FILE, path.display().to_string()),
            Self::PasswordCommand(cmd) => (ENV_PASSWORD_COMMAND, cmd.clone()),
        }
    }

    /// Screen the source before any subprocess exists.
    ///
    /// Password commands run with the user's privileges, so anything that
    /// smells like shell injection or a destructive tool is refused here
    /// rather than discovered at spawn time.
    pub fn validate(&self, repo_name: &str) -> ResticResult<()> {
        match self {
            Self::PasswordFile(path) => {
                if path.as_os_str().is_empty() {
                    return Err(ResticError::credential(repo_name, "empty password file path"));
                }
                Ok(())
            }
            Self::PasswordCommand(cmd) => {
                let trimmed = cmd.trim();
                if trimmed.is_empty() {
                    return Err(ResticError::credential(repo_name, "empty password command"));
                }
                if let Some(bad) = trimmed.chars().find(|c| COMMAND_METACHARACTERS.contains(c)) {
                    return Err(ResticError::credential(
                        repo_name,
                        format!("password command contains shell metacharacter {bad:?}"),
                    ));
                }
                let program = trimmed
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .rsplit('/')
                    .next()
                    .unwrap_or_default();
                if DENIED_PROGRAMS.contains(&program) {
                    return Err(ResticError::credential(
                        repo_name,
                        format!("password command invokes denied program '{program}'"),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// A configured backup destination plus its credential source. This is the
/// only input the driver needs to talk to one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoProfile {
    pub name: CompactString,
    /// Opaque address: local path or remote URI, passed through untouched.
    pub location: String,
    pub credential: CredentialSource,
}

impl RepoProfile {
    pub fn new(
        name: impl Into<CompactString>,
        location: impl Into<String>,
        credential: CredentialSource,
    ) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            credential,
        }
    }

    pub fn password_file(
        name: impl Into<CompactString>,
        location: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            name,
            location,
            CredentialSource::PasswordFile(path.into()),
        )
    }

    pub fn password_command(
        name: impl Into<CompactString>,
        location: impl Into<String>,
        cmd: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            location,
            CredentialSource::PasswordCommand(cmd.into()),
        )
    }

    /// The exact environment handed to every subprocess for this
    /// repository: the location variable plus one credential variable.
    pub fn env(&self) -> [(&'static str, String); 2] {
        let (cred_key, cred_value) = self.credential.env_var();
        [
            (ENV_REPOSITORY, self.location.clone()),
            (cred_key, cred_value),
        ]
    }

    pub fn validate(&self) -> ResticResult<()> {
        if self.location.trim().is_empty() {
            return Err(ResticError::credential(
                self.name.as_str(),
                "repository location is empty",
            ));
        }
        self.credential.validate(&self.name)
    }

    /// Whether `path` structurally looks like a local restic repository:
    /// a `config` file next to `data`, `keys` and `snapshots` directories.
    pub fn looks_like_repository(path: &Path) -> bool {
        path.join("config").is_file()
            && path.join("data").is_dir()
            && path.join("keys").is_dir()
            && path.join("snapshots").is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_profile() -> RepoProfile {
        RepoProfile::password_file("main", "/srv/backups/main", "/home/u/.secrets/main.txt")
    }

    #[test]
    fn env_carries_location_and_exactly_one_credential() {
        let env = file_profile().env();
        assert_eq!(env[0], (ENV_REPOSITORY, "/srv/backups/main".to_string()));
        assert_eq!(
            env[1],
            (ENV_PASSWORD_FILE, "/home/u/.secrets/main.txt".to_string())
        );

        let cmd = RepoProfile::password_command("vault", "s3:bucket/repo", "pass show restic");
        let env = cmd.env();
        assert_eq!(env[1], (ENV_PASSWORD_COMMAND, "pass show restic".to_string()));
    }

    #[test]
    fn password_command_metacharacters_rejected() {
        for cmd in [
            "cat file; rm -rf /",
            "echo $SECRET",
            "pass show x | tee /tmp/leak",
            "get`whoami`",
            "pass (main)",
            "pass < input",
        ] {
            let profile = RepoProfile::password_command("r", "/repo", cmd);
            assert!(profile.validate().is_err(), "accepted: {cmd}");
        }
    }

    #[test]
    fn password_command_denied_programs_rejected() {
        for cmd in ["rm -rf /", "curl https://example.com/pw", "/bin/dd if=x"] {
            let profile = RepoProfile::password_command("r", "/repo", cmd);
            assert!(profile.validate().is_err(), "accepted: {cmd}");
        }
        // A sane resolver passes.
        let ok = RepoProfile::password_command("r", "/repo", "pass show backup/restic");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn empty_inputs_rejected() {
        let profile = RepoProfile::password_file("r", "  ", "/tmp/pw");
        assert!(profile.validate().is_err());

        let profile = RepoProfile::password_command("r", "/repo", "   ");
        assert!(profile.validate().is_err());

        let profile = RepoProfile::password_file("r", "/repo", "");
        assert!(profile.validate().is_err());
    }
}
