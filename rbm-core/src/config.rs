//! # Configuration: repository book, UI and logging options
//!
//! Loads and saves TOML from the platform config path resolved with
//! [`directories`](https://docs.rs/directories) (`~/.config/rbm/config.toml`
//! on Linux). Structural validation runs at startup, before anything can
//! spawn a subprocess:
//!
//! - every repository carries exactly one credential source
//!   (`password_file` or `password_command`);
//! - a literal `password` key is rejected outright with a migration hint,
//!   never passed through to the environment;
//! - repository names are unique and filesystem-safe.
//!
//! Per-operation checks (password file present with sane permissions,
//! resolver command screened) run again right before each spawn via
//! [`RepoEntry::credential_check`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::fs as TokioFs;
use tracing::info;

use restic_client::{CredentialSource, RepoProfile};

use crate::error::AppError;

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> = Lazy::new(|| ProjectDirs::from("org", "rbm", "rbm"));

/// Options for the restic binary itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResticConfig {
    /// Program name or absolute path.
    pub program: String,

    /// Upper bound on the startup `version` probe.
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
}

impl Default for ResticConfig {
    fn default() -> Self {
        Self {
            program: "restic".to_string(),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Presentation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Rows per page in paged views (file browser).
    pub page_size: usize,

    /// Bounded operations-log capacity.
    pub log_capacity: usize,

    /// Hide snapshots whose only paths are `systemd-private` temp dirs.
    pub hide_system_snapshots: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            log_capacity: 100,
            hide_system_snapshots: true,
        }
    }
}

/// Logging options; the full [`crate::logging::LoggerConfig`] is composed
/// from these plus fixed defaults in `main`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,

    /// Override for the log directory; defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

/// One configured repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoEntry {
    pub name: String,

    /// Repository location as restic understands it (path or remote URL).
    pub location: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_command: Option<String>,

    /// Deprecated literal secret. Recognized only so validation can reject
    /// it with a migration hint; never serialized back out.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl RepoEntry {
    /// Structural validation: no secrets in the file, exactly one
    /// credential source, a name that can double as a filename.
    pub fn validate(&self) -> Result<(), AppError> {
        if !valid_repo_name(&self.name) {
            return Err(AppError::invalid_config(
                "repository.name",
                format!(
                    "'{}' must be non-empty and limited to letters, digits, '.', '-', '_'",
                    self.name
                ),
            ));
        }
        if self.location.trim().is_empty() {
            return Err(AppError::invalid_config(
                format!("repository '{}'", self.name),
                "location must not be empty",
            ));
        }
        if self.password.is_some() {
            return Err(AppError::invalid_config(
                format!("repository '{}'", self.name),
                "literal 'password' values are not supported; move the secret into a \
                 file and set 'password_file', or set 'password_command' to a resolver",
            ));
        }
        match (&self.password_file, &self.password_command) {
            (Some(_), Some(_)) => Err(AppError::invalid_config(
                format!("repository '{}'", self.name),
                "set exactly one of 'password_file' and 'password_command', not both",
            )),
            (None, None) => Err(AppError::invalid_config(
                format!("repository '{}'", self.name),
                "one of 'password_file' or 'password_command' is required",
            )),
            _ => Ok(()),
        }
    }

    /// Pre-spawn credential check: the password file must exist and be
    /// private, the resolver command must pass the driver's screen.
    pub fn credential_check(&self) -> Result<(), AppError> {
        self.validate()?;
        if let Some(path) = &self.password_file {
            check_password_file(&self.name, path)?;
        }
        self.to_profile()?.validate()?;
        Ok(())
    }

    /// Build the driver-side profile. Assumes [`Self::validate`] passed.
    pub fn to_profile(&self) -> Result<RepoProfile, AppError> {
        let credential = match (&self.password_file, &self.password_command) {
            (Some(path), None) => CredentialSource::PasswordFile(path.clone()),
            (None, Some(cmd)) => CredentialSource::PasswordCommand(cmd.clone()),
            _ => {
                return Err(AppError::invalid_config(
                    format!("repository '{}'", self.name),
                    "exactly one credential source is required",
                ));
            }
        };
        Ok(RepoProfile::new(
            self.name.as_str(),
            self.location.clone(),
            credential,
        ))
    }
}

/// Main configuration struct for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub restic: ResticConfig,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub logging: LogConfig,

    #[serde(default, rename = "repository", skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepoEntry>,
}

impl Config {
    /// Load the config file, or fall back to an empty default when none
    /// exists yet. Parse errors and unreadable files are not swallowed.
    pub async fn load_or_default() -> Result<Self, AppError> {
        let path = Self::config_path()?;
        if !path.exists() {
            info!("no config file at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> Result<Self, AppError> {
        check_config_file_mode(path).await?;
        let text = TokioFs::read_to_string(path)
            .await
            .map_err(|source| AppError::ConfigIo {
                path: path.to_path_buf(),
                source,
            })?;
        let cfg: Self = toml::from_str(&text)?;
        info!(
            path = %path.display(),
            repositories = cfg.repositories.len(),
            "loaded config"
        );
        Ok(cfg)
    }

    /// Save to the canonical path, creating the parent 0700 and forcing
    /// the file itself to 0600.
    pub async fn save(&self) -> Result<(), AppError> {
        let path = Self::config_path()?;
        self.save_to(&path).await
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent)
                .await
                .map_err(|source| AppError::ConfigIo {
                    path: parent.to_path_buf(),
                    source,
                })?;
            set_mode(parent, 0o700).await?;
        }
        let text = toml::to_string_pretty(self)?;
        TokioFs::write(path, text)
            .await
            .map_err(|source| AppError::ConfigIo {
                path: path.to_path_buf(),
                source,
            })?;
        set_mode(path, 0o600).await?;
        info!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Structural validation across the whole file.
    pub fn validate(&self) -> Result<(), AppError> {
        for (i, repo) in self.repositories.iter().enumerate() {
            repo.validate()?;
            if self.repositories[..i].iter().any(|r| r.name == repo.name) {
                return Err(AppError::invalid_config(
                    "repository.name",
                    format!("duplicate repository name '{}'", repo.name),
                ));
            }
        }
        if self.ui.page_size == 0 {
            return Err(AppError::invalid_config(
                "ui.page_size",
                "must be greater than 0",
            ));
        }
        if self.ui.log_capacity == 0 {
            return Err(AppError::invalid_config(
                "ui.log_capacity",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn repo(&self, index: usize) -> Option<&RepoEntry> {
        self.repositories.get(index)
    }

    pub fn config_path() -> Result<PathBuf, AppError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> Result<PathBuf, AppError> {
        PROJECT_DIRS
            .as_ref()
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(AppError::NoConfigDir)
    }

    pub fn default_log_dir() -> Result<PathBuf, AppError> {
        PROJECT_DIRS
            .as_ref()
            .map(|dirs| dirs.data_local_dir().join("logs"))
            .ok_or(AppError::NoConfigDir)
    }
}

/// Repository names end up as file names and map keys.
pub fn valid_repo_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// Generate a fresh password file for `name` under the canonical
/// `passwords/` directory; see [`generate_password_file_in`].
pub async fn generate_password_file(name: &str) -> Result<PathBuf, AppError> {
    let dir = Config::config_dir()?.join("passwords");
    generate_password_file_in(&dir, name).await
}

/// Write a random secret (64 hex chars) to `<dir>/<name>.txt`, directory
/// 0700, file locked down to 0400 once written.
pub async fn generate_password_file_in(dir: &Path, name: &str) -> Result<PathBuf, AppError> {
    if !valid_repo_name(name) {
        return Err(AppError::invalid_config(
            "repository.name",
            format!("'{name}' is not usable as a password file name"),
        ));
    }
    TokioFs::create_dir_all(dir).await?;
    set_mode(dir, 0o700).await?;

    let path = dir.join(format!("{name}.txt"));
    if path.exists() {
        return Err(AppError::invalid_config(
            format!("repository '{name}'"),
            format!("password file {} already exists", path.display()),
        ));
    }

    let secret = format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    TokioFs::write(&path, secret).await?;
    set_mode(&path, 0o400).await?;
    info!(path = %path.display(), "generated password file");
    Ok(path)
}

fn check_password_file(repo: &str, path: &Path) -> Result<(), AppError> {
    let meta = std::fs::metadata(path).map_err(|e| {
        AppError::invalid_config(
            format!("repository '{repo}'"),
            format!("password file {}: {e}", path.display()),
        )
    })?;
    if !meta.is_file() {
        return Err(AppError::invalid_config(
            format!("repository '{repo}'"),
            format!("password file {} is not a regular file", path.display()),
        ));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = meta.permissions().mode() & 0o7777;
        if mode != 0o400 && mode != 0o600 {
            return Err(AppError::invalid_config(
                format!("repository '{repo}'"),
                format!(
                    "password file {} has mode {mode:o}; expected 0400 or 0600",
                    path.display()
                ),
            ));
        }
    }
    Ok(())
}

async fn check_config_file_mode(path: &Path) -> Result<(), AppError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let meta = TokioFs::metadata(path)
            .await
            .map_err(|source| AppError::ConfigIo {
                path: path.to_path_buf(),
                source,
            })?;
        let mode = meta.permissions().mode() & 0o7777;
        if mode & 0o077 != 0 {
            return Err(AppError::invalid_config(
                "config file",
                format!(
                    "{} is group or world accessible (mode {mode:o}); chmod 600 and retry",
                    path.display()
                ),
            ));
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

async fn set_mode(path: &Path, mode: u32) -> Result<(), AppError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        TokioFs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(name: &str) -> RepoEntry {
        RepoEntry {
            name: name.to_string(),
            location: "/srv/repo".to_string(),
            password_file: Some(PathBuf::from("/tmp/pw.txt")),
            password_command: None,
            password: None,
        }
    }

    #[test]
    fn literal_password_is_rejected_with_migration_hint() {
        let mut repo = entry("local");
        repo.password = Some("hunter2".to_string());

        let err = repo.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("not supported"), "{msg}");
        assert!(msg.contains("password_file"), "{msg}");
        assert!(msg.contains("password_command"), "{msg}");
    }

    #[test]
    fn literal_password_parses_but_fails_validation() {
        let text = r#"
            [[repository]]
            name = "old"
            location = "/srv/repo"
            password = "hunter2"
        "#;
        let cfg: Config = toml::from_str(text).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn literal_password_is_never_serialized() {
        let mut cfg = Config::default();
        let mut repo = entry("local");
        repo.password = Some("hunter2".to_string());
        cfg.repositories.push(repo);

        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("password ="));
    }

    #[test]
    fn exactly_one_credential_source_is_required() {
        let mut both = entry("a");
        both.password_command = Some("pass show a".to_string());
        assert!(both.validate().is_err());

        let mut neither = entry("b");
        neither.password_file = None;
        assert!(neither.validate().is_err());

        assert!(entry("c").validate().is_ok());
    }

    #[test]
    fn duplicate_repository_names_are_rejected() {
        let mut cfg = Config::default();
        cfg.repositories.push(entry("local"));
        cfg.repositories.push(entry("local"));

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn repo_names_are_filesystem_safe() {
        assert!(valid_repo_name("backup-1"));
        assert!(valid_repo_name("nas.home_01"));
        assert!(!valid_repo_name(""));
        assert!(!valid_repo_name("a/b"));
        assert!(!valid_repo_name("two words"));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut cfg = Config::default();
        cfg.ui.page_size = 25;
        cfg.repositories.push(entry("local"));

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.ui.page_size, 25);
        assert_eq!(back.repositories.len(), 1);
        assert_eq!(back.repositories[0].name, "local");
    }

    #[cfg(unix)]
    #[test]
    fn open_password_file_fails_the_pre_spawn_check() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let pw = dir.path().join("pw.txt");
        std::fs::write(&pw, "secret").unwrap();
        std::fs::set_permissions(&pw, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut repo = entry("local");
        repo.password_file = Some(pw.clone());
        let err = repo.credential_check().unwrap_err();
        assert!(err.to_string().contains("expected 0400 or 0600"));

        std::fs::set_permissions(&pw, std::fs::Permissions::from_mode(0o600)).unwrap();
        assert!(repo.credential_check().is_ok());
    }

    #[test]
    fn missing_password_file_fails_the_pre_spawn_check() {
        let dir = TempDir::new().unwrap();
        let mut repo = entry("local");
        repo.password_file = Some(dir.path().join("absent.txt"));
        assert!(repo.credential_check().is_err());
    }

    #[test]
    fn hostile_resolver_command_fails_the_pre_spawn_check() {
        let mut repo = entry("local");
        repo.password_file = None;
        repo.password_command = Some("cat pw; rm -rf /".to_string());
        assert!(repo.credential_check().is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn generated_password_file_is_read_only_and_long() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = generate_password_file_in(dir.path(), "newrepo")
            .await
            .unwrap();

        let secret = std::fs::read_to_string(&path).unwrap();
        assert!(secret.len() >= 32);

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o400);
    }

    #[tokio::test]
    async fn generate_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        generate_password_file_in(dir.path(), "r1").await.unwrap();
        assert!(generate_password_file_in(dir.path(), "r1").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_config_is_private_and_loadable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.repositories.push(entry("local"));
        cfg.save_to(&path).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o600);

        let back = Config::load_from(&path).await.unwrap();
        assert_eq!(back.repositories.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn world_readable_config_is_refused() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = Config::load_from(&path).await.unwrap_err();
        assert!(err.to_string().contains("chmod 600"));
    }
}
