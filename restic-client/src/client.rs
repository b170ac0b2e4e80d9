//! One-shot restic invocations: queries and maintenance commands.
//!
//! Every call spawns one subprocess, waits for it, and maps the outcome
//! onto [`ResticResult`]. Streaming supervision of backup/restore lives in
//! [`crate::stream`]; this module is for commands whose full output fits
//! in memory.

use std::process::{Output, Stdio};

use compact_str::CompactString;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{
    error::{ResticError, ResticResult},
    repository::RepoProfile,
    types::{FileNode, ForgetGroup, ForgetPolicy, RepoHealth, RepoInfo, RepositoryStats, Snapshot},
};

pub const DEFAULT_PROGRAM: &str = "restic";

/// Discriminator probe for line-oriented JSON output.
#[derive(Deserialize)]
pub(crate) struct MessageTypeProbe {
    #[serde(default)]
    pub(crate) message_type: String,
}

/// Handle for talking to one repository through the restic binary.
#[derive(Debug, Clone)]
pub struct ResticClient {
    program: CompactString,
    profile: RepoProfile,
}

impl ResticClient {
    pub fn new(profile: RepoProfile) -> Self {
        Self {
            program: CompactString::const_new(DEFAULT_PROGRAM),
            profile,
        }
    }

    /// Override the binary, e.g. an absolute path or a test stub.
    pub fn with_program(profile: RepoProfile, program: impl Into<CompactString>) -> Self {
        Self {
            program: program.into(),
            profile,
        }
    }

    #[inline]
    pub fn profile(&self) -> &RepoProfile {
        &self.profile
    }

    #[inline]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Base command with the repository environment applied.
    ///
    /// `RESTIC_PASSWORD` is scrubbed from the inherited environment so a
    /// literal password can never leak through from the parent process;
    /// stdin is closed so restic cannot stall on an interactive prompt.
    pub(crate) fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(self.program.as_str());
        cmd.args(args)
            .envs(self.profile.env())
            .env_remove("RESTIC_PASSWORD")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, subcommand: &str, args: &[String]) -> ResticResult<Output> {
        self.profile.validate()?;
        debug!(
            repo = %self.profile.name,
            subcommand,
            "spawning restic"
        );
        self.command(args)
            .output()
            .await
            .map_err(|e| ResticError::launch(self.program.clone(), e))
    }

    /// Run to completion; non-zero exit becomes a [`ResticError`] carrying
    /// the captured stderr verbatim.
    async fn run_checked(&self, subcommand: &str, args: &[String]) -> ResticResult<String> {
        let output = self.run(subcommand, args).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                repo = %self.profile.name,
                subcommand,
                code = ?output.status.code(),
                "restic command failed"
            );
            Err(ResticError::command_failed(
                subcommand,
                output.status.code(),
                stderr,
            ))
        }
    }

    /// Captured text of a maintenance command, stdout and stderr folded
    /// together (restic writes most progress chatter to stderr).
    async fn run_captured(&self, subcommand: &str, args: &[String]) -> ResticResult<String> {
        let output = self.run(subcommand, args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.success() {
            let mut text = stdout.trim().to_string();
            let trailing = stderr.trim();
            if !trailing.is_empty() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(trailing);
            }
            Ok(text)
        } else {
            Err(ResticError::command_failed(
                subcommand,
                output.status.code(),
                stderr.trim(),
            ))
        }
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_string()).collect()
    }

    /// All snapshots in the repository, oldest first (restic's order).
    pub async fn snapshots(&self) -> ResticResult<Vec<Snapshot>> {
        let stdout = self
            .run_checked("snapshots", &Self::args(&["snapshots", "--json"]))
            .await?;
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(trimmed).map_err(|e| ResticError::decode("snapshots", e))
    }

    /// File tree of one snapshot. Only `"node"` records are kept; any line
    /// that fails the probe or the full parse is skipped, not fatal.
    pub async fn list_files(&self, snapshot_id: &str) -> ResticResult<Vec<FileNode>> {
        let stdout = self
            .run_checked("ls", &Self::args(&["ls", snapshot_id, "--json"]))
            .await?;

        let mut nodes: Vec<FileNode> = Vec::new();
        let mut skipped: usize = 0;
        for line in stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(probe) = serde_json::from_str::<MessageTypeProbe>(line) else {
                skipped += 1;
                continue;
            };
            if probe.message_type != "node" {
                continue;
            }
            match serde_json::from_str::<FileNode>(line) {
                Ok(node) => nodes.push(node),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(snapshot_id, skipped, "skipped malformed ls records");
        }
        Ok(nodes)
    }

    pub async fn stats(&self) -> ResticResult<RepositoryStats> {
        let stdout = self
            .run_checked("stats", &Self::args(&["stats", "--json"]))
            .await?;
        serde_json::from_str(stdout.trim()).map_err(|e| ResticError::decode("stats", e))
    }

    /// Integrity check; the exit status is the whole answer.
    pub async fn check(&self) -> ResticResult<()> {
        self.run_checked("check", &Self::args(&["check"])).await?;
        Ok(())
    }

    pub async fn cleanup_cache(&self) -> ResticResult<String> {
        self.run_captured("cache", &Self::args(&["cache", "--cleanup"]))
            .await
    }

    pub async fn unlock(&self) -> ResticResult<String> {
        self.run_captured("unlock", &Self::args(&["unlock"])).await
    }

    /// Preview what `forget` would remove under `policy`. Nothing is
    /// deleted; the returned groups partition snapshots into keep/remove.
    pub async fn forget_dry_run(&self, policy: &ForgetPolicy) -> ResticResult<Vec<ForgetGroup>> {
        let mut args = Self::args(&["forget", "--dry-run", "--json"]);
        args.extend(policy.to_args());
        let stdout = self.run_checked("forget", &args).await?;
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(trimmed).map_err(|e| ResticError::decode("forget", e))
    }

    /// Live removal under `policy`. Destructive; callers gate this behind
    /// a dry-run preview and an explicit confirmation.
    pub async fn forget(&self, policy: &ForgetPolicy) -> ResticResult<()> {
        let mut args = Self::args(&["forget", "--json"]);
        args.extend(policy.to_args());
        self.run_checked("forget", &args).await?;
        Ok(())
    }

    pub async fn prune_dry_run(&self) -> ResticResult<String> {
        self.run_captured("prune", &Self::args(&["prune", "--dry-run"]))
            .await
    }

    /// Live prune. Destructive; same gating as [`Self::forget`].
    pub async fn prune(&self) -> ResticResult<String> {
        self.run_captured("prune", &Self::args(&["prune"])).await
    }

    /// Initialize a brand-new repository at the profile's location.
    pub async fn init(&self) -> ResticResult<String> {
        self.run_captured("init", &Self::args(&["init"])).await
    }

    /// Health + stats + last-backup aggregate. Never fails: a stats
    /// failure degrades health to `Error`, snapshot-listing or check
    /// failures degrade to `Warning`.
    pub async fn repo_info(&self) -> RepoInfo {
        let stats = match self.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                return RepoInfo {
                    health: RepoHealth::Error,
                    detail: format!("stats query failed: {e}"),
                    ..RepoInfo::default()
                };
            }
        };

        let mut info = RepoInfo {
            health: RepoHealth::Healthy,
            stats,
            detail: "repository is healthy".to_string(),
            ..RepoInfo::default()
        };

        match self.snapshots().await {
            Ok(snapshots) => {
                info.snapshot_count = snapshots.len();
                info.last_backup = snapshots.iter().map(|s| s.time).max();
            }
            Err(e) => {
                info.health = RepoHealth::Warning;
                info.detail = format!("snapshot listing failed: {e}");
            }
        }

        if info.health == RepoHealth::Healthy {
            if let Err(e) = self.check().await {
                info.health = RepoHealth::Warning;
                info.detail = format!("integrity check failed: {e}");
            }
        }

        info
    }
}

/// Version string of the restic binary, independent of any repository.
pub async fn version(program: &str) -> ResticResult<String> {
    let output = Command::new(program)
        .arg("version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ResticError::launch(program, e))?;
    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    } else {
        Err(ResticError::command_failed(
            "version",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim(),
        ))
    }
}

/// Whether the restic binary can be launched at all.
pub async fn is_installed(program: &str) -> bool {
    version(program).await.is_ok()
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::repository::RepoProfile;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Drop a fake restic on disk: a shell script that ignores its
    /// arguments and replays canned output.
    fn stub(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("restic-stub");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn client_for(dir: &TempDir, body: &str) -> ResticClient {
        let program = stub(dir, body);
        let profile = RepoProfile::password_file("test", "/srv/repo", "/tmp/pw.txt");
        ResticClient::with_program(profile, program.display().to_string())
    }

    #[tokio::test]
    async fn snapshots_parses_array_output() {
        let dir = TempDir::new().unwrap();
        let body = r#"echo '[{"id":"abc123def456","short_id":"abc123de","time":"2025-06-01T10:30:00Z","hostname":"web1","username":"u","paths":["/home"],"tags":["daily"]}]'"#;
        let client = client_for(&dir, body);

        let snaps = client.snapshots().await.unwrap();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].display_id(), "abc123de");
    }

    #[tokio::test]
    async fn snapshots_empty_output_is_empty_list() {
        let dir = TempDir::new().unwrap();
        let client = client_for(&dir, "true");
        assert!(client.snapshots().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_files_keeps_only_node_records() {
        let dir = TempDir::new().unwrap();
        let body = concat!(
            r#"echo '{"message_type":"snapshot","id":"abc"}'"#,
            "\n",
            r#"echo '{"message_type":"node","name":"passwd","type":"file","path":"/etc/passwd","size":1024}'"#,
            "\n",
            "echo 'not json at all'",
            "\n",
            r#"echo '{"message_type":"node","name":"etc","type":"dir","path":"/etc"}'"#,
        );
        let client = client_for(&dir, body);

        let nodes = client.list_files("abc").await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].path, "/etc/passwd");
        assert!(nodes[1].is_dir());
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr_verbatim() {
        let dir = TempDir::new().unwrap();
        let client = client_for(&dir, "echo 'repository is already locked' >&2; exit 1");

        let err = client.check().await.unwrap_err();
        match err {
            ResticError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, 1);
                assert!(stderr.contains("repository is already locked"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_error() {
        let profile = RepoProfile::password_file("test", "/srv/repo", "/tmp/pw.txt");
        let client = ResticClient::with_program(profile, "/nonexistent/restic-missing");
        let err = client.snapshots().await.unwrap_err();
        assert!(err.is_launch_failure());
    }

    #[tokio::test]
    async fn repository_env_reaches_the_child() {
        let dir = TempDir::new().unwrap();
        let client = client_for(
            &dir,
            r#"printf '%s %s' "$RESTIC_REPOSITORY" "$RESTIC_PASSWORD_FILE""#,
        );

        let text = client.cleanup_cache().await.unwrap();
        assert_eq!(text, "/srv/repo /tmp/pw.txt");
    }

    #[tokio::test]
    async fn repo_info_degrades_health_on_stats_failure() {
        let dir = TempDir::new().unwrap();
        let client = client_for(&dir, "echo 'cannot open repository' >&2; exit 1");

        let info = client.repo_info().await;
        assert_eq!(info.health, RepoHealth::Error);
        assert!(info.detail.contains("stats query failed"));
    }

    #[tokio::test]
    async fn invalid_credential_never_spawns() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("spawned");
        let body = format!("touch {}", marker.display());
        let program = stub(&dir, &body);
        let profile = RepoProfile::password_command("bad", "/srv/repo", "cat pw; rm -rf /");
        let client = ResticClient::with_program(profile, program.display().to_string());

        let err = client.snapshots().await.unwrap_err();
        assert!(matches!(err, ResticError::Credential { .. }));
        assert!(!marker.exists(), "credential rejection must precede spawn");
    }
}
