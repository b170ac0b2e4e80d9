//! Wire types for restic's `--json` output and operation parameters.
//!
//! Field names follow restic's JSON schema exactly; everything restic may
//! omit in older versions carries `#[serde(default)]` so a schema drift
//! skips data instead of failing the whole record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable backup point as reported by `restic snapshots --json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    #[serde(default)]
    pub short_id: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Snapshot {
    /// Display identifier: the short id when restic provided one, else a
    /// prefix of the full id.
    pub fn display_id(&self) -> &str {
        if !self.short_id.is_empty() {
            &self.short_id
        } else if self.id.len() >= 8 {
            &self.id[..8]
        } else {
            &self.id
        }
    }
}

/// A `"message_type": "status"` line from `restic backup --json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupProgress {
    #[serde(default)]
    pub percent_done: f64,
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub files_done: u64,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub bytes_done: u64,
    #[serde(default)]
    pub seconds_elapsed: u64,
    #[serde(default)]
    pub seconds_remaining: u64,
    #[serde(default)]
    pub current_files: Vec<String>,
}

/// The single `"message_type": "summary"` line closing a backup run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupSummary {
    #[serde(default)]
    pub files_new: u64,
    #[serde(default)]
    pub files_changed: u64,
    #[serde(default)]
    pub files_unmodified: u64,
    #[serde(default)]
    pub dirs_new: u64,
    #[serde(default)]
    pub dirs_changed: u64,
    #[serde(default)]
    pub dirs_unmodified: u64,
    #[serde(default)]
    pub data_blobs: i64,
    #[serde(default)]
    pub tree_blobs: i64,
    #[serde(default)]
    pub data_added: u64,
    #[serde(default)]
    pub total_files_processed: u64,
    #[serde(default)]
    pub total_bytes_processed: u64,
    #[serde(default)]
    pub total_duration: f64,
    #[serde(default)]
    pub snapshot_id: String,
}

/// Terminal record for a restore run.
///
/// restic prints no structured restore summary; the stream adapter
/// synthesizes this once the process exits cleanly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoreSummary {
    pub snapshot_id: String,
    pub target: String,
    pub seconds_elapsed: u64,
}

/// One `"message_type": "node"` line from `restic ls <snapshot> --json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub mtime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub uid: u32,
    #[serde(default)]
    pub gid: u32,
}

impl FileNode {
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.node_type == "dir"
    }
}

/// Aggregate numbers from `restic stats --json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStats {
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub total_file_count: u64,
    #[serde(default)]
    pub snapshots_count: u64,
}

/// Retention rules handed to `restic forget`.
///
/// Every knob is optional; [`ForgetPolicy::is_empty`] gates invocations so
/// an all-default policy never reaches the tool (restic would refuse it
/// anyway, but the rejection should happen before a subprocess exists).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgetPolicy {
    pub keep_last: Option<u32>,
    pub keep_hourly: Option<u32>,
    pub keep_daily: Option<u32>,
    pub keep_weekly: Option<u32>,
    pub keep_monthly: Option<u32>,
    pub keep_yearly: Option<u32>,
    pub keep_within: Option<String>,
    #[serde(default)]
    pub keep_tags: Vec<String>,
    pub host: Option<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ForgetPolicy {
    /// True when no keep rule is set at all.
    pub fn is_empty(&self) -> bool {
        self.keep_last.is_none()
            && self.keep_hourly.is_none()
            && self.keep_daily.is_none()
            && self.keep_weekly.is_none()
            && self.keep_monthly.is_none()
            && self.keep_yearly.is_none()
            && self.keep_within.is_none()
            && self.keep_tags.is_empty()
    }

    /// Command-line flags for this policy, in restic's spelling.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut push_count = |flag: &str, value: Option<u32>| {
            if let Some(n) = value {
                args.push(flag.to_string());
                args.push(n.to_string());
            }
        };
        push_count("--keep-last", self.keep_last);
        push_count("--keep-hourly", self.keep_hourly);
        push_count("--keep-daily", self.keep_daily);
        push_count("--keep-weekly", self.keep_weekly);
        push_count("--keep-monthly", self.keep_monthly);
        push_count("--keep-yearly", self.keep_yearly);
        if let Some(within) = &self.keep_within {
            args.push("--keep-within".to_string());
            args.push(within.clone());
        }
        for tag in &self.keep_tags {
            args.push("--keep-tag".to_string());
            args.push(tag.clone());
        }
        if let Some(host) = &self.host {
            args.push("--host".to_string());
            args.push(host.clone());
        }
        for path in &self.paths {
            args.push("--path".to_string());
            args.push(path.clone());
        }
        for tag in &self.tags {
            args.push("--tag".to_string());
            args.push(tag.clone());
        }
        args
    }
}

/// One per-scope partition from `restic forget --dry-run --json`: the
/// snapshots a policy would keep and the ones it would remove.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForgetGroup {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub keep: Vec<Snapshot>,
    #[serde(default)]
    pub remove: Vec<Snapshot>,
}

/// Last-known health of a repository, derived from query outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepoHealth {
    #[default]
    Unknown,
    Healthy,
    Warning,
    Error,
}

impl RepoHealth {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Aggregated repository information (stats + health + last backup).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoInfo {
    pub health: RepoHealth,
    pub stats: RepositoryStats,
    pub snapshot_count: usize,
    pub last_backup: Option<DateTime<Utc>>,
    /// Human-readable note on how `health` was reached.
    pub detail: String,
}

/// Parameters for one supervised backup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupOptions {
    pub paths: Vec<String>,
    pub tags: Vec<String>,
    pub excludes: Vec<String>,
}

/// Parameters for one supervised restore run. `target: None` restores to
/// the original location, overwriting in place; callers must treat that as
/// an explicit opt-in, never a default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    pub snapshot_id: String,
    pub target: Option<String>,
    pub includes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_parses_restic_schema() {
        let raw = r#"{
            "time": "2025-06-01T10:30:00.123456789Z",
            "tree": "deadbeef",
            "paths": ["/home/user"],
            "hostname": "web1",
            "username": "user",
            "tags": ["daily"],
            "id": "abc123def456abc123def456abc123def456abc1",
            "short_id": "abc123de"
        }"#;

        let snap: Snapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.display_id(), "abc123de");
        assert_eq!(snap.hostname, "web1");
        assert_eq!(snap.paths, vec!["/home/user"]);
        assert_eq!(snap.tags, vec!["daily"]);
    }

    #[test]
    fn snapshot_display_id_falls_back_to_prefix() {
        let snap = Snapshot {
            id: "0123456789abcdef".into(),
            short_id: String::new(),
            time: Utc::now(),
            hostname: String::new(),
            username: String::new(),
            paths: Vec::new(),
            tags: Vec::new(),
        };
        assert_eq!(snap.display_id(), "01234567");
    }

    #[test]
    fn backup_progress_tolerates_missing_fields() {
        let progress: BackupProgress =
            serde_json::from_str(r#"{"message_type":"status","percent_done":0.25}"#).unwrap();
        assert!((progress.percent_done - 0.25).abs() < f64::EPSILON);
        assert_eq!(progress.total_files, 0);
        assert!(progress.current_files.is_empty());
    }

    #[test]
    fn forget_policy_args_cover_all_set_fields() {
        let policy = ForgetPolicy {
            keep_last: Some(3),
            keep_daily: Some(7),
            keep_within: Some("30d".into()),
            host: Some("web1".into()),
            tags: vec!["daily".into()],
            ..ForgetPolicy::default()
        };

        let args = policy.to_args();
        assert_eq!(
            args,
            vec![
                "--keep-last",
                "3",
                "--keep-daily",
                "7",
                "--keep-within",
                "30d",
                "--host",
                "web1",
                "--tag",
                "daily",
            ]
        );
    }

    #[test]
    fn forget_policy_empty_detection() {
        assert!(ForgetPolicy::default().is_empty());
        assert!(
            !ForgetPolicy {
                keep_last: Some(1),
                ..ForgetPolicy::default()
            }
            .is_empty()
        );
        // Scoping filters alone do not make a policy runnable.
        assert!(
            ForgetPolicy {
                host: Some("web1".into()),
                ..ForgetPolicy::default()
            }
            .is_empty()
        );
    }

    #[test]
    fn file_node_type_mapping() {
        let node: FileNode = serde_json::from_str(
            r#"{"message_type":"node","name":"etc","type":"dir","path":"/etc","uid":0,"gid":0}"#,
        )
        .unwrap();
        assert!(node.is_dir());
        assert_eq!(node.path, "/etc");
    }
}
