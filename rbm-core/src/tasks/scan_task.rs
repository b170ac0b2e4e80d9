//! ``src/tasks/scan_task.rs``
//! ============================================================================
//! # Repository discovery scan
//!
//! Walks a fixed set of plausible mount points and user directories two
//! levels deep, looking for the on-disk shape of a restic repository (a
//! `config` file next to `data`, `keys` and `snapshots`). `systemd*`
//! names are pruned without descending; they are runtime clutter, never
//! repositories.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use restic_client::RepoProfile;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;
use walkdir::{DirEntry, WalkDir};

use crate::controller::event_loop::TaskResult;

pub fn scan_repos_task(task_tx: UnboundedSender<TaskResult>) {
    tokio::spawn(async move {
        let found = tokio::task::spawn_blocking(scan_known_roots)
            .await
            .unwrap_or_default();
        info!(candidates = found.len(), "repository scan finished");
        let _ = task_tx.send(TaskResult::ScanCompleted { found });
    });
}

fn candidate_roots() -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = vec![
        PathBuf::from("/mnt"),
        PathBuf::from("/media"),
        PathBuf::from("/run/media"),
        PathBuf::from("/tmp"),
    ];
    if let Some(base) = BaseDirs::new() {
        let home = base.home_dir();
        roots.push(home.join("Backup"));
        roots.push(home.join("Documents"));
        roots.push(home.join("Downloads"));
    }
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    roots
}

fn scan_known_roots() -> Vec<PathBuf> {
    let mut found = Vec::new();
    for root in candidate_roots() {
        scan_root(&root, &mut found);
    }
    // roots can nest (cwd under /tmp), so the same hit may appear twice
    found.sort();
    found.dedup();
    found
}

fn scan_root(root: &Path, found: &mut Vec<PathBuf>) {
    if !root.is_dir() {
        return;
    }
    let walker = WalkDir::new(root)
        .max_depth(2)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_systemd_name(entry));
    for entry in walker.flatten() {
        if entry.file_type().is_dir() && RepoProfile::looks_like_repository(entry.path()) {
            found.push(entry.path().to_path_buf());
        }
    }
}

fn is_systemd_name(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with("systemd"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fake_repo(dir: &Path) {
        fs::create_dir_all(dir.join("data")).unwrap();
        fs::create_dir_all(dir.join("keys")).unwrap();
        fs::create_dir_all(dir.join("snapshots")).unwrap();
        fs::write(dir.join("config"), b"{}").unwrap();
    }

    #[test]
    fn finds_repositories_up_to_two_levels_deep() {
        let tmp = tempfile::tempdir().unwrap();
        fake_repo(&tmp.path().join("backup"));
        fake_repo(&tmp.path().join("disk/restic"));
        fake_repo(&tmp.path().join("a/b/too-deep"));
        fs::create_dir_all(tmp.path().join("plain/dir")).unwrap();

        let mut found = Vec::new();
        scan_root(tmp.path(), &mut found);
        found.sort();

        assert_eq!(
            found,
            vec![tmp.path().join("backup"), tmp.path().join("disk/restic")]
        );
    }

    #[test]
    fn systemd_directories_are_pruned() {
        let tmp = tempfile::tempdir().unwrap();
        fake_repo(&tmp.path().join("systemd-private-xyz"));
        fake_repo(&tmp.path().join("systemd-private-xyz2/repo"));
        fake_repo(&tmp.path().join("real"));

        let mut found = Vec::new();
        scan_root(tmp.path(), &mut found);

        assert_eq!(found, vec![tmp.path().join("real")]);
    }

    #[test]
    fn a_root_that_is_itself_a_repository_counts() {
        let tmp = tempfile::tempdir().unwrap();
        fake_repo(tmp.path());

        let mut found = Vec::new();
        scan_root(tmp.path(), &mut found);

        assert_eq!(found, vec![tmp.path().to_path_buf()]);
    }

    #[test]
    fn missing_roots_are_skipped_quietly() {
        let mut found = Vec::new();
        scan_root(Path::new("/definitely/not/here"), &mut found);
        assert!(found.is_empty());
    }
}
