//! Streaming supervision of long-running backup and restore subprocesses.
//!
//! `stream_backup`/`stream_restore` spawn one restic child each and return
//! an event channel. Stdout is read one line at a time; each line is
//! speculatively parsed and classified by its `message_type` discriminator
//! (backup) or by restic's plain-text `restoring` marker (restore).
//! Unrecognized lines are dropped without failing the stream.
//!
//! Channel guarantees, which [`crate::client`] callers rely on:
//! - events arrive in the order the child emitted them;
//! - exactly one terminal event ([`BackupEvent::Summary`] /
//!   [`RestoreEvent::Summary`] / `Failed`) is sent, after which the
//!   channel closes;
//! - a cancelled run never yields a summary, only a `Failed` event once
//!   the child has been reaped.

use std::time::Instant;

use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines},
    process::{Child, ChildStdout},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    client::{MessageTypeProbe, ResticClient},
    error::ResticError,
    types::{BackupOptions, BackupProgress, BackupSummary, RestoreOptions, RestoreSummary},
};

/// Events emitted while a backup runs. `Summary` and `Failed` are
/// terminal; nothing follows either.
#[derive(Debug, Clone, PartialEq)]
pub enum BackupEvent {
    Progress(BackupProgress),
    Summary(BackupSummary),
    Failed(String),
}

/// Events emitted while a restore runs. Restore progress is binary:
/// `Started` fires once when restic begins restoring, and the summary is
/// synthesized on clean exit because restic prints no structured one.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreEvent {
    Started,
    Summary(RestoreSummary),
    Failed(String),
}

/// Launch a supervised backup. The receiver sees zero or more `Progress`
/// events followed by exactly one terminal event.
pub fn stream_backup(
    client: ResticClient,
    opts: BackupOptions,
    cancel: CancellationToken,
) -> UnboundedReceiver<BackupEvent> {
    let (tx, rx) = mpsc::unbounded_channel::<BackupEvent>();
    tokio::spawn(run_backup(client, opts, cancel, tx));
    rx
}

/// Launch a supervised restore. The receiver sees at most one `Started`
/// followed by exactly one terminal event.
pub fn stream_restore(
    client: ResticClient,
    opts: RestoreOptions,
    cancel: CancellationToken,
) -> UnboundedReceiver<RestoreEvent> {
    let (tx, rx) = mpsc::unbounded_channel::<RestoreEvent>();
    tokio::spawn(run_restore(client, opts, cancel, tx));
    rx
}

fn classify_backup_line(line: &str) -> Option<BackupEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let probe: MessageTypeProbe = serde_json::from_str(line).ok()?;
    match probe.message_type.as_str() {
        "status" => serde_json::from_str::<BackupProgress>(line)
            .ok()
            .map(BackupEvent::Progress),
        "summary" => serde_json::from_str::<BackupSummary>(line)
            .ok()
            .map(BackupEvent::Summary),
        _ => None,
    }
}

/// Drain the child's stderr concurrently so a chatty tool can never fill
/// the pipe and deadlock against our stdout reads.
fn collect_stderr(child: &mut Child) -> JoinHandle<String> {
    let stderr = child.stderr.take();
    tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(stderr) = stderr {
            let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
        }
        buf
    })
}

async fn run_backup(
    client: ResticClient,
    opts: BackupOptions,
    cancel: CancellationToken,
    tx: UnboundedSender<BackupEvent>,
) {
    if let Err(e) = client.profile().validate() {
        let _ = tx.send(BackupEvent::Failed(e.to_string()));
        return;
    }

    let mut args: Vec<String> = vec!["backup".to_string(), "--json".to_string()];
    args.extend(opts.paths.iter().cloned());
    for tag in &opts.tags {
        args.push("--tag".to_string());
        args.push(tag.clone());
    }
    for pattern in &opts.excludes {
        args.push("--exclude".to_string());
        args.push(pattern.clone());
    }

    info!(repo = %client.profile().name, paths = ?opts.paths, "starting backup");

    let mut child: Child = match client.command(&args).spawn() {
        Ok(child) => child,
        Err(e) => {
            let _ = tx.send(BackupEvent::Failed(
                ResticError::launch(client.program(), e).to_string(),
            ));
            return;
        }
    };

    let stderr_task = collect_stderr(&mut child);
    let stdout: ChildStdout = child.stdout.take().expect("stdout must be piped");
    let mut lines: Lines<BufReader<ChildStdout>> = BufReader::new(stdout).lines();

    let mut summary_sent = false;
    let mut cancelled = false;

    loop {
        tokio::select! {
            () = cancel.cancelled(), if !cancelled => {
                cancelled = true;
                let _ = child.start_kill();
                // keep reading to EOF so the child can be reaped below
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if cancelled {
                        continue;
                    }
                    match classify_backup_line(&line) {
                        Some(BackupEvent::Summary(summary)) if !summary_sent => {
                            summary_sent = true;
                            let _ = tx.send(BackupEvent::Summary(summary));
                        }
                        Some(BackupEvent::Progress(progress)) if !summary_sent => {
                            let _ = tx.send(BackupEvent::Progress(progress));
                        }
                        _ => {}
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "backup stdout read failed");
                    break;
                }
            }
        }
    }

    let status = child.wait().await;
    let stderr_text = stderr_task.await.unwrap_or_default();

    if cancelled {
        debug!(repo = %client.profile().name, "backup cancelled");
        if !summary_sent {
            let _ = tx.send(BackupEvent::Failed(
                "backup cancelled before completion".to_string(),
            ));
        }
        return;
    }

    match status {
        Ok(status) if status.success() => {
            if !summary_sent {
                // Clean exit without a summary line still has to close the
                // session with a terminal event.
                let _ = tx.send(BackupEvent::Summary(BackupSummary::default()));
            }
        }
        Ok(status) => {
            if summary_sent {
                // restic can exit 3 after a summary when some source files
                // were unreadable; the terminal event is already out.
                warn!(code = ?status.code(), "backup exited non-zero after summary");
            } else {
                let _ = tx.send(BackupEvent::Failed(
                    ResticError::command_failed("backup", status.code(), stderr_text.trim())
                        .to_string(),
                ));
            }
        }
        Err(e) => {
            if !summary_sent {
                let _ = tx.send(BackupEvent::Failed(format!(
                    "failed to wait for restic: {e}"
                )));
            }
        }
    }
}

async fn run_restore(
    client: ResticClient,
    opts: RestoreOptions,
    cancel: CancellationToken,
    tx: UnboundedSender<RestoreEvent>,
) {
    if let Err(e) = client.profile().validate() {
        let _ = tx.send(RestoreEvent::Failed(e.to_string()));
        return;
    }

    // No target means restore to the original location; restic spells
    // that as target "/". Callers opt into this explicitly.
    let target = opts.target.clone().unwrap_or_else(|| "/".to_string());
    let mut args: Vec<String> = vec![
        "restore".to_string(),
        opts.snapshot_id.clone(),
        "--target".to_string(),
        target.clone(),
    ];
    for include in &opts.includes {
        args.push("--include".to_string());
        args.push(include.clone());
    }

    info!(
        repo = %client.profile().name,
        snapshot = %opts.snapshot_id,
        target = %target,
        "starting restore"
    );

    let started_at = Instant::now();
    let mut child: Child = match client.command(&args).spawn() {
        Ok(child) => child,
        Err(e) => {
            let _ = tx.send(RestoreEvent::Failed(
                ResticError::launch(client.program(), e).to_string(),
            ));
            return;
        }
    };

    let stderr_task = collect_stderr(&mut child);
    let stdout: ChildStdout = child.stdout.take().expect("stdout must be piped");
    let mut lines: Lines<BufReader<ChildStdout>> = BufReader::new(stdout).lines();

    let mut started = false;
    let mut cancelled = false;

    loop {
        tokio::select! {
            () = cancel.cancelled(), if !cancelled => {
                cancelled = true;
                let _ = child.start_kill();
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    // Plain-text output; the only recognizable signal is
                    // restic's "restoring <snapshot> to <target>" banner.
                    if !cancelled && !started && line.contains("restoring") {
                        started = true;
                        let _ = tx.send(RestoreEvent::Started);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "restore stdout read failed");
                    break;
                }
            }
        }
    }

    let status = child.wait().await;
    let stderr_text = stderr_task.await.unwrap_or_default();

    if cancelled {
        debug!(repo = %client.profile().name, "restore cancelled");
        let _ = tx.send(RestoreEvent::Failed(
            "restore cancelled before completion".to_string(),
        ));
        return;
    }

    match status {
        Ok(status) if status.success() => {
            let _ = tx.send(RestoreEvent::Summary(RestoreSummary {
                snapshot_id: opts.snapshot_id,
                target,
                seconds_elapsed: started_at.elapsed().as_secs(),
            }));
        }
        Ok(status) => {
            let _ = tx.send(RestoreEvent::Failed(
                ResticError::command_failed("restore", status.code(), stderr_text.trim())
                    .to_string(),
            ));
        }
        Err(e) => {
            let _ = tx.send(RestoreEvent::Failed(format!(
                "failed to wait for restic: {e}"
            )));
        }
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::repository::RepoProfile;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

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

    fn backup_opts() -> BackupOptions {
        BackupOptions {
            paths: vec!["/home".to_string()],
            tags: Vec::new(),
            excludes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn backup_classifies_lines_and_closes_after_summary() {
        let dir = TempDir::new().unwrap();
        let body = concat!(
            r#"echo '{"message_type":"status","percent_done":0.5,"files_done":3}'"#,
            "\n",
            "echo 'some chatter that is not json'",
            "\n",
            r#"echo '{"message_type":"verbose_status","action":"new"}'"#,
            "\n",
            r#"echo '{"message_type":"summary","files_new":3,"snapshot_id":"cafe01"}'"#,
        );
        let client = client_for(&dir, body);

        let mut rx = stream_backup(client, backup_opts(), CancellationToken::new());

        match rx.recv().await.unwrap() {
            BackupEvent::Progress(p) => assert_eq!(p.files_done, 3),
            other => panic!("expected progress, got {other:?}"),
        }
        match rx.recv().await.unwrap() {
            BackupEvent::Summary(s) => {
                assert_eq!(s.files_new, 3);
                assert_eq!(s.snapshot_id, "cafe01");
            }
            other => panic!("expected summary, got {other:?}"),
        }
        assert!(rx.recv().await.is_none(), "channel must close after summary");
    }

    #[tokio::test]
    async fn backup_failure_emits_single_error_with_stderr() {
        let dir = TempDir::new().unwrap();
        let body = concat!(
            r#"echo '{"message_type":"status","percent_done":0.1}'"#,
            "\n",
            "echo 'Fatal: wrong password' >&2",
            "\n",
            "exit 1",
        );
        let client = client_for(&dir, body);

        let mut rx = stream_backup(client, backup_opts(), CancellationToken::new());

        assert!(matches!(
            rx.recv().await.unwrap(),
            BackupEvent::Progress(_)
        ));
        match rx.recv().await.unwrap() {
            BackupEvent::Failed(msg) => assert!(msg.contains("wrong password"), "{msg}"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn backup_lines_after_summary_are_dropped() {
        let dir = TempDir::new().unwrap();
        let body = concat!(
            r#"echo '{"message_type":"summary","files_new":1}'"#,
            "\n",
            r#"echo '{"message_type":"status","percent_done":0.9}'"#,
            "\n",
            r#"echo '{"message_type":"summary","files_new":2}'"#,
        );
        let client = client_for(&dir, body);

        let mut rx = stream_backup(client, backup_opts(), CancellationToken::new());

        match rx.recv().await.unwrap() {
            BackupEvent::Summary(s) => assert_eq!(s.files_new, 1),
            other => panic!("expected summary, got {other:?}"),
        }
        assert!(
            rx.recv().await.is_none(),
            "no events may follow the terminal summary"
        );
    }

    #[tokio::test]
    async fn cancelled_backup_never_yields_a_summary() {
        let dir = TempDir::new().unwrap();
        let body = concat!(
            r#"echo '{"message_type":"status","percent_done":0.2}'"#,
            "\n",
            "sleep 5",
            "\n",
            r#"echo '{"message_type":"summary","files_new":9}'"#,
        );
        let client = client_for(&dir, body);
        let cancel = CancellationToken::new();

        let mut rx = stream_backup(client, backup_opts(), cancel.clone());

        assert!(matches!(
            rx.recv().await.unwrap(),
            BackupEvent::Progress(_)
        ));
        cancel.cancel();

        match rx.recv().await.unwrap() {
            BackupEvent::Failed(msg) => assert!(msg.contains("cancelled"), "{msg}"),
            other => panic!("cancellation must not produce {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn backup_launch_failure_is_reported_once() {
        let profile = RepoProfile::password_file("test", "/srv/repo", "/tmp/pw.txt");
        let client = ResticClient::with_program(profile, "/nonexistent/restic-missing");

        let mut rx = stream_backup(client, backup_opts(), CancellationToken::new());

        match rx.recv().await.unwrap() {
            BackupEvent::Failed(msg) => assert!(msg.contains("failed to launch"), "{msg}"),
            other => panic!("expected launch failure, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn restore_is_binary_and_synthesizes_summary() {
        let dir = TempDir::new().unwrap();
        let body = concat!(
            "echo 'restoring <Snapshot abc123> to /tmp/out'",
            "\n",
            "echo 'restoring file a'",
            "\n",
            "echo 'restoring file b'",
        );
        let client = client_for(&dir, body);
        let opts = RestoreOptions {
            snapshot_id: "abc123".to_string(),
            target: Some("/tmp/out".to_string()),
            includes: Vec::new(),
        };

        let mut rx = stream_restore(client, opts, CancellationToken::new());

        assert!(matches!(rx.recv().await.unwrap(), RestoreEvent::Started));
        match rx.recv().await.unwrap() {
            RestoreEvent::Summary(s) => {
                assert_eq!(s.snapshot_id, "abc123");
                assert_eq!(s.target, "/tmp/out");
            }
            other => panic!("expected summary, got {other:?}"),
        }
        assert!(rx.recv().await.is_none(), "exactly one Started, one Summary");
    }

    #[tokio::test]
    async fn restore_default_target_is_original_location() {
        let dir = TempDir::new().unwrap();
        // The stub replays its arguments so the test can see the flags.
        let client = client_for(&dir, r#"echo "args: $@""#);
        let opts = RestoreOptions {
            snapshot_id: "abc123".to_string(),
            target: None,
            includes: vec!["/etc/passwd".to_string()],
        };

        let mut rx = stream_restore(client, opts, CancellationToken::new());

        match rx.recv().await.unwrap() {
            RestoreEvent::Summary(s) => assert_eq!(s.target, "/"),
            other => panic!("expected summary, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn restore_failure_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let client = client_for(&dir, "echo 'Fatal: no such snapshot' >&2; exit 1");
        let opts = RestoreOptions {
            snapshot_id: "missing".to_string(),
            target: Some("/tmp/out".to_string()),
            includes: Vec::new(),
        };

        let mut rx = stream_restore(client, opts, CancellationToken::new());

        match rx.recv().await.unwrap() {
            RestoreEvent::Failed(msg) => assert!(msg.contains("no such snapshot"), "{msg}"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }
}
