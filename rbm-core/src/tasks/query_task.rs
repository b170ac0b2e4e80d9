//! ``src/tasks/query_task.rs``
//! ============================================================================
//! # Query tasks
//!
//! One-shot subprocess invocations run off the UI task: snapshot and
//! file listings, repository info, retention dry-runs and their live
//! counterparts, maintenance commands, configuration writes. Every task
//! reports back over the task channel; none of them touch state.

use std::path::PathBuf;
use std::time::Duration;

use compact_str::CompactString;
use restic_client::{ForgetPolicy, ResticClient};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::config::{self, Config, RepoEntry};
use crate::controller::event_loop::TaskResult;
use crate::model::forms::{CredentialMethod, RepoFormSubmission};

/// Probes `restic version` with a deadline so a wedged binary cannot
/// stall startup reporting.
pub fn version_probe_task(
    program: String,
    timeout: Duration,
    task_tx: UnboundedSender<TaskResult>,
) {
    tokio::spawn(async move {
        let result = match tokio::time::timeout(timeout, restic_client::version(&program)).await {
            Ok(Ok(version)) => {
                info!(version = %version, "restic binary found");
                Ok(version)
            }
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!("'{program} version' timed out")),
        };
        let _ = task_tx.send(TaskResult::VersionProbed(result));
    });
}

/// Lists snapshots; the result carries the generation it was spawned
/// under so stale answers are recognized on arrival.
pub fn snapshots_task(client: ResticClient, generation: u64, task_tx: UnboundedSender<TaskResult>) {
    tokio::spawn(async move {
        let result = client.snapshots().await.map_err(|err| err.to_string());
        if let Err(err) = &result {
            warn!(repo = %client.profile().name, error = %err, "snapshot query failed");
        }
        let _ = task_tx.send(TaskResult::SnapshotsLoaded { generation, result });
    });
}

pub fn repo_info_task(
    client: ResticClient,
    repo_index: usize,
    task_tx: UnboundedSender<TaskResult>,
) {
    tokio::spawn(async move {
        let info = client.repo_info().await;
        let _ = task_tx.send(TaskResult::RepoInfoLoaded { repo_index, info });
    });
}

pub fn list_files_task(
    client: ResticClient,
    snapshot_id: String,
    task_tx: UnboundedSender<TaskResult>,
) {
    tokio::spawn(async move {
        let result = client
            .list_files(&snapshot_id)
            .await
            .map_err(|err| err.to_string());
        let _ = task_tx.send(TaskResult::FilesLoaded {
            snapshot_id,
            result,
        });
    });
}

pub fn forget_preview_task(
    client: ResticClient,
    repo_index: usize,
    policy: ForgetPolicy,
    task_tx: UnboundedSender<TaskResult>,
) {
    tokio::spawn(async move {
        let result = client
            .forget_dry_run(&policy)
            .await
            .map_err(|err| err.to_string());
        let _ = task_tx.send(TaskResult::ForgetPreviewReady {
            repo_index,
            policy,
            result,
        });
    });
}

pub fn forget_task(
    client: ResticClient,
    repo_index: usize,
    policy: ForgetPolicy,
    task_tx: UnboundedSender<TaskResult>,
) {
    tokio::spawn(async move {
        info!(repo = %client.profile().name, "applying retention policy");
        let result = client.forget(&policy).await.map_err(|err| err.to_string());
        let _ = task_tx.send(TaskResult::ForgetCompleted { repo_index, result });
    });
}

pub fn prune_preview_task(
    client: ResticClient,
    repo_index: usize,
    task_tx: UnboundedSender<TaskResult>,
) {
    tokio::spawn(async move {
        let result = client.prune_dry_run().await.map_err(|err| err.to_string());
        let _ = task_tx.send(TaskResult::PruneDryRunReady { repo_index, result });
    });
}

pub fn prune_task(client: ResticClient, repo_index: usize, task_tx: UnboundedSender<TaskResult>) {
    tokio::spawn(async move {
        info!(repo = %client.profile().name, "pruning repository");
        let result = client.prune().await.map_err(|err| err.to_string());
        let _ = task_tx.send(TaskResult::PruneCompleted { repo_index, result });
    });
}

pub fn cache_cleanup_task(client: ResticClient, task_tx: UnboundedSender<TaskResult>) {
    tokio::spawn(async move {
        let result = client.cleanup_cache().await.map_err(|err| err.to_string());
        let _ = task_tx.send(TaskResult::MaintenanceCompleted {
            label: CompactString::const_new("cache cleanup"),
            result,
        });
    });
}

pub fn unlock_task(client: ResticClient, task_tx: UnboundedSender<TaskResult>) {
    tokio::spawn(async move {
        let result = client.unlock().await.map_err(|err| err.to_string());
        let _ = task_tx.send(TaskResult::MaintenanceCompleted {
            label: CompactString::const_new("unlock"),
            result,
        });
    });
}

/// Builds the configured entry for the add-repository form: generates
/// the password file when asked, then optionally initializes the
/// repository. The entry is only reported once everything succeeded.
pub fn add_repo_task(
    submission: RepoFormSubmission,
    program: String,
    task_tx: UnboundedSender<TaskResult>,
) {
    tokio::spawn(async move {
        let result = build_repo_entry(submission, &program).await;
        if let Err(err) = &result {
            warn!(error = %err, "add repository failed");
        }
        let _ = task_tx.send(TaskResult::RepoAdded { result });
    });
}

async fn build_repo_entry(submission: RepoFormSubmission, program: &str) -> Result<RepoEntry, String> {
    let mut entry = RepoEntry {
        name: submission.name.clone(),
        location: submission.location,
        password_file: None,
        password_command: None,
        password: None,
    };

    match submission.method {
        CredentialMethod::PasswordFile => {
            if submission.generate {
                let path = config::generate_password_file(&submission.name)
                    .await
                    .map_err(|err| err.to_string())?;
                info!(path = %path.display(), "generated password file");
                entry.password_file = Some(path);
            } else {
                entry.password_file = Some(submission.credential.into());
            }
        }
        CredentialMethod::PasswordCommand => {
            entry.password_command = Some(submission.credential);
        }
    }

    // same gate every other invocation passes through
    entry.credential_check().map_err(|err| err.to_string())?;

    if submission.run_init {
        let profile = entry.to_profile().map_err(|err| err.to_string())?;
        let client = ResticClient::with_program(profile, program);
        let output = client.init().await.map_err(|err| err.to_string())?;
        info!(repo = %entry.name, output = %output.trim(), "repository initialized");
    }

    Ok(entry)
}

/// Persists the configuration off the UI task.
pub fn save_config_task(config: Config, path: PathBuf, task_tx: UnboundedSender<TaskResult>) {
    tokio::spawn(async move {
        let result = config.save_to(&path).await.map_err(|err| err.to_string());
        let _ = task_tx.send(TaskResult::ConfigSaved { result });
    });
}
