//! ``src/tasks/backup_task.rs``
//! ============================================================================
//! # Backup task
//!
//! Bridges the driver's streaming backup channel onto the task channel.
//! The stream ends with exactly one terminal event; once it closes this
//! task is done. Cancellation travels the other way, through the token
//! held by the operation session.

use restic_client::{BackupOptions, ResticClient, stream_backup};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::controller::event_loop::TaskResult;

pub fn run_backup_task(
    client: ResticClient,
    opts: BackupOptions,
    cancel: CancellationToken,
    task_tx: UnboundedSender<TaskResult>,
) {
    tokio::spawn(async move {
        info!(repo = %client.profile().name, paths = ?opts.paths, "backup starting");
        let mut events = stream_backup(client, opts, cancel);
        while let Some(event) = events.recv().await {
            if task_tx.send(TaskResult::Backup(event)).is_err() {
                break;
            }
        }
    });
}
