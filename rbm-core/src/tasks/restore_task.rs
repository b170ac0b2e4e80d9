//! ``src/tasks/restore_task.rs``
//! ============================================================================
//! # Restore task
//!
//! Same bridge as the backup task, for the restore stream. Restore
//! output is not structured, so the stream only reports start, one
//! terminal summary, or failure.

use restic_client::{ResticClient, RestoreOptions, stream_restore};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::controller::event_loop::TaskResult;

pub fn run_restore_task(
    client: ResticClient,
    opts: RestoreOptions,
    cancel: CancellationToken,
    task_tx: UnboundedSender<TaskResult>,
) {
    tokio::spawn(async move {
        info!(
            repo = %client.profile().name,
            snapshot = %opts.snapshot_id,
            "restore starting"
        );
        let mut events = stream_restore(client, opts, cancel);
        while let Some(event) = events.recv().await {
            if task_tx.send(TaskResult::Restore(event)).is_err() {
                break;
            }
        }
    });
}
