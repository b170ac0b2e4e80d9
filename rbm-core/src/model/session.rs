//! # In-flight operation sessions
//!
//! One [`OperationSession`] exists per running backup or restore. It
//! owns the cancellation token handed to the stream task and the last
//! progress snapshot for rendering. Once a terminal event has been
//! folded in, the session refuses further progress; the holder drops it
//! after logging the outcome.

use std::time::Instant;

use restic_client::BackupProgress;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Backup,
    Restore,
}

impl OperationKind {
    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Restore => "restore",
        }
    }
}

#[derive(Debug)]
pub struct OperationSession {
    pub id: Uuid,
    pub kind: OperationKind,
    pub repo_index: usize,
    pub started_at: Instant,
    /// Human-readable description for the operations panel.
    pub label: String,
    cancel: CancellationToken,
    progress: Option<BackupProgress>,
    restore_started: bool,
    finished: bool,
}

impl OperationSession {
    pub fn new(kind: OperationKind, repo_index: usize, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            repo_index,
            started_at: Instant::now(),
            label: label.into(),
            cancel: CancellationToken::new(),
            progress: None,
            restore_started: false,
            finished: false,
        }
    }

    /// Token to hand to the stream task; cloning shares the same signal.
    #[inline]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    #[inline]
    pub fn cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Folds a progress report in. Returns false once the session has
    /// already seen its terminal event; the caller drops the report.
    pub fn apply_progress(&mut self, progress: BackupProgress) -> bool {
        if self.finished {
            return false;
        }
        self.progress = Some(progress);
        true
    }

    /// Marks a restore as having produced output. False after the
    /// terminal event, same contract as [`apply_progress`].
    ///
    /// [`apply_progress`]: Self::apply_progress
    pub fn mark_started(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.restore_started = true;
        true
    }

    /// Records the terminal event. True exactly once.
    pub fn finish(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        true
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[inline]
    pub fn progress(&self) -> Option<&BackupProgress> {
        self.progress.as_ref()
    }

    #[inline]
    pub fn restore_started(&self) -> bool {
        self.restore_started
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_refused_after_the_terminal_event() {
        let mut session = OperationSession::new(OperationKind::Backup, 0, "backup /home");
        assert!(session.apply_progress(BackupProgress::default()));
        assert!(session.finish());
        assert!(!session.apply_progress(BackupProgress::default()));
        assert!(!session.mark_started());
    }

    #[test]
    fn finish_is_idempotent_but_reports_once() {
        let mut session = OperationSession::new(OperationKind::Restore, 2, "restore abc123");
        assert!(session.finish());
        assert!(!session.finish());
        assert!(session.is_finished());
    }

    #[test]
    fn cancel_token_is_shared() {
        let session = OperationSession::new(OperationKind::Backup, 0, "backup /home");
        let token = session.cancel_token();
        assert!(!token.is_cancelled());
        session.request_cancel();
        assert!(token.is_cancelled());
        assert!(session.cancel_requested());
    }
}
