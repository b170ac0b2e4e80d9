//! ``src/controller/actions.rs``
//! ============================================================================
//! # Actions
//!
//! Every user input and internal event is mapped to one `Action` before
//! any state is touched. The event loop produces them, the dispatcher
//! consumes them; nothing else mutates [`AppState`].
//!
//! [`AppState`]: crate::model::app_state::AppState

use crate::controller::event_loop::TaskResult;

/// A high-level command, decoupled from raw terminal events.
#[derive(Debug, Clone)]
pub enum Action {
    /// Operator accepted a dry-run preview; raise the typed confirmation.
    AcceptPreview,

    /// Enter filter-entry mode on the snapshot panel.
    BeginFilter,

    /// Start the prune chain (dry-run first).
    BeginPrune,

    /// Run `cache --cleanup` in the background.
    CacheCleanup,

    CancelBackup,

    CancelRestore,

    /// Drop the active filter and show the full snapshot list.
    ClearFilter,

    CloseOverlay,

    ConfirmBackspace,

    ConfirmInput(char),

    /// Submit the typed confirmation word.
    ConfirmSubmit,

    /// Leave filter-entry mode, keeping the filter applied.
    EndFilter,

    /// Context action for the focused row: activate a repository, open
    /// a snapshot's file browser, pick a scan hit.
    EnterSelected,

    FilterBackspace,

    FilterInput(char),

    FormBackspace,

    FormInput(char),

    FormNextField,

    FormPrevField,

    /// Submit the focused form.
    FormSubmit,

    /// Flip the focused toggle field.
    FormToggle,

    Help,

    MoveSelectionDown,

    MoveSelectionUp,

    /// Next page in a paged overlay.
    NextPage,

    NextPanel,

    /// No state change; the event was consumed.
    NoOp,

    /// Open the backup form for the active repository.
    OpenBackupForm,

    /// Open the retention policy form.
    OpenForgetForm,

    /// Open the add-repository form.
    OpenRepoForm,

    /// Open the restore form for the selected snapshot.
    OpenRestoreForm,

    PrevPage,

    PrevPanel,

    Quit,

    /// Re-query snapshots and repository info.
    Refresh,

    /// Remove the selected repository entry (typed-confirmation gated).
    RemoveRepo,

    Resize(u16, u16),

    /// Walk well-known directories for restic repositories.
    Scan,

    /// A background task finished or produced an event.
    TaskResult(TaskResult),

    /// Toggle the mark on the file browser row under the cursor.
    ToggleMark,

    /// Run `unlock` in the background.
    Unlock,
}
