//! ``src/controller/event_loop.rs``
//! ============================================================================
//! # Event loop
//!
//! Merges terminal input with background task results into a single
//! stream of [`Action`]s. Key mapping is a pure function of the current
//! state: the active overlay claims keys first, then filter-entry mode,
//! then the normal browse bindings. The loop never mutates state; that
//! is the dispatcher's job.

use std::path::PathBuf;

use compact_str::CompactString;
use crossterm::event::{
    Event as TermEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};
use futures::StreamExt;
use restic_client::{
    BackupEvent, FileNode, ForgetGroup, ForgetPolicy, RepoInfo, RestoreEvent, Snapshot,
};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::RepoEntry;
use crate::controller::actions::Action;
use crate::model::app_state::{AppState, Overlay, Panel};
use crate::model::forms::FocusKind;

/// Completion or progress of a background task, delivered over the task
/// channel and folded into state by the dispatcher.
#[derive(Debug, Clone)]
pub enum TaskResult {
    /// Startup `restic version` probe.
    VersionProbed(Result<String, String>),

    /// Snapshot query result, stamped with the generation it was
    /// spawned under.
    SnapshotsLoaded {
        generation: u64,
        result: Result<Vec<Snapshot>, String>,
    },

    RepoInfoLoaded {
        repo_index: usize,
        info: RepoInfo,
    },

    /// `ls` output for the file browser.
    FilesLoaded {
        snapshot_id: String,
        result: Result<Vec<FileNode>, String>,
    },

    /// One event from a streaming backup.
    Backup(BackupEvent),

    /// One event from a streaming restore.
    Restore(RestoreEvent),

    ForgetPreviewReady {
        repo_index: usize,
        policy: ForgetPolicy,
        result: Result<Vec<ForgetGroup>, String>,
    },

    ForgetCompleted {
        repo_index: usize,
        result: Result<(), String>,
    },

    PruneDryRunReady {
        repo_index: usize,
        result: Result<String, String>,
    },

    PruneCompleted {
        repo_index: usize,
        result: Result<String, String>,
    },

    /// One-shot maintenance command (cache cleanup, unlock) finished.
    MaintenanceCompleted {
        label: CompactString,
        result: Result<String, String>,
    },

    ScanCompleted {
        found: Vec<PathBuf>,
    },

    /// Add-repository task: password generation and optional init done.
    RepoAdded {
        result: Result<RepoEntry, String>,
    },

    ConfigSaved {
        result: Result<(), String>,
    },
}

pub struct EventLoop {
    task_rx: mpsc::UnboundedReceiver<TaskResult>,
    event_stream: EventStream,
}

impl EventLoop {
    pub fn new(task_rx: mpsc::UnboundedReceiver<TaskResult>) -> Self {
        Self {
            task_rx,
            event_stream: EventStream::new(),
        }
    }

    /// Waits for the next terminal event or task result. Returns `Quit`
    /// when both sources are exhausted.
    pub async fn next_action(&mut self, state: &AppState) -> Action {
        tokio::select! {
            maybe_event = self.event_stream.next() => {
                match maybe_event {
                    Some(Ok(event)) => {
                        trace!(?event, "terminal event");
                        let action = Self::map_event(state, event);
                        debug!(?action, "terminal event mapped");
                        action
                    }
                    Some(Err(_)) | None => Action::Quit,
                }
            }

            maybe_task = self.task_rx.recv() => {
                match maybe_task {
                    Some(task) => {
                        debug!(?task, "task result received");
                        Action::TaskResult(task)
                    }
                    None => Action::Quit,
                }
            }
        }
    }

    fn map_event(state: &AppState, event: TermEvent) -> Action {
        match event {
            TermEvent::Key(key) if key.kind == KeyEventKind::Press => Self::map_key(state, key),
            TermEvent::Resize(w, h) => Action::Resize(w, h),
            _ => Action::NoOp,
        }
    }

    /// Pure key mapping; overlays claim keys before browse bindings.
    pub fn map_key(state: &AppState, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Action::Quit,
                KeyCode::Char('b') => Action::CancelBackup,
                KeyCode::Char('r') => Action::CancelRestore,
                _ => Action::NoOp,
            };
        }

        match &state.overlay {
            Overlay::None => {
                if state.filtering {
                    Self::filter_entry_keys(key)
                } else {
                    Self::browse_keys(state, key)
                }
            }
            Overlay::Help => match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q' | '?') => Action::CloseOverlay,
                _ => Action::NoOp,
            },
            Overlay::Confirm(_) => match key.code {
                KeyCode::Esc => Action::CloseOverlay,
                KeyCode::Enter => Action::ConfirmSubmit,
                KeyCode::Backspace => Action::ConfirmBackspace,
                KeyCode::Char(c) => Action::ConfirmInput(c),
                _ => Action::NoOp,
            },
            Overlay::Backup(form) => Self::form_keys(form.focus_kind(), key),
            Overlay::Restore(form) => Self::form_keys(form.focus_kind(), key),
            Overlay::Forget(form) => Self::form_keys(form.focus_kind(), key),
            Overlay::Repo(form) => Self::form_keys(form.focus_kind(), key),
            Overlay::ForgetPreview(_) | Overlay::PrunePreview(_) => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => Action::CloseOverlay,
                KeyCode::Enter => Action::AcceptPreview,
                KeyCode::Down | KeyCode::Char('j') => Action::MoveSelectionDown,
                KeyCode::Up | KeyCode::Char('k') => Action::MoveSelectionUp,
                _ => Action::NoOp,
            },
            Overlay::FileBrowser(_) => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => Action::CloseOverlay,
                KeyCode::Left | KeyCode::Char('h') => Action::PrevPage,
                KeyCode::Right | KeyCode::Char('l') => Action::NextPage,
                KeyCode::Down | KeyCode::Char('j') => Action::MoveSelectionDown,
                KeyCode::Up | KeyCode::Char('k') => Action::MoveSelectionUp,
                KeyCode::Char(' ') => Action::ToggleMark,
                KeyCode::Char('R') => Action::OpenRestoreForm,
                _ => Action::NoOp,
            },
            Overlay::Scan(_) => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => Action::CloseOverlay,
                KeyCode::Down | KeyCode::Char('j') => Action::MoveSelectionDown,
                KeyCode::Up | KeyCode::Char('k') => Action::MoveSelectionUp,
                KeyCode::Enter => Action::EnterSelected,
                _ => Action::NoOp,
            },
        }
    }

    fn filter_entry_keys(key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => Action::ClearFilter,
            KeyCode::Enter => Action::EndFilter,
            KeyCode::Backspace => Action::FilterBackspace,
            KeyCode::Char(c) => Action::FilterInput(c),
            _ => Action::NoOp,
        }
    }

    fn form_keys(kind: FocusKind, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => Action::CloseOverlay,
            KeyCode::Tab | KeyCode::Down => Action::FormNextField,
            KeyCode::BackTab | KeyCode::Up => Action::FormPrevField,
            KeyCode::Enter => match kind {
                FocusKind::Submit => Action::FormSubmit,
                _ => Action::FormNextField,
            },
            KeyCode::Backspace => Action::FormBackspace,
            KeyCode::Char(' ') => match kind {
                FocusKind::Toggle => Action::FormToggle,
                FocusKind::Text => Action::FormInput(' '),
                FocusKind::Submit => Action::NoOp,
            },
            KeyCode::Char(c) => match kind {
                FocusKind::Text => Action::FormInput(c),
                _ => Action::NoOp,
            },
            _ => Action::NoOp,
        }
    }

    fn browse_keys(state: &AppState, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('?') => Action::Help,
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => Action::NextPanel,
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => Action::PrevPanel,
            KeyCode::Down | KeyCode::Char('j') => Action::MoveSelectionDown,
            KeyCode::Up | KeyCode::Char('k') => Action::MoveSelectionUp,
            KeyCode::Enter => Action::EnterSelected,
            KeyCode::Char('r') => Action::Refresh,
            // filter entry only makes sense over the snapshot list
            KeyCode::Char('/') if state.panel == Panel::Snapshots => Action::BeginFilter,
            KeyCode::Char('c') => Action::ClearFilter,
            KeyCode::Char('b') => Action::OpenBackupForm,
            KeyCode::Char('R') => Action::OpenRestoreForm,
            KeyCode::Char('f') => Action::OpenForgetForm,
            KeyCode::Char('a') => Action::OpenRepoForm,
            KeyCode::Char('P') => Action::BeginPrune,
            KeyCode::Char('s') => Action::Scan,
            KeyCode::Char('C') => Action::CacheCleanup,
            KeyCode::Char('u') => Action::Unlock,
            KeyCode::Char('x') => Action::RemoveRepo,
            _ => Action::NoOp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::confirm::ConfirmDialog;
    use crate::model::forms::{RepoField, RepoForm, RestoreForm};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn filter_key_only_binds_on_the_snapshot_panel() {
        let mut state = AppState::new(Config::default());
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Char('/'))),
            Action::NoOp
        ));

        state.next_panel();
        assert_eq!(state.panel, Panel::Snapshots);
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Char('/'))),
            Action::BeginFilter
        ));
    }

    #[test]
    fn filter_entry_captures_characters() {
        let mut state = AppState::new(Config::default());
        state.next_panel();
        state.begin_filter();

        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Char('q'))),
            Action::FilterInput('q')
        ));
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Enter)),
            Action::EndFilter
        ));
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Esc)),
            Action::ClearFilter
        ));
    }

    #[test]
    fn enter_submits_only_from_the_submit_field() {
        let mut state = AppState::new(Config::default());
        let mut form = RepoForm::new();
        form.focus = RepoField::Name;
        state.open_overlay(Overlay::Repo(form));

        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Enter)),
            Action::FormNextField
        ));

        let mut form = RepoForm::new();
        form.focus = RepoField::Submit;
        state.open_overlay(Overlay::Repo(form));
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Enter)),
            Action::FormSubmit
        ));
    }

    #[test]
    fn space_toggles_only_on_toggle_fields() {
        let mut state = AppState::new(Config::default());
        let mut form = RepoForm::new();
        form.focus = RepoField::Generate;
        state.open_overlay(Overlay::Repo(form));
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Char(' '))),
            Action::FormToggle
        ));

        let mut form = RepoForm::new();
        form.focus = RepoField::Location;
        state.open_overlay(Overlay::Repo(form));
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Char(' '))),
            Action::FormInput(' ')
        ));
    }

    #[test]
    fn confirm_overlay_takes_free_text() {
        let mut state = AppState::new(Config::default());
        state.open_overlay(Overlay::Confirm(ConfirmDialog::prune(0)));

        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Char('P'))),
            Action::ConfirmInput('P')
        ));
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Backspace)),
            Action::ConfirmBackspace
        ));
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Enter)),
            Action::ConfirmSubmit
        ));
        // q is input here, never quit
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Char('q'))),
            Action::ConfirmInput('q')
        ));
    }

    #[test]
    fn file_browser_keys_page_and_mark() {
        let mut state = AppState::new(Config::default());
        state.open_overlay(Overlay::FileBrowser(
            crate::model::app_state::FileBrowserState::new("abc123", 50),
        ));

        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Char('l'))),
            Action::NextPage
        ));
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Char('h'))),
            Action::PrevPage
        ));
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Char(' '))),
            Action::ToggleMark
        ));
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Char('R'))),
            Action::OpenRestoreForm
        ));
    }

    #[test]
    fn restore_form_enter_walks_fields_until_submit() {
        let mut state = AppState::new(Config::default());
        state.open_overlay(Overlay::Restore(RestoreForm::new("abc123", Vec::new())));
        assert!(matches!(
            EventLoop::map_key(&state, press(KeyCode::Enter)),
            Action::FormNextField
        ));
    }

    #[test]
    fn control_chords_work_everywhere() {
        let mut state = AppState::new(Config::default());
        assert!(matches!(EventLoop::map_key(&state, ctrl('c')), Action::Quit));
        assert!(matches!(
            EventLoop::map_key(&state, ctrl('b')),
            Action::CancelBackup
        ));

        state.open_overlay(Overlay::Help);
        assert!(matches!(
            EventLoop::map_key(&state, ctrl('r')),
            Action::CancelRestore
        ));
    }
}
