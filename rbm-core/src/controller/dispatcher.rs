//! ``src/controller/dispatcher.rs``
//! ============================================================================
//! # Dispatcher
//!
//! The only place application state changes. Each [`Action`] is folded
//! into [`AppState`] synchronously; anything that needs a subprocess is
//! handed to a task which reports back through the task channel as
//! another action.
//!
//! ## Gates
//!
//! Before any subprocess is spawned the repository entry passes its
//! credential check (password file present and private, resolver
//! command clean). One backup and one restore may run at a time,
//! independently; repo-wide maintenance commands (forget, prune, cache
//! cleanup, unlock) share a single slot. Destructive operations walk
//! request, dry-run preview, typed confirmation, live run; a wrong
//! confirmation word aborts the chain.

use std::path::PathBuf;

use bytesize::ByteSize;
use restic_client::{BackupEvent, ResticClient, RestoreEvent};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::controller::actions::Action;
use crate::controller::event_loop::TaskResult;
use crate::model::app_state::{
    AppState, FileBrowserState, ForgetPreviewState, Overlay, Panel, PrunePreviewState, ScanState,
    VersionProbe,
};
use crate::model::confirm::{ConfirmDialog, PendingAction};
use crate::model::forms::{BackupForm, ForgetForm, RepoForm, RestoreForm};
use crate::model::session::{OperationKind, OperationSession};
use crate::tasks::backup_task::run_backup_task;
use crate::tasks::query_task::{
    add_repo_task, cache_cleanup_task, forget_preview_task, forget_task, list_files_task,
    prune_preview_task, prune_task, repo_info_task, save_config_task, snapshots_task, unlock_task,
};
use crate::tasks::restore_task::run_restore_task;
use crate::tasks::scan_task::scan_repos_task;

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub struct ActionDispatcher {
    task_tx: UnboundedSender<TaskResult>,
    /// Where configuration changes are persisted.
    config_path: PathBuf,
}

impl ActionDispatcher {
    pub fn new(task_tx: UnboundedSender<TaskResult>, config_path: PathBuf) -> Self {
        Self {
            task_tx,
            config_path,
        }
    }

    /// Folds one action into state. Returns false when the application
    /// should exit.
    pub fn handle(&self, state: &mut AppState, action: Action) -> bool {
        match action {
            Action::Quit => {
                if let Some(session) = &state.backup {
                    session.request_cancel();
                }
                if let Some(session) = &state.restore {
                    session.request_cancel();
                }
                return false;
            }

            Action::NoOp => {}
            Action::Resize(_, _) => state.mark_dirty(),

            Action::Help => {
                if matches!(state.overlay, Overlay::Help) {
                    state.close_overlay();
                } else {
                    state.open_overlay(Overlay::Help);
                }
            }
            Action::CloseOverlay => state.close_overlay(),
            Action::NextPanel => state.next_panel(),
            Action::PrevPanel => state.prev_panel(),

            Action::MoveSelectionDown => self.move_selection(state, true),
            Action::MoveSelectionUp => self.move_selection(state, false),
            Action::EnterSelected => self.enter_selected(state),
            Action::Refresh => self.refresh_repo(state),

            Action::BeginFilter => state.begin_filter(),
            Action::FilterInput(c) => {
                state.filter_input.insert_char(c);
                state.filter_edited();
            }
            Action::FilterBackspace => {
                state.filter_input.delete_char_before();
                state.filter_edited();
            }
            Action::EndFilter => state.end_filter(),
            Action::ClearFilter => state.clear_filter(),

            Action::OpenBackupForm => self.open_backup_form(state),
            Action::OpenRestoreForm => self.open_restore_form(state),
            Action::OpenForgetForm => self.open_forget_form(state),
            Action::OpenRepoForm => state.open_overlay(Overlay::Repo(RepoForm::new())),
            Action::BeginPrune => self.begin_prune(state),

            Action::FormInput(c) => Self::form_input(state, c),
            Action::FormBackspace => Self::form_backspace(state),
            Action::FormNextField => Self::form_next_field(state),
            Action::FormPrevField => Self::form_prev_field(state),
            Action::FormToggle => Self::form_toggle(state),
            Action::FormSubmit => self.form_submit(state),

            Action::ConfirmInput(c) => {
                if let Overlay::Confirm(dialog) = &mut state.overlay {
                    dialog.push_char(c);
                    state.mark_dirty();
                }
            }
            Action::ConfirmBackspace => {
                if let Overlay::Confirm(dialog) = &mut state.overlay {
                    dialog.pop_char();
                    state.mark_dirty();
                }
            }
            Action::ConfirmSubmit => self.confirm_submit(state),
            Action::AcceptPreview => self.accept_preview(state),

            Action::NextPage => {
                if let Overlay::FileBrowser(browser) = &mut state.overlay {
                    let len = browser.nodes.len();
                    browser.viewport.next_page(len);
                    state.mark_dirty();
                }
            }
            Action::PrevPage => {
                if let Overlay::FileBrowser(browser) = &mut state.overlay {
                    browser.viewport.prev_page();
                    state.mark_dirty();
                }
            }
            Action::ToggleMark => {
                if let Overlay::FileBrowser(browser) = &mut state.overlay {
                    browser.toggle_mark();
                    state.mark_dirty();
                }
            }

            Action::Scan => {
                state.ops_log.info("scanning for repositories");
                state.open_overlay(Overlay::Scan(ScanState {
                    found: Vec::new(),
                    selected: 0,
                    scanning: true,
                }));
                scan_repos_task(self.task_tx.clone());
            }
            Action::CacheCleanup => self.start_maintenance(state, MaintenanceOp::CacheCleanup),
            Action::Unlock => self.start_maintenance(state, MaintenanceOp::Unlock),
            Action::RemoveRepo => self.remove_repo(state),

            Action::CancelBackup => Self::cancel(state, OperationKind::Backup),
            Action::CancelRestore => Self::cancel(state, OperationKind::Restore),

            Action::TaskResult(task) => self.apply_task(state, task),
        }
        true
    }

    // -- clients and refresh -----------------------------------------------

    /// Builds a client for the repository, or logs why it cannot run.
    /// This is the gate every subprocess spawn goes through.
    fn client_for(&self, state: &mut AppState, repo_index: usize) -> Option<ResticClient> {
        let entry = state.config.repositories.get(repo_index)?;
        let name = entry.name.clone();
        let checked = entry.credential_check().and_then(|()| entry.to_profile());
        match checked {
            Ok(profile) => Some(ResticClient::with_program(
                profile,
                state.config.restic.program.as_str(),
            )),
            Err(err) => {
                warn!(repo = %name, error = %err, "credential check failed");
                state.ops_log.error(format!("{name}: {err}"));
                state.mark_dirty();
                None
            }
        }
    }

    /// Re-queries snapshots and repository info for the active repo.
    /// Bumps the generation first so anything already in flight is
    /// stale, whether or not a new query actually spawns.
    fn refresh_repo(&self, state: &mut AppState) {
        let Some(repo_index) = state.repo_index else {
            return;
        };
        let generation = state.bump_generation();
        let Some(client) = self.client_for(state, repo_index) else {
            state.snapshots_loading = false;
            return;
        };
        state.snapshots_loading = true;
        state.mark_dirty();
        snapshots_task(client.clone(), generation, self.task_tx.clone());
        repo_info_task(client, repo_index, self.task_tx.clone());
    }

    /// Snapshot-listing refresh without the repository-info query.
    fn refresh_snapshots(&self, state: &mut AppState) {
        let Some(repo_index) = state.repo_index else {
            return;
        };
        let generation = state.bump_generation();
        let Some(client) = self.client_for(state, repo_index) else {
            state.snapshots_loading = false;
            return;
        };
        state.snapshots_loading = true;
        state.mark_dirty();
        snapshots_task(client, generation, self.task_tx.clone());
    }

    // -- navigation --------------------------------------------------------

    fn move_selection(&self, state: &mut AppState, down: bool) {
        match &mut state.overlay {
            Overlay::FileBrowser(browser) => {
                let len = browser.nodes.len();
                if down {
                    browser.viewport.select_next(len);
                } else {
                    browser.viewport.select_prev();
                }
            }
            Overlay::ForgetPreview(preview) => {
                preview.scroll = if down {
                    preview.scroll + 1
                } else {
                    preview.scroll.saturating_sub(1)
                };
            }
            Overlay::PrunePreview(preview) => {
                preview.scroll = if down {
                    preview.scroll + 1
                } else {
                    preview.scroll.saturating_sub(1)
                };
            }
            Overlay::Scan(scan) => {
                if down {
                    if scan.selected + 1 < scan.found.len() {
                        scan.selected += 1;
                    }
                } else {
                    scan.selected = scan.selected.saturating_sub(1);
                }
            }
            Overlay::None => match state.panel {
                Panel::Repositories => {
                    let len = state.repo_count();
                    if down {
                        if state.repo_cursor + 1 < len {
                            state.repo_cursor += 1;
                        }
                    } else {
                        state.repo_cursor = state.repo_cursor.saturating_sub(1);
                    }
                }
                Panel::Snapshots => {
                    if down {
                        state.select_next_snapshot();
                    } else {
                        state.select_prev_snapshot();
                    }
                }
                Panel::Operations => {}
            },
            _ => return,
        }
        state.mark_dirty();
    }

    fn enter_selected(&self, state: &mut AppState) {
        if let Overlay::Scan(scan) = &state.overlay {
            if let Some(path) = scan.found.get(scan.selected) {
                let location = path.display().to_string();
                state.open_overlay(Overlay::Repo(RepoForm::for_location(&location)));
            }
            return;
        }
        match state.panel {
            Panel::Repositories => {
                if state.activate_cursor_repo().is_some() {
                    if let Some(repo) = state.active_repo() {
                        let name = repo.name.clone();
                        state.ops_log.info(format!("repository '{name}' selected"));
                    }
                    self.refresh_repo(state);
                }
            }
            Panel::Snapshots => self.open_file_browser(state),
            Panel::Operations => {}
        }
    }

    fn open_file_browser(&self, state: &mut AppState) {
        let Some(repo_index) = state.repo_index else {
            return;
        };
        let Some(snapshot) = state.selected_snapshot() else {
            state.ops_log.warning("no snapshot selected");
            state.mark_dirty();
            return;
        };
        let snapshot_id = snapshot.id.clone();
        let display = snapshot.display_id().to_string();
        let Some(client) = self.client_for(state, repo_index) else {
            return;
        };
        let page_size = state.config.ui.page_size;
        state.ops_log.info(format!("listing files in snapshot {display}"));
        state.open_overlay(Overlay::FileBrowser(FileBrowserState::new(
            snapshot_id.clone(),
            page_size,
        )));
        list_files_task(client, snapshot_id, self.task_tx.clone());
    }

    // -- forms -------------------------------------------------------------

    fn open_backup_form(&self, state: &mut AppState) {
        if state.repo_index.is_none() {
            state.ops_log.error("no active repository");
            state.mark_dirty();
            return;
        }
        if state.backup.is_some() {
            state.ops_log.warning("a backup is already running");
            state.mark_dirty();
            return;
        }
        state.open_overlay(Overlay::Backup(BackupForm::new()));
    }

    fn open_restore_form(&self, state: &mut AppState) {
        if state.restore.is_some() {
            state.ops_log.warning("a restore is already running");
            state.mark_dirty();
            return;
        }
        // from the file browser, the marks become the include list
        if let Overlay::FileBrowser(browser) = &state.overlay {
            let includes = browser.marked_paths();
            let snapshot_id = browser.snapshot_id.clone();
            state.open_overlay(Overlay::Restore(RestoreForm::new(snapshot_id, includes)));
            return;
        }
        let Some(snapshot) = state.selected_snapshot() else {
            state.ops_log.warning("no snapshot selected");
            state.mark_dirty();
            return;
        };
        let snapshot_id = snapshot.id.clone();
        state.open_overlay(Overlay::Restore(RestoreForm::new(snapshot_id, Vec::new())));
    }

    fn open_forget_form(&self, state: &mut AppState) {
        if state.repo_index.is_none() {
            state.ops_log.error("no active repository");
            state.mark_dirty();
            return;
        }
        state.open_overlay(Overlay::Forget(ForgetForm::new()));
    }

    fn form_input(state: &mut AppState, c: char) {
        match &mut state.overlay {
            Overlay::Backup(form) => form.input_char(c),
            Overlay::Restore(form) => form.input_char(c),
            Overlay::Forget(form) => form.input_char(c),
            Overlay::Repo(form) => form.input_char(c),
            _ => return,
        }
        state.mark_dirty();
    }

    fn form_backspace(state: &mut AppState) {
        match &mut state.overlay {
            Overlay::Backup(form) => form.backspace(),
            Overlay::Restore(form) => form.backspace(),
            Overlay::Forget(form) => form.backspace(),
            Overlay::Repo(form) => form.backspace(),
            _ => return,
        }
        state.mark_dirty();
    }

    fn form_next_field(state: &mut AppState) {
        match &mut state.overlay {
            Overlay::Backup(form) => form.focus_next(),
            Overlay::Restore(form) => form.focus_next(),
            Overlay::Forget(form) => form.focus_next(),
            Overlay::Repo(form) => form.focus_next(),
            _ => return,
        }
        state.mark_dirty();
    }

    fn form_prev_field(state: &mut AppState) {
        match &mut state.overlay {
            Overlay::Backup(form) => form.focus_prev(),
            Overlay::Restore(form) => form.focus_prev(),
            Overlay::Forget(form) => form.focus_prev(),
            Overlay::Repo(form) => form.focus_prev(),
            _ => return,
        }
        state.mark_dirty();
    }

    fn form_toggle(state: &mut AppState) {
        match &mut state.overlay {
            Overlay::Restore(form) => form.toggle(),
            Overlay::Repo(form) => form.toggle(),
            _ => return,
        }
        state.mark_dirty();
    }

    fn form_submit(&self, state: &mut AppState) {
        let overlay = std::mem::take(&mut state.overlay);
        match overlay {
            Overlay::Backup(form) => self.submit_backup(state, form),
            Overlay::Restore(form) => self.submit_restore(state, form),
            Overlay::Forget(form) => self.submit_forget(state, form),
            Overlay::Repo(form) => self.submit_repo(state, form),
            other => state.overlay = other,
        }
        state.mark_dirty();
    }

    fn submit_backup(&self, state: &mut AppState, form: BackupForm) {
        let Some(repo_index) = state.repo_index else {
            state.ops_log.error("no active repository");
            return;
        };
        if state.backup.is_some() {
            state.ops_log.warning("a backup is already running");
            return;
        }
        let opts = match form.to_options() {
            Ok(opts) => opts,
            Err(err) => {
                state.ops_log.error(format!("backup: {err}"));
                state.overlay = Overlay::Backup(form);
                return;
            }
        };
        let Some(client) = self.client_for(state, repo_index) else {
            state.overlay = Overlay::Backup(form);
            return;
        };
        let label = format!("backup {}", opts.paths.join(", "));
        let session = OperationSession::new(OperationKind::Backup, repo_index, label);
        let cancel = session.cancel_token();
        state.ops_log.info(format!("backup started: {}", opts.paths.join(", ")));
        state.set_session(session);
        run_backup_task(client, opts, cancel, self.task_tx.clone());
    }

    fn submit_restore(&self, state: &mut AppState, form: RestoreForm) {
        let Some(repo_index) = state.repo_index else {
            state.ops_log.error("no active repository");
            return;
        };
        if state.restore.is_some() {
            state.ops_log.warning("a restore is already running");
            return;
        }
        let opts = match form.to_options() {
            Ok(opts) => opts,
            Err(err) => {
                state.ops_log.error(format!("restore: {err}"));
                state.overlay = Overlay::Restore(form);
                return;
            }
        };
        let Some(client) = self.client_for(state, repo_index) else {
            state.overlay = Overlay::Restore(form);
            return;
        };
        let target = opts.target.as_deref().unwrap_or("original location");
        let label = format!("restore {} -> {target}", short_id(&opts.snapshot_id));
        state.ops_log.info(label.clone());
        let session = OperationSession::new(OperationKind::Restore, repo_index, label);
        let cancel = session.cancel_token();
        state.set_session(session);
        run_restore_task(client, opts, cancel, self.task_tx.clone());
    }

    fn submit_forget(&self, state: &mut AppState, form: ForgetForm) {
        let Some(repo_index) = state.repo_index else {
            state.ops_log.error("no active repository");
            return;
        };
        let policy = match form.to_policy() {
            Ok(policy) => policy,
            Err(err) => {
                state.ops_log.error(format!("forget: {err}"));
                state.overlay = Overlay::Forget(form);
                return;
            }
        };
        if !state.begin_maintenance("forget dry-run") {
            state.ops_log.warning("another maintenance operation is running");
            state.overlay = Overlay::Forget(form);
            return;
        }
        let Some(client) = self.client_for(state, repo_index) else {
            state.end_maintenance();
            state.overlay = Overlay::Forget(form);
            return;
        };
        state.ops_log.info("previewing retention policy (dry-run)");
        forget_preview_task(client, repo_index, policy, self.task_tx.clone());
    }

    fn submit_repo(&self, state: &mut AppState, form: RepoForm) {
        let submission = match form.to_submission() {
            Ok(submission) => submission,
            Err(err) => {
                state.ops_log.error(format!("add repository: {err}"));
                state.overlay = Overlay::Repo(form);
                return;
            }
        };
        if state
            .config
            .repositories
            .iter()
            .any(|repo| repo.name == submission.name)
        {
            state
                .ops_log
                .error(format!("repository '{}' already exists", submission.name));
            state.overlay = Overlay::Repo(form);
            return;
        }
        state
            .ops_log
            .info(format!("adding repository '{}'", submission.name));
        add_repo_task(
            submission,
            state.config.restic.program.clone(),
            self.task_tx.clone(),
        );
    }

    // -- destructive chain -------------------------------------------------

    fn begin_prune(&self, state: &mut AppState) {
        let Some(repo_index) = state.repo_index else {
            state.ops_log.error("no active repository");
            state.mark_dirty();
            return;
        };
        if !state.begin_maintenance("prune dry-run") {
            state.ops_log.warning("another maintenance operation is running");
            state.mark_dirty();
            return;
        }
        let Some(client) = self.client_for(state, repo_index) else {
            state.end_maintenance();
            return;
        };
        state.ops_log.info("prune dry-run started");
        state.mark_dirty();
        prune_preview_task(client, repo_index, self.task_tx.clone());
    }

    fn accept_preview(&self, state: &mut AppState) {
        let overlay = std::mem::take(&mut state.overlay);
        match overlay {
            Overlay::ForgetPreview(preview) => {
                let removing = preview.remove_count();
                state.open_overlay(Overlay::Confirm(ConfirmDialog::forget(
                    preview.repo_index,
                    preview.policy,
                    removing,
                )));
            }
            Overlay::PrunePreview(preview) => {
                state.open_overlay(Overlay::Confirm(ConfirmDialog::prune(preview.repo_index)));
            }
            other => state.overlay = other,
        }
    }

    fn confirm_submit(&self, state: &mut AppState) {
        let overlay = std::mem::take(&mut state.overlay);
        let Overlay::Confirm(dialog) = overlay else {
            state.overlay = overlay;
            return;
        };
        state.mark_dirty();
        if !dialog.is_confirmed() {
            state.ops_log.warning(format!(
                "confirmation did not match '{}'; operation aborted",
                dialog.expected
            ));
            return;
        }
        match dialog.action {
            PendingAction::Forget { repo_index, policy } => {
                if !state.begin_maintenance("forget") {
                    state.ops_log.warning("another maintenance operation is running");
                    return;
                }
                let Some(client) = self.client_for(state, repo_index) else {
                    state.end_maintenance();
                    return;
                };
                state.ops_log.info("applying retention policy");
                forget_task(client, repo_index, policy, self.task_tx.clone());
            }
            PendingAction::Prune { repo_index } => {
                if !state.begin_maintenance("prune") {
                    state.ops_log.warning("another maintenance operation is running");
                    return;
                }
                let Some(client) = self.client_for(state, repo_index) else {
                    state.end_maintenance();
                    return;
                };
                state.ops_log.info("prune started");
                prune_task(client, repo_index, self.task_tx.clone());
            }
            PendingAction::RemoveRepo { repo_index } => self.remove_repo_entry(state, repo_index),
        }
    }

    fn remove_repo(&self, state: &mut AppState) {
        let Some(entry) = state.cursor_repo() else {
            return;
        };
        let dialog = ConfirmDialog::remove_repo(state.repo_cursor, &entry.name);
        state.open_overlay(Overlay::Confirm(dialog));
    }

    fn remove_repo_entry(&self, state: &mut AppState, repo_index: usize) {
        if repo_index >= state.config.repositories.len() {
            return;
        }
        let removed = state.config.repositories.remove(repo_index);
        match state.repo_index {
            Some(active) if active == repo_index => {
                state.repo_index = None;
                state.bump_generation();
                state.snapshots.clear();
                state.filtered.clear();
                state.hidden_count = 0;
                state.snapshot_selected = 0;
                state.snapshot_scroll.reset();
            }
            Some(active) if active > repo_index => {
                state.repo_index = Some(active - 1);
            }
            _ => {}
        }
        state.sync_repo_slots();
        state.ops_log.success(format!(
            "repository '{}' removed from configuration (data untouched)",
            removed.name
        ));
        save_config_task(
            state.config.clone(),
            self.config_path.clone(),
            self.task_tx.clone(),
        );
    }

    // -- maintenance and cancellation --------------------------------------

    fn start_maintenance(&self, state: &mut AppState, op: MaintenanceOp) {
        let Some(repo_index) = state.repo_index else {
            state.ops_log.error("no active repository");
            state.mark_dirty();
            return;
        };
        if !state.begin_maintenance(op.label()) {
            state.ops_log.warning("another maintenance operation is running");
            state.mark_dirty();
            return;
        }
        let Some(client) = self.client_for(state, repo_index) else {
            state.end_maintenance();
            return;
        };
        state.ops_log.info(format!("{} started", op.label()));
        state.mark_dirty();
        match op {
            MaintenanceOp::CacheCleanup => cache_cleanup_task(client, self.task_tx.clone()),
            MaintenanceOp::Unlock => unlock_task(client, self.task_tx.clone()),
        }
    }

    fn cancel(state: &mut AppState, kind: OperationKind) {
        if let Some(session) = state.session(kind) {
            if !session.cancel_requested() {
                session.request_cancel();
                state
                    .ops_log
                    .warning(format!("{} cancellation requested", kind.label()));
                state.mark_dirty();
            }
        }
    }

    // -- task results ------------------------------------------------------

    fn apply_task(&self, state: &mut AppState, task: TaskResult) {
        match task {
            TaskResult::VersionProbed(result) => match result {
                Ok(version) => {
                    let line = version.lines().next().unwrap_or_default().trim().to_string();
                    state.ops_log.dimmed(line.clone());
                    state.restic_version = VersionProbe::Found(line);
                    state.mark_dirty();
                }
                Err(err) => {
                    state.restic_version = VersionProbe::Missing;
                    state.ops_log.warning(format!("restic not found: {err}"));
                    state.mark_dirty();
                }
            },

            TaskResult::SnapshotsLoaded { generation, result } => {
                if generation != state.snapshot_generation() {
                    debug!(generation, "stale snapshot result discarded");
                    state.ops_log.dimmed("stale snapshot result discarded");
                    state.mark_dirty();
                    return;
                }
                match result {
                    Ok(snapshots) => {
                        let count = snapshots.len();
                        if state.install_snapshots(generation, snapshots) {
                            state.ops_log.success(format!("loaded {count} snapshots"));
                            if state.hidden_count > 0 {
                                state.ops_log.dimmed(format!(
                                    "hid {} systemd-private snapshots",
                                    state.hidden_count
                                ));
                            }
                        }
                    }
                    Err(err) => {
                        state.snapshots_loading = false;
                        state.ops_log.error(format!("snapshot query failed: {err}"));
                        state.mark_dirty();
                    }
                }
            }

            TaskResult::RepoInfoLoaded { repo_index, info } => {
                if let Some(slot) = state.repo_infos.get_mut(repo_index) {
                    *slot = Some(info);
                    state.mark_dirty();
                }
            }

            TaskResult::FilesLoaded {
                snapshot_id,
                result,
            } => {
                let current = matches!(
                    &state.overlay,
                    Overlay::FileBrowser(browser) if browser.snapshot_id == snapshot_id
                );
                if !current {
                    debug!(snapshot = %short_id(&snapshot_id), "late file listing dropped");
                    return;
                }
                match result {
                    Ok(nodes) => {
                        let count = nodes.len();
                        if let Overlay::FileBrowser(browser) = &mut state.overlay {
                            browser.install(nodes);
                        }
                        state.ops_log.info(format!(
                            "{count} entries in snapshot {}",
                            short_id(&snapshot_id)
                        ));
                        state.mark_dirty();
                    }
                    Err(err) => {
                        state.close_overlay();
                        state.ops_log.error(format!("file listing failed: {err}"));
                    }
                }
            }

            TaskResult::Backup(event) => self.apply_backup_event(state, event),
            TaskResult::Restore(event) => self.apply_restore_event(state, event),

            TaskResult::ForgetPreviewReady {
                repo_index,
                policy,
                result,
            } => {
                state.end_maintenance();
                match result {
                    Ok(groups) => {
                        let preview = ForgetPreviewState {
                            repo_index,
                            policy,
                            groups,
                            scroll: 0,
                        };
                        state.ops_log.info(format!(
                            "dry-run: {} snapshots would be removed, {} kept",
                            preview.remove_count(),
                            preview.keep_count()
                        ));
                        state.open_overlay(Overlay::ForgetPreview(preview));
                    }
                    Err(err) => state.ops_log.error(format!("forget dry-run failed: {err}")),
                }
            }

            TaskResult::ForgetCompleted { result, .. } => {
                state.end_maintenance();
                match result {
                    Ok(()) => {
                        state.ops_log.success("retention policy applied");
                        self.refresh_repo(state);
                    }
                    Err(err) => state.ops_log.error(format!("forget failed: {err}")),
                }
            }

            TaskResult::PruneDryRunReady { repo_index, result } => {
                state.end_maintenance();
                match result {
                    Ok(report) => {
                        let report: Vec<String> = report.lines().map(String::from).collect();
                        state.open_overlay(Overlay::PrunePreview(PrunePreviewState {
                            repo_index,
                            report,
                            scroll: 0,
                        }));
                    }
                    Err(err) => state.ops_log.error(format!("prune dry-run failed: {err}")),
                }
            }

            TaskResult::PruneCompleted { result, .. } => {
                state.end_maintenance();
                match result {
                    Ok(_) => {
                        state.ops_log.success("prune finished");
                        self.refresh_repo(state);
                    }
                    Err(err) => state.ops_log.error(format!("prune failed: {err}")),
                }
            }

            TaskResult::MaintenanceCompleted { label, result } => {
                state.end_maintenance();
                match result {
                    Ok(output) => {
                        state.ops_log.success(format!("{label} finished"));
                        let line = output.lines().next().unwrap_or_default().trim();
                        if !line.is_empty() {
                            state.ops_log.dimmed(line.to_string());
                        }
                    }
                    Err(err) => state.ops_log.error(format!("{label} failed: {err}")),
                }
            }

            TaskResult::ScanCompleted { found } => {
                let count = found.len();
                if let Overlay::Scan(scan) = &mut state.overlay {
                    scan.found = found;
                    scan.scanning = false;
                    scan.selected = 0;
                }
                state
                    .ops_log
                    .info(format!("scan found {count} candidate repositories"));
                state.mark_dirty();
            }

            TaskResult::RepoAdded { result } => match result {
                Ok(entry) => {
                    let name = entry.name.clone();
                    state.config.repositories.push(entry);
                    state.sync_repo_slots();
                    state.ops_log.success(format!("repository '{name}' added"));
                    if state.repo_index.is_none() {
                        state.repo_cursor = state.repo_count() - 1;
                        state.activate_cursor_repo();
                        self.refresh_repo(state);
                    }
                    save_config_task(
                        state.config.clone(),
                        self.config_path.clone(),
                        self.task_tx.clone(),
                    );
                }
                Err(err) => {
                    state.ops_log.error(format!("add repository: {err}"));
                    state.mark_dirty();
                }
            },

            TaskResult::ConfigSaved { result } => {
                match result {
                    Ok(()) => state.ops_log.dimmed("configuration saved"),
                    Err(err) => state.ops_log.error(format!("configuration save failed: {err}")),
                }
                state.mark_dirty();
            }
        }
    }

    fn apply_backup_event(&self, state: &mut AppState, event: BackupEvent) {
        match event {
            BackupEvent::Progress(progress) => {
                if let Some(session) = state.backup.as_mut() {
                    if session.apply_progress(progress) {
                        state.mark_dirty();
                    }
                }
            }
            BackupEvent::Summary(summary) => {
                let Some(mut session) = state.clear_session(OperationKind::Backup) else {
                    debug!("backup summary without a session");
                    return;
                };
                session.finish();
                state.ops_log.success(format!(
                    "backup finished in {}s: {} new files, {} added",
                    session.elapsed_secs(),
                    summary.files_new,
                    ByteSize(summary.data_added)
                ));
                // the repository changed; pick up the new snapshot
                self.refresh_repo(state);
            }
            BackupEvent::Failed(message) => {
                let Some(mut session) = state.clear_session(OperationKind::Backup) else {
                    debug!("backup failure without a session");
                    return;
                };
                session.finish();
                if session.cancel_requested() {
                    state.ops_log.warning(format!(
                        "backup cancelled after {}s",
                        session.elapsed_secs()
                    ));
                } else {
                    state.ops_log.error(format!("backup failed: {message}"));
                }
            }
        }
    }

    fn apply_restore_event(&self, state: &mut AppState, event: RestoreEvent) {
        match event {
            RestoreEvent::Started => {
                if let Some(session) = state.restore.as_mut() {
                    if session.mark_started() {
                        state.mark_dirty();
                    }
                }
            }
            RestoreEvent::Summary(summary) => {
                let Some(mut session) = state.clear_session(OperationKind::Restore) else {
                    debug!("restore summary without a session");
                    return;
                };
                session.finish();
                state.ops_log.success(format!(
                    "restore of {} finished in {}s (target: {})",
                    short_id(&summary.snapshot_id),
                    summary.seconds_elapsed,
                    summary.target
                ));
                // restore leaves the repository as it was; re-list only
                self.refresh_snapshots(state);
            }
            RestoreEvent::Failed(message) => {
                let Some(mut session) = state.clear_session(OperationKind::Restore) else {
                    debug!("restore failure without a session");
                    return;
                };
                session.finish();
                if session.cancel_requested() {
                    state.ops_log.warning(format!(
                        "restore cancelled after {}s",
                        session.elapsed_secs()
                    ));
                } else {
                    state.ops_log.error(format!("restore failed: {message}"));
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MaintenanceOp {
    CacheCleanup,
    Unlock,
}

impl MaintenanceOp {
    fn label(self) -> &'static str {
        match self {
            Self::CacheCleanup => "cache cleanup",
            Self::Unlock => "unlock",
        }
    }
}
