//! # Application state
//!
//! One mutable [`AppState`] value holds everything the renderer needs:
//! configuration, repository roster, the snapshot collection with its
//! filter and viewports, the overlay stack (a closed enum carrying each
//! overlay's data), in-flight operation sessions and the operations
//! log. Handlers mutate it; nothing else does.
//!
//! ## Staleness
//!
//! Snapshot queries are stamped with a generation counter taken at
//! spawn time. [`AppState::install_snapshots`] refuses any result whose
//! stamp no longer matches, so a slow query for a previously active
//! repository can never overwrite the current list.

use std::path::PathBuf;

use compact_str::CompactString;
use restic_client::{FileNode, ForgetGroup, ForgetPolicy, Snapshot};
use smallvec::SmallVec;

use crate::config::{Config, RepoEntry};
use crate::model::confirm::ConfirmDialog;
use crate::model::filter::SnapshotFilter;
use crate::model::forms::{BackupForm, ForgetForm, RepoForm, RestoreForm, TextField};
use crate::model::ops_log::OpsLog;
use crate::model::session::{OperationKind, OperationSession};
use crate::model::viewport::{PagedViewport, ScrollViewport};
use restic_client::RepoInfo;

/// Top-level panels, cycled with Tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Panel {
    #[default]
    Repositories = 0,
    Snapshots = 1,
    Operations = 2,
}

impl Panel {
    pub const fn title(self) -> &'static str {
        match self {
            Self::Repositories => "Repositories",
            Self::Snapshots => "Snapshots",
            Self::Operations => "Operations",
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Repositories => Self::Snapshots,
            Self::Snapshots => Self::Operations,
            Self::Operations => Self::Repositories,
        }
    }

    pub const fn prev(self) -> Self {
        match self {
            Self::Repositories => Self::Operations,
            Self::Snapshots => Self::Repositories,
            Self::Operations => Self::Snapshots,
        }
    }
}

/// Outcome of the startup `restic version` probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VersionProbe {
    #[default]
    Unknown,
    Found(String),
    Missing,
}

/// Dry-run result awaiting the operator's decision.
#[derive(Debug, Clone)]
pub struct ForgetPreviewState {
    pub repo_index: usize,
    pub policy: ForgetPolicy,
    pub groups: Vec<ForgetGroup>,
    pub scroll: usize,
}

impl ForgetPreviewState {
    pub fn remove_count(&self) -> usize {
        self.groups.iter().map(|g| g.remove.len()).sum()
    }

    pub fn keep_count(&self) -> usize {
        self.groups.iter().map(|g| g.keep.len()).sum()
    }
}

/// `prune --dry-run` output awaiting the operator's decision.
#[derive(Debug, Clone)]
pub struct PrunePreviewState {
    pub repo_index: usize,
    pub report: Vec<String>,
    pub scroll: usize,
}

/// Paged listing of one snapshot's contents with per-row marks.
#[derive(Debug, Clone)]
pub struct FileBrowserState {
    pub snapshot_id: String,
    pub nodes: Vec<FileNode>,
    pub viewport: PagedViewport,
    pub marked: SmallVec<[usize; 8]>,
    pub loading: bool,
}

impl FileBrowserState {
    pub fn new(snapshot_id: impl Into<String>, page_size: usize) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            nodes: Vec::new(),
            viewport: PagedViewport::new(page_size),
            marked: SmallVec::new(),
            loading: true,
        }
    }

    pub fn install(&mut self, nodes: Vec<FileNode>) {
        self.nodes = nodes;
        self.loading = false;
        self.marked.clear();
        self.viewport.collection_changed(self.nodes.len());
    }

    #[inline]
    pub fn is_marked(&self, index: usize) -> bool {
        self.marked.contains(&index)
    }

    /// Toggles the mark on the row under the cursor.
    pub fn toggle_mark(&mut self) {
        let Some(index) = self.viewport.absolute_selected(self.nodes.len()) else {
            return;
        };
        if let Some(pos) = self.marked.iter().position(|&m| m == index) {
            self.marked.remove(pos);
        } else {
            self.marked.push(index);
        }
    }

    /// Paths of all marked rows, for the restore include list.
    pub fn marked_paths(&self) -> Vec<String> {
        let mut indices: Vec<usize> = self.marked.iter().copied().collect();
        indices.sort_unstable();
        indices
            .into_iter()
            .filter_map(|i| self.nodes.get(i))
            .map(|n| n.path.clone())
            .collect()
    }
}

/// Discovery scan hits; Enter pre-fills the add-repository form.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    pub found: Vec<PathBuf>,
    pub selected: usize,
    pub scanning: bool,
}

/// Modal surface over the panels. At most one is open; each variant
/// carries the full state of its dialog so closing one discards it.
#[derive(Debug, Default)]
pub enum Overlay {
    #[default]
    None,
    Help,
    Backup(BackupForm),
    Restore(RestoreForm),
    Forget(ForgetForm),
    Repo(RepoForm),
    Confirm(ConfirmDialog),
    ForgetPreview(ForgetPreviewState),
    PrunePreview(PrunePreviewState),
    FileBrowser(FileBrowserState),
    Scan(ScanState),
}

impl Overlay {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[derive(Debug)]
pub struct AppState {
    pub config: Config,

    // repositories
    pub repo_cursor: usize,
    /// Index of the repository queries run against; the cursor can
    /// wander without changing it until Enter commits.
    pub repo_index: Option<usize>,
    pub repo_infos: Vec<Option<RepoInfo>>,
    pub restic_version: VersionProbe,

    // snapshots
    pub snapshots: Vec<Snapshot>,
    /// Indices into `snapshots` surviving filter and hiding, in order.
    pub filtered: Vec<usize>,
    pub hidden_count: usize,
    pub snapshot_selected: usize,
    pub snapshot_scroll: ScrollViewport,
    snapshot_generation: u64,
    pub snapshots_loading: bool,

    // filter entry
    pub filter: SnapshotFilter,
    pub filter_input: TextField,
    pub filtering: bool,

    // layout
    pub panel: Panel,
    pub overlay: Overlay,

    // operations
    pub backup: Option<OperationSession>,
    pub restore: Option<OperationSession>,
    /// Label of the running maintenance command; one at a time.
    pub maintenance: Option<CompactString>,

    pub ops_log: OpsLog,

    dirty: bool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let repo_count = config.repositories.len();
        let log_capacity = config.ui.log_capacity;
        Self {
            config,
            repo_cursor: 0,
            repo_index: (repo_count > 0).then_some(0),
            repo_infos: vec![None; repo_count],
            restic_version: VersionProbe::Unknown,
            snapshots: Vec::new(),
            filtered: Vec::new(),
            hidden_count: 0,
            snapshot_selected: 0,
            snapshot_scroll: ScrollViewport::default(),
            snapshot_generation: 0,
            snapshots_loading: false,
            filter: SnapshotFilter::default(),
            filter_input: TextField::default(),
            filtering: false,
            panel: Panel::default(),
            overlay: Overlay::None,
            backup: None,
            restore: None,
            maintenance: None,
            ops_log: OpsLog::new(log_capacity),
            dirty: true,
        }
    }

    // -- rendering ---------------------------------------------------------

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// True when a redraw is owed; clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    // -- repositories ------------------------------------------------------

    #[inline]
    pub fn repo_count(&self) -> usize {
        self.config.repositories.len()
    }

    pub fn active_repo(&self) -> Option<&RepoEntry> {
        self.repo_index.and_then(|i| self.config.repositories.get(i))
    }

    pub fn cursor_repo(&self) -> Option<&RepoEntry> {
        self.config.repositories.get(self.repo_cursor)
    }

    /// Re-sizes per-repository slots after the roster changed and keeps
    /// cursor and active index inside bounds.
    pub fn sync_repo_slots(&mut self) {
        let len = self.repo_count();
        self.repo_infos.resize(len, None);
        if len == 0 {
            self.repo_cursor = 0;
            self.repo_index = None;
        } else {
            self.repo_cursor = self.repo_cursor.min(len - 1);
            if let Some(active) = self.repo_index {
                if active >= len {
                    self.repo_index = Some(self.repo_cursor);
                }
            }
        }
        self.mark_dirty();
    }

    /// Commits the cursor as the active repository. The snapshot list
    /// is cleared and the generation bumped so results for the previous
    /// repository are discarded on arrival, even if no new query gets
    /// spawned.
    pub fn activate_cursor_repo(&mut self) -> Option<usize> {
        if self.repo_cursor >= self.repo_count() {
            return None;
        }
        self.repo_index = Some(self.repo_cursor);
        self.snapshot_generation += 1;
        self.snapshots.clear();
        self.filtered.clear();
        self.hidden_count = 0;
        self.snapshot_selected = 0;
        self.snapshot_scroll.reset();
        self.mark_dirty();
        self.repo_index
    }

    // -- snapshots ---------------------------------------------------------

    #[inline]
    pub fn snapshot_generation(&self) -> u64 {
        self.snapshot_generation
    }

    /// Stamps the next snapshot query. Older stamps become stale.
    pub fn bump_generation(&mut self) -> u64 {
        self.snapshot_generation += 1;
        self.snapshot_generation
    }

    /// Installs a query result unless its stamp is stale. Returns
    /// whether the result was accepted.
    pub fn install_snapshots(&mut self, generation: u64, snapshots: Vec<Snapshot>) -> bool {
        if generation != self.snapshot_generation {
            return false;
        }
        self.snapshots = snapshots;
        self.snapshots_loading = false;
        self.apply_filter();
        true
    }

    /// Rebuilds the visible index list from the filter and the
    /// systemd-private hiding rule, then clamps the selection.
    pub fn apply_filter(&mut self) {
        let hide = self.config.ui.hide_system_snapshots;
        let mut hidden = 0usize;
        self.filtered = self
            .snapshots
            .iter()
            .enumerate()
            .filter(|(_, snap)| {
                if hide && snap.paths.iter().any(|p| p.contains("systemd-private")) {
                    hidden += 1;
                    return false;
                }
                self.filter.matches(snap)
            })
            .map(|(i, _)| i)
            .collect();
        self.hidden_count = hidden;

        if self.filtered.is_empty() {
            self.snapshot_selected = 0;
            self.snapshot_scroll.reset();
        } else if self.snapshot_selected >= self.filtered.len() {
            self.snapshot_selected = self.filtered.len() - 1;
        }
        self.mark_dirty();
    }

    #[inline]
    pub fn visible_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn selected_snapshot(&self) -> Option<&Snapshot> {
        self.filtered
            .get(self.snapshot_selected)
            .and_then(|&i| self.snapshots.get(i))
    }

    pub fn select_next_snapshot(&mut self) {
        if self.snapshot_selected + 1 < self.filtered.len() {
            self.snapshot_selected += 1;
            self.mark_dirty();
        }
    }

    pub fn select_prev_snapshot(&mut self) {
        if self.snapshot_selected > 0 {
            self.snapshot_selected -= 1;
            self.mark_dirty();
        }
    }

    // -- filter entry ------------------------------------------------------

    pub fn begin_filter(&mut self) {
        self.filtering = true;
        self.mark_dirty();
    }

    /// Live filtering: every edit reparses and reapplies.
    pub fn filter_edited(&mut self) {
        self.filter = SnapshotFilter::parse(self.filter_input.as_str());
        self.apply_filter();
    }

    pub fn end_filter(&mut self) {
        self.filtering = false;
        self.filter_edited();
    }

    pub fn clear_filter(&mut self) {
        self.filtering = false;
        self.filter_input = TextField::default();
        self.filter = SnapshotFilter::default();
        self.apply_filter();
    }

    // -- operations --------------------------------------------------------

    pub fn session(&self, kind: OperationKind) -> Option<&OperationSession> {
        match kind {
            OperationKind::Backup => self.backup.as_ref(),
            OperationKind::Restore => self.restore.as_ref(),
        }
    }

    pub fn session_mut(&mut self, kind: OperationKind) -> Option<&mut OperationSession> {
        match kind {
            OperationKind::Backup => self.backup.as_mut(),
            OperationKind::Restore => self.restore.as_mut(),
        }
    }

    /// Installs a new session; the slot must be free, one in-flight
    /// operation per kind.
    pub fn set_session(&mut self, session: OperationSession) {
        let slot = match session.kind {
            OperationKind::Backup => &mut self.backup,
            OperationKind::Restore => &mut self.restore,
        };
        debug_assert!(slot.is_none(), "session slot must be gated by the caller");
        *slot = Some(session);
        self.mark_dirty();
    }

    pub fn clear_session(&mut self, kind: OperationKind) -> Option<OperationSession> {
        self.mark_dirty();
        match kind {
            OperationKind::Backup => self.backup.take(),
            OperationKind::Restore => self.restore.take(),
        }
    }

    /// Claims the single maintenance slot. False while another
    /// maintenance command runs.
    pub fn begin_maintenance(&mut self, label: impl Into<CompactString>) -> bool {
        if self.maintenance.is_some() {
            return false;
        }
        self.maintenance = Some(label.into());
        self.mark_dirty();
        true
    }

    pub fn end_maintenance(&mut self) {
        self.maintenance = None;
        self.mark_dirty();
    }

    // -- layout ------------------------------------------------------------

    pub fn next_panel(&mut self) {
        self.panel = self.panel.next();
        self.mark_dirty();
    }

    pub fn prev_panel(&mut self) {
        self.panel = self.panel.prev();
        self.mark_dirty();
    }

    pub fn open_overlay(&mut self, overlay: Overlay) {
        self.overlay = overlay;
        self.mark_dirty();
    }

    pub fn close_overlay(&mut self) {
        self.overlay = Overlay::None;
        self.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(id: &str, paths: &[&str]) -> Snapshot {
        Snapshot {
            id: id.to_string(),
            short_id: id.chars().take(8).collect(),
            time: Utc::now(),
            hostname: "host".to_string(),
            username: "user".to_string(),
            paths: paths.iter().map(ToString::to_string).collect(),
            tags: Vec::new(),
        }
    }

    fn state_with(snapshots: Vec<Snapshot>) -> AppState {
        let mut state = AppState::new(Config::default());
        let generation = state.bump_generation();
        assert!(state.install_snapshots(generation, snapshots));
        state
    }

    #[test]
    fn stale_snapshot_results_are_discarded() {
        let mut state = AppState::new(Config::default());
        let old = state.bump_generation();
        let fresh = state.bump_generation();

        assert!(!state.install_snapshots(old, vec![snapshot("aaaa1111", &["/old"])]));
        assert!(state.snapshots.is_empty());

        assert!(state.install_snapshots(fresh, vec![snapshot("bbbb2222", &["/new"])]));
        assert_eq!(state.snapshots.len(), 1);
    }

    #[test]
    fn systemd_private_snapshots_are_hidden_and_counted() {
        let state = state_with(vec![
            snapshot("aaaa1111", &["/home"]),
            snapshot("bbbb2222", &["/tmp/systemd-private-abc/tmp"]),
            snapshot("cccc3333", &["/etc"]),
        ]);
        assert_eq!(state.visible_len(), 2);
        assert_eq!(state.hidden_count, 1);
    }

    #[test]
    fn hiding_can_be_disabled() {
        let mut state = AppState::new(Config::default());
        state.config.ui.hide_system_snapshots = false;
        let generation = state.bump_generation();
        state.install_snapshots(
            generation,
            vec![snapshot("bbbb2222", &["/tmp/systemd-private-abc/tmp"])],
        );
        assert_eq!(state.visible_len(), 1);
        assert_eq!(state.hidden_count, 0);
    }

    #[test]
    fn selection_is_clamped_when_the_collection_shrinks() {
        let mut state = state_with(vec![
            snapshot("aaaa1111", &["/a"]),
            snapshot("bbbb2222", &["/b"]),
            snapshot("cccc3333", &["/c"]),
        ]);
        state.snapshot_selected = 2;

        let generation = state.bump_generation();
        state.install_snapshots(generation, vec![snapshot("dddd4444", &["/d"])]);
        assert_eq!(state.snapshot_selected, 0);

        let generation = state.bump_generation();
        state.install_snapshots(generation, Vec::new());
        assert_eq!(state.snapshot_selected, 0);
        assert!(state.selected_snapshot().is_none());
    }

    #[test]
    fn activating_a_repo_clears_the_snapshot_list() {
        let mut config = Config::default();
        config.repositories.push(RepoEntry {
            name: "one".into(),
            location: "/srv/one".into(),
            password_file: Some("/tmp/pw".into()),
            password_command: None,
            password: None,
        });
        config.repositories.push(RepoEntry {
            name: "two".into(),
            location: "/srv/two".into(),
            password_file: Some("/tmp/pw".into()),
            password_command: None,
            password: None,
        });

        let mut state = AppState::new(config);
        let generation = state.bump_generation();
        state.install_snapshots(generation, vec![snapshot("aaaa1111", &["/a"])]);

        state.repo_cursor = 1;
        let before = state.snapshot_generation();
        assert_eq!(state.activate_cursor_repo(), Some(1));
        assert!(state.snapshots.is_empty());
        assert!(state.selected_snapshot().is_none());

        // the in-flight result for repo one must now be stale
        assert!(!state.install_snapshots(before, vec![snapshot("aaaa1111", &["/a"])]));
    }

    #[test]
    fn filter_editing_applies_live() {
        let mut state = state_with(vec![
            snapshot("aaaa1111", &["/home/alice"]),
            snapshot("bbbb2222", &["/var/lib"]),
        ]);
        state.begin_filter();
        for c in "alice".chars() {
            state.filter_input.insert_char(c);
            state.filter_edited();
        }
        assert_eq!(state.visible_len(), 1);
        state.clear_filter();
        assert_eq!(state.visible_len(), 2);
    }

    #[test]
    fn one_session_slot_per_kind() {
        let mut state = AppState::new(Config::default());
        assert!(state.session(OperationKind::Backup).is_none());
        state.set_session(OperationSession::new(OperationKind::Backup, 0, "backup"));
        assert!(state.session(OperationKind::Backup).is_some());
        assert!(state.session(OperationKind::Restore).is_none());

        let taken = state.clear_session(OperationKind::Backup);
        assert!(taken.is_some());
        assert!(state.session(OperationKind::Backup).is_none());
    }

    #[test]
    fn maintenance_slot_is_exclusive() {
        let mut state = AppState::new(Config::default());
        assert!(state.begin_maintenance("unlock"));
        assert!(!state.begin_maintenance("cache cleanup"));
        state.end_maintenance();
        assert!(state.begin_maintenance("cache cleanup"));
    }

    #[test]
    fn panel_cycle_wraps_both_ways() {
        let mut state = AppState::new(Config::default());
        assert_eq!(state.panel, Panel::Repositories);
        state.next_panel();
        state.next_panel();
        state.next_panel();
        assert_eq!(state.panel, Panel::Repositories);
        state.prev_panel();
        assert_eq!(state.panel, Panel::Operations);
    }

    #[test]
    fn file_browser_marks_follow_absolute_indices() {
        let mut browser = FileBrowserState::new("abc123", 2);
        browser.install(vec![
            FileNode {
                name: "a".into(),
                node_type: "file".into(),
                path: "/a".into(),
                size: 1,
                permissions: String::new(),
                mtime: None,
                uid: 0,
                gid: 0,
            },
            FileNode {
                name: "b".into(),
                node_type: "file".into(),
                path: "/b".into(),
                size: 2,
                permissions: String::new(),
                mtime: None,
                uid: 0,
                gid: 0,
            },
            FileNode {
                name: "c".into(),
                node_type: "dir".into(),
                path: "/c".into(),
                size: 0,
                permissions: String::new(),
                mtime: None,
                uid: 0,
                gid: 0,
            },
        ]);

        browser.toggle_mark(); // row 0
        browser.viewport.next_page(3);
        browser.toggle_mark(); // row 2, first row of page 1
        assert_eq!(browser.marked_paths(), vec!["/a", "/c"]);

        browser.toggle_mark(); // unmark row 2
        assert_eq!(browser.marked_paths(), vec!["/a"]);
        assert!(browser.is_marked(0));
        assert!(!browser.is_marked(2));
    }
}
