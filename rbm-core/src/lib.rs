pub mod error;

pub mod config;

pub mod logging;
pub use logging::LoggerBuilder;

pub mod controller {
    pub mod actions;
    pub use actions::Action;

    pub mod dispatcher;
    pub use dispatcher::ActionDispatcher;

    pub mod event_loop;
    pub use event_loop::{EventLoop, TaskResult};
}

pub mod model {
    pub mod app_state;
    pub use app_state::{AppState, Overlay, Panel};

    pub mod confirm;
    pub use confirm::{ConfirmDialog, PendingAction};

    pub mod filter;
    pub use filter::SnapshotFilter;

    pub mod forms;
    pub use forms::{BackupForm, ForgetForm, RepoForm, RestoreForm};

    pub mod ops_log;
    pub use ops_log::{LogLevel, OpsLog};

    pub mod session;
    pub use session::{OperationKind, OperationSession};

    pub mod viewport;
    pub use viewport::{PagedViewport, ScrollViewport};
}

pub mod tasks {
    pub mod backup_task;

    pub mod query_task;

    pub mod restore_task;

    pub mod scan_task;
}

pub mod view {
    pub mod theme;

    pub mod ui;

    pub mod components {
        pub mod confirm_overlay;
        pub use confirm_overlay::ConfirmOverlay;
        pub mod file_browser_overlay;
        pub use file_browser_overlay::FileBrowserOverlay;
        pub mod form_overlay;
        pub use form_overlay::FormOverlay;
        pub mod help_overlay;
        pub use help_overlay::HelpOverlay;
        pub mod operations_panel;
        pub use operations_panel::OperationsPanel;
        pub mod preview_overlay;
        pub use preview_overlay::PreviewOverlay;
        pub mod repository_panel;
        pub use repository_panel::RepositoryPanel;
        pub mod scan_overlay;
        pub use scan_overlay::ScanOverlay;
        pub mod snapshot_panel;
        pub use snapshot_panel::SnapshotPanel;
        pub mod status_bar;
        pub use status_bar::StatusBar;
    }
}

pub use error::AppError;

pub use model::app_state::AppState;
