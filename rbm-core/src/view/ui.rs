//! ``src/view/ui.rs``
//! ============================================================================
//! # Frame renderer
//!
//! Paints the whole frame from the application state: tab bar, the
//! active panel, status bar, then at most one modal overlay. The only
//! mutation is the snapshot scroll viewport, adjusted here because the
//! visible row count is a render-time fact.

use ratatui::{prelude::*, widgets::Tabs};

use crate::model::app_state::{AppState, Overlay, Panel};
use crate::view::components::{
    confirm_overlay::ConfirmOverlay, file_browser_overlay::FileBrowserOverlay,
    form_overlay::FormOverlay, help_overlay::HelpOverlay, operations_panel::OperationsPanel,
    preview_overlay::PreviewOverlay, repository_panel::RepositoryPanel,
    scan_overlay::ScanOverlay, snapshot_panel::SnapshotPanel, status_bar::StatusBar,
};
use crate::view::theme;

const PANELS: [Panel; 3] = [Panel::Repositories, Panel::Snapshots, Panel::Operations];

pub fn render(frame: &mut Frame<'_>, state: &mut AppState) {
    let screen = frame.area();
    let [tab_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(screen);

    render_tabs(frame, state, tab_area);

    let panel_active = state.overlay.is_none();
    match state.panel {
        Panel::Repositories => {
            RepositoryPanel::new().render(frame, state, body_area, panel_active);
        }
        Panel::Snapshots => SnapshotPanel::new().render(frame, state, body_area, panel_active),
        Panel::Operations => OperationsPanel::new().render(frame, state, body_area, panel_active),
    }

    StatusBar::new().render(frame, state, status_area);
    render_overlay(frame, state, screen);
}

fn render_tabs(frame: &mut Frame<'_>, state: &AppState, area: Rect) {
    let titles: Vec<&str> = PANELS.iter().map(|p| p.title()).collect();
    let selected = PANELS
        .iter()
        .position(|p| *p == state.panel)
        .unwrap_or_default();
    let tabs = Tabs::new(titles)
        .style(Style::default().fg(theme::COMMENT).bg(theme::BACKGROUND))
        .highlight_style(
            Style::default()
                .fg(theme::YELLOW)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, area);
}

fn render_overlay(frame: &mut Frame<'_>, state: &AppState, screen: Rect) {
    match &state.overlay {
        Overlay::None => {}
        Overlay::Help => HelpOverlay::new().render(frame, centered(screen, 70, 90)),
        Overlay::Backup(form) => {
            FormOverlay::new().render_backup(frame, form, centered(screen, 60, 40));
        }
        Overlay::Restore(form) => {
            FormOverlay::new().render_restore(frame, form, centered(screen, 60, 45));
        }
        Overlay::Forget(form) => {
            FormOverlay::new().render_forget(frame, form, centered(screen, 60, 60));
        }
        Overlay::Repo(form) => {
            FormOverlay::new().render_repo(frame, form, centered(screen, 60, 55));
        }
        Overlay::Confirm(dialog) => {
            ConfirmOverlay::new().render(frame, dialog, centered(screen, 55, 35));
        }
        Overlay::ForgetPreview(preview) => {
            PreviewOverlay::new().render_forget(frame, preview, centered(screen, 75, 80));
        }
        Overlay::PrunePreview(preview) => {
            PreviewOverlay::new().render_prune(frame, preview, centered(screen, 75, 80));
        }
        Overlay::FileBrowser(browser) => {
            FileBrowserOverlay::new().render(frame, browser, centered(screen, 85, 85));
        }
        Overlay::Scan(scan) => ScanOverlay::new().render(frame, scan, centered(screen, 70, 60)),
    }
}

fn centered(r: Rect, w_pct: u16, h_pct: u16) -> Rect {
    let w = (r.width * w_pct / 100).min(r.width);
    let h = (r.height * h_pct / 100).min(r.height);
    Rect {
        x: r.x + (r.width - w) / 2,
        y: r.y + (r.height - h) / 2,
        width: w,
        height: h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_stays_inside_the_screen() {
        let screen = Rect::new(0, 0, 100, 40);
        let r = centered(screen, 60, 50);
        assert!(r.x + r.width <= screen.width);
        assert!(r.y + r.height <= screen.height);
        assert_eq!(r.width, 60);
        assert_eq!(r.height, 20);
    }

    #[test]
    fn centered_rect_clamps_to_tiny_screens() {
        let screen = Rect::new(0, 0, 4, 2);
        let r = centered(screen, 90, 90);
        assert!(r.width <= screen.width);
        assert!(r.height <= screen.height);
    }
}
