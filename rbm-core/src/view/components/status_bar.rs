//! ``src/view/components/status_bar.rs``
//!
//! One-line footer: active repository and tool state on the left, the
//! key hints for the current context on the right.

use ratatui::{
    prelude::*,
    widgets::{Paragraph, Widget},
};

use crate::model::app_state::{AppState, Overlay, Panel, VersionProbe};
use crate::view::theme;

pub struct StatusBar;

impl StatusBar {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame<'_>, state: &AppState, area: Rect) {
        let repo = state
            .active_repo()
            .map_or("no repository", |repo| repo.name.as_str());
        let version = match &state.restic_version {
            VersionProbe::Unknown => "restic: probing".to_string(),
            VersionProbe::Found(v) => v.clone(),
            VersionProbe::Missing => "restic NOT FOUND".to_string(),
        };
        let left_style = if matches!(state.restic_version, VersionProbe::Missing) {
            Style::default().fg(theme::RED).bg(theme::BACKGROUND)
        } else {
            Style::default().fg(theme::FOREGROUND).bg(theme::BACKGROUND)
        };
        let left = format!(" {repo} | {version}");

        let right = match &state.overlay {
            Overlay::None if state.filtering => "Enter apply | Esc clear",
            Overlay::None => match state.panel {
                Panel::Repositories => "Enter select | a add | s scan | x remove | ? help",
                Panel::Snapshots => "Enter browse | b backup | R restore | / filter | f forget | ? help",
                Panel::Operations => "P prune | C cache | u unlock | ? help",
            },
            Overlay::Confirm(_) => "type the word, Enter confirms | Esc aborts",
            Overlay::ForgetPreview(_) | Overlay::PrunePreview(_) => {
                "Enter continue | j/k scroll | Esc abort"
            }
            Overlay::FileBrowser(_) => "space mark | R restore marked | h/l page | Esc close",
            Overlay::Scan(_) => "Enter add selected | Esc close",
            _ => "Tab next field | Enter submit | Esc cancel",
        };

        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Fill(1), Constraint::Fill(1)])
            .split(area);

        Paragraph::new(left)
            .style(left_style)
            .alignment(Alignment::Left)
            .render(layout[0], frame.buffer_mut());
        Paragraph::new(format!("{right} "))
            .style(Style::default().fg(theme::COMMENT).bg(theme::BACKGROUND))
            .alignment(Alignment::Right)
            .render(layout[1], frame.buffer_mut());
    }
}

impl Default for StatusBar {
    fn default() -> Self {
        Self::new()
    }
}
