//! ``src/view/components/repository_panel.rs``
//!
//! Repository roster: one row per configured repository with the
//! last-known health and stats filled in as info queries land.

use bytesize::ByteSize;
use chrono::Local;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, HighlightSpacing, Row, Table, TableState},
};
use restic_client::RepoHealth;

use crate::model::app_state::AppState;
use crate::view::theme;

pub struct RepositoryPanel;

impl RepositoryPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame<'_>, state: &AppState, area: Rect, active: bool) {
        let header = Row::new(vec!["", "Name", "Location", "Health", "Size", "Snapshots", "Last backup"])
            .style(theme::header_style())
            .bottom_margin(1);

        let rows: Vec<Row> = state
            .config
            .repositories
            .iter()
            .enumerate()
            .map(|(i, repo)| {
                let info = state.repo_infos.get(i).and_then(|slot| slot.as_ref());
                let marker = if state.repo_index == Some(i) { "●" } else { " " };
                let health = info.map_or(RepoHealth::Unknown, |info| info.health);
                let health_style = match health {
                    RepoHealth::Healthy => Style::default().fg(theme::GREEN),
                    RepoHealth::Warning => Style::default().fg(theme::YELLOW),
                    RepoHealth::Error => Style::default().fg(theme::RED),
                    RepoHealth::Unknown => Style::default().fg(theme::COMMENT),
                };
                let size = info
                    .map(|info| ByteSize(info.stats.total_size).to_string())
                    .unwrap_or_default();
                let count = info
                    .map(|info| info.snapshot_count.to_string())
                    .unwrap_or_default();
                let last = info
                    .and_then(|info| info.last_backup)
                    .map(|at| {
                        at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
                    })
                    .unwrap_or_default();

                Row::new(vec![
                    Cell::from(marker).style(Style::default().fg(theme::GREEN)),
                    Cell::from(repo.name.clone()),
                    Cell::from(repo.location.clone()).style(Style::default().fg(theme::COMMENT)),
                    Cell::from(health.label()).style(health_style),
                    Cell::from(size),
                    Cell::from(count),
                    Cell::from(last),
                ])
            })
            .collect();

        let widths = [
            Constraint::Length(1),
            Constraint::Length(16),
            Constraint::Fill(1),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(9),
            Constraint::Length(17),
        ];

        let mut table_state = TableState::default().with_selected(state.repo_cursor);
        let title = format!(" Repositories ({}) ", state.repo_count());

        let table = Table::new(rows, widths)
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .title_style(theme::title_style())
                    .border_style(theme::panel_border_style(active))
                    .style(theme::panel_style()),
            )
            .row_highlight_style(theme::selection_style())
            .highlight_symbol("▶ ")
            .highlight_spacing(HighlightSpacing::Always);

        frame.render_stateful_widget(table, area, &mut table_state);
    }
}

impl Default for RepositoryPanel {
    fn default() -> Self {
        Self::new()
    }
}
