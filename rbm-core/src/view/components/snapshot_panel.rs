//! ``src/view/components/snapshot_panel.rs``
//!
//! Snapshot list for the active repository. Scrolling is windowed by
//! the state's own viewport so the selected row is always on screen;
//! the table paints exactly the visible slice, nothing more.

use chrono::Local;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::model::app_state::AppState;
use crate::view::theme;

pub struct SnapshotPanel;

impl SnapshotPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame<'_>, state: &mut AppState, area: Rect, active: bool) {
        let show_filter = state.filtering || state.filter.is_active();
        let [filter_area, table_area, footer_area] = Layout::vertical([
            Constraint::Length(if show_filter { 1 } else { 0 }),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        if show_filter {
            self.render_filter_line(frame, state, filter_area);
        }
        self.render_table(frame, state, table_area, active);
        self.render_footer(frame, state, footer_area);
    }

    fn render_filter_line(&self, frame: &mut Frame<'_>, state: &AppState, area: Rect) {
        let mut spans = vec![Span::styled("filter: ", Style::default().fg(theme::CYAN))];
        if state.filtering {
            let text = state.filter_input.as_str();
            let (before, after) = text.split_at(state.filter_input.cursor.min(text.len()));
            spans.push(Span::raw(before.to_string()));
            spans.push(Span::styled("█", Style::default().fg(theme::YELLOW)));
            spans.push(Span::raw(after.to_string()));
        } else {
            spans.push(Span::raw(state.filter_input.as_str().to_string()));
            spans.push(Span::styled(
                "  (c clears)",
                theme::hint_style(),
            ));
        }
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(theme::panel_style()),
            area,
        );
    }

    fn render_table(&self, frame: &mut Frame<'_>, state: &mut AppState, area: Rect, active: bool) {
        let title = if state.snapshots_loading {
            " Snapshots (loading…) ".to_string()
        } else {
            format!(" Snapshots ({}) ", state.visible_len())
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_style(theme::title_style())
            .border_style(theme::panel_border_style(active))
            .style(theme::panel_style());

        // rows inside the border, minus the header and its margin
        let visible = (area.height.saturating_sub(4)) as usize;
        state.snapshot_scroll.scroll_to(state.snapshot_selected, visible.max(1));
        let offset = state.snapshot_scroll.offset();
        let end = (offset + visible.max(1)).min(state.filtered.len());

        let header = Row::new(vec!["ID", "Time", "Host", "Tags", "Paths"])
            .style(theme::header_style())
            .bottom_margin(1);

        let rows: Vec<Row> = state.filtered[offset..end]
            .iter()
            .enumerate()
            .map(|(row, &snap_index)| {
                let snap = &state.snapshots[snap_index];
                let time = snap
                    .time
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string();
                let style = if offset + row == state.snapshot_selected {
                    theme::selection_style()
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(snap.display_id().to_string())
                        .style(Style::default().fg(theme::CYAN)),
                    Cell::from(time),
                    Cell::from(snap.hostname.clone()),
                    Cell::from(snap.tags.join(",")).style(Style::default().fg(theme::PINK)),
                    Cell::from(snap.paths.join(" ")),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(10),
            Constraint::Length(17),
            Constraint::Length(12),
            Constraint::Length(14),
            Constraint::Fill(1),
        ];

        frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
    }

    fn render_footer(&self, frame: &mut Frame<'_>, state: &AppState, area: Rect) {
        let mut parts = Vec::new();
        if state.filter.is_active() {
            parts.push(format!(
                "{}/{} match",
                state.visible_len(),
                state.snapshots.len()
            ));
        }
        if state.hidden_count > 0 {
            parts.push(format!("{} system snapshots hidden", state.hidden_count));
        }
        if state.repo_index.is_none() {
            parts.push("no repository selected".to_string());
        }
        frame.render_widget(
            Paragraph::new(parts.join("  |  ")).style(theme::hint_style()),
            area,
        );
    }
}

impl Default for SnapshotPanel {
    fn default() -> Self {
        Self::new()
    }
}
