//! ``src/view/components/operations_panel.rs``
//!
//! Live operations and the event log. A running backup gets a gauge
//! fed from its last progress report; a restore only has a started
//! marker and a timer, restic keeps its JSON progress for backups.

use bytesize::ByteSize;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::model::app_state::AppState;
use crate::model::ops_log::LogLevel;
use crate::model::session::OperationSession;
use crate::view::theme;

pub struct OperationsPanel;

impl OperationsPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame<'_>, state: &AppState, area: Rect, active: bool) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Operations ")
            .title_style(theme::title_style())
            .border_style(theme::panel_border_style(active))
            .style(theme::panel_style());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [sessions_area, log_area] = Layout::vertical([
            Constraint::Length(7),
            Constraint::Fill(1),
        ])
        .areas(inner);

        self.render_sessions(frame, state, sessions_area);
        self.render_log(frame, state, log_area);
    }

    fn render_sessions(&self, frame: &mut Frame<'_>, state: &AppState, area: Rect) {
        let [backup_area, restore_area, maintenance_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Length(2),
        ])
        .areas(area);

        match &state.backup {
            Some(session) => self.render_backup(frame, session, backup_area),
            None => frame.render_widget(
                Paragraph::new("backup: idle  (b to start)").style(theme::hint_style()),
                backup_area,
            ),
        }
        match &state.restore {
            Some(session) => self.render_restore(frame, session, restore_area),
            None => frame.render_widget(
                Paragraph::new("restore: idle  (R from a snapshot)").style(theme::hint_style()),
                restore_area,
            ),
        }

        let maintenance = match &state.maintenance {
            Some(label) => Line::from(vec![
                Span::styled("maintenance: ", Style::default().fg(theme::ORANGE)),
                Span::raw(label.to_string()),
                Span::styled(" running", Style::default().fg(theme::ORANGE)),
            ]),
            None => Line::from(Span::styled("maintenance: idle", theme::hint_style())),
        };
        frame.render_widget(Paragraph::new(maintenance), maintenance_area);
    }

    fn render_backup(&self, frame: &mut Frame<'_>, session: &OperationSession, area: Rect) {
        let [line_area, gauge_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(2)]).areas(area);

        let status = if session.cancel_requested() {
            Span::styled("cancelling", Style::default().fg(theme::ORANGE))
        } else {
            Span::styled("running", Style::default().fg(theme::GREEN))
        };
        let line = Line::from(vec![
            Span::styled(
                session.label.as_str(),
                Style::default().fg(theme::FOREGROUND).bold(),
            ),
            Span::raw(format!("  {}s  ", session.elapsed_secs())),
            status,
            Span::styled("  (^B cancels)", theme::hint_style()),
        ]);
        frame.render_widget(Paragraph::new(line), line_area);

        match session.progress() {
            Some(progress) => {
                let percent = (progress.percent_done * 100.0).clamp(0.0, 100.0) as u16;
                let label = format!(
                    "{percent}%  {}/{} files  {} of {}",
                    progress.files_done,
                    progress.total_files,
                    ByteSize(progress.bytes_done),
                    ByteSize(progress.total_bytes),
                );
                let gauge = Gauge::default()
                    .gauge_style(Style::default().fg(theme::PINK).bg(theme::CURRENT_LINE))
                    .percent(percent)
                    .label(label);
                frame.render_widget(gauge, gauge_area);
            }
            None => frame.render_widget(
                Paragraph::new("waiting for the first status report").style(theme::hint_style()),
                gauge_area,
            ),
        }
    }

    fn render_restore(&self, frame: &mut Frame<'_>, session: &OperationSession, area: Rect) {
        let status = if session.cancel_requested() {
            Span::styled("cancelling", Style::default().fg(theme::ORANGE))
        } else if session.restore_started() {
            Span::styled("restoring", Style::default().fg(theme::GREEN))
        } else {
            Span::styled("starting", Style::default().fg(theme::YELLOW))
        };
        let line = Line::from(vec![
            Span::styled(
                session.label.as_str(),
                Style::default().fg(theme::FOREGROUND).bold(),
            ),
            Span::raw(format!("  {}s  ", session.elapsed_secs())),
            status,
            Span::styled("  (^R cancels)", theme::hint_style()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_log(&self, frame: &mut Frame<'_>, state: &AppState, area: Rect) {
        let block = Block::default()
            .borders(Borders::TOP)
            .title(" Log ")
            .title_style(Style::default().fg(theme::COMMENT))
            .border_style(Style::default().fg(theme::COMMENT));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines: Vec<Line> = state
            .ops_log
            .tail(inner.height as usize)
            .map(|entry| {
                let style = match entry.level {
                    LogLevel::Info => Style::default().fg(theme::FOREGROUND),
                    LogLevel::Success => Style::default().fg(theme::GREEN),
                    LogLevel::Warning => Style::default().fg(theme::YELLOW),
                    LogLevel::Error => Style::default().fg(theme::RED),
                    LogLevel::Dimmed => Style::default().fg(theme::COMMENT),
                };
                Line::from(vec![
                    Span::styled(
                        entry.at.format("%H:%M:%S ").to_string(),
                        Style::default().fg(theme::COMMENT),
                    ),
                    Span::styled(entry.text.to_string(), style),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Default for OperationsPanel {
    fn default() -> Self {
        Self::new()
    }
}
