//! ``src/view/components/form_overlay.rs``
//! ============================================================================
//! # Form overlays
//!
//! Painters for the four input forms. Rows are drawn from the same
//! active-field logic that drives focus, so a field hidden by a toggle
//! never appears on screen either.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::model::forms::{
    BackupField, BackupForm, CredentialMethod, ForgetField, ForgetForm, RepoField, RepoForm,
    RestoreField, RestoreForm, TextField,
};
use crate::view::theme;

const LABEL_WIDTH: usize = 18;

pub struct FormOverlay;

impl FormOverlay {
    pub fn new() -> Self {
        Self
    }

    pub fn render_backup(&self, frame: &mut Frame<'_>, form: &BackupForm, area: Rect) {
        let lines = vec![
            text_row("Paths", &form.paths, form.focus == BackupField::Paths),
            hint_row("comma separated, at least one"),
            text_row("Tags", &form.tags, form.focus == BackupField::Tags),
            text_row("Excludes", &form.excludes, form.focus == BackupField::Excludes),
            Line::from(""),
            submit_row("Start backup", form.focus == BackupField::Submit),
        ];
        self.chrome(frame, " Backup ", lines, area);
    }

    pub fn render_restore(&self, frame: &mut Frame<'_>, form: &RestoreForm, area: Rect) {
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Snapshot  ", Style::default().fg(theme::COMMENT)),
                Span::styled(form.snapshot_id.clone(), Style::default().fg(theme::CYAN)),
            ]),
            Line::from(match form.includes.len() {
                0 => Span::styled("restores the whole snapshot", theme::hint_style()),
                n => Span::styled(
                    format!("restores {n} marked paths"),
                    Style::default().fg(theme::PINK),
                ),
            }),
            Line::from(""),
            toggle_row(
                "Original location",
                form.to_original,
                form.focus == RestoreField::OriginalLocation,
            ),
        ];
        if form.to_original {
            lines.push(Line::from(Span::styled(
                "overwrites files in place",
                Style::default().fg(theme::RED),
            )));
        } else {
            lines.push(text_row("Target", &form.target, form.focus == RestoreField::Target));
        }
        lines.push(Line::from(""));
        lines.push(submit_row("Start restore", form.focus == RestoreField::Submit));
        self.chrome(frame, " Restore ", lines, area);
    }

    pub fn render_forget(&self, frame: &mut Frame<'_>, form: &ForgetForm, area: Rect) {
        let lines = vec![
            text_row("Keep last", &form.keep_last, form.focus == ForgetField::KeepLast),
            text_row("Keep hourly", &form.keep_hourly, form.focus == ForgetField::KeepHourly),
            text_row("Keep daily", &form.keep_daily, form.focus == ForgetField::KeepDaily),
            text_row("Keep weekly", &form.keep_weekly, form.focus == ForgetField::KeepWeekly),
            text_row("Keep monthly", &form.keep_monthly, form.focus == ForgetField::KeepMonthly),
            text_row("Keep yearly", &form.keep_yearly, form.focus == ForgetField::KeepYearly),
            text_row("Keep within", &form.keep_within, form.focus == ForgetField::KeepWithin),
            hint_row("duration like 30d or 2y5m, counts are numbers"),
            Line::from(""),
            submit_row("Preview (dry-run)", form.focus == ForgetField::Submit),
        ];
        self.chrome(frame, " Retention policy ", lines, area);
    }

    pub fn render_repo(&self, frame: &mut Frame<'_>, form: &RepoForm, area: Rect) {
        let method_label = match form.method {
            CredentialMethod::PasswordFile => "password file",
            CredentialMethod::PasswordCommand => "password command",
        };
        let mut lines = vec![
            text_row("Name", &form.name, form.focus == RepoField::Name),
            text_row("Location", &form.location, form.focus == RepoField::Location),
            choice_row("Credential", method_label, form.focus == RepoField::Method),
        ];
        if form.method == CredentialMethod::PasswordFile {
            lines.push(toggle_row(
                "Generate file",
                form.generate,
                form.focus == RepoField::Generate,
            ));
        }
        if !(form.method == CredentialMethod::PasswordFile && form.generate) {
            let label = match form.method {
                CredentialMethod::PasswordFile => "File path",
                CredentialMethod::PasswordCommand => "Command",
            };
            lines.push(text_row(label, &form.credential, form.focus == RepoField::Credential));
        }
        lines.push(toggle_row(
            "Run init",
            form.run_init,
            form.focus == RepoField::RunInit,
        ));
        lines.push(Line::from(""));
        lines.push(submit_row("Add repository", form.focus == RepoField::Submit));
        self.chrome(frame, " Add repository ", lines, area);
    }

    fn chrome(&self, frame: &mut Frame<'_>, title: &str, mut lines: Vec<Line>, area: Rect) {
        frame.render_widget(Clear, area);
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Tab next field, Enter on the last row submits, Esc cancels",
            theme::hint_style(),
        )));
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .title_alignment(Alignment::Center)
                .border_style(theme::overlay_border_style())
                .style(theme::overlay_style()),
        );
        frame.render_widget(paragraph, area);
    }
}

impl Default for FormOverlay {
    fn default() -> Self {
        Self::new()
    }
}

fn label_span(label: &str, focused: bool) -> Span<'static> {
    let text = format!("{label:<LABEL_WIDTH$}");
    if focused {
        Span::styled(text, Style::default().fg(theme::YELLOW).bold())
    } else {
        Span::styled(text, Style::default().fg(theme::COMMENT))
    }
}

fn text_row(label: &str, field: &TextField, focused: bool) -> Line<'static> {
    let mut spans = vec![label_span(label, focused)];
    if focused {
        let text = field.as_str();
        let cursor = field.cursor.min(text.len());
        let (before, after) = text.split_at(cursor);
        spans.push(Span::raw(before.to_string()));
        spans.push(Span::styled("█", Style::default().fg(theme::YELLOW)));
        spans.push(Span::raw(after.to_string()));
    } else {
        spans.push(Span::raw(field.as_str().to_string()));
    }
    Line::from(spans)
}

fn toggle_row(label: &str, on: bool, focused: bool) -> Line<'static> {
    let mark = if on { "[x]" } else { "[ ]" };
    Line::from(vec![
        label_span(label, focused),
        Span::styled(
            format!("{mark}  (space flips)"),
            if on {
                Style::default().fg(theme::GREEN)
            } else {
                Style::default().fg(theme::FOREGROUND)
            },
        ),
    ])
}

fn choice_row(label: &str, value: &str, focused: bool) -> Line<'static> {
    Line::from(vec![
        label_span(label, focused),
        Span::styled(format!("{value}  (space flips)"), Style::default().fg(theme::CYAN)),
    ])
}

fn submit_row(text: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        Style::default()
            .fg(theme::BACKGROUND)
            .bg(theme::GREEN)
            .bold()
    } else {
        Style::default().fg(theme::GREEN)
    };
    Line::from(Span::styled(format!("  {text}  "), style))
}

fn hint_row(text: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw(" ".repeat(LABEL_WIDTH)),
        Span::styled(text.to_string(), theme::hint_style()),
    ])
}
