//! # Form state for backup, restore, forget and add-repository
//!
//! Every form owns its fields and a focus marker. Focus moves through
//! `active_fields()`, a list recomputed from the form's toggles on every
//! call, so a toggle that hides a field (restore-to-original hides the
//! target, generate-password hides the credential input) immediately
//! drops it from the cycle. Toggles can only be flipped while focused,
//! and a toggle is always part of its own active list, so focus never
//! dangles.
//!
//! Submission converts the raw text into the driver's request types;
//! list inputs are comma-separated with entries trimmed and empties
//! dropped.

use compact_str::CompactString;
use restic_client::{BackupOptions, ForgetPolicy, RestoreOptions};
use smallvec::SmallVec;

use crate::config::valid_repo_name;

/// What the event loop needs to know about the focused field to route a
/// key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusKind {
    Text,
    Toggle,
    Submit,
}

/// One editable line. Cursor is a byte offset, kept on char boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    pub value: CompactString,
    pub cursor: usize,
}

impl TextField {
    pub fn with_value(value: impl Into<CompactString>) -> Self {
        let value = value.into();
        Self {
            cursor: value.len(),
            value,
        }
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut text = self.value.to_string();
        text.insert(self.cursor, ch);
        self.value = text.into();
        self.cursor += ch.len_utf8();
    }

    pub fn delete_char_before(&mut self) -> bool {
        if self.cursor > 0 {
            let mut text = self.value.to_string();
            let char_indices: Vec<_> = text.char_indices().collect();

            if let Some((pos, _)) = char_indices.iter().rev().find(|(pos, _)| *pos < self.cursor) {
                text.remove(*pos);
                self.value = text.into();
                self.cursor = *pos;
                return true;
            }
        }
        false
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// Comma-separated list input: entries trimmed, empties dropped.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_keep(label: &str, field: &TextField) -> Result<Option<u32>, String> {
    let text = field.as_str().trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<u32>()
        .map(Some)
        .map_err(|_| format!("{label}: '{text}' is not a number"))
}

// ---------------------------------------------------------------------------
// Backup

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupField {
    Paths,
    Tags,
    Excludes,
    Submit,
}

#[derive(Debug, Clone)]
pub struct BackupForm {
    pub paths: TextField,
    pub tags: TextField,
    pub excludes: TextField,
    pub focus: BackupField,
}

impl BackupForm {
    pub fn new() -> Self {
        Self {
            paths: TextField::default(),
            tags: TextField::default(),
            excludes: TextField::default(),
            focus: BackupField::Paths,
        }
    }

    pub fn active_fields(&self) -> SmallVec<[BackupField; 4]> {
        SmallVec::from_slice(&[
            BackupField::Paths,
            BackupField::Tags,
            BackupField::Excludes,
            BackupField::Submit,
        ])
    }

    pub fn focus_next(&mut self) {
        let fields = self.active_fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(pos + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields = self.active_fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(pos + fields.len() - 1) % fields.len()];
    }

    pub fn focus_kind(&self) -> FocusKind {
        match self.focus {
            BackupField::Submit => FocusKind::Submit,
            _ => FocusKind::Text,
        }
    }

    pub fn input_char(&mut self, c: char) {
        match self.focus {
            BackupField::Paths => self.paths.insert_char(c),
            BackupField::Tags => self.tags.insert_char(c),
            BackupField::Excludes => self.excludes.insert_char(c),
            BackupField::Submit => {}
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            BackupField::Paths => {
                self.paths.delete_char_before();
            }
            BackupField::Tags => {
                self.tags.delete_char_before();
            }
            BackupField::Excludes => {
                self.excludes.delete_char_before();
            }
            BackupField::Submit => {}
        }
    }

    pub fn to_options(&self) -> Result<BackupOptions, String> {
        let paths = split_list(self.paths.as_str());
        if paths.is_empty() {
            return Err("at least one path is required".to_string());
        }
        Ok(BackupOptions {
            paths,
            tags: split_list(self.tags.as_str()),
            excludes: split_list(self.excludes.as_str()),
        })
    }
}

impl Default for BackupForm {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Restore

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreField {
    OriginalLocation,
    Target,
    Submit,
}

#[derive(Debug, Clone)]
pub struct RestoreForm {
    pub snapshot_id: String,
    /// Paths marked in the file browser; empty restores everything.
    pub includes: Vec<String>,
    pub to_original: bool,
    pub target: TextField,
    pub focus: RestoreField,
}

impl RestoreForm {
    pub fn new(snapshot_id: impl Into<String>, includes: Vec<String>) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            includes,
            to_original: false,
            target: TextField::default(),
            focus: RestoreField::Target,
        }
    }

    /// Restoring to the original location leaves no target to edit.
    pub fn active_fields(&self) -> SmallVec<[RestoreField; 3]> {
        if self.to_original {
            SmallVec::from_slice(&[RestoreField::OriginalLocation, RestoreField::Submit])
        } else {
            SmallVec::from_slice(&[
                RestoreField::OriginalLocation,
                RestoreField::Target,
                RestoreField::Submit,
            ])
        }
    }

    pub fn focus_next(&mut self) {
        let fields = self.active_fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(pos + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields = self.active_fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(pos + fields.len() - 1) % fields.len()];
    }

    pub fn focus_kind(&self) -> FocusKind {
        match self.focus {
            RestoreField::OriginalLocation => FocusKind::Toggle,
            RestoreField::Target => FocusKind::Text,
            RestoreField::Submit => FocusKind::Submit,
        }
    }

    pub fn toggle(&mut self) {
        if self.focus == RestoreField::OriginalLocation {
            self.to_original = !self.to_original;
        }
    }

    pub fn input_char(&mut self, c: char) {
        if self.focus == RestoreField::Target {
            self.target.insert_char(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.focus == RestoreField::Target {
            self.target.delete_char_before();
        }
    }

    pub fn to_options(&self) -> Result<RestoreOptions, String> {
        let target = if self.to_original {
            None
        } else {
            let text = self.target.as_str().trim();
            if text.is_empty() {
                return Err(
                    "a target directory is required (or toggle restore to original location)"
                        .to_string(),
                );
            }
            Some(text.to_string())
        };
        Ok(RestoreOptions {
            snapshot_id: self.snapshot_id.clone(),
            target,
            includes: self.includes.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Forget policy

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgetField {
    KeepLast,
    KeepHourly,
    KeepDaily,
    KeepWeekly,
    KeepMonthly,
    KeepYearly,
    KeepWithin,
    Submit,
}

#[derive(Debug, Clone)]
pub struct ForgetForm {
    pub keep_last: TextField,
    pub keep_hourly: TextField,
    pub keep_daily: TextField,
    pub keep_weekly: TextField,
    pub keep_monthly: TextField,
    pub keep_yearly: TextField,
    pub keep_within: TextField,
    pub focus: ForgetField,
}

impl ForgetForm {
    pub fn new() -> Self {
        Self {
            keep_last: TextField::default(),
            keep_hourly: TextField::default(),
            keep_daily: TextField::default(),
            keep_weekly: TextField::default(),
            keep_monthly: TextField::default(),
            keep_yearly: TextField::default(),
            keep_within: TextField::default(),
            focus: ForgetField::KeepLast,
        }
    }

    pub fn active_fields(&self) -> SmallVec<[ForgetField; 8]> {
        SmallVec::from_slice(&[
            ForgetField::KeepLast,
            ForgetField::KeepHourly,
            ForgetField::KeepDaily,
            ForgetField::KeepWeekly,
            ForgetField::KeepMonthly,
            ForgetField::KeepYearly,
            ForgetField::KeepWithin,
            ForgetField::Submit,
        ])
    }

    pub fn focus_next(&mut self) {
        let fields = self.active_fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(pos + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields = self.active_fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(pos + fields.len() - 1) % fields.len()];
    }

    pub fn focus_kind(&self) -> FocusKind {
        match self.focus {
            ForgetField::Submit => FocusKind::Submit,
            _ => FocusKind::Text,
        }
    }

    fn focused_field_mut(&mut self) -> Option<&mut TextField> {
        match self.focus {
            ForgetField::KeepLast => Some(&mut self.keep_last),
            ForgetField::KeepHourly => Some(&mut self.keep_hourly),
            ForgetField::KeepDaily => Some(&mut self.keep_daily),
            ForgetField::KeepWeekly => Some(&mut self.keep_weekly),
            ForgetField::KeepMonthly => Some(&mut self.keep_monthly),
            ForgetField::KeepYearly => Some(&mut self.keep_yearly),
            ForgetField::KeepWithin => Some(&mut self.keep_within),
            ForgetField::Submit => None,
        }
    }

    pub fn input_char(&mut self, c: char) {
        if let Some(field) = self.focused_field_mut() {
            field.insert_char(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.focused_field_mut() {
            field.delete_char_before();
        }
    }

    pub fn to_policy(&self) -> Result<ForgetPolicy, String> {
        let policy = ForgetPolicy {
            keep_last: parse_keep("keep last", &self.keep_last)?,
            keep_hourly: parse_keep("keep hourly", &self.keep_hourly)?,
            keep_daily: parse_keep("keep daily", &self.keep_daily)?,
            keep_weekly: parse_keep("keep weekly", &self.keep_weekly)?,
            keep_monthly: parse_keep("keep monthly", &self.keep_monthly)?,
            keep_yearly: parse_keep("keep yearly", &self.keep_yearly)?,
            keep_within: {
                let text = self.keep_within.as_str().trim();
                (!text.is_empty()).then(|| text.to_string())
            },
            ..ForgetPolicy::default()
        };
        if policy.is_empty() {
            return Err("at least one keep rule is required".to_string());
        }
        Ok(policy)
    }
}

impl Default for ForgetForm {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Add repository

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialMethod {
    #[default]
    PasswordFile,
    PasswordCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoField {
    Name,
    Location,
    Method,
    Generate,
    Credential,
    RunInit,
    Submit,
}

#[derive(Debug, Clone)]
pub struct RepoForm {
    pub name: TextField,
    pub location: TextField,
    pub method: CredentialMethod,
    /// Generate a fresh password file instead of pointing at one.
    /// Only meaningful for the file method.
    pub generate: bool,
    pub credential: TextField,
    pub run_init: bool,
    pub focus: RepoField,
}

impl RepoForm {
    pub fn new() -> Self {
        Self {
            name: TextField::default(),
            location: TextField::default(),
            method: CredentialMethod::PasswordFile,
            generate: false,
            credential: TextField::default(),
            run_init: false,
            focus: RepoField::Name,
        }
    }

    /// Pre-filled from a discovery scan hit.
    pub fn for_location(location: &str) -> Self {
        Self {
            location: TextField::with_value(location),
            ..Self::new()
        }
    }

    pub fn active_fields(&self) -> SmallVec<[RepoField; 7]> {
        let mut fields = SmallVec::new();
        fields.push(RepoField::Name);
        fields.push(RepoField::Location);
        fields.push(RepoField::Method);
        match self.method {
            CredentialMethod::PasswordFile => {
                fields.push(RepoField::Generate);
                if !self.generate {
                    fields.push(RepoField::Credential);
                }
            }
            CredentialMethod::PasswordCommand => fields.push(RepoField::Credential),
        }
        fields.push(RepoField::RunInit);
        fields.push(RepoField::Submit);
        fields
    }

    pub fn focus_next(&mut self) {
        let fields = self.active_fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(pos + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields = self.active_fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(pos + fields.len() - 1) % fields.len()];
    }

    pub fn focus_kind(&self) -> FocusKind {
        match self.focus {
            RepoField::Method | RepoField::Generate | RepoField::RunInit => FocusKind::Toggle,
            RepoField::Submit => FocusKind::Submit,
            _ => FocusKind::Text,
        }
    }

    pub fn toggle(&mut self) {
        match self.focus {
            RepoField::Method => {
                self.method = match self.method {
                    CredentialMethod::PasswordFile => CredentialMethod::PasswordCommand,
                    CredentialMethod::PasswordCommand => CredentialMethod::PasswordFile,
                };
                // generate only exists for the file method
                if self.method == CredentialMethod::PasswordCommand {
                    self.generate = false;
                }
            }
            RepoField::Generate => self.generate = !self.generate,
            RepoField::RunInit => self.run_init = !self.run_init,
            _ => {}
        }
    }

    pub fn input_char(&mut self, c: char) {
        match self.focus {
            RepoField::Name => self.name.insert_char(c),
            RepoField::Location => self.location.insert_char(c),
            RepoField::Credential => self.credential.insert_char(c),
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            RepoField::Name => {
                self.name.delete_char_before();
            }
            RepoField::Location => {
                self.location.delete_char_before();
            }
            RepoField::Credential => {
                self.credential.delete_char_before();
            }
            _ => {}
        }
    }

    pub fn to_submission(&self) -> Result<RepoFormSubmission, String> {
        let name = self.name.as_str().trim().to_string();
        if !valid_repo_name(&name) {
            return Err(format!(
                "name '{name}' must be non-empty and limited to letters, digits, '.', '-', '_'"
            ));
        }
        let location = self.location.as_str().trim().to_string();
        if location.is_empty() {
            return Err("location is required".to_string());
        }
        let generate = self.method == CredentialMethod::PasswordFile && self.generate;
        let credential = self.credential.as_str().trim().to_string();
        if !generate && credential.is_empty() {
            let what = match self.method {
                CredentialMethod::PasswordFile => "a password file path",
                CredentialMethod::PasswordCommand => "a password command",
            };
            return Err(format!("{what} is required (or enable generation)"));
        }
        Ok(RepoFormSubmission {
            name,
            location,
            method: self.method,
            credential,
            generate,
            run_init: self.run_init,
        })
    }
}

impl Default for RepoForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated output of the add-repository form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFormSubmission {
    pub name: String,
    pub location: String,
    pub method: CredentialMethod,
    /// Password file path or resolver command; empty when `generate`.
    pub credential: String,
    pub generate: bool,
    pub run_init: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_into(form: &mut RepoForm, text: &str) {
        for c in text.chars() {
            form.input_char(c);
        }
    }

    #[test]
    fn text_field_edits_at_cursor_across_multibyte() {
        let mut field = TextField::with_value("héllo");
        field.insert_char('!');
        assert_eq!(field.as_str(), "héllo!");
        assert!(field.delete_char_before());
        assert!(field.delete_char_before());
        assert_eq!(field.as_str(), "héll");
        field.cursor = 0;
        assert!(!field.delete_char_before());
    }

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(
            split_list(" /home, /etc ,, /var/lib ,"),
            vec!["/home", "/etc", "/var/lib"]
        );
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn backup_form_requires_paths() {
        let mut form = BackupForm::new();
        assert!(form.to_options().is_err());

        form.input_char('/');
        form.input_char('a');
        let opts = form.to_options().unwrap();
        assert_eq!(opts.paths, vec!["/a"]);
        assert!(opts.tags.is_empty());
    }

    #[test]
    fn restore_toggle_drops_target_from_active_fields() {
        let mut form = RestoreForm::new("abc123", Vec::new());
        assert!(form.active_fields().contains(&RestoreField::Target));

        form.focus = RestoreField::OriginalLocation;
        form.toggle();
        assert!(form.to_original);
        assert!(!form.active_fields().contains(&RestoreField::Target));

        // cycle: OriginalLocation -> Submit -> OriginalLocation
        form.focus_next();
        assert_eq!(form.focus, RestoreField::Submit);
        form.focus_next();
        assert_eq!(form.focus, RestoreField::OriginalLocation);
    }

    #[test]
    fn restore_to_original_needs_no_target() {
        let mut form = RestoreForm::new("abc123", vec!["/etc/passwd".to_string()]);
        assert!(form.to_options().is_err(), "empty target must be rejected");

        form.focus = RestoreField::OriginalLocation;
        form.toggle();
        let opts = form.to_options().unwrap();
        assert_eq!(opts.target, None);
        assert_eq!(opts.includes, vec!["/etc/passwd"]);
    }

    #[test]
    fn forget_form_parses_numbers_and_rejects_junk() {
        let mut form = ForgetForm::new();
        form.input_char('7');
        let policy = form.to_policy().unwrap();
        assert_eq!(policy.keep_last, Some(7));

        let mut bad = ForgetForm::new();
        bad.input_char('x');
        let err = bad.to_policy().unwrap_err();
        assert!(err.contains("keep last"), "{err}");
    }

    #[test]
    fn empty_forget_policy_is_rejected() {
        let form = ForgetForm::new();
        assert!(form.to_policy().is_err());
    }

    #[test]
    fn generate_toggle_removes_credential_field() {
        let mut form = RepoForm::new();
        assert!(form.active_fields().contains(&RepoField::Credential));

        form.focus = RepoField::Generate;
        form.toggle();
        assert!(!form.active_fields().contains(&RepoField::Credential));

        // switching to the command method forces the credential back and
        // clears the generate flag
        form.focus = RepoField::Method;
        form.toggle();
        assert_eq!(form.method, CredentialMethod::PasswordCommand);
        assert!(!form.generate);
        assert!(form.active_fields().contains(&RepoField::Credential));
        assert!(!form.active_fields().contains(&RepoField::Generate));
    }

    #[test]
    fn focus_cycle_skips_hidden_fields() {
        let mut form = RepoForm::new();
        form.focus = RepoField::Generate;
        form.toggle(); // credential now hidden

        form.focus_next();
        assert_eq!(form.focus, RepoField::RunInit, "credential must be skipped");
        form.focus_prev();
        assert_eq!(form.focus, RepoField::Generate);
    }

    #[test]
    fn repo_submission_validates() {
        let mut form = RepoForm::new();
        assert!(form.to_submission().is_err(), "name required");

        form.focus = RepoField::Name;
        type_into(&mut form, "nas");
        assert!(form.to_submission().is_err(), "location required");

        form.focus = RepoField::Location;
        type_into(&mut form, "/srv/restic");
        assert!(form.to_submission().is_err(), "credential required");

        form.focus = RepoField::Generate;
        form.toggle();
        let sub = form.to_submission().unwrap();
        assert!(sub.generate);
        assert_eq!(sub.name, "nas");
        assert_eq!(sub.location, "/srv/restic");
        assert!(sub.credential.is_empty());
    }
}
