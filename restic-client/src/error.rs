//! Error handling for restic subprocess execution

use compact_str::CompactString;
use thiserror::Error;

pub type ResticResult<T> = Result<T, ResticError>;

/// Failures surfaced by the restic driver.
///
/// Launch and exit failures carry enough context to be shown to the user
/// verbatim; decode failures name the subcommand whose output broke.
#[derive(Error, Debug)]
pub enum ResticError {
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: CompactString,
        #[source]
        source: std::io::Error,
    },

    #[error("restic {subcommand} failed (exit {code}): {stderr}")]
    CommandFailed {
        subcommand: CompactString,
        code: i32,
        stderr: String,
    },

    #[error("restic {subcommand} terminated by signal")]
    Terminated { subcommand: CompactString },

    #[error("unreadable {subcommand} output: {source}")]
    Decode {
        subcommand: CompactString,
        #[source]
        source: serde_json::Error,
    },

    #[error("credential rejected for repository '{name}': {reason}")]
    Credential {
        name: CompactString,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResticError {
    #[inline]
    pub fn launch(program: impl Into<CompactString>, source: std::io::Error) -> Self {
        Self::Launch {
            program: program.into(),
            source,
        }
    }

    /// Build the terminal error for a non-zero exit, folding the captured
    /// stderr text in verbatim.
    pub fn command_failed(
        subcommand: impl Into<CompactString>,
        code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        match code {
            Some(code) => Self::CommandFailed {
                subcommand: subcommand.into(),
                code,
                stderr: stderr.into(),
            },
            None => Self::Terminated {
                subcommand: subcommand.into(),
            },
        }
    }

    #[inline]
    pub fn decode(subcommand: impl Into<CompactString>, source: serde_json::Error) -> Self {
        Self::Decode {
            subcommand: subcommand.into(),
            source,
        }
    }

    #[inline]
    pub fn credential(name: impl Into<CompactString>, reason: impl Into<String>) -> Self {
        Self::Credential {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for failures of the launch itself, before the tool ever ran.
    #[inline]
    pub const fn is_launch_failure(&self) -> bool {
        matches!(self, Self::Launch { .. })
    }
}
