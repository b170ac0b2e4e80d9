//! # restic-client - Typed async driver for the restic backup tool
//!
//! Wraps the external `restic` binary behind a typed API: one-shot queries
//! (snapshot listings, stats, integrity checks, retention dry-runs) and
//! streaming supervision of long-running backup/restore runs.
//!
//! ## Key Features
//! - Credential handling restricted to password files and resolver
//!   commands; literal passwords are rejected before any spawn
//! - Line-oriented JSON parsing that skips malformed records instead of
//!   failing the stream
//! - Exactly one terminal event (summary or error) per supervised run
//! - Cooperative cancellation that still reaps the child process

pub mod client;
pub mod error;
pub mod repository;
pub mod stream;
pub mod types;

// Re-export main types for easy use
pub use client::{ResticClient, is_installed, version};
pub use error::{ResticError, ResticResult};
pub use repository::{CredentialSource, RepoProfile};
pub use stream::{BackupEvent, RestoreEvent, stream_backup, stream_restore};
pub use types::{
    BackupOptions, BackupProgress, BackupSummary, FileNode, ForgetGroup, ForgetPolicy, RepoHealth,
    RepoInfo, RepositoryStats, RestoreOptions, RestoreSummary, Snapshot,
};
