//! # Typed-word confirmation dialog
//!
//! Destructive operations pass through here after their preview. The
//! dialog carries the pending action as data; nothing executes until the
//! typed input equals the expected word exactly. Equality is
//! case-sensitive with no trimming, so `"DELETE "` does not confirm
//! `DELETE`.

use compact_str::CompactString;
use restic_client::ForgetPolicy;

/// What runs if the user confirms.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    /// Live `forget` with the previewed policy.
    Forget {
        repo_index: usize,
        policy: ForgetPolicy,
    },
    /// Live `prune` after its dry run.
    Prune { repo_index: usize },
    /// Drop a repository from the config book (backing data untouched).
    RemoveRepo { repo_index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmDialog {
    pub title: String,
    pub prompt: String,
    pub expected: &'static str,
    pub input: CompactString,
    pub action: PendingAction,
}

impl ConfirmDialog {
    pub fn forget(repo_index: usize, policy: ForgetPolicy, removing: usize) -> Self {
        Self {
            title: "Forget snapshots".to_string(),
            prompt: format!("This will forget {removing} snapshot(s). Type DELETE to proceed."),
            expected: "DELETE",
            input: CompactString::default(),
            action: PendingAction::Forget { repo_index, policy },
        }
    }

    pub fn prune(repo_index: usize) -> Self {
        Self {
            title: "Prune repository".to_string(),
            prompt: "This will rewrite pack files and drop unreferenced data. \
                     Type PRUNE to proceed."
                .to_string(),
            expected: "PRUNE",
            input: CompactString::default(),
            action: PendingAction::Prune { repo_index },
        }
    }

    pub fn remove_repo(repo_index: usize, name: &str) -> Self {
        Self {
            title: format!("Remove repository '{name}'"),
            prompt: "Removes only the config entry; the repository data stays. \
                     Type yes to proceed."
                .to_string(),
            expected: "yes",
            input: CompactString::default(),
            action: PendingAction::RemoveRepo { repo_index },
        }
    }

    /// Exact, case-sensitive equality. No trimming, no partial credit.
    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.input.as_str() == self.expected
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }
}
