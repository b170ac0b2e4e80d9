//! # Snapshot filter engine
//!
//! One input line is parsed into a [`SnapshotFilter`]: `tag:` and `host:`
//! tokens become dedicated predicates, everything else joins into the
//! free-text term. Free text matches when ANY of full id, short id, a
//! path, or a tag contains it; the tag and host predicates each narrow the
//! result further (they AND with the free text and with each other). All
//! matching is case-insensitive substring. A filter with no terms is
//! inactive and selects everything.
//!
//! Application is order-preserving and copy-free: the output is a list of
//! indices into the collection that was passed in.

use restic_client::Snapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    pub text: String,
    pub tag: String,
    pub host: String,
}

impl SnapshotFilter {
    /// Parse one input line. `tag:`/`host:` prefixed tokens populate the
    /// predicates (last occurrence wins); remaining tokens are rejoined as
    /// the free-text term.
    pub fn parse(input: &str) -> Self {
        let mut filter = Self::default();
        let mut free: Vec<&str> = Vec::new();
        for token in input.split_whitespace() {
            if let Some(tag) = token.strip_prefix("tag:") {
                filter.tag = tag.to_lowercase();
            } else if let Some(host) = token.strip_prefix("host:") {
                filter.host = host.to_lowercase();
            } else {
                free.push(token);
            }
        }
        filter.text = free.join(" ").to_lowercase();
        filter
    }

    /// An all-empty filter selects the whole collection.
    #[inline]
    pub fn is_active(&self) -> bool {
        !(self.text.is_empty() && self.tag.is_empty() && self.host.is_empty())
    }

    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        if !self.text.is_empty() && !self.matches_free_text(snapshot) {
            return false;
        }
        if !self.tag.is_empty()
            && !snapshot
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(&self.tag))
        {
            return false;
        }
        if !self.host.is_empty() && !snapshot.hostname.to_lowercase().contains(&self.host) {
            return false;
        }
        true
    }

    fn matches_free_text(&self, snapshot: &Snapshot) -> bool {
        let needle = self.text.as_str();
        snapshot.id.to_lowercase().contains(needle)
            || snapshot.short_id.to_lowercase().contains(needle)
            || snapshot
                .paths
                .iter()
                .any(|p| p.to_lowercase().contains(needle))
            || snapshot
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(needle))
    }

    /// Indices of matching snapshots, in collection order. Inactive
    /// filters return the identity mapping.
    pub fn apply(&self, snapshots: &[Snapshot]) -> Vec<usize> {
        if !self.is_active() {
            return (0..snapshots.len()).collect();
        }
        snapshots
            .iter()
            .enumerate()
            .filter(|(_, s)| self.matches(s))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(id: &str, host: &str, paths: &[&str], tags: &[&str]) -> Snapshot {
        Snapshot {
            id: id.to_string(),
            short_id: id.chars().take(8).collect(),
            time: chrono::Utc::now(),
            hostname: host.to_string(),
            username: "u".to_string(),
            paths: paths.iter().map(|p| (*p).to_string()).collect(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    fn fleet() -> Vec<Snapshot> {
        vec![
            snap("aaaa1111bbbb", "web1", &["/home/alice"], &["daily"]),
            snap("cccc2222dddd", "web2", &["/var/lib/pg"], &["db", "nightly"]),
            snap("eeee3333ffff", "laptop", &["/home/bob"], &["daily", "home"]),
        ]
    }

    #[test]
    fn inactive_filter_selects_everything() {
        let snaps = fleet();
        let filter = SnapshotFilter::parse("   ");
        assert!(!filter.is_active());
        assert_eq!(filter.apply(&snaps), vec![0, 1, 2]);
    }

    #[test]
    fn free_text_ors_across_id_paths_and_tags() {
        let snaps = fleet();

        // matches snapshot 0 by path and snapshot 2 by path
        assert_eq!(SnapshotFilter::parse("home").apply(&snaps), vec![0, 2]);
        // matches snapshot 1 by id prefix
        assert_eq!(SnapshotFilter::parse("cccc").apply(&snaps), vec![1]);
        // matches snapshot 1 by tag
        assert_eq!(SnapshotFilter::parse("nightly").apply(&snaps), vec![1]);
        // case-insensitive
        assert_eq!(SnapshotFilter::parse("HOME").apply(&snaps), vec![0, 2]);
    }

    #[test]
    fn predicates_and_with_free_text() {
        let snaps = fleet();

        // "home" alone matches 0 and 2; the host predicate narrows to 2
        let filter = SnapshotFilter::parse("home host:laptop");
        assert_eq!(filter.apply(&snaps), vec![2]);

        // tag and host predicates AND with each other
        assert_eq!(
            SnapshotFilter::parse("tag:daily host:web1").apply(&snaps),
            vec![0]
        );
        assert_eq!(
            SnapshotFilter::parse("tag:db host:laptop").apply(&snaps),
            Vec::<usize>::new()
        );
    }

    #[test]
    fn application_is_idempotent() {
        let snaps = fleet();
        let filter = SnapshotFilter::parse("daily");

        let once = filter.apply(&snaps);
        let survivors: Vec<Snapshot> = once.iter().map(|&i| snaps[i].clone()).collect();
        let twice = filter.apply(&survivors);

        assert_eq!(twice.len(), once.len());
        for (j, &orig) in once.iter().enumerate() {
            assert_eq!(survivors[twice[j]].id, snaps[orig].id);
        }
    }

    #[test]
    fn order_is_preserved() {
        let snaps = fleet();
        let indices = SnapshotFilter::parse("daily").apply(&snaps);
        assert_eq!(indices, vec![0, 2]);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn last_duplicate_predicate_wins() {
        let filter = SnapshotFilter::parse("tag:a tag:b");
        assert_eq!(filter.tag, "b");
        assert!(filter.text.is_empty());
    }
}
