//! First-seen-wins digest deduplication, scoped to one organization.

use std::collections::HashSet;

use crate::model::SnapshotDescriptor;

/// Digests already forwarded for the organization currently being processed.
///
/// Owned by the producer loop only; workers never see it.
#[derive(Debug, Default)]
pub struct SeenDigests {
    digests: HashSet<String>,
}

impl SeenDigests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_duplicate(&self, digest: &str) -> bool {
        self.digests.contains(digest)
    }

    pub fn mark_seen(&mut self, digest: &str) {
        self.digests.insert(digest.to_string());
    }

    /// Checks and records `digest` in one step. Returns `true` the first time
    /// a digest is offered and `false` for every repeat.
    pub fn admit(&mut self, digest: &str) -> bool {
        if self.is_duplicate(digest) {
            return false;
        }
        self.mark_seen(digest);
        true
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Forgets everything; called between organizations.
    pub fn reset(&mut self) {
        self.digests.clear();
    }
}

/// Filters `descriptors` down to the first occurrence of each digest,
/// preserving feed order.
pub fn dedup_descriptors<I>(descriptors: I) -> Vec<SnapshotDescriptor>
where
    I: IntoIterator<Item = SnapshotDescriptor>,
{
    let mut seen = SeenDigests::new();
    descriptors
        .into_iter()
        .filter(|d| seen.admit(&d.digest))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(timestamp: &str, digest: &str) -> SnapshotDescriptor {
        SnapshotDescriptor {
            timestamp: timestamp.to_string(),
            url: "http://example.org/a".to_string(),
            digest: digest.to_string(),
        }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let input = vec![
            desc("1", "aaa"),
            desc("2", "bbb"),
            desc("3", "aaa"),
            desc("4", "ccc"),
            desc("5", "bbb"),
        ];

        let kept: Vec<_> = dedup_descriptors(input)
            .into_iter()
            .map(|d| d.timestamp)
            .collect();
        assert_eq!(kept, vec!["1", "2", "4"]);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let input = vec![desc("1", "x"), desc("2", "x"), desc("3", "y")];

        let once = dedup_descriptors(input);
        let twice = dedup_descriptors(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_mark_seen_and_reset() {
        let mut seen = SeenDigests::new();
        assert!(!seen.is_duplicate("abc123"));

        seen.mark_seen("abc123");
        assert!(seen.is_duplicate("abc123"));
        assert!(!seen.admit("abc123"));
        assert_eq!(seen.len(), 1);

        seen.reset();
        assert!(seen.is_empty());
        assert!(seen.admit("abc123"));
    }
}
