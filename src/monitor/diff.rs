//! Snapshot diffing.
//!
//! The diff core turns two non-destructive snapshots of a destination into
//! a classification of its messages: still present, newly arrived, or no
//! longer present. It is a pure function of the previous id set and the
//! current browse result, so the engine can be driven by synthetic
//! snapshots in tests.

use std::collections::HashSet;

use crate::message::{MessageId, ObservedMessage};

/// The classified outcome of comparing one browse against the previous
/// snapshot of the same destination.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDiff {
    /// Ids seen before but absent now, sorted by id.
    pub removed: Vec<MessageId>,
    /// Messages absent before, in broker browse order.
    pub added: Vec<ObservedMessage>,
    /// All ids present in the current snapshot; becomes the next
    /// `last_seen` for the destination.
    pub current_ids: HashSet<MessageId>,
}

impl SnapshotDiff {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Diffs a browse result against the previously seen id set.
///
/// Messages are identified by `message_id`, never by position. A message
/// listed more than once in a single browse counts once; the first
/// occurrence wins.
#[must_use]
pub fn diff_snapshot(last_seen: &HashSet<MessageId>, current: &[ObservedMessage]) -> SnapshotDiff {
    let mut current_ids = HashSet::with_capacity(current.len());
    let mut added = Vec::new();

    for message in current {
        if !current_ids.insert(message.message_id.clone()) {
            continue;
        }
        if !last_seen.contains(&message.message_id) {
            added.push(message.clone());
        }
    }

    let mut removed: Vec<MessageId> = last_seen
        .iter()
        .filter(|id| !current_ids.contains(*id))
        .cloned()
        .collect();
    removed.sort();

    SnapshotDiff {
        removed,
        added,
        current_ids,
    }
}
