//! Snapshot comparison.
//!
//! Records are matched by id only. A record of the newer snapshot is reported
//! when its id was not present before or when any of its fields differ.
//! Records that disappeared are never reported.

use std::collections::{BTreeSet, HashMap};

use statuswatch_shared::{Record, RecordId, Snapshot};

/// Ids judged new or modified between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(BTreeSet<RecordId>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.0.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordId> {
        self.0.iter()
    }
}

impl FromIterator<RecordId> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = RecordId>>(iter: T) -> Self {
        ChangeSet(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    New,
    Modified,
    Unchanged,
}

fn classify(index: &HashMap<&RecordId, &Record>, rec: &Record) -> Change {
    match index.get(&rec.id) {
        None => Change::New,
        Some(old) if *old != rec => Change::Modified,
        Some(_) => Change::Unchanged,
    }
}

/// Compute the ids of `current` that are new or modified relative to `previous`.
///
/// When `previous` repeats an id, its last occurrence is the one compared against.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> ChangeSet {
    let index: HashMap<&RecordId, &Record> = previous.iter().map(|r| (&r.id, r)).collect();
    current
        .iter()
        .filter(|rec| classify(&index, rec) != Change::Unchanged)
        .map(|rec| rec.id.clone())
        .collect()
}
