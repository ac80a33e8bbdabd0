use statuswatch_shared::Snapshot;

/// Holds the last accepted snapshot. Starts out empty.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Snapshot,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Swap in `next` wholesale and hand back the snapshot it displaced.
    pub fn replace(&mut self, next: Snapshot) -> Snapshot {
        std::mem::replace(&mut self.current, next)
    }
}
