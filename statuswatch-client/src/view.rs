use chrono::{DateTime, Utc};
use statuswatch_shared::{RecordId, Snapshot};

use crate::diff::ChangeSet;

/// Read-only projection handed to the rendering side.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub records: Snapshot,
    pub is_loading: bool,
    pub is_error: bool,
    /// Text of the most recent transport failure while `is_error` holds.
    pub last_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub blink_active: bool,
    pub highlighted: ChangeSet,
}

impl ViewState {
    pub fn initial() -> Self {
        Self {
            records: Snapshot::empty(),
            is_loading: true,
            is_error: false,
            last_error: None,
            last_update: None,
            blink_active: false,
            highlighted: ChangeSet::new(),
        }
    }

    pub fn is_highlighted(&self, id: &RecordId) -> bool {
        self.highlighted.contains(id)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::initial()
    }
}
