use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Record identifier as sent by the source: either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Number(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

/// One row of the monitored collection.
///
/// `id` is the matching key across snapshots; everything else, including any
/// fields the source adds beyond `name` and `status`, is payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub status: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: status.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// Complete point-in-time listing of the collection, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Vec<Record>);

impl Snapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Snapshot(records)
    }

    pub fn empty() -> Self {
        Snapshot(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.0.iter()
    }
}

impl From<Vec<Record>> for Snapshot {
    fn from(value: Vec<Record>) -> Self {
        Snapshot(value)
    }
}

impl FromIterator<Record> for Snapshot {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Snapshot(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
