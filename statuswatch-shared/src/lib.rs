pub mod api;
pub mod domain;

pub use domain::{Record, RecordId, Snapshot};
