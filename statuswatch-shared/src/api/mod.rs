use serde::{Deserialize, Serialize};

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

/// Path of the record listing served by the source.
pub const DATA_PATH: &str = "/data";
/// Liveness probe of the demo source.
pub const HEALTH_PATH: &str = "/healthz";

// Health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub version: String,
}
