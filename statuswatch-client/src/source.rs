use std::time::Duration;

use async_trait::async_trait;
use statuswatch_shared::Snapshot;
use statuswatch_shared::api::rest::{self, TransportError};

use crate::config::{ClientConfig, normalize_server_url};

/// Where snapshots come from. The monitor only ever calls `fetch`.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Snapshot, TransportError>;
}

/// Fetches `GET <server_url>/data` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: String,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(server_url: &str, timeout: Duration) -> Self {
        Self {
            base: normalize_server_url(server_url),
            timeout,
        }
    }

    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self::new(&cfg.server_url, cfg.request_timeout())
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn fetch(&self) -> Result<Snapshot, TransportError> {
        rest::fetch_records(&self.base, self.timeout).await
    }
}
