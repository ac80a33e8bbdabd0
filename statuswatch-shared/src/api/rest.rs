//! Minimal REST client helpers for consumers (clients).

use super::endpoints as ep;
use crate::domain::Snapshot;
use once_cell::sync::Lazy;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(60))
        // Upper bound; callers pass a tighter per-request timeout
        .timeout(Duration::from_secs(120))
        .build()
        .expect("failed to build HTTP client")
});

fn mk_client() -> reqwest::Client {
    HTTP_CLIENT.clone()
}

fn map_send_error(e: reqwest::Error, timeout: Duration) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Http(e.to_string())
    }
}

async fn handle_json<T: for<'de> serde::Deserialize<'de>>(
    res: reqwest::Response,
    timeout: Duration,
) -> Result<T, TransportError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }
    // the per-request timeout also covers reading the body
    res.json::<T>().await.map_err(|e| {
        if e.is_timeout() {
            TransportError::Timeout(timeout)
        } else {
            TransportError::Serde(e.to_string())
        }
    })
}

/// Fetch the full record listing from `base`.
pub async fn fetch_records(base: &str, timeout: Duration) -> Result<Snapshot, TransportError> {
    let client = mk_client();
    let url = ep::data(base);
    let res = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| map_send_error(e, timeout))?;
    handle_json(res, timeout).await
}
