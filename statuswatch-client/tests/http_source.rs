use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use statuswatch_client::app::monitor;
use statuswatch_client::{CycleOutcome, HttpSource, MonitorSettings, SnapshotSource, Timings};
use statuswatch_shared::api::rest::TransportError;
use statuswatch_shared::api::DATA_PATH;
use statuswatch_shared::RecordId;
use tokio_util::sync::CancellationToken;

struct Canned {
    responses: Mutex<VecDeque<(StatusCode, String)>>,
    delay: Duration,
    hits: AtomicUsize,
}

async fn canned_data(State(canned): State<Arc<Canned>>) -> (StatusCode, String) {
    canned.hits.fetch_add(1, Ordering::SeqCst);
    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }
    canned
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((StatusCode::OK, "[]".to_string()))
}

async fn start(app: Router) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), std::io::Error> {
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Ok((addr, handle))
}

struct TestServer {
    base: String,
    canned: Arc<Canned>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(responses: Vec<(StatusCode, &str)>, delay: Duration) -> Option<Self> {
        let canned = Arc::new(Canned {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|(s, b)| (s, b.to_string()))
                    .collect(),
            ),
            delay,
            hits: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route(DATA_PATH, get(canned_data))
            .with_state(canned.clone());
        let (addr, handle) = match start(app).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                eprintln!("Skipping test due to sandbox restrictions: {e}");
                return None;
            }
            Err(e) => panic!("failed to start server: {e}"),
        };
        Some(Self {
            base: format!("http://{}", addr),
            canned,
            handle,
        })
    }

    fn source(&self, timeout: Duration) -> HttpSource {
        HttpSource::new(&self.base, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn fetch_parses_listing() {
    let body = r#"[
        {"id": 1, "name": "Node_1", "status": "OK"},
        {"id": "edge-2", "name": "Edge", "status": "NOT OK", "zone": "eu"}
    ]"#;
    let Some(server) = TestServer::spawn(vec![(StatusCode::OK, body)], Duration::ZERO).await
    else {
        return;
    };

    let snapshot = server.source(TIMEOUT).fetch().await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.records()[0].id, RecordId::from(1));
    assert_eq!(snapshot.records()[1].id, RecordId::from("edge-2"));
    assert_eq!(snapshot.records()[1].extra["zone"], "eu");
    assert_eq!(server.canned.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_success_status_is_transport_error() {
    let Some(server) =
        TestServer::spawn(vec![(StatusCode::SERVICE_UNAVAILABLE, "down")], Duration::ZERO).await
    else {
        return;
    };

    let err = server.source(TIMEOUT).fetch().await.unwrap_err();
    assert_eq!(
        err,
        TransportError::Status {
            status: 503,
            body: "down".into()
        }
    );
}

#[tokio::test]
async fn undecodable_body_is_serde_error() {
    let Some(server) =
        TestServer::spawn(vec![(StatusCode::OK, r#"{"id": 1}"#)], Duration::ZERO).await
    else {
        return;
    };

    let err = server.source(TIMEOUT).fetch().await.unwrap_err();
    assert!(matches!(err, TransportError::Serde(_)), "{err:?}");
}

#[tokio::test]
async fn slow_source_times_out() {
    let Some(server) =
        TestServer::spawn(vec![(StatusCode::OK, "[]")], Duration::from_secs(3)).await
    else {
        return;
    };

    let timeout = Duration::from_millis(200);
    let err = server.source(timeout).fetch().await.unwrap_err();
    assert_eq!(err, TransportError::Timeout(timeout));
}

#[tokio::test]
async fn stalled_body_times_out() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = match tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await {
        Ok(l) => l,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => return,
        Err(e) => panic!("bind failed: {e}"),
    };
    let addr = listener.local_addr().unwrap();
    // headers arrive at once, the body never completes
    let server = tokio::spawn(async move {
        let (mut conn, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = conn.read(&mut buf).await;
        conn.write_all(
            b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n[",
        )
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let timeout = Duration::from_millis(300);
    let source = HttpSource::new(&format!("http://{addr}"), timeout);
    let err = source.fetch().await.unwrap_err();
    assert_eq!(err, TransportError::Timeout(timeout));
    server.abort();
}

#[tokio::test]
async fn unreachable_source_is_http_error() {
    let listener = match tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await {
        Ok(l) => l,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => return,
        Err(e) => panic!("bind failed: {e}"),
    };
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = HttpSource::new(&format!("http://{addr}"), TIMEOUT);
    let err = source.fetch().await.unwrap_err();
    assert!(matches!(err, TransportError::Http(_)), "{err:?}");
}

#[tokio::test]
async fn monitor_against_demo_server() {
    use statuswatch_server::server;

    let state = server::AppState::new(server::AppConfig {
        seed: Some(99),
        ..Default::default()
    });
    let (addr, handle) = match start(server::router(state)).await {
        Ok(v) => v,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => return,
        Err(e) => panic!("failed to start server: {e}"),
    };

    let settings = MonitorSettings {
        poll_interval: Duration::from_secs(600),
        stall_after: TIMEOUT,
        timings: Timings::default(),
    };
    let source = HttpSource::new(&format!("http://{addr}"), TIMEOUT);
    let monitor = monitor::spawn(Arc::new(source), settings, CancellationToken::new());
    let mut rx = monitor.subscribe();

    let first = tokio::time::timeout(TIMEOUT, rx.wait_for(|v| !v.is_loading))
        .await
        .expect("first poll in time")
        .unwrap()
        .clone();
    assert!(!first.is_error);
    assert!((10..=20).contains(&first.records.len()));
    // everything is new on the first poll
    assert_eq!(first.highlighted.len(), first.records.len());

    // second request regenerates the listing, third repeats it
    let second = monitor.manual_refresh().await.unwrap();
    assert_eq!(second.cycle(), 2);
    let third = monitor.manual_refresh().await.unwrap();
    assert_eq!(
        third,
        CycleOutcome::Applied {
            cycle: 3,
            changed: 0
        }
    );

    monitor.shutdown().await;
    handle.abort();
}
