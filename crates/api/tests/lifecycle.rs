//! Lifecycle tests against a real listener.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use health_api::config::Settings;
use health_api::lifecycle::{
    AppLifecycle, Lifecycle, LifecycleHooks, LifecycleState, ServeError, StartupError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};

#[derive(Default)]
struct CountingHooks {
    starts: AtomicUsize,
    stops: AtomicUsize,
}

#[async_trait]
impl LifecycleHooks for CountingHooks {
    async fn on_start(&self) -> Result<(), StartupError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FailingHooks {
    stops: AtomicUsize,
}

#[async_trait]
impl LifecycleHooks for FailingHooks {
    async fn on_start(&self) -> Result<(), StartupError> {
        Err(StartupError::Hook("pool unavailable".to_string()))
    }

    async fn on_stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct PanickingHooks {
    stops: AtomicUsize,
}

#[async_trait]
impl LifecycleHooks for PanickingHooks {
    async fn on_start(&self) -> Result<(), StartupError> {
        panic!("resource setup exploded");
    }

    async fn on_stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

async fn bind() -> TcpListener {
    TcpListener::bind("127.0.0.1:0").await.unwrap()
}

async fn wait_for(rx: &mut watch::Receiver<LifecycleState>, state: LifecycleState) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == state))
        .await
        .expect("timed out waiting for lifecycle state")
        .unwrap();
}

/// Sends a bare HTTP/1.1 request and returns the raw response text.
async fn raw_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_clean_run_walks_all_states() {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap();
    let app = health_api::create_app(&Settings::default());
    let hooks = Arc::new(CountingHooks::default());
    let lifecycle = Arc::new(Lifecycle::new());
    let mut states = lifecycle.subscribe();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    assert_eq!(lifecycle.state(), LifecycleState::Created);

    let server = {
        let hooks = hooks.clone();
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            lifecycle
                .serve(listener, app, hooks.as_ref(), async {
                    let _ = stop_rx.await;
                })
                .await
        })
    };

    wait_for(&mut states, LifecycleState::Running).await;
    assert_eq!(hooks.starts.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.stops.load(Ordering::SeqCst), 0);

    let response = raw_get(addr, "/health").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("\"status\":\"ok\""), "{response}");

    stop_tx.send(()).unwrap();
    let result = server.await.unwrap();

    assert!(result.is_ok());
    assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    assert_eq!(hooks.starts.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_path_does_not_stop_server() {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap();
    let app = health_api::create_app(&Settings::default());
    let lifecycle = Arc::new(Lifecycle::new());
    let mut states = lifecycle.subscribe();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            let hooks = AppLifecycle::new(&Settings::default());
            lifecycle
                .serve(listener, app, &hooks, async {
                    let _ = stop_rx.await;
                })
                .await
        })
    };

    wait_for(&mut states, LifecycleState::Running).await;

    let response = raw_get(addr, "/nonexistent").await;
    assert!(response.starts_with("HTTP/1.1 404"), "{response}");

    let response = raw_get(addr, "/health").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert_eq!(lifecycle.state(), LifecycleState::Running);

    stop_tx.send(()).unwrap();
    assert!(server.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_failed_startup_still_runs_shutdown_hook() {
    let listener = bind().await;
    let app = health_api::create_app(&Settings::default());
    let hooks = FailingHooks::default();
    let lifecycle = Lifecycle::new();

    let result = lifecycle
        .serve(listener, app, &hooks, std::future::pending())
        .await;

    match result {
        Err(ServeError::Startup(StartupError::Hook(message))) => {
            assert_eq!(message, "pool unavailable");
        }
        other => panic!("expected startup error, got {other:?}"),
    }
    assert_eq!(hooks.stops.load(Ordering::SeqCst), 1);
    assert_eq!(lifecycle.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_panicking_startup_still_runs_shutdown_hook() {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap();
    let app = health_api::create_app(&Settings::default());
    let hooks = PanickingHooks::default();
    let lifecycle = Lifecycle::new();

    let result = lifecycle
        .serve(listener, app, &hooks, std::future::pending())
        .await;

    match result {
        Err(ServeError::Startup(StartupError::Panicked(message))) => {
            assert_eq!(message, "resource setup exploded");
        }
        other => panic!("expected startup panic, got {other:?}"),
    }
    assert_eq!(hooks.stops.load(Ordering::SeqCst), 1);
    assert_eq!(lifecycle.state(), LifecycleState::Stopped);

    // The listener was dropped without serving.
    assert!(TcpStream::connect(addr).await.is_err());
}
