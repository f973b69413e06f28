//! Startup/shutdown hooks and the serving loop they wrap.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use async_trait::async_trait;
use axum::Router;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::Settings;

/// Where the server is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

/// Errors raised by a startup hook.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("startup hook failed: {0}")]
    Hook(String),

    #[error("startup hook panicked: {0}")]
    Panicked(String),
}

/// Errors that end [`Lifecycle::serve`].
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Callbacks run around the serving loop.
///
/// `on_stop` runs whenever `on_start` was entered, including when it failed.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    async fn on_start(&self) -> Result<(), StartupError>;
    async fn on_stop(&self);
}

/// Default hooks for the service. There are no shared resources to acquire
/// yet, so both hooks only log.
#[derive(Debug, Clone)]
pub struct AppLifecycle {
    app_name: String,
}

impl AppLifecycle {
    pub fn new(settings: &Settings) -> Self {
        Self {
            app_name: settings.app_name.clone(),
        }
    }
}

#[async_trait]
impl LifecycleHooks for AppLifecycle {
    async fn on_start(&self) -> Result<(), StartupError> {
        let started = Instant::now();
        tracing::info!("Starting {}", self.app_name);

        let elapsed = started.elapsed().as_secs_f64();
        tracing::info!(
            elapsed_secs = elapsed,
            "{} started successfully in {:.2} seconds",
            self.app_name,
            elapsed
        );
        Ok(())
    }

    async fn on_stop(&self) {
        tracing::info!("Shutting down {}", self.app_name);
    }
}

/// Drives the server through its lifecycle states.
#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Created);
        Self { state }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Returns a receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Runs the startup hook, serves `app` until `shutdown` resolves, then
    /// runs the shutdown hook.
    ///
    /// If the startup hook fails or panics the server never accepts a
    /// connection: the shutdown hook runs, the state becomes `Stopped` and
    /// the startup error is returned.
    pub async fn serve<H, F>(
        &self,
        listener: TcpListener,
        app: Router,
        hooks: &H,
        shutdown: F,
    ) -> Result<(), ServeError>
    where
        H: LifecycleHooks + ?Sized,
        F: Future<Output = ()> + Send + 'static,
    {
        self.transition(LifecycleState::Starting);

        let started = match AssertUnwindSafe(hooks.on_start()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(StartupError::Panicked(panic_message(panic.as_ref()))),
        };

        if let Err(err) = started {
            tracing::error!("Error during application startup: {err}");
            hooks.on_stop().await;
            self.transition(LifecycleState::Stopped);
            return Err(err.into());
        }

        self.transition(LifecycleState::Running);
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "accepting connections");
        }

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        self.transition(LifecycleState::ShuttingDown);
        hooks.on_stop().await;
        self.transition(LifecycleState::Stopped);

        result.map_err(ServeError::Io)
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = ?previous, to = ?next, "lifecycle transition");
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lifecycle_is_created() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Created);
    }

    #[test]
    fn test_transition_is_observed() {
        let lifecycle = Lifecycle::new();
        let rx = lifecycle.subscribe();
        lifecycle.transition(LifecycleState::Starting);
        assert_eq!(*rx.borrow(), LifecycleState::Starting);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(boxed.as_ref()), "owned boom");

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn test_default_hooks_succeed() {
        let hooks = AppLifecycle::new(&Settings::default());
        assert!(hooks.on_start().await.is_ok());
        hooks.on_stop().await;
    }
}
