//! Health API server entry point.

use std::process::ExitCode;

use health_api::config::get_settings;
use health_api::lifecycle::{AppLifecycle, Lifecycle};
use health_api::logging::Logging;
use tokio::signal;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Load settings; a malformed environment is fatal
    let settings = match get_settings() {
        Ok(settings) => settings,
        Err(err) => {
            match Logging::default().init() {
                Ok(_) => tracing::error!(error = %err, "invalid configuration"),
                Err(log_err) => {
                    eprintln!("failed to configure logging: {log_err}");
                    eprintln!("invalid configuration: {err}");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // 2. Initialize logging
    let logging = Logging::new(settings);
    if let Err(err) = logging.init() {
        eprintln!("failed to configure logging: {err}");
        return ExitCode::FAILURE;
    }

    // 3. Build the application
    let app = health_api::create_app(settings);

    // 4. Bind the listener
    let addr = settings.addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind address");
            return ExitCode::FAILURE;
        }
    };

    // 5. Serve until a shutdown signal arrives
    let hooks = AppLifecycle::new(settings);
    let lifecycle = Lifecycle::new();
    match lifecycle
        .serve(listener, app, &hooks, shutdown_signal())
        .await
    {
        Ok(()) => {
            tracing::info!("server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "server exited with an error");
            ExitCode::FAILURE
        }
    }
}
