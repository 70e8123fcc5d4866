use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stock_watcher::{Watcher, WatcherConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = WatcherConfig::from_env();
    let watcher = Watcher::new(config);

    tokio::select! {
        result = watcher.run() => {
            // run() only returns on a fatal error. Fail loud: a supervisor
            // restarting a misconfigured watcher beats silent polling.
            if let Err(e) = result {
                error!("fatal error: {}", e);
                std::process::exit(1);
            }
        }
        _ = shutdown_signal() => {
            info!("termination signal received, exiting");
        }
    }
}

/// Resolves on SIGINT, SIGTERM, SIGUSR1 or SIGUSR2. No per-signal behavior,
/// no cycle-aware drain: any of them means exit now.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut usr1 = signal(SignalKind::user_defined1()).expect("failed to install SIGUSR1 handler");
    let mut usr2 = signal(SignalKind::user_defined2()).expect("failed to install SIGUSR2 handler");

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = usr1.recv() => {}
        _ = usr2.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
