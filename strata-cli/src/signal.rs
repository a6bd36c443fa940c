//! Maps process signals to pipeline cancellation.

use tokio::sync::broadcast;
use tracing::info;

/// Receiver that fires once when the process is asked to stop.
///
/// Watches SIGINT and, on unix, SIGTERM. An in-flight deployment racing this
/// receiver aborts with a cancellation error instead of leaving the poll
/// loop running.
pub fn shutdown_signal() -> broadcast::Receiver<()> {
    let (tx, rx) = broadcast::channel(1);

    tokio::spawn(async move {
        let interrupt = async {
            tokio::signal::ctrl_c().await.expect("ctrl-c handler installation failed");
        };

        #[cfg(unix)]
        let terminate = async {
            let mut signal =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("SIGTERM handler installation failed");
            signal.recv().await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = interrupt => info!("Interrupt received, cancelling the run"),
            _ = terminate => info!("Termination requested, cancelling the run"),
        }

        let _ = tx.send(());
    });

    rx
}
