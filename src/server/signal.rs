// Signal handling module
// SIGINT (Ctrl+C) and SIGTERM both request a graceful shutdown

use crate::logger;

/// Resolve once a shutdown signal arrives
///
/// A handler that cannot be registered is logged and never fires; the
/// other one keeps working.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                logger::log_error(&format!("Failed to register SIGTERM handler: {e}"));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => logger::log_info("SIGINT received, shutting down"),
        () = terminate => logger::log_info("SIGTERM received, shutting down"),
    }
}
