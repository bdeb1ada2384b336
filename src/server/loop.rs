// Server loop module
// Accepts connections until a shutdown signal arrives

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::{accept_connection, ServerState};
use crate::logger;

/// Longest time to wait for in-flight connections after shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Accept connections on `listener` until `shutdown` resolves
///
/// After shutdown the listener is closed and open connections get up to
/// five seconds to finish.
pub async fn run<S>(
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown: S,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            () = &mut shutdown => break,
        }
    }

    drop(listener);
    logger::log_shutdown(state.active_connections());

    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while state.active_connections() > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    })
    .await;
    if drained.is_err() {
        logger::log_warning(&format!(
            "Shutdown with {} connections still open",
            state.active_connections()
        ));
    }

    Ok(())
}
