//! Graceful shutdown handling.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels `cancel` on the first Ctrl-C.
///
/// In-flight provider calls finish; no new work starts. The watcher exits
/// on its own once `cancel` fires for any other reason.
pub fn cancel_on_ctrl_c(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    log::warn!("Failed to listen for Ctrl-C: {}", e);
                    return;
                }
                log::warn!("Interrupted; finishing in-flight lookups and reporting partial results");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}
