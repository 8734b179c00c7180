// ABOUTME: Graceful shutdown for the record store.
// ABOUTME: Final best-effort checkpoint, engine close, and handle invalidation, idempotently.

use crate::bootstrap::ConnectionState;
use crate::store::checkpoint;

/// Shut the store down: one final best-effort checkpoint, then close the
/// engine and clear the handle. Idempotent; calling on an already-closed
/// state is a no-op. Afterwards every record store operation fails with
/// `StoreError::NotInitialized`, exactly as before bootstrap.
pub async fn shutdown(state: &ConnectionState) {
    let mut guard = state.engine.lock().await;
    let Some(conn) = guard.take() else {
        tracing::debug!("shutdown called on an already-closed store");
        return;
    };

    if let Err(e) = checkpoint(&conn) {
        tracing::warn!("final checkpoint failed, continuing shutdown: {}", e);
    }

    if let Err((_, e)) = conn.close() {
        tracing::warn!("engine connection close failed: {}", e);
    }

    tracing::info!("record store shut down");
}
