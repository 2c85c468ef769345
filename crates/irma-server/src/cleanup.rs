use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use irma_api::auth::AppState;

/// Background task that deletes expired sessions on an interval.
pub async fn run_session_sweep(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let state = Arc::clone(&state);
        match tokio::task::spawn_blocking(move || state.db.purge_expired_sessions()).await {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Session sweep: removed {} expired sessions", count);
                }
            }
            Ok(Err(e)) => warn!("Session sweep error: {}", e),
            Err(e) => warn!("Session sweep task failed: {}", e),
        }
    }
}
