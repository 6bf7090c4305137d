use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the room store is installed and answering pings.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.room_store().await else {
        warn!("storage unavailable (degraded mode)");
        return HealthResponse::degraded();
    };

    match store.health_check().await {
        Ok(()) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded()
        }
    }
}
