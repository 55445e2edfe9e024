//! Background model discovery
//!
//! Periodically fetches model listings from every provider that exposes
//! one and republishes the registry epoch with the results merged in.
//! Providers without a listing endpoint simply contribute nothing.

use std::collections::HashMap;
use std::time::Duration;

use crate::state::GatewayState;

/// Refresh interval for model discovery
const REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Start the background discovery task
pub fn start_discovery(state: GatewayState) {
    tokio::spawn(async move {
        // Initial fetch immediately, then on a fixed cadence
        refresh_all(&state).await;

        let mut interval = tokio::time::interval(REFRESH_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            refresh_all(&state).await;
        }
    });
}

/// Fetch listings from every provider and publish a new epoch
async fn refresh_all(state: &GatewayState) {
    let mut discovered: HashMap<String, Vec<String>> = HashMap::new();

    for (name, adapter) in state.providers() {
        match adapter.list_models().await {
            Ok(models) => {
                tracing::debug!(provider = %name, count = models.len(), "discovered models");
                discovered.insert(name.clone(), models);
            }
            Err(e) => {
                tracing::warn!(provider = %name, error = %e, "model discovery failed");
            }
        }
    }

    if !discovered.is_empty() {
        state.rebuild_registry(&discovered);
    }
}
