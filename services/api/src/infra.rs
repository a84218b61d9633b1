use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use lead_desk::api::ApiState;
use lead_desk::config::AppConfig;
use lead_desk::error::AppError;
use lead_desk::store::MemoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

/// State shared by the operational endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the lead services onto a fresh in-memory store and seed the
/// configured administrator.
pub(crate) fn build_api_state(config: &AppConfig) -> Result<ApiState<MemoryStore>, AppError> {
    let state = ApiState::new(
        Arc::new(MemoryStore::new()),
        config.auth.password_hasher(),
        config.auth.token_issuer(),
    );

    match &config.bootstrap {
        Some(admin) => {
            if state.staff.seed_admin(&admin.username, &admin.password)?.is_none() {
                info!(username = %admin.username, "bootstrap admin already present");
            }
        }
        None => info!("no bootstrap admin configured"),
    }

    Ok(state)
}
