//! HTTP surface: shared handler state, the error-to-response mapping, and the
//! bearer-token extractor.

mod error;
mod extract;

use std::sync::Arc;

use axum::Router;
use tracing::error;

use crate::auth::{auth_routes, AuthService, TokenIssuer};
use crate::leads::{lead_routes, LeadLifecycle};
use crate::staff::{staff_routes, PasswordHasher, StaffDirectory};
use crate::store::Store;

pub use error::{ApiError, NOT_AUTHENTICATED, PERMISSION_DENIED};

/// Services shared by every handler.
pub struct ApiState<R> {
    pub leads: Arc<LeadLifecycle<R>>,
    pub staff: Arc<StaffDirectory<R>>,
    pub auth: Arc<AuthService<R>>,
}

impl<R> Clone for ApiState<R> {
    fn clone(&self) -> Self {
        Self {
            leads: Arc::clone(&self.leads),
            staff: Arc::clone(&self.staff),
            auth: Arc::clone(&self.auth),
        }
    }
}

impl<R> ApiState<R>
where
    R: Store,
{
    pub fn new(repository: Arc<R>, hasher: PasswordHasher, issuer: TokenIssuer) -> Self {
        let staff = Arc::new(StaffDirectory::new(repository.clone(), hasher));
        Self {
            leads: Arc::new(LeadLifecycle::new(repository.clone())),
            auth: Arc::new(AuthService::new(repository, staff.clone(), issuer)),
            staff,
        }
    }
}

/// Runs a CPU-bound service call, such as password hashing, on the blocking
/// pool.
pub(crate) async fn run_blocking<T, E, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|join| {
            error!(error = %join, "blocking task failed");
            ApiError::Internal
        })?
        .map_err(Into::into)
}

/// Lead, staff, and auth endpoints bound to one store.
pub fn api_router<R>(state: ApiState<R>) -> Router
where
    R: Store,
{
    Router::new()
        .merge(lead_routes::<R>())
        .merge(staff_routes::<R>())
        .merge(auth_routes::<R>())
        .with_state(state)
}
