//! Push HTTP Layer
//!
//! Axum handlers for the push API under `/api/v1/push`.

mod api;
mod error;
mod middleware;

pub use api::*;
pub use error::*;
pub use middleware::*;

use std::sync::Arc;

use axum::Router;
use push_dispatch::{JobQueue, PushService};
use push_storage::AllStorage;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Create the push API router.
///
/// Every route requires a valid API key.
pub fn push_router<S, Q>(service: Arc<PushService<S, Q>>) -> Router
where
    S: AllStorage + 'static,
    Q: JobQueue + 'static,
{
    use axum::routing::{get, post};

    Router::new()
        .route("/api/v1/push", get(api::list_handler::<S, Q>))
        .route("/api/v1/push/register", post(api::register_handler::<S, Q>))
        .route("/api/v1/push/now", post(api::send_now_handler::<S, Q>))
        .route("/api/v1/push/queue", post(api::queue_handler::<S, Q>))
        .route("/api/v1/push/{uuid}", get(api::status_handler::<S, Q>))
        .route_layer(axum::middleware::from_fn_with_state(
            service.clone(),
            middleware::require_api_key::<S, Q>,
        ))
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .with_state(service)
}
