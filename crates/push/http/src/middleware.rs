//! HTTP middleware.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use push_dispatch::{JobQueue, PushService};
use push_storage::AllStorage;

use crate::{API_KEY_HEADER, ApiError};

/// Logging middleware.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    tracing::debug!(method = %method, uri = %uri, "incoming request");

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        "request completed"
    );

    response
}

/// Resolve the `X-Api-Key` header to a credential.
///
/// The credential is inserted into the request extensions for handlers;
/// missing or unknown keys get 403.
pub async fn require_api_key<S, Q>(
    State(service): State<Arc<PushService<S, Q>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    S: AllStorage + 'static,
    Q: JobQueue + 'static,
{
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty());

    let Some(api_key) = api_key else {
        return ApiError::new(StatusCode::FORBIDDEN, "missing api key").into_response();
    };

    match service.authenticate(api_key) {
        Ok(Some(credential)) => {
            request.extensions_mut().insert(credential);
            next.run(request).await
        }
        Ok(None) => {
            tracing::warn!(uri = %request.uri(), "rejected unknown api key");
            ApiError::new(StatusCode::FORBIDDEN, "invalid api key").into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
