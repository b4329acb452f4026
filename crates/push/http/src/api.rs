//! REST API handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, Request, State};
use axum::http::{StatusCode, header};
use axum::{Extension, Form, Json};
use push_core::{AttemptId, Credential, DispatchAttempt, FailureRecord, Payload, Recipient};
use push_dispatch::{JobQueue, PushService};
use push_storage::AllStorage;
use serde::{Deserialize, Serialize};

use crate::ApiError;

type Service<S, Q> = State<Arc<PushService<S, Q>>>;

/// Send or queue request.
#[derive(Debug, Deserialize)]
pub struct PushRequest {
    pub to: Vec<Recipient>,
    pub payload: Payload,
}

/// Form-encoded [`PushRequest`], each field holding a JSON document.
#[derive(Debug, Deserialize)]
pub struct PushForm {
    pub to: String,
    pub payload: String,
}

impl TryFrom<PushForm> for PushRequest {
    type Error = ApiError;

    fn try_from(form: PushForm) -> Result<Self, Self::Error> {
        let invalid = |field: &str, e: serde_json::Error| {
            ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("invalid `{field}` field: {e}"),
            )
        };

        Ok(Self {
            to: serde_json::from_str(&form.to).map_err(|e| invalid("to", e))?,
            payload: serde_json::from_str(&form.payload).map_err(|e| invalid("payload", e))?,
        })
    }
}

/// Body of a send or queue request, as JSON or as a urlencoded [`PushForm`].
#[derive(Debug)]
pub struct PushBody(pub PushRequest);

impl<S: Send + Sync> FromRequest<S> for PushBody {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(form) = Form::<PushForm>::from_request(req, state).await?;
            return Ok(Self(form.try_into()?));
        }

        let Json(request) = Json::<PushRequest>::from_request(req, state).await?;
        Ok(Self(request))
    }
}

/// Device registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub platform: String,
    pub identity: String,
    /// Provider registration token.
    #[serde(alias = "token")]
    pub regid: String,
}

/// Device registration response.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub device_uuid: Recipient,
}

/// A dispatch attempt as reported to callers.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushStatusResponse {
    pub push_uuid: AttemptId,
    pub status: String,
    pub recipients: Vec<Recipient>,
    pub failures: Vec<FailureRecord>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<DispatchAttempt> for PushStatusResponse {
    fn from(attempt: DispatchAttempt) -> Self {
        Self {
            push_uuid: attempt.id,
            status: attempt.status.as_str().to_string(),
            recipients: attempt.recipients,
            failures: attempt.failures.records(),
            created_at: attempt.created_at,
            updated_at: attempt.updated_at,
        }
    }
}

/// Latest attempts response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushListResponse {
    pub data: Vec<PushStatusResponse>,
}

/// List the caller's latest attempts.
pub async fn list_handler<S, Q>(
    State(service): Service<S, Q>,
    Extension(credential): Extension<Credential>,
) -> Result<Json<PushListResponse>, ApiError>
where
    S: AllStorage + 'static,
    Q: JobQueue + 'static,
{
    let data = service
        .latest(&credential)?
        .into_iter()
        .map(PushStatusResponse::from)
        .collect();

    Ok(Json(PushListResponse { data }))
}

/// Look up one attempt.
pub async fn status_handler<S, Q>(
    State(service): Service<S, Q>,
    Extension(credential): Extension<Credential>,
    Path(uuid): Path<String>,
) -> Result<Json<PushStatusResponse>, ApiError>
where
    S: AllStorage + 'static,
    Q: JobQueue + 'static,
{
    let attempt = service.status(&credential, &AttemptId::new(uuid))?;
    Ok(Json(attempt.into()))
}

/// Register a device for push.
pub async fn register_handler<S, Q>(
    State(service): Service<S, Q>,
    Extension(credential): Extension<Credential>,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError>
where
    S: AllStorage + 'static,
    Q: JobQueue + 'static,
{
    let Json(request) = request?;
    let device = service.register_device(
        &credential,
        &request.platform,
        &request.identity,
        &request.regid,
    )?;

    Ok(Json(RegisterResponse {
        device_uuid: device.uid,
    }))
}

/// Send immediately.
pub async fn send_now_handler<S, Q>(
    State(service): Service<S, Q>,
    Extension(credential): Extension<Credential>,
    PushBody(request): PushBody,
) -> Result<Json<PushStatusResponse>, ApiError>
where
    S: AllStorage + 'static,
    Q: JobQueue + 'static,
{
    let attempt = service
        .send_now(&credential, request.to, request.payload)
        .await?;
    Ok(Json(attempt.into()))
}

/// Queue for background delivery.
pub async fn queue_handler<S, Q>(
    State(service): Service<S, Q>,
    Extension(credential): Extension<Credential>,
    PushBody(request): PushBody,
) -> Result<Json<PushStatusResponse>, ApiError>
where
    S: AllStorage + 'static,
    Q: JobQueue + 'static,
{
    let attempt = service
        .queue(&credential, request.to, request.payload)
        .await?;
    Ok(Json(attempt.into()))
}
