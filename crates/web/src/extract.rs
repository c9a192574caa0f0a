use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use stamper_core::{AppError, models::HookPayload};

pub const PROJECT_HEADER: &str = "REDMINE_PROJECT";
pub const EVENT_TYPE_HEADER: &str = "Bitrise-Event-Type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitriseEventType {
    Triggered,
    Finished,
    Other(String),
}

impl BitriseEventType {
    fn parse(value: &str) -> Self {
        match value {
            "build/triggered" => Self::Triggered,
            "build/finished" => Self::Finished,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Validated Bitrise hook request: target project, event type, and the
/// decoded payload. Missing project header or an undecodable body
/// rejects the request before any handler logic runs.
pub struct HookEvent {
    pub project: String,
    pub event_type: BitriseEventType,
    pub payload: HookPayload,
}

impl<S> FromRequest<S> for HookEvent
where S: Send + Sync
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        fn err(message: &str) -> Response {
            AppError::BadRequest(message.to_string()).into_response()
        }
        let project = req
            .headers()
            .get(PROJECT_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| err("REDMINE_PROJECT header is absent in the hook header"))?
            .to_string();
        let event_type = req
            .headers()
            .get(EVENT_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(BitriseEventType::parse)
            .unwrap_or_else(|| BitriseEventType::Other(String::new()));
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| err("Received wrong request data payload"))?;
        let payload = serde_json::from_slice(&body)
            .map_err(|_| err("Can't decode request payload json data"))?;
        Ok(Self { project, event_type, payload })
    }
}
