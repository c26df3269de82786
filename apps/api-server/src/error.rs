//! Error responses.
//!
//! `AppError` is the generic handler for HTML and plain-text routes: it answers
//! with the status and a plain message. `ApiError` renders domain errors and
//! unreadable request bodies as JSON error bodies for the `/api` routes.
//! Server-side failures are logged and answered with a generic message.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::CoreError;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, warn};

fn status_of(err: &CoreError) -> StatusCode {
    StatusCode::from_u16(http_common::status_for(err)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("ACCESS DENIED")]
    AccessDenied,

    #[error("Page Not Found")]
    PageNotFound,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("failed to render page: {0}")]
    Render(#[from] askama::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AccessDenied => StatusCode::UNAUTHORIZED,
            AppError::PageNotFound => StatusCode::NOT_FOUND,
            AppError::Core(e) => status_of(e),
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(err = %self, "request failed");
            return (status, "Some Error Occurred").into_response();
        }
        (status, self.to_string()).into_response()
    }
}

/// Error rendered as `{"error": {"code", "message"}}` on the `/api` routes.
#[derive(Debug)]
pub enum ApiError {
    /// Request body that could not be read as the expected JSON shape.
    BadRequest(String),
    Core(CoreError),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self::Core(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                warn!(%message, "rejected api request body");
                (
                    StatusCode::BAD_REQUEST,
                    Json(http_common::json_error_with_message("bad_request", &message)),
                )
                    .into_response()
            }
            ApiError::Core(err) => {
                let (code, body) = http_common::core_error_response(&err);
                let status =
                    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if !err.is_client_error() {
                    error!(err = ?err, "api request failed");
                }
                (status, Json(body)).into_response()
            }
        }
    }
}

/// `Json` extractor whose rejections are answered as [`ApiError`] bodies.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
