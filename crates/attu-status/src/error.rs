//! Error type for the status API.
//!
//! [`StatusError`] converts into an Axum response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use attu_core::calendar::CalendarError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the status API layer.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// A calendar computation failed.
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

impl StatusError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Calendar(CalendarError::InvalidYear { .. }) => StatusCode::BAD_REQUEST,
            Self::Calendar(CalendarError::MissingAnchor { .. }) => StatusCode::NOT_FOUND,
            Self::Calendar(CalendarError::RolloverSuspended) => StatusCode::CONFLICT,
            Self::Calendar(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
