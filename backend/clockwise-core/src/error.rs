// src/error.rs
use axum::http::StatusCode as AxumStatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::reporting::{ExportError, IntegrityError};
use crate::supabase_client::SupabaseError;
use crate::timesheets::{TransitionError, WorkflowError};
use crate::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Conflict(#[from] TransitionError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Supabase(#[from] SupabaseError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken => {
                AppError::Unauthorized(err.to_string())
            }
            AuthError::Store(e) => AppError::Supabase(e),
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(e) => AppError::Validation(e),
            WorkflowError::Transition(e) => AppError::Conflict(e),
            WorkflowError::NotFound(_) => AppError::NotFound(err.to_string()),
            WorkflowError::Forbidden(msg) => AppError::Forbidden(msg),
            WorkflowError::Store(e) => AppError::Supabase(e),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> AxumStatusCode {
        match self {
            AppError::Unauthorized(_) => AxumStatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => AxumStatusCode::FORBIDDEN,
            AppError::BadRequest(_) => AxumStatusCode::BAD_REQUEST,
            AppError::NotFound(_) => AxumStatusCode::NOT_FOUND,
            AppError::Validation(_) => AxumStatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => AxumStatusCode::CONFLICT,
            AppError::Integrity(_) | AppError::Export(_) | AppError::Supabase(_) => {
                AxumStatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Server errors pass the underlying message through; callers of the admin
// endpoints rely on it.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            error!("Error occurred: {:?}", self);
        } else {
            warn!("Request rejected ({}): {}", status_code, self);
        }

        let body = match &self {
            AppError::Validation(errors) => serde_json::json!({
                "error": "Validation failed",
                "fields": errors.0,
            }),
            other => serde_json::json!({ "error": other.to_string() }),
        };
        (status_code, Json(body)).into_response()
    }
}
