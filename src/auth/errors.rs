use std::fmt::Display;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::users::StoreError;

/// Business errors for account and auth workflows.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} already exists")]
    DuplicateEmail(String),
    /// Same error for an unknown email and for a wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("something went wrong")]
    Internal,
}

impl AuthError {
    /// Logs `cause` and returns the detail-free `Internal` variant.
    pub fn internal(context: &str, cause: impl Display) -> Self {
        error!(error = %cause, "{context}");
        AuthError::Internal
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::DuplicateEmail(_) | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey(email) => AuthError::DuplicateEmail(email),
            StoreError::Backend(e) => AuthError::internal("user store failed", e),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
