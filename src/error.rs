use crate::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Store(StoreError),

    /// Covers both missing records and records the viewer may not see.
    #[error("Resource not found")]
    NotFound,

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Login required")]
    LoginRequired { location: String },

    #[error("Internal Server Error")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// A single-field validation failure.
    pub fn invalid(field: &'static str, code: &'static str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, ValidationError::new(code));
        AppError::Validation(errors)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing => AppError::NotFound,
            StoreError::Conflict(field) => AppError::invalid(field, "unique"),
            other => AppError::Store(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Store(ref e) => {
                tracing::error!(error = ?e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Something went wrong" }),
                )
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Resource not found" })),
            AppError::Validation(ref errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "Invalid input", "fields": errors }),
            ),
            AppError::LoginRequired { ref location } => {
                return Redirect::to(location).into_response();
            }
            AppError::Anyhow(ref e) => {
                tracing::error!(error = ?e, "system failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Something went wrong" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
