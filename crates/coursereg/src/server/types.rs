use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::catalog::CatalogError;
use crate::conflict::{ConflictingSlot, ValidationErrors};
use crate::db::DbError;
use crate::server::util::FormError;

/// An error attached to one input field (or `__all__` for form-level errors).
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictingSlot>,
}

impl FieldError {
    fn new(field: &str, kind: &str, message: String) -> Self {
        Self {
            field: field.to_string(),
            kind: kind.to_string(),
            message,
            conflict: None,
        }
    }
}

/// Error body returned by every endpoint.
#[derive(Debug)]
pub struct ApiErrorType {
    pub status: StatusCode,
    pub error: String,
    pub context: Option<String>,
    pub errors: Vec<FieldError>,
}

impl ApiErrorType {
    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }
}

impl From<(StatusCode, &str, Option<String>)> for ApiErrorType {
    fn from((status, error, context): (StatusCode, &str, Option<String>)) -> Self {
        Self {
            status,
            error: error.to_string(),
            context,
            errors: Vec::new(),
        }
    }
}

impl From<ValidationErrors> for ApiErrorType {
    fn from(errors: ValidationErrors) -> Self {
        let records = errors
            .records()
            .into_iter()
            .map(|record| FieldError {
                field: record.field.as_str().to_string(),
                kind: record.kind.as_str().to_string(),
                message: record.message,
                conflict: record.conflict,
            })
            .collect();

        ApiErrorType::from((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Class time rejected",
            Some(errors.to_string()),
        ))
        .with_errors(records)
    }
}

impl From<CatalogError> for ApiErrorType {
    fn from(err: CatalogError) -> Self {
        let status = if err.is_conflict() {
            StatusCode::CONFLICT
        } else {
            StatusCode::BAD_REQUEST
        };
        let field_error = FieldError::new(err.field(), "catalog", err.to_string());
        ApiErrorType::from((status, "Invalid catalog record", Some(err.to_string())))
            .with_errors(vec![field_error])
    }
}

impl From<FormError> for ApiErrorType {
    fn from(err: FormError) -> Self {
        let field_error = FieldError::new(err.field(), "form", err.to_string());
        ApiErrorType::from((StatusCode::BAD_REQUEST, "Invalid form input", Some(err.to_string())))
            .with_errors(vec![field_error])
    }
}

impl From<JsonRejection> for ApiErrorType {
    fn from(rejection: JsonRejection) -> Self {
        let status = match &rejection {
            JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        let message = rejection.body_text();
        ApiErrorType::from((status, "Invalid request body", Some(message.clone())))
            .with_errors(vec![FieldError::new("__all__", "form", message)])
    }
}

impl From<DbError> for ApiErrorType {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation(errors) => errors.into(),
            DbError::Catalog(e) => e.into(),
            DbError::Enrollment(e) => ApiErrorType::from((
                StatusCode::CONFLICT,
                "Enrollment refused",
                Some(e.to_string()),
            )),
            DbError::NotFound { .. } => ApiErrorType::from((
                StatusCode::NOT_FOUND,
                "Record not found",
                Some(err.to_string()),
            )),
            DbError::Sqlite(_) | DbError::LockPoisoned => {
                error!("Storage failure: {}", err);
                ApiErrorType::from((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage failure",
                    Some(err.to_string()),
                ))
            }
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "context": self.context,
        });
        if !self.errors.is_empty() {
            body["errors"] = json!(self.errors);
        }
        (self.status, Json(body)).into_response()
    }
}
