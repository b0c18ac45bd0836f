use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::catalog::ingest::IngestError;
use crate::catalog::query::QueryError;
use crate::catalog::summary::SummaryError;
use crate::records::RecordsError;

/// Error body `{"detail": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Logs `err` and hides it behind a generic 500.
    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.detail });
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        tracing::error!(error = %err, "scrape run failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Scraping failed: {err}"),
        )
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<SummaryError> for ApiError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "Book not found"),
            SummaryError::Generation(_) => {
                tracing::error!(error = %err, "summary generation failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            SummaryError::Store(err) => Self::internal(err),
        }
    }
}

impl From<RecordsError> for ApiError {
    fn from(err: RecordsError) -> Self {
        let status = match err {
            RecordsError::Storage(cause) => return Self::internal(cause),
            RecordsError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RecordsError::DuplicateDepartment
            | RecordsError::DuplicateEmail
            | RecordsError::UnknownDepartment(_) => StatusCode::BAD_REQUEST,
            RecordsError::StudentNotFound | RecordsError::EnrollmentTargetNotFound => {
                StatusCode::NOT_FOUND
            }
        };
        Self::new(status, err.to_string())
    }
}
