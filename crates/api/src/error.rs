use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use conveyor_core::error::CoreError;
use conveyor_db::StoreError;

use crate::response::ErrorBody;

/// Error type returned by every HTTP handler.
///
/// Domain failures arrive as [`CoreError`] and persistence failures as
/// [`StoreError`]; both convert with `?`. The [`IntoResponse`] impl turns
/// each into a JSON body of the shape `{"error": ..., "code": ...}` so
/// clients can branch on `code` instead of parsing prose.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            },

            AppError::Store(store) => match store {
                StoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                StoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                StoreError::Database(err) => db_error_response(err),
            },
        };

        let body = ErrorBody {
            error: message,
            code,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Map a low-level sqlx failure without leaking SQL detail to clients.
///
/// `RowNotFound` is the only sqlx variant a caller can act on; everything
/// else is logged server-side and reported as an opaque 500.
fn db_error_response(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    if matches!(err, sqlx::Error::RowNotFound) {
        return (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        );
    }
    tracing::error!(error = %err, "Database error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_errors_map_to_400_with_code() {
        let response =
            AppError::from(CoreError::Validation("job_type must not be empty".into()))
                .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_of(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"], "job_type must not be empty");
    }

    #[tokio::test]
    async fn not_found_includes_entity_and_id() {
        let response = AppError::from(CoreError::NotFound {
            entity: "Job",
            id: 42,
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_of(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["error"], "Job with id 42 not found");
    }

    #[tokio::test]
    async fn store_conflicts_map_to_409() {
        let response =
            AppError::from(StoreError::Conflict("Job 7 is not pending".into())).into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_of(response).await;
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(body["error"], "Job 7 is not pending");
    }

    #[tokio::test]
    async fn database_errors_are_sanitized() {
        let response =
            AppError::from(StoreError::Database(sqlx::Error::PoolClosed)).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"], "An internal error occurred");
    }
}
