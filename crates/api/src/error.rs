use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalogapi_catalog::CatalogError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Catalog not found")]
    NotFound,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            // Not-found carries no body.
            ApiError::NotFound => return StatusCode::NOT_FOUND.into_response(),
            ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            ApiError::Catalog(err) if err.is_connectivity() => {
                tracing::error!("Database unavailable: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ServiceUnavailable",
                    "Database unavailable".to_string(),
                )
            }
            ApiError::Catalog(err) => {
                tracing::error!("Internal error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "Code": error_code,
            "Message": message,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
