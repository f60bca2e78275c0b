use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use bomgraph_utils::{BomError, ErrorResponse};

/// Handler error rendered as an [`ErrorResponse`] body.
#[derive(Debug)]
pub struct ApiError(pub BomError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<BomError> for ApiError {
    fn from(error: BomError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            bomgraph_utils::log_error!(self.0, "engine operation failed");
        }
        (status, Json(ErrorResponse::from(self.0))).into_response()
    }
}
