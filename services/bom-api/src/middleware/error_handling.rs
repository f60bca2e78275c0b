use axum::{
    http::Request,
    middleware::Next,
    response::Response,
};

/// Logs every server-side failure once, with method and path.
pub async fn error_handling_middleware(
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    if response.status().is_server_error() {
        tracing::error!(%method, %path, status = response.status().as_u16(), "request failed");
    }

    response
}
