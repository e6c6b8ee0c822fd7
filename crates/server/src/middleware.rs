//! API middleware.

use std::any::Any;
use std::time::Instant;

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_REQUEST_HEADERS, CONTENT_LENGTH, CONTENT_TYPE,
};
use axum::http::{HeaderValue, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::ErrorResponse;

/// Open CORS: any origin, the three methods the API uses, and whatever
/// headers the preflight asked for.
pub async fn cors_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let requested_headers = request.headers().get(ACCESS_CONTROL_REQUEST_HEADERS).cloned();

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        requested_headers.unwrap_or_else(|| HeaderValue::from_static("Content-Type")),
    );

    response
}

/// Largest plain-text error body carried over into the JSON error.
const ERROR_DETAIL_LIMIT: usize = 4 * 1024;

/// Rewrite error responses that did not come from a handler (body limit,
/// extractor rejections, routing) into the service's JSON error shape.
pub async fn json_errors(request: Request<Body>, next: Next) -> Response<Body> {
    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let detail = match axum::body::to_bytes(body, ERROR_DETAIL_LIMIT).await {
        Ok(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
            String::from_utf8_lossy(&bytes).trim().to_string()
        }
        _ => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };
    log::warn!("Rejected request: {status} {detail}");

    let mut rewritten = (status, Json(ErrorResponse::new(detail))).into_response();
    for (name, value) in parts.headers.iter() {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            rewritten.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rewritten
}

fn is_json(response: &Response<Body>) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// Request logging middleware.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    if path == "/health" {
        log::debug!("{method} {path} {status} {elapsed_ms}ms");
    } else {
        log::info!("{method} {path} {status} {elapsed_ms}ms");
    }

    response
}

/// Turn a handler panic into the service's JSON error.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    log::error!("Handler panicked: {detail}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!("Internal server error: {detail}"))),
    )
        .into_response()
}
