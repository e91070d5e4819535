pub mod interceptor;

pub use interceptor::{intercept_run_response, NO_COMPRESS_PARAM, RUN_PATH};

use axum::{
    extract::Request,
    http::{header::HOST, HeaderValue},
    response::Response,
};
use std::time::Duration;
use tower_http::compression::{
    predicate::{And, NotForContentType, Predicate, SizeAbove},
    CompressionLayer,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{info, warn, Span};

/// Bodies at or above this many bytes get gzip-encoded
pub const COMPRESSION_MIN_SIZE: u16 = 1000;

type CompressionPredicate =
    And<And<And<SizeAbove, NotForContentType>, NotForContentType>, NotForContentType>;

/// CORS for the configured origins. Methods and headers are mirrored from the
/// request since wildcards are not allowed together with credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Gzip for responses of at least [`COMPRESSION_MIN_SIZE`] bytes
pub fn compression_layer() -> CompressionLayer<CompressionPredicate> {
    let predicate = SizeAbove::new(COMPRESSION_MIN_SIZE)
        .and(NotForContentType::GRPC)
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::SSE);
    CompressionLayer::new().compress_when(predicate)
}

/// Best-effort absolute URL of a server-side request
pub fn request_url(request: &Request) -> String {
    match request.headers().get(HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{}{}", host, request.uri()),
        None => request.uri().to_string(),
    }
}

pub fn log_request(request: &Request, _span: &Span) {
    info!("Request: {} {}", request.method(), request_url(request));
}

pub fn log_response(response: &Response, latency: Duration, _span: &Span) {
    info!(
        "Response: {} ({} ms)",
        response.status().as_u16(),
        latency.as_millis()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn url_includes_host_and_query() {
        let request = Request::builder()
            .uri("/run?noCompress=true")
            .header(HOST, "localhost:8080")
            .body(Body::empty())
            .unwrap();

        assert_eq!(request_url(&request), "http://localhost:8080/run?noCompress=true");
    }

    #[test]
    fn url_without_host_is_the_uri() {
        let request = Request::builder().uri("/run").body(Body::empty()).unwrap();
        assert_eq!(request_url(&request), "/run");
    }
}
