//! Post-processing for `/run` responses.
//!
//! The body is drained, a decompressed copy is logged for debugging, and when the
//! client passed `noCompress` the `Content-Encoding` header is dropped. The bytes sent
//! back are always the ones the inner pipeline produced, even when they are still gzip.

use axum::{
    body::{to_bytes, Body},
    extract::{Query, Request},
    http::{
        header::{HeaderMap, HeaderValue, CONTENT_ENCODING},
        StatusCode, Uri,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use flate2::read::GzDecoder;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;
use thiserror::Error;
use tracing::{error, info};

use crate::error::ApiError;

pub const RUN_PATH: &str = "/run";
pub const NO_COMPRESS_PARAM: &str = "noCompress";

/// Characters of the serialized body kept in the log line
const PREVIEW_CHARS: usize = 1000;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("gzip decode failed: {0}")]
    Gzip(#[from] std::io::Error),
    #[error("body is not JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Read the no-compress flag from the query string; anything unparseable means false
pub fn no_compress_requested(uri: &Uri) -> bool {
    match Query::<HashMap<String, String>>::try_from_uri(uri) {
        Ok(Query(params)) => {
            info!("Request query parameters: {:?}", params);
            let no_compress = params
                .get(NO_COMPRESS_PARAM)
                .is_some_and(|value| is_truthy(value));
            if no_compress {
                info!("Client requested no compression for this response");
            }
            no_compress
        }
        Err(e) => {
            error!("Error parsing query params: {}", e);
            false
        }
    }
}

/// Decode a buffered body for logging: gunzip when flagged, parse as JSON,
/// and keep the head of its compact serialization
pub fn preview_body(body: &[u8], encoding: Option<&HeaderValue>) -> Result<String, PreviewError> {
    let decoded: Cow<'_, [u8]> = match encoding {
        Some(value) if value.as_bytes() == b"gzip" => {
            info!("Decompressing gzipped response body for logging.");
            let mut out = Vec::new();
            GzDecoder::new(body).read_to_end(&mut out)?;
            Cow::Owned(out)
        }
        _ => Cow::Borrowed(body),
    };

    let value: Value = serde_json::from_slice(&decoded)?;
    Ok(value.to_string().chars().take(PREVIEW_CHARS).collect())
}

/// Drop `Content-Encoding` when the client asked for it. Only the header goes,
/// the body is left as is.
pub fn strip_content_encoding(headers: &mut HeaderMap, no_compress: bool) -> Option<HeaderValue> {
    if !no_compress {
        return None;
    }
    let removed = headers.remove(CONTENT_ENCODING);
    if let Some(encoding) = &removed {
        info!(
            "Removing Content-Encoding header ({}) as requested by client",
            encoding.to_str().unwrap_or("<binary>")
        );
    }
    removed
}

pub async fn intercept_run_response(request: Request, next: Next) -> Response {
    let no_compress = no_compress_requested(request.uri());
    let is_run = request.uri().path() == RUN_PATH;

    let response = next.run(request).await;

    if !is_run || response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return ApiError::internal(format!("Failed to read /run response body: {}", e))
                .into_response();
        }
    };

    match preview_body(&bytes, parts.headers.get(CONTENT_ENCODING)) {
        Ok(preview) => info!("Processed /run response: {}...", preview),
        Err(e) => error!("Error processing response body: {}", e),
    }

    strip_content_encoding(&mut parts.headers, no_compress);

    Response::from_parts(parts, Body::from(bytes))
}
