//! Response handling and transformation.
//!
//! # Responsibilities
//! - Return backend responses to the client unchanged (status, headers, body)
//! - Map terminal forwarding errors to structured JSON bodies
//!
//! # Design Decisions
//! - Hop-by-hop headers stripped; content-length recomputed by the server
//! - Unavailable → 503, raised transport error → 502

use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::forwarding::ForwardError;
use crate::transport::BackendResponse;

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
];

/// JSON body of a failed forward.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub attempts: usize,
}

impl IntoResponse for BackendResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers.iter() {
            if HOP_BY_HOP.contains(name) || name == header::CONTENT_LENGTH || name.as_str() == "keep-alive" {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        (self.status, headers, self.body).into_response()
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let attempts = self.attempt_count();
        let (status, error) = match self {
            ForwardError::AllInstancesUnavailable { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "All instances are unavailable".to_string(),
            ),
            ForwardError::LastTransportError { source, .. } => (StatusCode::BAD_GATEWAY, source.to_string()),
        };
        (status, Json(ErrorBody { error, attempts })).into_response()
    }
}
