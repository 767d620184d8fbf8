//! Transport Abstraction
//!
//! Delivers submissions and collection fetches to the remote service. The core
//! treats status codes opaquely; classification into retryable/terminal
//! failure classes happens in `core-queue`.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::error::BridgeError;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// One attachment riding along a submission.
///
/// The `uri` points at host-local media (file path, content uri); the
/// transport implementation is responsible for reading it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPart {
    pub uri: String,
    pub mime_type: String,
    pub name: String,
    pub size_bytes: u64,
}

/// Request handed to the transport capability
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub attachments: Vec<AttachmentPart>,
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            attachments: Vec::new(),
            timeout: None,
        }
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn attachments(mut self, attachments: Vec<AttachmentPart>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Response from the transport capability
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, BridgeError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e)))
    }

    /// Get response body as UTF-8 string
    pub fn text(&self) -> Result<String, BridgeError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Extract a server-supplied reason string from an error response.
    ///
    /// Looks for a `reason`, `message` or `error` field in a JSON body,
    /// falling back to the raw body text. This is the only interpretation the
    /// core performs on response bodies of failed calls.
    pub fn error_reason(&self) -> Option<String> {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&self.body) {
            for field in ["reason", "message", "error"] {
                if let Some(reason) = value.get(field).and_then(|v| v.as_str()) {
                    return Some(reason.to_string());
                }
            }
        }
        match self.text() {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        }
    }
}

/// Failure to obtain any response at all.
///
/// A response with a non-2xx status is NOT a `TransportFailure`; it is a
/// `TransportResponse` the core classifies itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("network unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    TimedOut,
}

/// Transport capability trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::transport::{Transport, TransportRequest, HttpMethod};
///
/// async fn ping(transport: &dyn Transport) -> bool {
///     let request = TransportRequest::new(HttpMethod::Get, "/v1/health");
///     matches!(transport.send(request).await, Ok(r) if r.is_success())
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one delivery attempt.
    ///
    /// Implementations must not retry internally; retry policy belongs to the
    /// core. A timeout carried on the request bounds the whole attempt.
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = TransportRequest::new(HttpMethod::Post, "/v1/reports")
            .json(serde_json::json!({"category": "pothole"}))
            .timeout(Duration::from_secs(30));

        assert_eq!(request.path, "/v1/reports");
        assert!(request.body.is_some());
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_response_status_checks() {
        let response = TransportResponse::new(200, "ok");
        assert!(response.is_success());
        assert!(!response.is_client_error());
        assert!(!response.is_server_error());

        let response = TransportResponse::new(503, "");
        assert!(response.is_server_error());
    }

    #[test]
    fn test_error_reason_from_json_fields() {
        let response = TransportResponse::new(422, r#"{"reason": "invalid category"}"#);
        assert_eq!(response.error_reason(), Some("invalid category".to_string()));

        let response = TransportResponse::new(422, r#"{"message": "too long"}"#);
        assert_eq!(response.error_reason(), Some("too long".to_string()));

        let response = TransportResponse::new(400, r#"{"error": "bad request"}"#);
        assert_eq!(response.error_reason(), Some("bad request".to_string()));
    }

    #[test]
    fn test_error_reason_falls_back_to_text() {
        let response = TransportResponse::new(500, "upstream exploded");
        assert_eq!(response.error_reason(), Some("upstream exploded".to_string()));

        let response = TransportResponse::new(500, "");
        assert_eq!(response.error_reason(), None);
    }
}
