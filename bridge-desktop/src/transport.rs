//! Transport implementation using reqwest.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use bridge_traits::{
    AttachmentPart, HttpMethod, Transport, TransportFailure, TransportRequest, TransportResponse,
};

/// Reqwest-based transport.
///
/// One delivery attempt per `send`, exactly as the trait requires; retry
/// policy stays in the core. Attachments are uploaded as multipart form data
/// with the JSON payload in a `payload` part.
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Creates a transport against `base_url` with default client settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .user_agent("field-report-core/0.1.0")
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Creates a transport over a preconfigured client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }

    async fn read_attachment(attachment: &AttachmentPart) -> Result<Vec<u8>, TransportFailure> {
        let path = attachment
            .uri
            .strip_prefix("file://")
            .unwrap_or(&attachment.uri);

        tokio::fs::read(path).await.map_err(|e| {
            TransportFailure::Unreachable(format!(
                "failed to read attachment '{}': {}",
                attachment.name, e
            ))
        })
    }

    async fn build_multipart(
        request: &TransportRequest,
    ) -> Result<Form, TransportFailure> {
        let mut form = Form::new();

        if let Some(body) = &request.body {
            let payload = Part::text(body.to_string())
                .mime_str("application/json")
                .map_err(|e| TransportFailure::Unreachable(e.to_string()))?;
            form = form.part("payload", payload);
        }

        for attachment in &request.attachments {
            let data = Self::read_attachment(attachment).await?;
            let part = Part::bytes(data)
                .file_name(attachment.name.clone())
                .mime_str(&attachment.mime_type)
                .map_err(|e| {
                    TransportFailure::Unreachable(format!(
                        "invalid mime type '{}': {}",
                        attachment.mime_type, e
                    ))
                })?;
            form = form.part(format!("attachment:{}", attachment.name), part);
        }

        Ok(form)
    }

    fn convert_error(e: reqwest::Error) -> TransportFailure {
        if e.is_timeout() {
            TransportFailure::TimedOut
        } else {
            TransportFailure::Unreachable(e.to_string())
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportFailure> {
        let url = format!("{}{}", self.base_url, request.path);
        let method = Self::convert_method(request.method);

        debug!(%url, attachments = request.attachments.len(), "Sending request");

        let mut builder = self.client.request(method, &url);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder = if request.attachments.is_empty() {
            match &request.body {
                Some(body) => builder.json(body),
                None => builder,
            }
        } else {
            builder.multipart(Self::build_multipart(&request).await?)
        };

        let response = builder.send().await.map_err(Self::convert_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            warn!(%url, error = %e, "Failed to read response body");
            Self::convert_error(e)
        })?;

        Ok(TransportResponse::new(status, body))
    }
}
