//! Request transports.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::fixtures;
use super::response::ResponseSource;
use super::{Endpoint, ProcessingRequest, CSRF_HEADER};
use crate::error::{ClientError, ClientResult};

/// A decoded JSON body plus where it came from.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub body: Value,
    pub source: ResponseSource,
}

/// Moves a request to the backend (or a stand-in) and returns its JSON body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// POST a multipart request.
    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &ProcessingRequest,
        csrf_token: Option<&str>,
    ) -> ClientResult<TransportResponse>;

    /// GET a JSON endpoint.
    async fn fetch_json(&self, endpoint: &Endpoint) -> ClientResult<TransportResponse>;
}

/// Real HTTP transport.
///
/// Only a connect timeout is set; a backend that accepts the connection and
/// never answers leaves the request pending.
pub struct HttpTransport {
    client: reqwest::Client,
    api_root: String,
}

impl HttpTransport {
    pub fn new(api_root: impl Into<String>, connect_timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_root: api_root.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn build_form(request: &ProcessingRequest) -> ClientResult<reqwest::multipart::Form> {
        let file = &request.file;
        let file_part = reqwest::multipart::Part::bytes(file.content().to_vec())
            .file_name(file.filename().to_string())
            .mime_str(file.mime_type())
            .map_err(|e| ClientError::Transport(format!("failed to build form part: {e}")))?;

        let mut form = reqwest::multipart::Form::new().part("file", file_part);
        for (name, value) in &request.params {
            form = form.text(*name, value.to_form_value());
        }
        Ok(form)
    }

    async fn read_json(url: &str, response: reqwest::Response) -> ClientResult<TransportResponse> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            tracing::warn!(url, status = status.as_u16(), "backend returned error status");
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::malformed(format!("JSON body ({e})")))?;

        Ok(TransportResponse {
            body,
            source: ResponseSource::Live,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &ProcessingRequest,
        csrf_token: Option<&str>,
    ) -> ClientResult<TransportResponse> {
        let url = endpoint.url(&self.api_root);
        let form = Self::build_form(request)?;

        let mut builder = self
            .client
            .post(&url)
            .header("accept", "application/json")
            .multipart(form);
        if let Some(token) = csrf_token {
            builder = builder.header(CSRF_HEADER, token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("HTTP request failed: {e}")))?;
        Self::read_json(&url, response).await
    }

    async fn fetch_json(&self, endpoint: &Endpoint) -> ClientResult<TransportResponse> {
        let url = endpoint.url(&self.api_root);
        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("HTTP request failed: {e}")))?;
        Self::read_json(&url, response).await
    }
}

/// Answers every request from the canned fixture set.
#[derive(Debug, Clone, Default)]
pub struct FixtureTransport {
    latency: Duration,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated round-trip applied before each answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn lookup(&self, endpoint: &Endpoint) -> ClientResult<TransportResponse> {
        fixtures::fixture(endpoint)
            .map(|body| TransportResponse {
                body,
                source: ResponseSource::Fixture,
            })
            .ok_or_else(|| ClientError::Transport(format!("no fixture for {endpoint}")))
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    fn name(&self) -> &'static str {
        "fixtures"
    }

    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &ProcessingRequest,
        _csrf_token: Option<&str>,
    ) -> ClientResult<TransportResponse> {
        tracing::debug!(
            endpoint = %endpoint,
            file = request.file.filename(),
            "answering from fixtures"
        );
        self.delay().await;
        self.lookup(endpoint)
    }

    async fn fetch_json(&self, endpoint: &Endpoint) -> ClientResult<TransportResponse> {
        self.delay().await;
        self.lookup(endpoint)
    }
}

/// Live transport that substitutes a fixture when the backend fails.
///
/// Only transport-level failures (connection errors and non-2xx statuses)
/// fall back. The substituted response is tagged [`ResponseSource::Fixture`].
pub struct FallbackTransport {
    primary: Arc<dyn Transport>,
    fixtures: FixtureTransport,
}

impl FallbackTransport {
    pub fn new(primary: Arc<dyn Transport>, fixtures: FixtureTransport) -> Self {
        Self { primary, fixtures }
    }

    fn recover(
        &self,
        endpoint: &Endpoint,
        result: ClientResult<TransportResponse>,
    ) -> ClientResult<TransportResponse> {
        match result {
            Err(err) if err.is_recoverable_by_fixture() => match self.fixtures.lookup(endpoint) {
                Ok(mock) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        error = %err,
                        "backend unavailable, using mock response"
                    );
                    Ok(mock)
                }
                Err(_) => Err(err),
            },
            other => other,
        }
    }
}

#[async_trait]
impl Transport for FallbackTransport {
    fn name(&self) -> &'static str {
        "http+fixtures"
    }

    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &ProcessingRequest,
        csrf_token: Option<&str>,
    ) -> ClientResult<TransportResponse> {
        let result = self.primary.send(endpoint, request, csrf_token).await;
        self.recover(endpoint, result)
    }

    async fn fetch_json(&self, endpoint: &Endpoint) -> ClientResult<TransportResponse> {
        let result = self.primary.fetch_json(endpoint).await;
        self.recover(endpoint, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Operation, ParamValue};
    use crate::media::{MediaCategory, UploadedFile};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Primary transport that always fails with a fixed error.
    struct FailingTransport {
        error: ClientError,
        calls: AtomicUsize,
    }

    impl FailingTransport {
        fn new(error: ClientError) -> Self {
            Self {
                error,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for FailingTransport {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn send(
            &self,
            _endpoint: &Endpoint,
            _request: &ProcessingRequest,
            _csrf_token: Option<&str>,
        ) -> ClientResult<TransportResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(self.error.clone())
        }

        async fn fetch_json(&self, _endpoint: &Endpoint) -> ClientResult<TransportResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(self.error.clone())
        }
    }

    fn request() -> ProcessingRequest {
        ProcessingRequest::new(UploadedFile::new("clip.mp3", vec![0u8; 4]))
            .with_param("speed", ParamValue::Float(1.5))
    }

    #[tokio::test]
    async fn test_fixture_transport_answers_media_endpoints() {
        let transport = FixtureTransport::new();
        let endpoint = Endpoint::Media(MediaCategory::Audio, Operation::Augment);
        let resp = transport.send(&endpoint, &request(), None).await.unwrap();
        assert_eq!(resp.source, ResponseSource::Fixture);
        assert!(resp.body.get("augmented_audio").is_some());
    }

    #[tokio::test]
    async fn test_fixture_transport_has_no_csrf_fixture() {
        let transport = FixtureTransport::new();
        let result = transport.fetch_json(&Endpoint::CsrfToken).await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixture_transport_latency() {
        let transport = FixtureTransport::new().with_latency(Duration::from_millis(1000));
        let endpoint = Endpoint::Media(MediaCategory::Text, Operation::Upload);
        let start = tokio::time::Instant::now();
        transport.send(&endpoint, &request(), None).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_fallback_on_transport_error() {
        let primary = Arc::new(FailingTransport::new(ClientError::Transport(
            "connection refused".into(),
        )));
        let transport = FallbackTransport::new(primary.clone(), FixtureTransport::new());
        let endpoint = Endpoint::Media(MediaCategory::Audio, Operation::Augment);

        let resp = transport.send(&endpoint, &request(), None).await.unwrap();
        assert_eq!(resp.source, ResponseSource::Fixture);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_on_status_error() {
        let primary = Arc::new(FailingTransport::new(ClientError::Status {
            status: 503,
            body: "down".into(),
        }));
        let transport = FallbackTransport::new(primary, FixtureTransport::new());
        let endpoint = Endpoint::Media(MediaCategory::Image, Operation::Preprocess);
        let resp = transport.send(&endpoint, &request(), None).await.unwrap();
        assert_eq!(resp.source, ResponseSource::Fixture);
    }

    #[tokio::test]
    async fn test_fallback_propagates_when_no_fixture() {
        let primary = Arc::new(FailingTransport::new(ClientError::Status {
            status: 404,
            body: "missing".into(),
        }));
        let transport = FallbackTransport::new(primary, FixtureTransport::new());
        let result = transport.fetch_json(&Endpoint::CsrfToken).await;
        assert!(matches!(result, Err(ClientError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_fallback_does_not_mask_malformed_responses() {
        let primary = Arc::new(FailingTransport::new(ClientError::malformed("JSON body")));
        let transport = FallbackTransport::new(primary, FixtureTransport::new());
        let endpoint = Endpoint::Media(MediaCategory::Text, Operation::Preprocess);
        let result = transport.send(&endpoint, &request(), None).await;
        assert!(matches!(result, Err(ClientError::MalformedResponse { .. })));
    }

    #[test]
    fn test_http_form_builds_with_params() {
        let form = HttpTransport::build_form(&request());
        assert!(form.is_ok());
    }

    #[test]
    fn test_http_transport_trims_root() {
        let transport =
            HttpTransport::new("http://localhost:8000/api/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.api_root(), "http://localhost:8000/api/v1");
    }
}
