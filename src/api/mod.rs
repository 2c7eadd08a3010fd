//! Backend API client.
//!
//! - **Transport**: how a request reaches the backend. `HttpTransport` speaks
//!   multipart over reqwest, `FixtureTransport` answers from canned payloads,
//!   `FallbackTransport` tries the former and falls back to the latter.
//! - **ApiClient**: endpoint construction, CSRF token handling, and decoding
//!   of JSON bodies into typed results.
//!
//! The transport is picked once from [`TransportMode`] when the client is built.

pub mod fixtures;
pub mod response;
pub mod transport;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;

use crate::config::{ClientConfig, TransportMode};
use crate::error::{ClientError, ClientResult};
use crate::media::{MediaCategory, UploadedFile};

pub use response::{
    AugmentResult, EncodedMedia, MeshData, PreprocessResult, ResponseSource, UploadResult,
};
pub use transport::{
    FallbackTransport, FixtureTransport, HttpTransport, Transport, TransportResponse,
};

/// Header carrying the CSRF token on live POST requests.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Operation exposed per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Upload,
    Preprocess,
    Augment,
}

impl Operation {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Operation::Upload => "upload",
            Operation::Preprocess => "preprocess",
            Operation::Augment => "augment",
        }
    }
}

/// An addressable backend endpoint, relative to the API root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Media(MediaCategory, Operation),
    CsrfToken,
}

impl Endpoint {
    /// Path relative to the API root, e.g. `3d/preprocess`.
    pub fn path(&self) -> String {
        match self {
            Endpoint::Media(category, op) => {
                format!("{}/{}", category.api_segment(), op.path_segment())
            }
            Endpoint::CsrfToken => "csrf-token".to_string(),
        }
    }

    /// Absolute URL under `api_root`.
    pub fn url(&self, api_root: &str) -> String {
        format!("{}/{}", api_root.trim_end_matches('/'), self.path())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Value of one form parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Form-field encoding, as the backend's form parser expects it.
    pub fn to_form_value(&self) -> String {
        match self {
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Text(s) => s.clone(),
        }
    }
}

/// The active file plus the parameters for one action.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub file: UploadedFile,
    pub params: Vec<(&'static str, ParamValue)>,
}

impl ProcessingRequest {
    pub fn new(file: UploadedFile) -> Self {
        Self {
            file,
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: &'static str, value: ParamValue) -> Self {
        self.params.push((name, value));
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// Typed client over a [`Transport`].
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    csrf_enabled: bool,
    csrf_token: OnceCell<String>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            csrf_enabled: false,
            csrf_token: OnceCell::new(),
        }
    }

    /// Build the client and its transport from configuration.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let api_root = config
            .api_root()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        let fixtures = || FixtureTransport::new().with_latency(config.fixture_latency());

        let transport: Arc<dyn Transport> = match config.transport {
            TransportMode::Live => Arc::new(HttpTransport::new(api_root, config.connect_timeout())?),
            TransportMode::Fixtures => Arc::new(fixtures()),
            TransportMode::LiveWithFallback => Arc::new(FallbackTransport::new(
                Arc::new(HttpTransport::new(api_root, config.connect_timeout())?),
                fixtures(),
            )),
        };
        tracing::debug!(mode = ?config.transport, transport = transport.name(), "api client ready");

        let csrf_enabled = config.csrf && config.transport != TransportMode::Fixtures;
        Ok(Self::new(transport).with_csrf(csrf_enabled))
    }

    pub fn with_csrf(mut self, enabled: bool) -> Self {
        self.csrf_enabled = enabled;
        self
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// CSRF token. `None` when disabled or unavailable; a failed fetch is
    /// retried on the next request, a successful one is kept.
    pub async fn csrf_token(&self) -> Option<String> {
        if !self.csrf_enabled {
            return None;
        }
        let token = self
            .csrf_token
            .get_or_try_init(|| async {
                let resp = self.transport.fetch_json(&Endpoint::CsrfToken).await?;
                resp.body
                    .get("token")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| ClientError::malformed("token"))
            })
            .await;
        match token {
            Ok(token) => Some(token.clone()),
            Err(e) => {
                tracing::warn!(error = %e, "CSRF token unavailable, proceeding without");
                None
            }
        }
    }

    async fn post(
        &self,
        category: MediaCategory,
        op: Operation,
        request: &ProcessingRequest,
    ) -> ClientResult<TransportResponse> {
        let endpoint = Endpoint::Media(category, op);
        let token = self.csrf_token().await;
        tracing::info!(
            endpoint = %endpoint,
            file = request.file.filename(),
            params = request.params.len(),
            "sending request"
        );
        self.transport
            .send(&endpoint, request, token.as_deref())
            .await
    }

    pub async fn upload(
        &self,
        category: MediaCategory,
        file: &UploadedFile,
    ) -> ClientResult<UploadResult> {
        let request = ProcessingRequest::new(file.clone());
        let resp = self.post(category, Operation::Upload, &request).await?;
        UploadResult::decode(category, &resp.body, resp.source)
    }

    pub async fn preprocess(
        &self,
        category: MediaCategory,
        request: &ProcessingRequest,
    ) -> ClientResult<PreprocessResult> {
        let resp = self.post(category, Operation::Preprocess, request).await?;
        PreprocessResult::decode(category, &resp.body, resp.source)
    }

    pub async fn augment(
        &self,
        category: MediaCategory,
        request: &ProcessingRequest,
    ) -> ClientResult<AugmentResult> {
        let resp = self.post(category, Operation::Augment, request).await?;
        AugmentResult::decode(category, &resp.body, resp.source)
    }
}
