//! Transport capability: performs the actual network exchange.
//!
//! The executor talks to a [`Transport`] trait object rather than to reqwest
//! directly, so runs can be driven against deterministic stub transports in
//! tests. [`HttpTransport`] is the production implementation.

use crate::contract::HttpMethod;
use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// A single request handed to the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub timeout: Duration,
}

/// The transport's view of a response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Parse the body as JSON, if it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Capability performing the request/response exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one exchange. Network-level failures (timeout, refused
    /// connection) surface as [`TransportError`]; any HTTP status, including
    /// 4xx/5xx, is a successful exchange from the transport's point of view.
    async fn request(&self, req: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport used against live services.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, req: TransportRequest) -> Result<TransportResponse, TransportError> {
        let method: reqwest::Method = req.method.into();
        let mut builder = self.client.request(method, &req.url).timeout(req.timeout);

        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, req.timeout))?;

        let status = response.status().as_u16();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.to_string(), value.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| map_reqwest_error(err, req.timeout))?;

        Ok(TransportResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            secs: timeout.as_secs(),
        }
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Http(err.to_string())
    }
}
