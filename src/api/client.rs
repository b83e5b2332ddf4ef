use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::api::models::OutgoingMessage;

/// Why a message could not be delivered. The screen shows the same text for all of them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubmitError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server rejected the message (HTTP {status})")]
    Rejected { status: u16 },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl SubmitError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Rejected { .. } => "rejected",
            Self::MalformedResponse(_) => "malformed-response",
        }
    }
}

/// Delivers one message and hands back the raw `status` value of the reply.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<Value, SubmitError>;
}

pub struct ApiClient {
    http: HttpClient,
    endpoint: Url,
}

impl ApiClient {
    pub fn new(endpoint: Url) -> Self {
        Self { http: HttpClient::new(), endpoint }
    }

    /// Like `new`, but with an overall request timeout instead of the client default.
    pub fn with_timeout(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait]
impl MessageTransport for ApiClient {
    async fn send(&self, message: &OutgoingMessage) -> Result<Value, SubmitError> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(message)
            .send()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(SubmitError::Rejected { status: resp.status().as_u16() });
        }
        let json: Value = resp
            .json()
            .await
            .map_err(|e| SubmitError::MalformedResponse(e.to_string()))?;
        json.get("status")
            .cloned()
            .ok_or_else(|| SubmitError::MalformedResponse("no status field in response".into()))
    }
}
