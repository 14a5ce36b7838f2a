use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::search::models::{Envelope, SearchQuery, SearchResponse};

/// Action name posted alongside every search
pub const SEARCH_ACTION: &str = "wcls_search";

/// What the search endpoint answered
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// `success: true` with a decodable payload
    Results(SearchResponse),
    /// `success: false`, with the server's message when it sent one
    Failed(Option<String>),
}

/// Client-side failures: anything that shows up as "network error"
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request rejected with status {0}")]
    Rejected(u16),
    #[error("undecodable response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Sends one search to the backend
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, TransportError>;
}

/// Turn a decoded envelope into an outcome
pub fn decode_envelope(envelope: Envelope<Value>) -> Result<SearchOutcome, TransportError> {
    if envelope.success {
        let response: SearchResponse = serde_json::from_value(envelope.data)?;
        Ok(SearchOutcome::Results(response))
    } else {
        let message = envelope
            .data
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(SearchOutcome::Failed(message))
    }
}

/// Script data served by `/api/nonce`
#[derive(Debug, Deserialize)]
struct ScriptData {
    ajax_url: String,
    nonce: String,
}

/// Posts searches as form bodies over HTTP
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    nonce: String,
}

impl HttpTransport {
    /// Create a transport for a known endpoint and nonce
    pub fn new(endpoint: impl Into<String>, nonce: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            nonce: nonce.into(),
        })
    }

    /// Fetch the endpoint and a fresh nonce from a running server
    pub async fn connect(base_url: &str) -> anyhow::Result<Self> {
        let url = format!("{}/api/nonce", base_url.trim_end_matches('/'));
        let transport = Self::new(String::new(), String::new())?;

        let data: ScriptData = transport
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!("Obtained search nonce from {}", url);

        Ok(Self {
            endpoint: data.ajax_url,
            nonce: data.nonce,
            ..transport
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, TransportError> {
        let mut fields = vec![
            ("action", SEARCH_ACTION.to_string()),
            ("nonce", self.nonce.clone()),
        ];
        fields.extend(query.form_fields());

        let response = self.client.post(&self.endpoint).form(&fields).send().await?;

        let status = response.status();
        debug!("Search {:?} answered with {}", query.text, status);
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TransportError::Rejected(status.as_u16()));
        }

        let body = response.bytes().await?;
        let envelope: Envelope<Value> = serde_json::from_slice(&body)?;
        decode_envelope(envelope)
    }
}
