//! REST client for the analytics backend.
//!
//! DESIGN
//! ======
//! `DashboardApi` is the injectable service seam: the conversation threads
//! and the dashboard controller hold an `Arc<dyn DashboardApi>` built once
//! per application, and tests substitute a scripted mock.
//!
//! ERROR HANDLING
//! ==============
//! No method propagates a transport failure as a panic or an unhandled
//! error. Transport, status, decode and application-level failures are all
//! caught here and normalized: the dashboard fetch and the history fetches
//! degrade to `None`/empty, while analysis and graph generation return an
//! `ApiError` the thread renders as an assistant message.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::types::{
    Aggregate, Analysis, AnalyzeEnvelope, ChatHistoryRow, GraphHistoryRow, GraphSet, GraphsEnvelope, Health,
    HistoryEnvelope,
};
use crate::config::ApiConfig;
use crate::state::filters::FilterState;

// =============================================================================
// ERROR
// =============================================================================

/// Normalized failure of one API call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connect, DNS, reset).
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("request failed with status {status}")]
    Status { status: u16 },

    /// The body was not the JSON shape the endpoint documents.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The server reported `{success: false, error}`; the text is passed through unchanged.
    #[error("{0}")]
    Rejected(String),

    /// The HTTP client could not be constructed from config.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

pub const UNKNOWN_SERVER_ERROR: &str = "Unknown error";

// =============================================================================
// SERVICE TRAIT
// =============================================================================

/// The backend operations the dashboard and both conversation threads consume.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Fetch the dashboard aggregate for the given filters. `None` means nothing to show.
    async fn fetch_dashboard_data(&self, filters: &FilterState) -> Option<Aggregate>;

    /// Ask a natural-language data question.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; the caller renders it, never re-raises it.
    async fn analyze_text(&self, message: &str) -> Result<Analysis, ApiError>;

    /// Recent analysis exchanges, oldest first. Empty on any failure.
    async fn fetch_chat_history(&self, limit: u32) -> Vec<ChatHistoryRow>;

    /// Ask for charts answering a natural-language question.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; the caller renders it, never re-raises it.
    async fn generate_graphs(&self, message: &str) -> Result<GraphSet, ApiError>;

    /// Recent chart requests, oldest first. Empty on any failure.
    async fn fetch_graph_history(&self, limit: u32) -> Vec<GraphHistoryRow>;

    /// Backend diagnostics.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure when the backend is unreachable or unhealthy.
    async fn health(&self) -> Result<Health, ApiError>;
}

// =============================================================================
// HTTP IMPLEMENTATION
// =============================================================================

/// `reqwest`-backed implementation of [`DashboardApi`].
pub struct HttpDashboardApi {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct UserMessageBody<'a> {
    user_message: &'a str,
}

impl HttpDashboardApi {
    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the TLS backend or client cannot be initialized.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, query: &[(&'static str, String)]) -> Result<(u16, String), ApiError> {
        let url = endpoint(&self.base_url, path);
        debug!(%url, params = query.len(), "GET");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        read_body(response).await
    }

    async fn post_message(&self, path: &str, message: &str) -> Result<(u16, String), ApiError> {
        let url = endpoint(&self.base_url, path);
        debug!(%url, chars = message.chars().count(), "POST");
        let response = self
            .http
            .post(url)
            .json(&UserMessageBody { user_message: message })
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<(u16, String), ApiError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    Ok((status, text))
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn fetch_dashboard_data(&self, filters: &FilterState) -> Option<Aggregate> {
        let params = filters.query_params();
        let result = match self.get("/data", &params).await {
            Ok((status, body)) => parse_dashboard(status, &body),
            Err(e) => Err(e),
        };
        match result {
            Ok(aggregate) => aggregate,
            Err(e) => {
                warn!(error = %e, "dashboard fetch failed");
                None
            }
        }
    }

    async fn analyze_text(&self, message: &str) -> Result<Analysis, ApiError> {
        let (status, body) = self.post_message("/text/analyze", message).await.inspect_err(|e| {
            warn!(error = %e, "text analysis request failed");
        })?;
        parse_analysis(status, &body)
    }

    async fn fetch_chat_history(&self, limit: u32) -> Vec<ChatHistoryRow> {
        let result = match self.get("/chat/history", &[("limit", limit.to_string())]).await {
            Ok((status, body)) => parse_history(status, &body),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(error = %e, "chat history unavailable; starting empty");
            Vec::new()
        })
    }

    async fn generate_graphs(&self, message: &str) -> Result<GraphSet, ApiError> {
        let (status, body) = self.post_message("/graphs/generate", message).await.inspect_err(|e| {
            warn!(error = %e, "graph generation request failed");
        })?;
        parse_graph_set(status, &body)
    }

    async fn fetch_graph_history(&self, limit: u32) -> Vec<GraphHistoryRow> {
        let result = match self.get("/graphs/history", &[("limit", limit.to_string())]).await {
            Ok((status, body)) => parse_history(status, &body),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(error = %e, "graph history unavailable; starting empty");
            Vec::new()
        })
    }

    async fn health(&self) -> Result<Health, ApiError> {
        let (status, body) = self.get("/health", &[]).await?;
        ensure_success(status)?;
        decode(&body)
    }
}

// =============================================================================
// RESPONSE INTERPRETATION
// =============================================================================

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn ensure_success(status: u16) -> Result<(), ApiError> {
    if (200..300).contains(&status) { Ok(()) } else { Err(ApiError::Status { status }) }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn rejected(error: Option<String>) -> ApiError {
    ApiError::Rejected(error.unwrap_or_else(|| UNKNOWN_SERVER_ERROR.to_owned()))
}

/// Interpret a `GET /data` response. `Ok(None)` when the array is empty or absent.
pub(crate) fn parse_dashboard(status: u16, body: &str) -> Result<Option<Aggregate>, ApiError> {
    ensure_success(status)?;
    let value: serde_json::Value = decode(body)?;
    let Some(first) = value.as_array().and_then(|items| items.first()) else {
        return Ok(None);
    };
    serde_json::from_value(first.clone())
        .map(Some)
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Interpret a `POST /text/analyze` response.
pub(crate) fn parse_analysis(status: u16, body: &str) -> Result<Analysis, ApiError> {
    ensure_success(status)?;
    let envelope: AnalyzeEnvelope = decode(body)?;
    if !envelope.success {
        return Err(rejected(envelope.error));
    }
    Ok(Analysis { summary: envelope.summary.unwrap_or_default(), timestamp: envelope.timestamp })
}

/// Interpret a `POST /graphs/generate` response.
pub(crate) fn parse_graph_set(status: u16, body: &str) -> Result<GraphSet, ApiError> {
    ensure_success(status)?;
    let envelope: GraphsEnvelope = decode(body)?;
    if !envelope.success {
        return Err(rejected(envelope.error));
    }
    Ok(GraphSet {
        charts: envelope.charts.unwrap_or_default(),
        questions: envelope.questions,
        timestamp: envelope.timestamp,
    })
}

/// Interpret a `GET /chat/history` or `GET /graphs/history` response.
pub(crate) fn parse_history<T: DeserializeOwned>(status: u16, body: &str) -> Result<Vec<T>, ApiError> {
    ensure_success(status)?;
    let envelope: HistoryEnvelope<T> = decode(body)?;
    if !envelope.success {
        return Err(rejected(envelope.error));
    }
    Ok(envelope.history)
}
