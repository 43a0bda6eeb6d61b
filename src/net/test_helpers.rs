//! Scripted `DashboardApi` used by state and controller tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::api::{ApiError, DashboardApi};
use super::types::{Aggregate, Analysis, ChatHistoryRow, GraphHistoryRow, GraphSet, Health};
use crate::state::filters::FilterState;

#[derive(Default)]
pub struct MockApi {
    pub aggregates: Mutex<Vec<Option<Aggregate>>>,
    pub analyses: Mutex<Vec<Result<Analysis, ApiError>>>,
    pub graph_sets: Mutex<Vec<Result<GraphSet, ApiError>>>,
    pub chat_history: Mutex<Vec<ChatHistoryRow>>,
    pub graph_history: Mutex<Vec<GraphHistoryRow>>,
    /// Every call as `name` or `name:arg`, in call order.
    pub calls: Mutex<Vec<String>>,
    /// When set, analysis and graph calls park until notified.
    pub gate: Option<Arc<Notify>>,
}

impl MockApi {
    pub fn with_analyses(analyses: Vec<Result<Analysis, ApiError>>) -> Self {
        Self { analyses: Mutex::new(analyses), ..Self::default() }
    }

    pub fn with_graph_sets(graph_sets: Vec<Result<GraphSet, ApiError>>) -> Self {
        Self { graph_sets: Mutex::new(graph_sets), ..Self::default() }
    }

    pub fn with_aggregates(aggregates: Vec<Option<Aggregate>>) -> Self {
        Self { aggregates: Mutex::new(aggregates), ..Self::default() }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(':').next() == Some(name))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

fn pop_front<T>(queue: &Mutex<Vec<T>>) -> Option<T> {
    let mut queue = queue.lock().unwrap();
    if queue.is_empty() { None } else { Some(queue.remove(0)) }
}

#[async_trait]
impl DashboardApi for MockApi {
    async fn fetch_dashboard_data(&self, filters: &FilterState) -> Option<Aggregate> {
        let query: Vec<String> = filters
            .query_params()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        self.record(format!("fetch_dashboard_data:{}", query.join("&")));
        pop_front(&self.aggregates).flatten()
    }

    async fn analyze_text(&self, message: &str) -> Result<Analysis, ApiError> {
        self.record(format!("analyze_text:{message}"));
        self.wait_gate().await;
        pop_front(&self.analyses).unwrap_or_else(|| Err(ApiError::Transport("no scripted reply".into())))
    }

    async fn fetch_chat_history(&self, limit: u32) -> Vec<ChatHistoryRow> {
        self.record(format!("fetch_chat_history:{limit}"));
        std::mem::take(&mut *self.chat_history.lock().unwrap())
    }

    async fn generate_graphs(&self, message: &str) -> Result<GraphSet, ApiError> {
        self.record(format!("generate_graphs:{message}"));
        self.wait_gate().await;
        pop_front(&self.graph_sets).unwrap_or_else(|| Err(ApiError::Transport("no scripted reply".into())))
    }

    async fn fetch_graph_history(&self, limit: u32) -> Vec<GraphHistoryRow> {
        self.record(format!("fetch_graph_history:{limit}"));
        std::mem::take(&mut *self.graph_history.lock().unwrap())
    }

    async fn health(&self) -> Result<Health, ApiError> {
        self.record("health".to_owned());
        Ok(Health { status: "healthy".into(), database: "connected".into(), ..Health::default() })
    }
}
