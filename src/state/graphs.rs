//! Chart-generation chat: questions answered with a set of charts.
//!
//! The backend does not persist rendered charts, so history replays each
//! request as the user's question plus a placeholder reply inviting the
//! user to ask again. Regenerating runs the whole pipeline from scratch and
//! can produce different charts than the first time.

#[cfg(test)]
#[path = "graphs_test.rs"]
mod graphs_test;

use async_trait::async_trait;
use time::{OffsetDateTime, UtcOffset};

use super::conversation::{Conversation, ThreadStrategy, failure_text};
use super::message::{Message, parse_timestamp};
use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::net::api::{ApiError, DashboardApi};
use crate::net::types::{GraphHistoryRow, GraphSet};

pub type GraphThread = Conversation<GraphStrategy>;

pub const HISTORY_PLACEHOLDER: &str =
    "Charts were generated for this question earlier. Ask it again to regenerate them.";

/// Assistant text shown above a successful chart reply.
#[must_use]
pub fn chart_reply_text(question: &str) -> String {
    format!("Here are the charts for \"{question}\".")
}

#[derive(Clone, Debug)]
pub struct GraphStrategy {
    pub history_limit: u32,
}

impl Default for GraphStrategy {
    fn default() -> Self {
        Self { history_limit: DEFAULT_HISTORY_LIMIT }
    }
}

#[async_trait]
impl ThreadStrategy for GraphStrategy {
    type Reply = GraphSet;
    type HistoryRow = GraphHistoryRow;

    fn name(&self) -> &'static str {
        "graphs"
    }

    async fn submit(&self, api: &dyn DashboardApi, question: &str) -> Result<GraphSet, ApiError> {
        api.generate_graphs(question).await
    }

    fn reply_message(&self, question: &str, reply: Result<GraphSet, ApiError>, now: OffsetDateTime) -> Message {
        match reply {
            Ok(set) => {
                let timestamp = set.timestamp.as_deref().and_then(|raw| parse_timestamp(raw, now.offset())).unwrap_or(now);
                Message::assistant(chart_reply_text(question), Some(timestamp)).with_charts(set.charts)
            }
            Err(err) => Message::assistant(failure_text(&err), Some(now)).with_charts(Vec::new()),
        }
    }

    async fn fetch_history(&self, api: &dyn DashboardApi) -> Vec<GraphHistoryRow> {
        api.fetch_graph_history(self.history_limit).await
    }

    fn history_messages(&self, row: GraphHistoryRow, offset: UtcOffset) -> Vec<Message> {
        let timestamp = row.created_at.as_deref().and_then(|raw| parse_timestamp(raw, offset));
        vec![Message::user(row.user_message, timestamp), Message::assistant(HISTORY_PLACEHOLDER, timestamp)]
    }
}
