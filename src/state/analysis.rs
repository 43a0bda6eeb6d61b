//! Data-analysis chat: questions answered with a prose summary.

#[cfg(test)]
#[path = "analysis_test.rs"]
mod analysis_test;

use async_trait::async_trait;
use time::{OffsetDateTime, UtcOffset};

use super::conversation::{Conversation, ThreadStrategy, failure_text};
use super::message::{Message, parse_timestamp};
use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::net::api::{ApiError, DashboardApi};
use crate::net::types::{Analysis, ChatHistoryRow};

pub type AnalysisThread = Conversation<AnalysisStrategy>;

#[derive(Clone, Debug)]
pub struct AnalysisStrategy {
    pub history_limit: u32,
}

impl Default for AnalysisStrategy {
    fn default() -> Self {
        Self { history_limit: DEFAULT_HISTORY_LIMIT }
    }
}

#[async_trait]
impl ThreadStrategy for AnalysisStrategy {
    type Reply = Analysis;
    type HistoryRow = ChatHistoryRow;

    fn name(&self) -> &'static str {
        "analysis"
    }

    async fn submit(&self, api: &dyn DashboardApi, question: &str) -> Result<Analysis, ApiError> {
        api.analyze_text(question).await
    }

    fn reply_message(&self, _question: &str, reply: Result<Analysis, ApiError>, now: OffsetDateTime) -> Message {
        match reply {
            Ok(analysis) => {
                let timestamp = analysis.timestamp.as_deref().and_then(|raw| parse_timestamp(raw, now.offset())).unwrap_or(now);
                Message::assistant(analysis.summary, Some(timestamp))
            }
            Err(err) => Message::assistant(failure_text(&err), Some(now)),
        }
    }

    async fn fetch_history(&self, api: &dyn DashboardApi) -> Vec<ChatHistoryRow> {
        api.fetch_chat_history(self.history_limit).await
    }

    fn history_messages(&self, row: ChatHistoryRow, offset: UtcOffset) -> Vec<Message> {
        let timestamp = row.created_at.as_deref().and_then(|raw| parse_timestamp(raw, offset));
        vec![Message::user(row.user_message, timestamp), Message::assistant(row.assistant_response, timestamp)]
    }
}
