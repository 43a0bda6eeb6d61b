//! Conversation thread state machine shared by the analysis and chart chats.
//!
//! DESIGN
//! ======
//! One generic `Conversation<S>` owns the message list and the
//! `sending`/history flags; a `ThreadStrategy` decides which endpoint a
//! question goes to and how a reply or a history row becomes messages.
//!
//! The thread state sits behind a `std::sync::Mutex` that is only held
//! between awaits, never across one. A send checks and sets `sending`
//! under that lock, so at most one request per thread is in flight and a
//! second send while busy is dropped without touching the network.
//!
//! `reset` bumps an epoch counter. A request that started before the reset
//! completes into the void: its reply is discarded instead of appended.

#[cfg(test)]
#[path = "conversation_test.rs"]
mod conversation_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info};

use super::message::Message;
use crate::net::api::{ApiError, DashboardApi};

pub const FAILURE_PREFIX: &str = "Sorry, I ran into an issue: ";

/// Human-readable assistant text for a failed request.
#[must_use]
pub fn failure_text(err: &ApiError) -> String {
    format!("{FAILURE_PREFIX}{err}")
}

// =============================================================================
// STRATEGY
// =============================================================================

/// How one kind of thread talks to the backend and renders replies.
#[async_trait]
pub trait ThreadStrategy: Send + Sync + 'static {
    /// Successful reply payload.
    type Reply: Send + 'static;
    /// One persisted history row.
    type HistoryRow: Send + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Send the question to the backend.
    ///
    /// # Errors
    ///
    /// Returns the normalized API failure; the thread renders it as a message.
    async fn submit(&self, api: &dyn DashboardApi, question: &str) -> Result<Self::Reply, ApiError>;

    /// Turn the outcome of `submit` into the assistant message to append.
    /// `now` is already in the thread's display offset.
    fn reply_message(&self, question: &str, reply: Result<Self::Reply, ApiError>, now: OffsetDateTime) -> Message;

    /// Fetch persisted history rows, oldest first. Empty on failure.
    async fn fetch_history(&self, api: &dyn DashboardApi) -> Vec<Self::HistoryRow>;

    /// Expand one history row into the messages it replays as, with
    /// timestamps read in `offset`.
    fn history_messages(&self, row: Self::HistoryRow, offset: UtcOffset) -> Vec<Message>;
}

// =============================================================================
// THREAD STATE
// =============================================================================

/// Snapshot of one conversation thread.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThreadState {
    pub messages: Vec<Message>,
    /// True while a question is in flight.
    pub sending: bool,
    /// True while the one-time history fetch is in flight.
    pub awaiting_history: bool,
    /// Flips to true once per activation, whether or not the fetch succeeded.
    pub history_loaded: bool,
    epoch: u64,
}

/// Result of a [`Conversation::send`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty input or a request already in flight; nothing happened.
    Ignored,
    /// The backend answered and the reply was appended.
    Replied,
    /// The request failed and an apology message was appended.
    Failed,
    /// The thread was reset while the request was in flight; the reply was dropped.
    Stale,
}

struct PendingSend {
    question: String,
    epoch: u64,
}

// =============================================================================
// CONVERSATION
// =============================================================================

/// A conversation thread parameterized by its send strategy.
pub struct Conversation<S: ThreadStrategy> {
    api: Arc<dyn DashboardApi>,
    strategy: S,
    /// Display offset for every timestamp in the thread.
    utc_offset: UtcOffset,
    thread: Mutex<ThreadState>,
}

impl<S: ThreadStrategy> Conversation<S> {
    pub fn new(api: Arc<dyn DashboardApi>, strategy: S) -> Self {
        Self { api, strategy, utc_offset: UtcOffset::UTC, thread: Mutex::new(ThreadState::default()) }
    }

    /// Stamp and read timestamps in `offset` instead of UTC.
    #[must_use]
    pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn utc_offset(&self) -> UtcOffset {
        self.utc_offset
    }

    /// Clone of the current thread state.
    pub fn snapshot(&self) -> ThreadState {
        self.lock().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn is_sending(&self) -> bool {
        self.lock().sending
    }

    /// Hydrate persisted history on first activation.
    ///
    /// Returns `true` if this call performed the fetch. Later calls, and
    /// calls while the first fetch is still running, return `false`.
    pub async fn activate(&self) -> bool {
        let Some(epoch) = self.begin_history() else {
            return false;
        };
        let rows = self.strategy.fetch_history(self.api.as_ref()).await;
        self.complete_history(epoch, rows)
    }

    /// Send the contents of `input` as a question.
    ///
    /// On acceptance the user message is appended immediately and `input`
    /// is cleared; on rejection `input` is left untouched.
    pub async fn send(&self, input: &mut String) -> SendOutcome {
        let Some(pending) = self.begin_send(input) else {
            return SendOutcome::Ignored;
        };
        let reply = self.strategy.submit(self.api.as_ref(), &pending.question).await;
        self.complete_send(pending, reply)
    }

    /// Discard all messages and flags, as on a page reload.
    pub fn reset(&self) {
        let mut thread = self.lock();
        let epoch = thread.epoch.wrapping_add(1);
        *thread = ThreadState { epoch, ..ThreadState::default() };
        debug!(thread = self.strategy.name(), epoch, "thread reset");
    }

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.utc_offset)
    }

    fn lock(&self) -> MutexGuard<'_, ThreadState> {
        self.thread.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_history(&self) -> Option<u64> {
        let mut thread = self.lock();
        if thread.history_loaded || thread.awaiting_history {
            return None;
        }
        thread.awaiting_history = true;
        Some(thread.epoch)
    }

    fn complete_history(&self, epoch: u64, rows: Vec<S::HistoryRow>) -> bool {
        let mut thread = self.lock();
        if thread.epoch != epoch {
            debug!(thread = self.strategy.name(), "dropping history for a reset thread");
            return false;
        }
        let replayed: Vec<Message> = rows
            .into_iter()
            .flat_map(|row| self.strategy.history_messages(row, self.utc_offset))
            .collect();
        info!(thread = self.strategy.name(), messages = replayed.len(), "history hydrated");
        // Anything sent while history was loading is newer than every replayed row.
        thread.messages.splice(0..0, replayed);
        thread.awaiting_history = false;
        thread.history_loaded = true;
        true
    }

    fn begin_send(&self, input: &mut String) -> Option<PendingSend> {
        let mut thread = self.lock();
        let question = input.trim();
        if question.is_empty() || thread.sending {
            return None;
        }
        let question = question.to_owned();
        thread.messages.push(Message::user(question.clone(), Some(self.now())));
        input.clear();
        thread.sending = true;
        debug!(thread = self.strategy.name(), "sending");
        Some(PendingSend { question, epoch: thread.epoch })
    }

    fn complete_send(&self, pending: PendingSend, reply: Result<S::Reply, ApiError>) -> SendOutcome {
        let mut thread = self.lock();
        if thread.epoch != pending.epoch {
            debug!(thread = self.strategy.name(), "dropping reply for a reset thread");
            return SendOutcome::Stale;
        }
        let outcome = if reply.is_ok() { SendOutcome::Replied } else { SendOutcome::Failed };
        let message = self
            .strategy
            .reply_message(&pending.question, reply, self.now());
        thread.messages.push(message);
        thread.sending = false;
        info!(thread = self.strategy.name(), ?outcome, "reply appended");
        outcome
    }
}
