use super::*;
use crate::net::test_helpers::MockApi;
use crate::net::types::{Analysis, ChatHistoryRow};
use crate::state::analysis::AnalysisStrategy;
use crate::state::message::Role;
use tokio::sync::Notify;

fn analysis(summary: &str) -> Result<Analysis, ApiError> {
    Ok(Analysis { summary: summary.to_owned(), timestamp: Some("2024-12-06T10:00:00".to_owned()) })
}

fn thread_with(api: &Arc<MockApi>) -> Conversation<AnalysisStrategy> {
    Conversation::new(api.clone(), AnalysisStrategy::default())
}

// =============================================================
// send
// =============================================================

#[tokio::test]
async fn send_appends_user_then_assistant_and_clears_input() {
    let api = Arc::new(MockApi::with_analyses(vec![analysis("Books lead.")]));
    let thread = thread_with(&api);
    let mut input = "  top categories?  ".to_owned();

    let outcome = thread.send(&mut input).await;

    assert_eq!(outcome, SendOutcome::Replied);
    assert!(input.is_empty());
    let messages = thread.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "top categories?");
    assert!(messages[0].timestamp.is_some());
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Books lead.");
    assert!(!thread.is_sending());
    assert_eq!(api.calls(), vec!["analyze_text:top categories?"]);
}

#[tokio::test]
async fn send_rejects_blank_input_without_network() {
    let api = Arc::new(MockApi::default());
    let thread = thread_with(&api);
    let mut input = "   \n\t".to_owned();

    assert_eq!(thread.send(&mut input).await, SendOutcome::Ignored);
    assert_eq!(input, "   \n\t");
    assert!(thread.messages().is_empty());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn send_failure_appends_apology_and_leaves_sending() {
    let api = Arc::new(MockApi::with_analyses(vec![Err(ApiError::Status { status: 502 })]));
    let thread = thread_with(&api);
    let mut input = "revenue?".to_owned();

    assert_eq!(thread.send(&mut input).await, SendOutcome::Failed);

    let messages = thread.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Sorry, I ran into an issue: request failed with status 502");
    assert!(!thread.is_sending());
}

#[tokio::test]
async fn failed_send_allows_immediate_retry() {
    let api = Arc::new(MockApi::with_analyses(vec![Err(ApiError::Transport("reset".into())), analysis("ok")]));
    let thread = thread_with(&api);

    let mut input = "q".to_owned();
    assert_eq!(thread.send(&mut input).await, SendOutcome::Failed);
    let mut input = "q".to_owned();
    assert_eq!(thread.send(&mut input).await, SendOutcome::Replied);
    assert_eq!(thread.messages().len(), 4);
}

#[tokio::test]
async fn send_while_sending_is_a_no_op() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(MockApi { gate: Some(gate.clone()), ..MockApi::with_analyses(vec![analysis("first reply")]) });
    let thread = Arc::new(thread_with(&api));

    let first = {
        let thread = thread.clone();
        tokio::spawn(async move {
            let mut input = "first".to_owned();
            thread.send(&mut input).await
        })
    };
    while !thread.is_sending() {
        tokio::task::yield_now().await;
    }

    let before = thread.messages().len();
    let mut second = "second".to_owned();
    assert_eq!(thread.send(&mut second).await, SendOutcome::Ignored);
    assert_eq!(second, "second");
    assert_eq!(thread.messages().len(), before);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), SendOutcome::Replied);
    assert_eq!(api.call_count("analyze_text"), 1);
    let contents: Vec<String> = thread.messages().into_iter().map(|m| m.content).collect();
    assert_eq!(contents, vec!["first", "first reply"]);
}

#[tokio::test]
async fn reply_after_reset_is_dropped() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(MockApi { gate: Some(gate.clone()), ..MockApi::with_analyses(vec![analysis("late")]) });
    let thread = Arc::new(thread_with(&api));

    let pending = {
        let thread = thread.clone();
        tokio::spawn(async move {
            let mut input = "slow question".to_owned();
            thread.send(&mut input).await
        })
    };
    while !thread.is_sending() {
        tokio::task::yield_now().await;
    }

    thread.reset();
    gate.notify_one();

    assert_eq!(pending.await.unwrap(), SendOutcome::Stale);
    assert!(thread.messages().is_empty());
    assert!(!thread.is_sending());
}

// =============================================================
// activate
// =============================================================

#[tokio::test]
async fn activate_hydrates_once() {
    let api = Arc::new(MockApi::default());
    api.chat_history.lock().unwrap().push(ChatHistoryRow {
        user_message: "q1".into(),
        assistant_response: "a1".into(),
        created_at: Some("2024-12-01T09:00:00".into()),
    });
    let thread = thread_with(&api);

    assert!(thread.activate().await);
    assert!(!thread.activate().await);

    assert!(thread.snapshot().history_loaded);
    assert_eq!(thread.messages().len(), 2);
    assert_eq!(api.call_count("fetch_chat_history"), 1);
}

#[tokio::test]
async fn activate_with_failed_history_starts_empty_and_is_not_retried() {
    let api = Arc::new(MockApi::default());
    let thread = thread_with(&api);

    assert!(thread.activate().await);
    let state = thread.snapshot();
    assert!(state.history_loaded);
    assert!(!state.awaiting_history);
    assert!(state.messages.is_empty());

    assert!(!thread.activate().await);
    assert_eq!(api.call_count("fetch_chat_history"), 1);
}

#[tokio::test]
async fn reset_allows_history_to_load_again() {
    let api = Arc::new(MockApi::default());
    let thread = thread_with(&api);

    thread.activate().await;
    thread.reset();
    assert!(!thread.snapshot().history_loaded);
    assert!(thread.activate().await);
    assert_eq!(api.call_count("fetch_chat_history"), 2);
}

#[test]
fn failure_text_wraps_rejection_verbatim() {
    assert_eq!(failure_text(&ApiError::Rejected("LLM timeout".into())), "Sorry, I ran into an issue: LLM timeout");
}

// =============================================================
// display offset
// =============================================================

#[tokio::test]
async fn thread_offset_stamps_user_and_reads_server_times_in_one_clock() {
    let pst = UtcOffset::from_hms(-8, 0, 0).unwrap();
    let api = Arc::new(MockApi::with_analyses(vec![analysis("Up 4%.")]));
    *api.chat_history.lock().unwrap() = vec![ChatHistoryRow {
        user_message: "old".into(),
        assistant_response: "older".into(),
        created_at: Some("2024-12-06T20:00:05".into()),
    }];
    let thread = Conversation::new(api.clone(), AnalysisStrategy::default()).with_utc_offset(pst);

    thread.activate().await;
    let mut input = "revenue?".to_owned();
    thread.send(&mut input).await;

    let messages = thread.messages();
    assert_eq!(messages.len(), 4);
    assert!(messages.iter().filter_map(|message| message.timestamp).all(|ts| ts.offset() == pst));
    assert_eq!(messages[0].timestamp.map(|ts| ts.hour()), Some(20));
}
