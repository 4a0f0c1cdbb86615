//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns one conversation
//! and drives the send/receive cycle against a [`Completer`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::chat::message::{Message, Role, transcript};
use crate::completion::Completer;
use crate::observability::{
    SESSION_IGNORED_BUSY, SESSION_IGNORED_EMPTY, SESSION_SUBMISSIONS, SESSION_TURN_DURATION,
};

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The question was asked and this reply was appended.
    Replied(Message),
    /// The text was empty or whitespace only; nothing changed.
    Empty,
    /// Another request was in flight; the submission was dropped.
    Busy,
}

impl SubmitOutcome {
    /// The appended reply, if the submission went through.
    pub fn reply(&self) -> Option<&Message> {
        match self {
            SubmitOutcome::Replied(message) => Some(message),
            SubmitOutcome::Empty | SubmitOutcome::Busy => None,
        }
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The number of messages in the conversation, greeting included.
    pub message_count: usize,
    /// Completed requests to the completer.
    pub total_requests: u64,
    /// Submissions dropped because they were empty.
    pub ignored_empty: u64,
    /// Submissions dropped because a request was in flight.
    pub ignored_busy: u64,
    /// Whether a request is in flight right now.
    pub in_flight: bool,
}

/// A chat session that owns one conversation.
///
/// The conversation starts with the greeting and only ever grows by appending.
/// All methods take `&self` so the session can be shared between the input
/// loop and whatever renders it; at most one request is in flight at a time.
pub struct ChatSession<C: Completer> {
    completer: C,
    greeting: String,
    messages: Mutex<Vec<Message>>,
    in_flight: AtomicBool,
    request_count: AtomicU64,
    ignored_empty: AtomicU64,
    ignored_busy: AtomicU64,
}

impl<C: Completer> ChatSession<C> {
    /// Creates a new session seeded with `greeting`.
    pub fn new(completer: C, greeting: impl Into<String>) -> Self {
        let session = Self {
            completer,
            greeting: greeting.into(),
            messages: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            request_count: AtomicU64::new(0),
            ignored_empty: AtomicU64::new(0),
            ignored_busy: AtomicU64::new(0),
        };
        session.initialize();
        session
    }

    /// Replaces the conversation with the single greeting message.
    pub fn initialize(&self) {
        *self.lock_messages() = vec![Message::model(self.greeting.clone())];
    }

    /// Starts the conversation over.
    ///
    /// Returns `false`, leaving the conversation untouched, while a request is
    /// in flight.
    pub fn clear(&self) -> bool {
        let Some(_guard) = InFlight::begin(&self.in_flight) else {
            return false;
        };
        self.initialize();
        tracing::debug!("conversation cleared");
        true
    }

    /// Sends a user message and waits for the reply.
    ///
    /// This method:
    /// 1. Drops empty submissions and submissions made while in flight
    /// 2. Snapshots the transcript of the conversation so far
    /// 3. Adds the trimmed user message to the conversation
    /// 4. Asks the completer, passing the snapshot as context
    /// 5. Adds the reply to the conversation
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            SESSION_IGNORED_EMPTY.click();
            self.ignored_empty.fetch_add(1, Ordering::Relaxed);
            return SubmitOutcome::Empty;
        }
        let Some(_guard) = InFlight::begin(&self.in_flight) else {
            SESSION_IGNORED_BUSY.click();
            self.ignored_busy.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("submission dropped; request in flight");
            return SubmitOutcome::Busy;
        };
        SESSION_SUBMISSIONS.click();

        let history = {
            let mut messages = self.lock_messages();
            let history = transcript(&messages);
            messages.push(Message::user(text));
            history
        };

        let start = Instant::now();
        let reply = self.completer.complete(text, &history).await;
        SESSION_TURN_DURATION.add(start.elapsed().as_secs_f64());
        self.request_count.fetch_add(1, Ordering::Relaxed);

        let reply = Message::model(reply);
        self.lock_messages().push(reply.clone());
        SubmitOutcome::Replied(reply)
    }

    /// Asks the keyword of an activated button; identical to typing it.
    pub async fn activate_button(&self, keyword: &str) -> SubmitOutcome {
        self.submit(keyword).await
    }

    /// Returns true while a request is outstanding.
    ///
    /// Buttons should be rendered disabled while this holds.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// A snapshot of the conversation, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.lock_messages().clone()
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.lock_messages().len()
    }

    /// The most recent model message.
    pub fn last_reply(&self) -> Option<Message> {
        self.lock_messages()
            .iter()
            .rev()
            .find(|message| message.role == Role::Model)
            .cloned()
    }

    /// The conversation as transcript lines.
    pub fn transcript(&self) -> Vec<String> {
        transcript(&self.lock_messages())
    }

    /// The greeting every conversation starts with.
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// The completer this session asks.
    pub fn completer(&self) -> &C {
        &self.completer
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            message_count: self.message_count(),
            total_requests: self.request_count.load(Ordering::Relaxed),
            ignored_empty: self.ignored_empty.load(Ordering::Relaxed),
            ignored_busy: self.ignored_busy.load(Ordering::Relaxed),
            in_flight: self.is_in_flight(),
        }
    }

    fn lock_messages(&self) -> MutexGuard<'_, Vec<Message>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the in-flight latch; releasing it on drop also covers a submission
/// future that is dropped before the reply arrives.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn begin(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// Echoes the question and records what it was asked.
    #[derive(Default)]
    struct Echo {
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait::async_trait]
    impl Completer for Echo {
        async fn complete(&self, user_text: &str, history: &[String]) -> String {
            self.calls
                .lock()
                .unwrap()
                .push((user_text.to_string(), history.to_vec()));
            format!("關於「{user_text}」：**預約掛號**")
        }
    }

    /// Parks inside `complete` until released.
    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl Completer for Gate {
        async fn complete(&self, _user_text: &str, _history: &[String]) -> String {
            self.entered.notify_one();
            self.release.notified().await;
            "done".to_string()
        }
    }

    #[test]
    fn new_session_has_greeting() {
        let session = ChatSession::new(Echo::default(), "您好");
        assert_eq!(session.message_count(), 1);
        let greeting = &session.messages()[0];
        assert_eq!(greeting.role, Role::Model);
        assert_eq!(greeting.text, "您好");
        assert_eq!(session.last_reply().unwrap().text, "您好");
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn submit_appends_user_then_model() {
        let session = ChatSession::new(Echo::default(), "您好");
        let outcome = session.submit("  門診時間 \n").await;
        assert_eq!(
            outcome.reply().map(|m| m.text.as_str()),
            Some("關於「門診時間」：**預約掛號**")
        );

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].text, "門診時間");
        assert_eq!(messages[2].role, Role::Model);
        assert!(messages[1].timestamp <= messages[2].timestamp);
    }

    #[tokio::test]
    async fn history_excludes_the_new_question() {
        let session = ChatSession::new(Echo::default(), "您好");
        session.submit("第一題").await;
        session.submit("第二題").await;

        let calls = session.completer().calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ("第一題".to_string(), vec!["Assistant: 您好".to_string()]));
        assert_eq!(
            calls[1].1,
            vec![
                "Assistant: 您好".to_string(),
                "User: 第一題".to_string(),
                "Assistant: 關於「第一題」：**預約掛號**".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn blank_submissions_are_ignored() {
        let session = ChatSession::new(Echo::default(), "您好");
        for text in ["", "   ", "\n\t"] {
            assert_eq!(session.submit(text).await, SubmitOutcome::Empty);
        }
        assert_eq!(session.message_count(), 1);
        assert!(session.completer().calls.lock().unwrap().is_empty());
        assert_eq!(session.stats().ignored_empty, 3);
    }

    #[tokio::test]
    async fn submissions_while_in_flight_are_dropped() {
        let gate = Arc::new(Gate::default());
        let session = ChatSession::new(gate.clone(), "您好");

        let first = session.submit("第一題");
        let second = async {
            gate.entered.notified().await;
            assert!(session.is_in_flight());
            let before = session.message_count();
            assert_eq!(before, 2);
            assert_eq!(session.submit("第二題").await, SubmitOutcome::Busy);
            assert_eq!(session.activate_button("門診時間").await, SubmitOutcome::Busy);
            assert!(!session.clear());
            assert_eq!(session.message_count(), before);
            gate.release.notify_one();
        };
        let (outcome, ()) = tokio::join!(first, second);

        assert_eq!(outcome.reply().map(|m| m.text.as_str()), Some("done"));
        assert_eq!(session.message_count(), 3);
        assert!(!session.is_in_flight());
        let stats = session.stats();
        assert_eq!(stats.ignored_busy, 2);
        assert_eq!(stats.total_requests, 1);
    }

    #[tokio::test]
    async fn dropped_submission_releases_latch() {
        let gate = Arc::new(Gate::default());
        let session = ChatSession::new(gate.clone(), "您好");
        {
            let pending = session.submit("第一題");
            tokio::pin!(pending);
            tokio::select! {
                _ = &mut pending => panic!("gate was never released"),
                _ = gate.entered.notified() => {}
            }
            assert!(session.is_in_flight());
        }
        assert!(!session.is_in_flight());
        // The question stays; no reply was recorded for it.
        assert_eq!(session.message_count(), 2);
    }

    #[tokio::test]
    async fn button_activation_matches_typing() {
        let typed = ChatSession::new(Echo::default(), "您好\n**門診時間**");
        let clicked = ChatSession::new(Echo::default(), "您好\n**門診時間**");

        typed.submit("門診時間").await;
        clicked.activate_button("門診時間").await;

        let strip = |messages: Vec<Message>| -> Vec<(Role, String)> {
            messages.into_iter().map(|m| (m.role, m.text)).collect()
        };
        assert_eq!(strip(typed.messages()), strip(clicked.messages()));
        assert_eq!(
            *typed.completer().calls.lock().unwrap(),
            *clicked.completer().calls.lock().unwrap()
        );
    }

    #[tokio::test]
    async fn clear_restores_greeting() {
        let session = ChatSession::new(Echo::default(), "您好");
        session.submit("掛號").await;
        assert_eq!(session.message_count(), 3);
        assert!(session.clear());
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.transcript(), vec!["Assistant: 您好".to_string()]);
        assert_eq!(session.greeting(), "您好");
    }
}
