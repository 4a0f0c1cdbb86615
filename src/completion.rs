//! The completion boundary between a chat session and a language model.
//!
//! A session only depends on [`Completer`], whose calls cannot fail. Backends
//! implement the fallible [`CompletionClient`] and are turned into a
//! `Completer` by [`WithFallback`], which answers every failure with the
//! clinic's fallback reply.

use std::sync::Arc;

use crate::client_logger::{ClientLogger, TracingLogger};
use crate::error::Result;
use crate::observability::COMPLETION_FALLBACKS;

/// Produces the assistant's reply to a question. Never fails.
#[async_trait::async_trait]
pub trait Completer: Send + Sync {
    /// Answers `user_text` given the transcript of the conversation before it.
    ///
    /// `history` holds one `"<RoleLabel>: <text>"` line per earlier message.
    async fn complete(&self, user_text: &str, history: &[String]) -> String;
}

#[async_trait::async_trait]
impl<T: Completer + ?Sized> Completer for Arc<T> {
    async fn complete(&self, user_text: &str, history: &[String]) -> String {
        (**self).complete(user_text, history).await
    }
}

#[async_trait::async_trait]
impl<T: Completer + ?Sized> Completer for Box<T> {
    async fn complete(&self, user_text: &str, history: &[String]) -> String {
        (**self).complete(user_text, history).await
    }
}

/// A language model backend that may fail.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generates a reply to `user_text` given the prior transcript.
    async fn generate(&self, user_text: &str, history: &[String]) -> Result<String>;
}

#[async_trait::async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    async fn generate(&self, user_text: &str, history: &[String]) -> Result<String> {
        (**self).generate(user_text, history).await
    }
}

/// Adapts a [`CompletionClient`] into a [`Completer`] by replacing errors
/// with a fixed fallback reply.
pub struct WithFallback<C: CompletionClient> {
    client: C,
    fallback_reply: String,
    logger: Arc<dyn ClientLogger>,
}

impl<C: CompletionClient> WithFallback<C> {
    /// Wraps `client`, answering failures with `fallback_reply`.
    pub fn new(client: C, fallback_reply: impl Into<String>) -> Self {
        Self {
            client,
            fallback_reply: fallback_reply.into(),
            logger: Arc::new(TracingLogger),
        }
    }

    /// Replaces the default `tracing` logger.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// The reply used when the backend fails.
    pub fn fallback_reply(&self) -> &str {
        &self.fallback_reply
    }

    /// The wrapped backend.
    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait::async_trait]
impl<C: CompletionClient> Completer for WithFallback<C> {
    async fn complete(&self, user_text: &str, history: &[String]) -> String {
        self.logger.log_request(user_text, history);
        match self.client.generate(user_text, history).await {
            Ok(reply) => {
                self.logger.log_reply(&reply);
                reply
            }
            Err(err) => {
                COMPLETION_FALLBACKS.click();
                self.logger.log_failure(&err);
                self.fallback_reply.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<Result<String>>>);

    #[async_trait::async_trait]
    impl CompletionClient for Scripted {
        async fn generate(&self, _user_text: &str, _history: &[String]) -> Result<String> {
            self.0.lock().unwrap().remove(0)
        }
    }

    #[derive(Default)]
    struct RecordingLogger(Mutex<Vec<String>>);

    impl ClientLogger for RecordingLogger {
        fn log_request(&self, user_text: &str, history: &[String]) {
            self.0
                .lock()
                .unwrap()
                .push(format!("request {user_text} {}", history.len()));
        }

        fn log_reply(&self, reply: &str) {
            self.0.lock().unwrap().push(format!("reply {reply}"));
        }

        fn log_failure(&self, error: &Error) {
            self.0.lock().unwrap().push(format!("failure {error}"));
        }
    }

    #[tokio::test]
    async fn success_passes_reply_through() {
        let logger = Arc::new(RecordingLogger::default());
        let completer = WithFallback::new(Scripted(Mutex::new(vec![Ok("好的".to_string())])), "稍後再試")
            .with_logger(logger.clone());
        let reply = completer.complete("門診時間", &["Assistant: 您好".to_string()]).await;
        assert_eq!(reply, "好的");
        assert_eq!(
            *logger.0.lock().unwrap(),
            vec!["request 門診時間 1".to_string(), "reply 好的".to_string()]
        );
    }

    #[tokio::test]
    async fn failure_becomes_fallback_reply() {
        let logger = Arc::new(RecordingLogger::default());
        let completer = WithFallback::new(
            Scripted(Mutex::new(vec![Err(Error::rate_limit("slow down", None))])),
            "稍後再試",
        )
        .with_logger(logger.clone());
        assert_eq!(completer.fallback_reply(), "稍後再試");
        let reply = completer.complete("掛號", &[]).await;
        assert_eq!(reply, "稍後再試");
        assert_eq!(
            *logger.0.lock().unwrap(),
            vec![
                "request 掛號 0".to_string(),
                "failure Rate limit exceeded: slow down".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn shared_completer_delegates() {
        let completer: Arc<dyn Completer> = Arc::new(WithFallback::new(
            Scripted(Mutex::new(vec![Err(Error::empty_reply(None))])),
            "fallback",
        ));
        assert_eq!(completer.complete("hi", &[]).await, "fallback");
    }
}
