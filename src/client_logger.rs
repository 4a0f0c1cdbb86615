//! Logging hook for completion calls.
//!
//! This module provides the [`ClientLogger`] trait that lets callers capture
//! every question sent to the completion backend, every reply, and every
//! failure that was turned into a fallback reply. [`TracingLogger`] forwards
//! them to `tracing` and is what [`WithFallback`](crate::WithFallback) uses
//! unless another logger is installed.

use crate::Error;

/// A trait for logging completion calls.
///
/// # Example
///
/// ```rust,ignore
/// use clinic_chat::{ClientLogger, Error};
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, user_text: &str, history: &[String]) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "ask ({} prior): {user_text}", history.len()).unwrap();
///     }
///
///     fn log_reply(&self, reply: &str) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "reply: {reply}").unwrap();
///     }
///
///     fn log_failure(&self, error: &Error) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "failure: {error}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a question before it is sent, with the transcript that accompanies it.
    fn log_request(&self, user_text: &str, history: &[String]);

    /// Log a reply returned by the backend.
    fn log_reply(&self, reply: &str);

    /// Log a backend failure. The caller shows the fallback reply instead.
    fn log_failure(&self, error: &Error);
}

/// Logs completion calls as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl ClientLogger for TracingLogger {
    fn log_request(&self, user_text: &str, history: &[String]) {
        tracing::debug!(
            history_len = history.len(),
            chars = user_text.chars().count(),
            "sending question to completion backend"
        );
    }

    fn log_reply(&self, reply: &str) {
        tracing::debug!(
            chars = reply.chars().count(),
            "completion backend replied"
        );
    }

    fn log_failure(&self, error: &Error) {
        tracing::warn!(
            error = %error,
            status = ?error.status_code(),
            "completion failed; answering with fallback reply"
        );
    }
}
