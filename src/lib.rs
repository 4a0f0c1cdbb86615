// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod completion;
pub mod error;
pub mod markup;
pub mod observability;
pub mod profile;
pub mod utils;

// Re-exports
pub use client::Gemini;
pub use client_logger::{ClientLogger, TracingLogger};
pub use completion::{Completer, CompletionClient, WithFallback};
pub use error::{Error, Result};
pub use markup::{Line, MarkupFormatter, RenderToken};
pub use observability::register_biometrics;
pub use profile::ClinicProfile;
