//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::{DEFAULT_MODEL, Gemini};
use crate::error::{Error, Result};
use crate::profile::ClinicProfile;

/// Default HTTP timeout for completion requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Command-line arguments for the clinic-chat tool.
#[derive(CommandLine, Debug, Default, Eq, PartialEq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemini-2.5-flash)", "MODEL")]
    pub model: Option<String>,

    /// System prompt overriding the clinic profile's.
    #[arrrg(optional, "System prompt for the assistant", "PROMPT")]
    pub system: Option<String>,

    /// Clinic profile YAML file.
    #[arrrg(optional, "Clinic profile YAML (name, phone, greeting, ...)", "FILE")]
    pub profile: Option<String>,

    /// Alternate API base URL.
    #[arrrg(optional, "API base URL (default: Gemini v1beta)", "URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Sampling temperature, parsed when the config is built.
    #[arrrg(optional, "Sampling temperature (0.0 to 2.0)", "TEMP")]
    pub temperature: Option<String>,

    /// Maximum output tokens per reply.
    #[arrrg(optional, "Max output tokens per reply", "TOKENS")]
    pub max_output_tokens: Option<u32>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The model to use for generating replies.
    pub model: String,

    /// System prompt override; `None` uses the profile's system prompt.
    pub system_prompt: Option<String>,

    /// Branding, greeting, fallback reply, and contact data.
    pub profile: ClinicProfile,

    /// Where the profile was loaded from, if not built in.
    pub profile_path: Option<PathBuf>,

    /// Alternate API base URL.
    pub base_url: Option<String>,

    /// HTTP timeout for one completion request.
    pub timeout: Duration,

    /// Optional sampling temperature.
    pub temperature: Option<f32>,

    /// Optional cap on output tokens.
    pub max_output_tokens: Option<u32>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-2.5-flash
    /// - Profile: the built-in clinic profile
    /// - Timeout: 60 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
            profile: ClinicProfile::default(),
            profile_path: None,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            temperature: None,
            max_output_tokens: None,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system prompt override.
    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    /// Sets the clinic profile.
    pub fn with_profile(mut self, profile: ClinicProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the output token cap.
    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The system prompt actually sent: the override, else the profile's.
    pub fn effective_system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(&self.profile.system_prompt)
    }

    /// Checks ranges that the API would otherwise reject on every request.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::validation(
                "model must not be empty",
                Some("model".to_string()),
            ));
        }
        if let Some(temperature) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(Error::validation(
                format!("temperature must be between 0.0 and 2.0, got {temperature}"),
                Some("temperature".to_string()),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::validation(
                "timeout must be positive",
                Some("timeout".to_string()),
            ));
        }
        self.profile.validate()
    }

    /// Builds the Gemini backend described by this configuration.
    pub fn gemini(&self, api_key: Option<String>) -> Result<Gemini> {
        self.validate()?;
        Ok(
            Gemini::with_options(api_key, self.base_url.clone(), Some(self.timeout))?
                .with_model(self.model.clone())
                .with_system_prompt(Some(self.effective_system_prompt().to_string()))
                .with_temperature(self.temperature)
                .with_max_output_tokens(self.max_output_tokens),
        )
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let profile = match &args.profile {
            Some(path) => ClinicProfile::from_file(path)?,
            None => ClinicProfile::default(),
        };
        let temperature = args
            .temperature
            .as_deref()
            .map(parse_temperature)
            .transpose()?;
        let config = ChatConfig {
            model: args.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: args.system,
            profile,
            profile_path: args.profile.map(PathBuf::from),
            base_url: args.base_url,
            timeout: args
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            temperature,
            max_output_tokens: args.max_output_tokens,
            use_color: !args.no_color,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_temperature(value: &str) -> Result<f32> {
    value.trim().parse::<f32>().map_err(|_| {
        Error::validation(
            format!("temperature must be a number, got {value:?}"),
            Some("temperature".to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!(config.system_prompt.is_none());
        assert_eq!(config.profile, ClinicProfile::default());
        assert!(config.profile_path.is_none());
        assert!(config.base_url.is_none());
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.temperature.is_none());
        assert!(config.max_output_tokens.is_none());
        assert!(config.use_color);
        config.validate().unwrap();
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.use_color);
        assert_eq!(
            config.effective_system_prompt(),
            ClinicProfile::default().system_prompt
        );
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("gemini-2.5-pro".to_string()),
            system: Some("Answer briefly.".to_string()),
            timeout: Some(15),
            temperature: Some("0.4".to_string()),
            max_output_tokens: Some(800),
            no_color: true,
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.effective_system_prompt(), "Answer briefly.");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.temperature, Some(0.4));
        assert_eq!(config.max_output_tokens, Some(800));
        assert!(!config.use_color);
    }

    #[test]
    fn config_from_args_missing_profile() {
        let args = ChatArgs {
            profile: Some("/nonexistent/profile.yaml".to_string()),
            ..ChatArgs::default()
        };
        assert!(matches!(
            ChatConfig::try_from(args),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn config_from_args_bad_temperature() {
        let args = ChatArgs {
            temperature: Some("warm".to_string()),
            ..ChatArgs::default()
        };
        let err = ChatConfig::try_from(args).unwrap_err();
        assert!(err.is_validation());

        let args = ChatArgs {
            temperature: Some("2.5".to_string()),
            ..ChatArgs::default()
        };
        let err = ChatConfig::try_from(args).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn out_of_range_values_rejected() {
        let err = ChatConfig::new()
            .with_temperature(Some(3.5))
            .validate()
            .unwrap_err();
        assert!(err.is_validation());
        let err = ChatConfig::new()
            .with_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.is_validation());
        let err = ChatConfig::new().with_model(" ").validate().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn config_builder_pattern() {
        let profile = ClinicProfile {
            phone: Some("02-1234-5678".to_string()),
            ..ClinicProfile::default()
        };
        let config = ChatConfig::new()
            .with_model("gemini-2.5-flash-lite")
            .with_system_prompt("Test prompt".to_string())
            .with_profile(profile.clone())
            .with_base_url(Some("http://localhost:9000/".to_string()))
            .with_timeout(Duration::from_secs(5))
            .with_temperature(Some(0.2))
            .with_max_output_tokens(Some(256))
            .without_color();

        assert_eq!(config.model, "gemini-2.5-flash-lite");
        assert_eq!(config.system_prompt, Some("Test prompt".to_string()));
        assert_eq!(config.profile, profile);
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:9000/"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_output_tokens, Some(256));
        assert!(!config.use_color);
    }

    #[test]
    fn gemini_backend_from_config() {
        let config = ChatConfig::new()
            .with_model("gemini-2.5-pro")
            .with_base_url(Some("http://localhost:9000/v1beta".to_string()));
        let gemini = config.gemini(Some("test-key".to_string())).unwrap();
        assert_eq!(gemini.model(), "gemini-2.5-pro");
        assert_eq!(
            gemini.endpoint().unwrap().as_str(),
            "http://localhost:9000/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }
}
