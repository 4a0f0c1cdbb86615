//! Clinic profile: the branding and contact data the assistant presents.
//!
//! A profile can be loaded from YAML. Every field is optional and falls back
//! to the built-in clinic profile:
//!
//! ```yaml
//! name: "高健診所"
//! phone: "02-1234-5678"
//! contact_url: "https://lin.ee/RIY5AtG"
//! greeting: |
//!   您好！有什麼我可以幫您的嗎？
//!   **門診時間**
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::markup::DEFAULT_CONTACT_URL;

const DEFAULT_NAME: &str = "高健診所";

const DEFAULT_GREETING: &str = "您好！有什麼我可以幫您的嗎？\n我是高健診所 AI 健康助理\n我會協助您解答 :\n**洗腎飲食**\n**護腎飲食**\n**腎臟健康**\n**門診時間**\n**預約掛號**\n**接送服務**";

const DEFAULT_FALLBACK_REPLY: &str =
    "抱歉，AI 助理暫時無法回應，請稍後再試，或直接透過 Line 與診所聯絡：https://lin.ee/RIY5AtG";

const DEFAULT_DISCLAIMER: &str = "此資訊僅供參考，無法取代醫師親自診斷，請務必回診評估。";

const DEFAULT_SYSTEM_PROMPT: &str = r#"你是高健診所的 AI 健康助理，專精腎臟保健、洗腎與護腎飲食、門診與掛號資訊。
請使用繁體中文，語氣親切、簡潔。
回覆可以使用以下標記，前端會轉成對應的元件：
- **關鍵字**：可點選的按鈕，點選後會以該關鍵字再次提問。
- [[文字]]：紅色警示。
- {{文字}}：綠色重點標示。
- ((文字))：橘色的就醫指引區塊。
- 以 "- " 開頭的行：條列項目。
- 需要真人協助或預約時，附上 https://lin.ee/RIY5AtG 會顯示 Line 諮詢與撥打電話按鈕。
不要做出診斷；出現急症徵兆時請提醒使用者立即就醫。"#;

/// Branding, contact data, and canned texts for one clinic.
///
/// The built-in profile ships without a phone number, so its contact block
/// offers only the messaging link; the dialer appears once `phone` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicProfile {
    /// Display name of the clinic.
    pub name: String,

    /// The seeded first message of every conversation.
    pub greeting: String,

    /// Reply shown when the completion backend fails.
    pub fallback_reply: String,

    /// Messaging link that the formatter turns into a contact block.
    pub contact_url: String,

    /// Phone number for the contact block's dialer. `None` hides the dialer.
    pub phone: Option<String>,

    /// Disclaimer shown under the contact block.
    pub disclaimer: String,

    /// Instructions for the model, including the reply markup it may use.
    pub system_prompt: String,
}

impl ClinicProfile {
    /// Parses a profile from YAML and validates it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let profile: ClinicProfile = serde_yaml::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Loads a profile from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|err| {
            Error::io(format!("failed to read profile {}", path.display()), err)
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Checks that the profile can drive a conversation.
    pub fn validate(&self) -> Result<()> {
        if self.greeting.trim().is_empty() {
            return Err(Error::validation(
                "greeting must not be empty",
                Some("greeting".to_string()),
            ));
        }
        if self.fallback_reply.trim().is_empty() {
            return Err(Error::validation(
                "fallback reply must not be empty",
                Some("fallback_reply".to_string()),
            ));
        }
        let url = url::Url::parse(&self.contact_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::validation(
                format!("contact url must be http(s), got {}", url.scheme()),
                Some("contact_url".to_string()),
            ));
        }
        Ok(())
    }

    /// The `tel:` link for the dialer button, if a phone number is set.
    pub fn phone_link(&self) -> Option<String> {
        self.phone.as_deref().map(|phone| {
            let digits: String = phone
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect();
            format!("tel:{digits}")
        })
    }
}

impl Default for ClinicProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            contact_url: DEFAULT_CONTACT_URL.to_string(),
            phone: None,
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}
