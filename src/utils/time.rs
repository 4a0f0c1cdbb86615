//! Timestamp helpers for chat messages.

use time::OffsetDateTime;
use time::macros::format_description;

/// Serde adapter storing an [`OffsetDateTime`] as an RFC 3339 string.
///
/// Use with `#[serde(with = "crate::utils::time::rfc3339")]`.
pub mod rfc3339 {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    /// Deserialize an RFC 3339 formatted string into an OffsetDateTime
    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
    }

    /// Serialize an OffsetDateTime into an RFC 3339 formatted string
    pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = datetime
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&s)
    }
}

/// The current time in UTC.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Formats a timestamp as `HH:MM` for display next to a message.
pub fn clock(datetime: OffsetDateTime) -> String {
    datetime
        .format(format_description!("[hour]:[minute]"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn clock_is_zero_padded() {
        assert_eq!(clock(datetime!(2026-03-01 08:05 +08:00)), "08:05");
        assert_eq!(clock(datetime!(2026-03-01 17:30 UTC)), "17:30");
    }

    #[test]
    fn rfc3339_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Stamp {
            #[serde(with = "rfc3339")]
            at: OffsetDateTime,
        }

        let stamp = Stamp {
            at: datetime!(2026-03-01 08:05:09 +08:00),
        };
        let json = serde_json::to_string(&stamp).unwrap();
        assert_eq!(json, r#"{"at":"2026-03-01T08:05:09+08:00"}"#);
        let parsed: Stamp = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.at, stamp.at);
    }
}
