//! Clipboard entry model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Length of generated entry ids
pub const ID_LEN: usize = 8;

/// Content category of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Plain text
    Text,
    /// Source code or structured text
    Code,
    /// URL
    Link,
    /// Image encoded as a data URL
    Image,
    /// Arbitrary file encoded as a data URL
    File,
}

impl EntryType {
    /// All variants, in display order
    pub const ALL: [EntryType; 5] = [
        EntryType::Text,
        EntryType::Code,
        EntryType::Link,
        EntryType::Image,
        EntryType::File,
    ];

    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Text => "text",
            EntryType::Code => "code",
            EntryType::Link => "link",
            EntryType::Image => "image",
            EntryType::File => "file",
        }
    }

    /// Whether the content is an encoded binary payload rather than text.
    ///
    /// Encoded payloads are stored verbatim; textual content is trimmed.
    pub fn is_encoded_payload(&self) -> bool {
        matches!(self, EntryType::Image | EntryType::File)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown entry type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entry type '{0}'")]
pub struct UnknownEntryType(pub String);

impl FromStr for EntryType {
    type Err = UnknownEntryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEntryType(s.to_string()))
    }
}

/// A single stored clipboard item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Random lowercase alphanumeric id
    pub id: String,

    /// Payload: text, URL, code, or data URL
    pub content: String,

    /// Declared or inferred content category
    #[serde(rename = "type")]
    pub entry_type: EntryType,

    /// Human-readable title
    #[serde(default)]
    pub label: String,

    /// Original file name
    #[serde(default)]
    pub filename: String,

    /// Creation time, milliseconds since the Unix epoch
    #[serde(rename = "ts", alias = "timestamp")]
    pub timestamp: i64,
}

impl Entry {
    /// Create a new entry stamped with a fresh id and the current time.
    ///
    /// `label` falls back to `filename` when empty.
    pub fn new(
        content: String,
        entry_type: EntryType,
        label: Option<String>,
        filename: Option<String>,
    ) -> Self {
        let filename = filename.unwrap_or_default();
        let label = label
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| filename.clone());

        Self {
            id: generate_id(),
            content,
            entry_type,
            label,
            filename,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Generate an entry id: [`ID_LEN`] lowercase hex characters from a v4 UUID
pub fn generate_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(ID_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_shape() {
        for _ in 0..50 {
            let id = generate_id();
            assert_eq!(id.len(), ID_LEN);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_label_falls_back_to_filename() {
        let entry = Entry::new(
            "data:image/png;base64,AAAA".to_string(),
            EntryType::Image,
            None,
            Some("shot.png".to_string()),
        );
        assert_eq!(entry.label, "shot.png");
        assert_eq!(entry.filename, "shot.png");

        let entry = Entry::new("x".to_string(), EntryType::Text, Some(String::new()), None);
        assert_eq!(entry.label, "");
        assert_eq!(entry.filename, "");
    }

    #[test]
    fn test_entry_type_parse() {
        assert_eq!("link".parse::<EntryType>(), Ok(EntryType::Link));
        assert_eq!("file".parse::<EntryType>(), Ok(EntryType::File));
        assert!("LINK".parse::<EntryType>().is_err());
        assert!("video".parse::<EntryType>().is_err());
    }

    #[test]
    fn test_serialized_field_names() {
        let entry = Entry {
            id: "abcd1234".to_string(),
            content: "hi".to_string(),
            entry_type: EntryType::Code,
            label: String::new(),
            filename: String::new(),
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "code");
        assert_eq!(json["ts"], 1_700_000_000_000i64);
        assert_eq!(json["label"], "");
    }

    #[test]
    fn test_deserialize_fills_optional_fields() {
        let entry: Entry = serde_json::from_str(
            r#"{"id":"a1b2c3d4","content":"x","type":"text","timestamp":5}"#,
        )
        .unwrap();
        assert_eq!(entry.timestamp, 5);
        assert_eq!(entry.label, "");
        assert_eq!(entry.filename, "");
    }
}
