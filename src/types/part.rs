//! Message and artifact part types.
//!
//! Parts are the smallest content units inside messages and artifacts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A discriminated union representing a part of a message or artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    /// A text content part.
    Text(TextPart),
    /// A file content part.
    File(FilePart),
    /// A structured data part.
    Data(DataPart),
}

impl Part {
    /// Creates a new text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(TextPart::new(text))
    }

    /// Creates a new file part with inline base64 bytes.
    pub fn file_bytes(bytes: impl Into<String>, mime_type: Option<String>) -> Self {
        Part::File(FilePart::with_bytes(bytes, mime_type))
    }

    /// Creates a new file part referencing a URI.
    pub fn file_uri(uri: impl Into<String>, mime_type: Option<String>) -> Self {
        Part::File(FilePart::with_uri(uri, mime_type))
    }

    /// Creates a new data part.
    pub fn data(data: serde_json::Value) -> Self {
        Part::Data(DataPart::new(data))
    }

    /// Returns true if this is a text part.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Part::Text(_))
    }

    /// Returns the text content if this is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(p) => Some(&p.text),
            _ => None,
        }
    }
}

/// Represents a text segment within a message or artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPart {
    /// The string content of the text part.
    pub text: String,
    /// Optional metadata associated with this part.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl TextPart {
    /// Creates a new text part.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
        }
    }
}

/// Represents a file segment within a message or artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilePart {
    /// The file content.
    pub file: FileContent,
    /// Optional metadata associated with this part.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl FilePart {
    /// Creates a new file part with inline bytes content.
    pub fn with_bytes(bytes: impl Into<String>, mime_type: Option<String>) -> Self {
        Self {
            file: FileContent::Bytes(FileWithBytes {
                bytes: bytes.into(),
                mime_type,
                name: None,
            }),
            metadata: None,
        }
    }

    /// Creates a new file part with URI content.
    pub fn with_uri(uri: impl Into<String>, mime_type: Option<String>) -> Self {
        Self {
            file: FileContent::Uri(FileWithUri {
                uri: uri.into(),
                mime_type,
                name: None,
            }),
            metadata: None,
        }
    }
}

/// File content can be provided inline as bytes or by URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FileContent {
    /// File content provided as base64-encoded bytes.
    Bytes(FileWithBytes),
    /// File content located at a URI.
    Uri(FileWithUri),
}

/// Represents a file with its content provided as base64-encoded bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileWithBytes {
    /// The base64-encoded content of the file.
    pub bytes: String,
    /// The MIME type of the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// An optional name for the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Represents a file with its content located at a URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileWithUri {
    /// A URL pointing to the file's content.
    pub uri: String,
    /// The MIME type of the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// An optional name for the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Represents a structured data segment within a message or artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPart {
    /// The structured data content.
    pub data: serde_json::Value,
    /// Optional metadata associated with this part.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl DataPart {
    /// Creates a new data part.
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            data,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_part_serialization() {
        let part = Part::text("Hello, world!");
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("\"kind\":\"text\""));
        assert!(json.contains("Hello, world!"));
    }

    #[test]
    fn test_file_part_bytes_serialization() {
        let part = Part::file_bytes("SGVsbG8=", Some("text/plain".into()));
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("\"kind\":\"file\""));
        assert!(json.contains("\"mimeType\":\"text/plain\""));
    }

    #[test]
    fn test_file_content_untagged_roundtrip() {
        let uri_part = Part::file_uri("https://example.com/a.bin", None);
        let json = serde_json::to_string(&uri_part).unwrap();
        let parsed: Part = serde_json::from_str(&json).unwrap();
        assert_eq!(uri_part, parsed);
    }

    #[test]
    fn test_data_part() {
        let part = Part::data(serde_json::json!({"answer": 42}));
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("\"kind\":\"data\""));
        let parsed: Part = serde_json::from_str(&json).unwrap();
        assert_eq!(part, parsed);
    }

    #[test]
    fn test_as_text() {
        assert_eq!(Part::text("x").as_text(), Some("x"));
        assert_eq!(Part::data(serde_json::json!({})).as_text(), None);
    }
}
