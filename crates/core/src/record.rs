//! Cached URL outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_rusqlite::rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use tokio_rusqlite::rusqlite::Result as SqlResult;
use url::Url;

/// Status recorded when the transport failed before any response arrived.
///
/// 599 is the conventional "network connect timeout" code used by proxies.
pub const UNREACHABLE_STATUS: u16 = 599;

/// Stored payload of a record.
///
/// Text covers decoded bodies, redirect targets and blob paths. Bodies that
/// are not valid UTF-8 and were not routed to the blob store are kept as
/// raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
}

impl Content {
    /// Decode a body, falling back to raw bytes when it is not UTF-8.
    pub fn decode(body: Vec<u8>) -> Self {
        match String::from_utf8(body) {
            Ok(text) => Content::Text(text),
            Err(e) => Content::Bytes(e.into_bytes()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Bytes(bytes) => bytes,
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

impl ToSql for Content {
    fn to_sql(&self) -> SqlResult<ToSqlOutput<'_>> {
        Ok(match self {
            Content::Text(text) => ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes())),
            Content::Bytes(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
        })
    }
}

impl FromSql for Content {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Content::default()),
            ValueRef::Blob(bytes) => Ok(Content::Bytes(bytes.to_vec())),
            ValueRef::Text(bytes) => Ok(Content::decode(bytes.to_vec())),
            ValueRef::Integer(i) => Ok(Content::Text(i.to_string())),
            ValueRef::Real(r) => Ok(Content::Text(r.to_string())),
        }
    }
}

/// One cached outcome per hop URL ever observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub content: Content,
    pub retrieved_at: String,
}

impl Record {
    pub fn is_redirect(&self) -> bool {
        is_redirect(self.status_code)
    }

    /// The next URL of a redirect chain, if this record is a redirect whose
    /// content is an absolute URL.
    pub fn redirect_target(&self) -> Option<&str> {
        if !self.is_redirect() {
            return None;
        }
        self.content.as_text().filter(|target| Url::parse(target).is_ok())
    }
}

pub fn is_redirect(status_code: u16) -> bool {
    (300..400).contains(&status_code)
}

/// Current time in the format written to `retrieved_at`.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Listing row: everything but the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub retrieved_at: String,
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.url,
            self.status_code,
            self.content_type.as_deref().unwrap_or("None"),
            self.retrieved_at
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status_code: u16, content: &str) -> Record {
        Record {
            url: "https://example.com/a".to_string(),
            status_code,
            content_type: None,
            content: Content::Text(content.to_string()),
            retrieved_at: timestamp(),
        }
    }

    #[test]
    fn test_decode_utf8() {
        assert_eq!(Content::decode(b"hello".to_vec()), Content::Text("hello".to_string()));
    }

    #[test]
    fn test_decode_falls_back_to_bytes() {
        let raw = vec![0x25, 0x50, 0x44, 0x46, 0xff, 0xfe];
        assert_eq!(Content::decode(raw.clone()), Content::Bytes(raw));
    }

    #[test]
    fn test_redirect_target() {
        assert_eq!(record(301, "https://example.com/b").redirect_target(), Some("https://example.com/b"));
        assert_eq!(record(302, "").redirect_target(), None);
        assert_eq!(record(302, "<a href=x>moved</a>").redirect_target(), None);
        assert_eq!(record(200, "https://example.com/b").redirect_target(), None);
    }

    #[test]
    fn test_redirect_range() {
        assert!(!is_redirect(299));
        assert!(is_redirect(300));
        assert!(is_redirect(399));
        assert!(!is_redirect(400));
    }

    #[test]
    fn test_list_entry_display() {
        let entry = ListEntry {
            url: "https://example.com/".to_string(),
            status_code: 200,
            content_type: Some("text/html".to_string()),
            retrieved_at: "2017-02-01T10:00:00Z".to_string(),
        };
        assert_eq!(entry.to_string(), "https://example.com/, 200, text/html, 2017-02-01T10:00:00Z");

        let entry = ListEntry { content_type: None, status_code: 599, ..entry };
        assert_eq!(entry.to_string(), "https://example.com/, 599, None, 2017-02-01T10:00:00Z");
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let stamp = timestamp();
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
