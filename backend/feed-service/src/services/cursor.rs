//! Opaque pagination cursor
//!
//! Encodes the keyset position `(created_at, post_id)` of the oldest consumed
//! candidate as URL-safe base64. Pages resume strictly after that position.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor {
    pub created_at: DateTime<Utc>,
    pub post_id: Uuid,
}

impl FeedCursor {
    pub fn from_post(post: &Post) -> Self {
        Self {
            created_at: post.created_at,
            post_id: post.id,
        }
    }

    /// Whether `post` lies strictly past this position in `created_at DESC, id DESC` order.
    pub fn admits(&self, post: &Post) -> bool {
        (post.created_at, post.id) < (self.created_at, self.post_id)
    }

    pub fn encode(&self) -> String {
        let raw = format!(
            "{}|{}",
            self.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            self.post_id
        );
        URL_SAFE_NO_PAD.encode(raw)
    }

    pub fn decode(cursor: &str) -> Result<Self> {
        let decoded = URL_SAFE_NO_PAD
            .decode(cursor.trim())
            .map_err(|_| AppError::BadRequest("Invalid cursor format".to_string()))?;
        let raw = String::from_utf8(decoded)
            .map_err(|_| AppError::BadRequest("Invalid cursor encoding".to_string()))?;

        let (ts, id) = raw
            .rsplit_once('|')
            .ok_or_else(|| AppError::BadRequest("Invalid cursor value".to_string()))?;

        let created_at = DateTime::parse_from_rfc3339(ts)
            .map_err(|_| AppError::BadRequest("Invalid cursor timestamp".to_string()))?
            .with_timezone(&Utc);
        let post_id = Uuid::parse_str(id)
            .map_err(|_| AppError::BadRequest("Invalid cursor post id".to_string()))?;

        Ok(Self {
            created_at,
            post_id,
        })
    }

    /// Decode an optional query parameter; empty strings mean "first page".
    pub fn decode_optional(cursor: Option<&str>) -> Result<Option<Self>> {
        match cursor {
            Some(c) if !c.trim().is_empty() => Self::decode(c).map(Some),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_cursor_roundtrip_keeps_nanoseconds() {
        let cursor = FeedCursor {
            created_at: Utc::now(),
            post_id: Uuid::new_v4(),
        };
        let decoded = FeedCursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_wire_format() {
        let post_id = Uuid::from_u128(0x42);
        let created_at = DateTime::parse_from_rfc3339("2024-05-01T12:00:00.000000123Z")
            .unwrap()
            .with_timezone(&Utc);
        let cursor = FeedCursor {
            created_at,
            post_id,
        };

        let raw = String::from_utf8(URL_SAFE_NO_PAD.decode(cursor.encode()).unwrap()).unwrap();
        assert_eq!(raw, format!("2024-05-01T12:00:00.000000123Z|{}", post_id));
    }

    #[test]
    fn test_cursor_none_or_empty_is_first_page() {
        assert_eq!(FeedCursor::decode_optional(None).unwrap(), None);
        assert_eq!(FeedCursor::decode_optional(Some("  ")).unwrap(), None);
    }

    #[test]
    fn test_cursor_rejects_garbage() {
        assert!(matches!(
            FeedCursor::decode("!!not-base64!!"),
            Err(AppError::BadRequest(_))
        ));
        let no_separator = URL_SAFE_NO_PAD.encode("12345");
        assert!(matches!(
            FeedCursor::decode(&no_separator),
            Err(AppError::BadRequest(_))
        ));
        let bad_uuid = URL_SAFE_NO_PAD.encode("2024-01-01T00:00:00Z|nope");
        assert!(matches!(
            FeedCursor::decode(&bad_uuid),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_admits_uses_id_to_break_timestamp_ties() {
        let now = Utc::now();
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);
        let cursor = FeedCursor {
            created_at: now,
            post_id: high,
        };

        let post = |created_at, id| Post {
            id,
            author_id: Uuid::new_v4(),
            body: String::new(),
            media_urls: vec![],
            visibility: crate::models::Visibility::Public,
            created_at,
            like_count: 0,
            comment_count: 0,
            share_count: 0,
            deleted_at: None,
        };

        assert!(cursor.admits(&post(now, low)));
        assert!(!cursor.admits(&post(now, high)));
        assert!(cursor.admits(&post(now - Duration::seconds(1), high)));
        assert!(!cursor.admits(&post(now + Duration::seconds(1), low)));
    }
}
