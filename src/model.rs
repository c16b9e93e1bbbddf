//! Data models for tweets parsed from an X archive.
//!
//! These structures are the normalized form of archive entries: immutable
//! value objects built once during parsing, with malformed sub-entities
//! already filtered out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Date format used by X archive exports, e.g. `Fri Jan 09 15:12:21 +0000 2026`.
pub const ARCHIVE_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// A tweet mapped from one raw archive entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    /// Id of the tweet this one replies to; empty for root tweets.
    pub reply_to: String,
    /// Id of the user the reply is addressed to; empty for root tweets.
    pub reply_to_user: String,
    pub content: String,
    /// Raw `created_at` text as stored in the archive.
    pub date: String,
    pub favorites: i64,
    pub retweets: i64,
    pub hashtags: Vec<String>,
    pub links: Vec<Link>,
    pub media: Vec<Media>,
    pub mentions: Vec<Mention>,
}

impl Tweet {
    /// Whether this tweet is a reply to another status.
    #[must_use]
    pub fn is_reply(&self) -> bool {
        !self.reply_to.is_empty()
    }

    /// Parse the raw `created_at` text into a UTC timestamp.
    ///
    /// Accepts the archive's native format first, then RFC 3339 as a
    /// fallback. Returns `None` for empty or unparseable dates.
    #[must_use]
    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        parse_archive_date(&self.date)
    }

    /// Iterate the photo attachments (media with type `photo`).
    pub fn photos(&self) -> impl Iterator<Item = &Media> {
        self.media.iter().filter(|m| m.is_photo())
    }
}

/// A shortened URL and its resolved forms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    /// Short form as it appears in the tweet text (t.co).
    pub url: String,
    pub expanded_url: String,
    pub display_url: String,
}

/// Media attached to a tweet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub id: String,
    /// Canonical media URL (media_url_https).
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: String,
    /// Short link embedded in the tweet text for this media item.
    pub display_url: String,
}

impl Media {
    /// Construct a media item, normalizing the type once up front.
    ///
    /// Types are trimmed and lowercased; an empty type defaults to `photo`,
    /// matching how archives omit the field for plain images.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        media_type: &str,
        display_url: impl Into<String>,
    ) -> Self {
        let normalized = media_type.trim().to_ascii_lowercase();
        Self {
            id: id.into(),
            url: url.into(),
            media_type: if normalized.is_empty() {
                "photo".to_string()
            } else {
                normalized
            },
            display_url: display_url.into(),
        }
    }

    /// Whether this item is a photo (the only kind the reference processor
    /// uploads; video is a documented no-op).
    #[must_use]
    pub fn is_photo(&self) -> bool {
        self.media_type == "photo"
    }
}

/// A user mention in a tweet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mention {
    pub name: String,
    pub screen_name: String,
    pub id: String,
}

/// Parse an archive date string (native format, then RFC 3339).
#[must_use]
pub fn parse_archive_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_str(trimmed, ARCHIVE_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
