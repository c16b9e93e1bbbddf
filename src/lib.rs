//! xport - Twitter/X archive importer
//!
//! Turns the `tweets.js` part file from an X data export into
//! block-structured documents in a local content store.
//!
//! The pipeline reads the archive lazily ([`collection`]), walks it in
//! resumable batches ([`action`]), and hands each tweet plus its own-reply
//! thread to a registered processor ([`processor`], [`block`]) that writes
//! markup into a [`store`] and sideloads photos through [`media`].

pub mod action;
pub mod block;
pub mod cli;
pub mod collection;
pub mod config;
pub mod content;
pub mod error;
pub mod loader;
pub mod logging;
pub mod media;
pub mod model;
pub mod processor;
pub mod store;

pub use action::{ImportAction, ImportConfig, ImportResponse};
pub use block::{BlockOptions, BlockProcessor};
pub use cli::*;
pub use collection::{ArchiveSurvey, TweetCollection};
pub use error::{Result, XportError, render_error};
pub use loader::{ArchiveLoader, FileArchiveLoader};
pub use media::{HttpMediaUploader, MediaUploader, NullMediaUploader};
pub use model::*;
pub use processor::{OnDuplicate, Processor, ProcessorRegistry, ProcessorStatus};
pub use store::{ContentStore, MemoryStore, SqliteStore};

use chrono::{DateTime, Datelike, Utc};

/// Default database filename
pub const DEFAULT_DB_NAME: &str = "xport.db";

/// Default directory name for sideloaded media
pub const DEFAULT_MEDIA_DIR_NAME: &str = "media";

const BYTES_PER_KB: u64 = 1024;
const BYTES_PER_MB: u64 = 1024 * 1024;
const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Get the default data directory for xport
#[must_use]
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("xport")
}

/// Get the default database path
#[must_use]
pub fn default_db_path() -> std::path::PathBuf {
    default_data_dir().join(DEFAULT_DB_NAME)
}

/// Get the default media directory
#[must_use]
pub fn default_media_dir() -> std::path::PathBuf {
    default_data_dir().join(DEFAULT_MEDIA_DIR_NAME)
}

/// Format a count with thousands separators.
#[must_use]
pub fn format_number(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

/// Format a datetime as a human-friendly relative string.
///
/// Uses smart thresholds for readability:
/// - < 1 minute: "just now"
/// - < 1 hour: "Nm ago"
/// - < 24 hours: "Nh ago"
/// - < 7 days: "Nd ago"
/// - Same calendar year: "Mon D"
/// - Different year: "Mon D, YYYY"
#[must_use]
pub fn format_relative_date(dt: DateTime<Utc>) -> String {
    format_relative_date_with_base(dt, Utc::now())
}

/// Format a datetime relative to a fixed base time (useful for tests).
#[must_use]
pub fn format_relative_date_with_base(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(dt);

    // Future dates fall back to absolute formatting
    if elapsed.num_seconds() < 0 {
        return dt.format("%b %d, %Y").to_string();
    }

    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else if dt.year() == now.year() {
        dt.format("%b %d").to_string()
    } else {
        dt.format("%b %d, %Y").to_string()
    }
}

/// Format an optional datetime with human-friendly output.
#[must_use]
pub fn format_optional_date(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(|| "unknown".to_string(), format_relative_date)
}

/// Format a long identifier as a short token (e.g., 1234...6789).
#[must_use]
pub fn format_short_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 10 {
        return id.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Format bytes into a human-friendly string.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [(u64, &str); 3] = [
        (BYTES_PER_GB, "GB"),
        (BYTES_PER_MB, "MB"),
        (BYTES_PER_KB, "KB"),
    ];

    for (unit, suffix) in UNITS {
        if bytes >= unit {
            let whole = bytes / unit;
            let tenths = (bytes % unit) * 10 / unit;
            return format!("{whole}.{tenths} {suffix}");
        }
    }

    format!("{bytes} B")
}
