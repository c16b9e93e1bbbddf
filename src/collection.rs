//! Tweet collection and reply-graph resolution.
//!
//! Owns the raw archive text and decodes it exactly once, lazily, on first
//! access. Archives arrive either as plain JSON or in the JavaScript export
//! wrapper (`window.YTD.tweets.part0 = [...]`). Two queries are answered
//! against the decoded entries: cursor-based "next own tweet" iteration and
//! recursive reply-thread assembly.

use crate::model::{Link, Media, Mention, Tweet};
use chrono::{DateTime, Utc};
use once_cell::unsync::OnceCell;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Upper bound on reply-chain recursion. Archives are not attacker
/// controlled, but a cyclic or absurdly deep chain must not blow the stack.
pub const MAX_THREAD_DEPTH: usize = 512;

/// A lazily parsed tweet archive.
///
/// Created per import run from the archive file's content, parsed on first
/// query, then discarded with the run. All queries are read-only; the decoded
/// entries never change after the one-time parse.
pub struct TweetCollection {
    raw: String,
    entries: OnceCell<Vec<Value>>,
}

impl TweetCollection {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            entries: OnceCell::new(),
        }
    }

    /// Decoded archive entries, parsing on first access.
    fn entries(&self) -> &[Value] {
        self.entries.get_or_init(|| Self::decode(&self.raw))
    }

    /// Strip the JS assignment wrapper if present and decode the JSON array.
    ///
    /// Any decode failure (or a non-array top level) yields an empty entry
    /// list: downstream queries then behave as "no tweets" rather than
    /// erroring, since exports routinely contain legacy or foreign files.
    fn decode(raw: &str) -> Vec<Value> {
        let trimmed = raw.trim_start();
        let json = if trimmed.starts_with('[') {
            trimmed
        } else if let Some(pos) = raw.find(" = ") {
            &raw[pos + 3..]
        } else {
            raw
        };

        match serde_json::from_str::<Value>(json) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                warn!("Archive top level is not an array, treating as empty");
                Vec::new()
            }
            Err(e) => {
                warn!("Failed to decode archive JSON, treating as empty: {e}");
                Vec::new()
            }
        }
    }

    /// Find the next tweet after `cursor_id` in archive order.
    ///
    /// An empty cursor starts from the top. With `own_tweets_only`, entries
    /// that reply to another status are skipped, but the cursor position
    /// itself is matched by id before any filtering, so a reply cursor still
    /// anchors the scan. Returns `None` when the source is exhausted or the
    /// cursor id does not exist.
    ///
    /// Each call is a fresh linear scan. O(n·k) for k calls is deliberate:
    /// personal exports top out at tens of thousands of entries and the
    /// cursor has to survive across process restarts anyway.
    #[must_use]
    pub fn get_next_tweet(&self, cursor_id: &str, own_tweets_only: bool) -> Option<Tweet> {
        let mut located = cursor_id.is_empty();

        for entry in self.entries() {
            let Some(raw) = entry.get("tweet") else {
                continue;
            };

            if located {
                if own_tweets_only && !reply_target(raw).is_empty() {
                    continue;
                }
                match map_tweet(raw) {
                    Some(tweet) => return Some(tweet),
                    None => continue,
                }
            } else if raw_id(raw) == Some(cursor_id) {
                located = true;
            }
        }

        None
    }

    /// Assemble the full reply thread below `root_id`, flattened depth-first.
    ///
    /// Every entry replying to `root_id` is appended followed by its own
    /// (recursive) thread. Branching replies are flattened in archive
    /// discovery order; the result is a linear list, not a tree.
    #[must_use]
    pub fn get_threaded_tweets(&self, root_id: &str) -> Vec<Tweet> {
        let mut thread = Vec::new();
        self.collect_replies(root_id, 0, &mut thread);
        thread
    }

    fn collect_replies(&self, id: &str, depth: usize, out: &mut Vec<Tweet>) {
        if depth >= MAX_THREAD_DEPTH {
            warn!("Reply chain below '{id}' exceeds depth {MAX_THREAD_DEPTH}, truncating");
            return;
        }

        for entry in self.entries() {
            let Some(raw) = entry.get("tweet") else {
                continue;
            };
            if reply_target(raw) != id {
                continue;
            }
            if let Some(tweet) = map_tweet(raw) {
                let child_id = tweet.id.clone();
                out.push(tweet);
                self.collect_replies(&child_id, depth + 1, out);
            }
        }
    }

    /// One-pass census over the archive, backing `stats` and `check`.
    #[must_use]
    pub fn survey(&self) -> ArchiveSurvey {
        let mut survey = ArchiveSurvey::default();

        for entry in self.entries() {
            survey.entries += 1;
            let Some(raw) = entry.get("tweet") else {
                survey.skipped += 1;
                continue;
            };
            let Some(tweet) = map_tweet(raw) else {
                survey.skipped += 1;
                continue;
            };

            survey.tweets += 1;
            if tweet.is_reply() {
                survey.replies += 1;
            } else {
                survey.roots += 1;
            }
            if !tweet.media.is_empty() {
                survey.with_media += 1;
            }
            for tag in &tweet.hashtags {
                *survey.hashtags.entry(tag.clone()).or_insert(0) += 1;
            }
            if let Some(date) = tweet.parsed_date() {
                survey.first_date = Some(survey.first_date.map_or(date, |d: DateTime<Utc>| d.min(date)));
                survey.last_date = Some(survey.last_date.map_or(date, |d: DateTime<Utc>| d.max(date)));
            }
        }

        survey
    }
}

/// Counts collected by [`TweetCollection::survey`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveSurvey {
    /// Raw array elements, including non-tweet entries.
    pub entries: usize,
    /// Entries that mapped to a well-formed tweet.
    pub tweets: usize,
    pub roots: usize,
    pub replies: usize,
    /// Entries without a tweet key or without a usable id.
    pub skipped: usize,
    pub with_media: usize,
    pub hashtags: HashMap<String, usize>,
    pub first_date: Option<DateTime<Utc>>,
    pub last_date: Option<DateTime<Utc>>,
}

// =============================================================================
// Raw entry mapping
// =============================================================================

/// Tweet id from a raw entry; archives carry `id`, older exports `id_str`.
fn raw_id(raw: &Value) -> Option<&str> {
    raw["id"]
        .as_str()
        .filter(|s| !s.is_empty())
        .or_else(|| raw["id_str"].as_str().filter(|s| !s.is_empty()))
}

/// Id of the status this entry replies to; empty when it is a root tweet.
fn reply_target(raw: &Value) -> &str {
    raw["in_reply_to_status_id"]
        .as_str()
        .filter(|s| !s.is_empty())
        .or_else(|| raw["in_reply_to_status_id_str"].as_str())
        .unwrap_or_default()
}

/// Engagement counts arrive as strings in exports; quietly accept numbers too.
fn parse_count(value: &Value) -> i64 {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(0)
        .max(0)
}

/// Map one raw entry body to a [`Tweet`], or `None` when no usable id exists.
///
/// Everything except the id is optional and defaults to empty/zero; entity
/// lists drop malformed elements rather than failing the whole tweet.
fn map_tweet(raw: &Value) -> Option<Tweet> {
    let id = raw_id(raw)?.to_string();

    Some(Tweet {
        id,
        reply_to: reply_target(raw).to_string(),
        reply_to_user: raw["in_reply_to_user_id"]
            .as_str()
            .or_else(|| raw["in_reply_to_user_id_str"].as_str())
            .unwrap_or_default()
            .to_string(),
        content: raw["full_text"].as_str().unwrap_or_default().to_string(),
        date: raw["created_at"].as_str().unwrap_or_default().to_string(),
        favorites: parse_count(&raw["favorite_count"]),
        retweets: parse_count(&raw["retweet_count"]),
        hashtags: map_hashtags(&raw["entities"]["hashtags"]),
        links: map_links(&raw["entities"]["urls"]),
        media: map_media(&raw["entities"]["media"]),
        mentions: map_mentions(&raw["entities"]["user_mentions"]),
    })
}

fn map_hashtags(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap_or(&vec![])
        .iter()
        .filter_map(|h| h["text"].as_str().map(String::from))
        .collect()
}

fn map_links(value: &Value) -> Vec<Link> {
    value
        .as_array()
        .unwrap_or(&vec![])
        .iter()
        .filter_map(|u| {
            Some(Link {
                url: u["url"].as_str()?.to_string(),
                expanded_url: u["expanded_url"].as_str()?.to_string(),
                display_url: u["display_url"].as_str()?.to_string(),
            })
        })
        .collect()
}

fn map_media(value: &Value) -> Vec<Media> {
    value
        .as_array()
        .unwrap_or(&vec![])
        .iter()
        .filter_map(|m| {
            Some(Media::new(
                m["id_str"].as_str()?,
                m["media_url_https"]
                    .as_str()
                    .or_else(|| m["media_url"].as_str())?,
                m["type"].as_str().unwrap_or("photo"),
                m["url"].as_str().unwrap_or_default(),
            ))
        })
        .collect()
}

fn map_mentions(value: &Value) -> Vec<Mention> {
    value
        .as_array()
        .unwrap_or(&vec![])
        .iter()
        .filter_map(|m| {
            Some(Mention {
                name: m["name"].as_str().unwrap_or_default().to_string(),
                screen_name: m["screen_name"].as_str()?.to_string(),
                id: m["id_str"].as_str()?.to_string(),
            })
        })
        .collect()
}
