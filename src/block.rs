//! Block-markup reference processor.
//!
//! Compiles a tweet and its reply thread into a block-structured document:
//! a paragraph with entity substitution applied, a collapsible details block
//! holding the thread, and an image gallery for sideloaded photos. Video
//! attachments are deliberately left alone. Persistence goes through the
//! injected [`ContentStore`]; photo fetching through the injected
//! [`MediaUploader`].

use crate::content::{LinkArgs, populate_hashtags, populate_mentions, populate_urls};
use crate::error::{Result, XportError};
use crate::media::{MediaUploader, file_name_from_url};
use crate::model::Tweet;
use crate::processor::{OnDuplicate, Processor, ProcessorStatus};
use crate::store::{ContentStore, DocumentDraft, DocumentQuery};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Attribute carrying the source tweet id; the re-import lookup key.
pub const ATTR_TWEET_ID: &str = "tweet_id";
/// Attribute carrying the serialized source tweet.
pub const ATTR_TWEET_JSON: &str = "tweet_json";
/// Attribute carrying the comma-joined ids of the compiled thread.
pub const ATTR_THREAD_IDS: &str = "thread_ids";

const CLASS_TWEET: &str = "xport--tweet";
const CLASS_THREAD: &str = "xport--thread";
const CLASS_GALLERY: &str = "xport--gallery";
const CLASS_IMAGE: &str = "xport--image";
const CLASS_HASHTAG: &str = "xport--hashtag";
const CLASS_MENTION: &str = "xport--mention";
const CLASS_LINK: &str = "xport--link";

/// Construction-time options for [`BlockProcessor`].
#[derive(Debug, Clone)]
pub struct BlockOptions {
    /// When set, photo fetch URLs are rewritten to `{base}/{filename}`,
    /// for archives whose media was mirrored somewhere else beforehand.
    pub media_base_url: Option<String>,
    /// Author recorded on created documents.
    pub author: String,
    /// Status recorded on created documents.
    pub doc_status: String,
}

impl Default for BlockOptions {
    fn default() -> Self {
        Self {
            media_base_url: None,
            author: String::new(),
            doc_status: "published".to_string(),
        }
    }
}

/// Reference [`Processor`] turning tweets into block-markup documents.
pub struct BlockProcessor {
    store: Box<dyn ContentStore>,
    media: Box<dyn MediaUploader>,
    options: BlockOptions,
    status: ProcessorStatus,
    messages: Vec<String>,
}

impl BlockProcessor {
    /// Registry selector for this processor.
    pub const SELECTOR: &'static str = "block";

    #[must_use]
    pub fn new(
        store: Box<dyn ContentStore>,
        media: Box<dyn MediaUploader>,
        options: BlockOptions,
    ) -> Self {
        Self {
            store,
            media,
            options,
            status: ProcessorStatus::Pending,
            messages: Vec::new(),
        }
    }

    fn push_message(&mut self, message: String) {
        debug!("{message}");
        self.messages.push(message);
    }

    /// Decide and execute per the duplicate policy.
    fn run(&mut self, tweet: &Tweet, thread: &[Tweet], on_duplicate: OnDuplicate) -> Result<()> {
        debug!(
            "Processing tweet {} ({} thread replies, policy {on_duplicate})",
            tweet.id,
            thread.len()
        );

        let existing = self
            .store
            .find(&DocumentQuery::new(ATTR_TWEET_ID, &tweet.id))?;

        match (existing, on_duplicate) {
            (Some(_), OnDuplicate::Skip) => {
                self.push_message(format!(
                    "Document for tweet {} already exists and was skipped.",
                    tweet.id
                ));
                Ok(())
            }
            (Some(doc), OnDuplicate::Update) => self.update_document(doc.id, tweet, thread),
            _ => self.create_document(tweet, thread),
        }
    }

    fn create_document(&mut self, tweet: &Tweet, thread: &[Tweet]) -> Result<()> {
        let draft = self.build_draft(tweet, thread)?;

        let doc = match self.store.create(&draft) {
            Ok(doc) => doc,
            Err(e) => {
                self.push_message(format!(
                    "Error creating document for tweet: {}, {e}",
                    tweet.id
                ));
                return Err(e);
            }
        };
        if let Err(e) = self.write_attributes(doc.id, tweet, thread) {
            self.push_message(format!(
                "Error creating document for tweet: {}, {e}",
                tweet.id
            ));
            return Err(e);
        }

        self.push_message(format!("Tweet created {} (#{})", doc.id, tweet.id));
        Ok(())
    }

    fn update_document(&mut self, id: i64, tweet: &Tweet, thread: &[Tweet]) -> Result<()> {
        let draft = self.build_draft(tweet, thread)?;

        let doc = match self.store.update(id, &draft) {
            Ok(doc) => doc,
            Err(e) => {
                self.push_message(format!(
                    "Error updating document for tweet: {}, {e}",
                    tweet.id
                ));
                return Err(e);
            }
        };
        if let Err(e) = self.write_attributes(doc.id, tweet, thread) {
            self.push_message(format!(
                "Error updating document for tweet: {}, {e}",
                tweet.id
            ));
            return Err(e);
        }

        self.push_message(format!("Tweet updated {} (#{})", doc.id, tweet.id));
        Ok(())
    }

    fn write_attributes(&mut self, document_id: i64, tweet: &Tweet, thread: &[Tweet]) -> Result<()> {
        self.store
            .set_attribute(document_id, ATTR_TWEET_ID, &tweet.id)?;
        let source = serde_json::to_string(tweet)?;
        self.store
            .set_attribute(document_id, ATTR_TWEET_JSON, &source)?;
        let thread_ids = thread
            .iter()
            .map(|t| t.id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.store
            .set_attribute(document_id, ATTR_THREAD_IDS, &thread_ids)?;
        Ok(())
    }

    fn build_draft(&mut self, tweet: &Tweet, thread: &[Tweet]) -> Result<DocumentDraft> {
        let created_at = document_timestamp(tweet)?;
        let body = self.compile_content(tweet, thread)?;
        Ok(DocumentDraft {
            title: tweet.id.clone(),
            body,
            author: self.options.author.clone(),
            created_at,
            status: self.options.doc_status.clone(),
        })
    }

    /// Primary tweet first, then the thread in a collapsible container.
    fn compile_content(&mut self, tweet: &Tweet, thread: &[Tweet]) -> Result<String> {
        let mut body = self.render_tweet(tweet)?;
        if !thread.is_empty() {
            body.push('\n');
            body.push_str(&self.render_thread(thread)?);
        }
        Ok(body)
    }

    /// One tweet as a paragraph block plus its photo gallery.
    fn render_tweet(&mut self, tweet: &Tweet) -> Result<String> {
        let content = populate_hashtags(
            &tweet.content,
            tweet,
            &LinkArgs::hashtag().with_class(CLASS_HASHTAG),
        );
        let content = populate_mentions(
            &content,
            tweet,
            &LinkArgs::mention().with_class(CLASS_MENTION),
        );
        let content = populate_urls(&content, tweet, &LinkArgs::link().with_class(CLASS_LINK));

        let paragraph = format!(
            "<!-- block:paragraph -->\n<p id=\"tweet-{}\" class=\"{CLASS_TWEET}\">{content}</p>\n<!-- /block:paragraph -->",
            tweet.id
        );
        self.append_media(tweet, paragraph)
    }

    fn render_thread(&mut self, thread: &[Tweet]) -> Result<String> {
        let label = if thread.len() == 1 {
            "Read 1 reply".to_string()
        } else {
            format!("Read {} replies", thread.len())
        };

        let mut inner = Vec::with_capacity(thread.len());
        for tweet in thread {
            inner.push(self.render_tweet(tweet)?);
        }

        Ok(format!(
            "<!-- block:details -->\n<details class=\"{CLASS_THREAD}\"><summary>{label}</summary>\n{}\n</details>\n<!-- /block:details -->",
            inner.join("\n")
        ))
    }

    /// Sideload photos and append them as a gallery block.
    ///
    /// Each uploaded photo's short link is removed from the already-rendered
    /// content. Video media is a documented no-op. An upload failure fails
    /// the whole tweet; the action records it and moves on.
    fn append_media(&mut self, tweet: &Tweet, mut content: String) -> Result<String> {
        let photos: Vec<_> = tweet.photos().cloned().collect();
        if photos.is_empty() {
            return Ok(content);
        }

        let mut items = Vec::with_capacity(photos.len());
        for media in &photos {
            let filename = file_name_from_url(&media.url);
            let fetch_url = self.options.media_base_url.as_ref().map_or_else(
                || media.url.clone(),
                |base| format!("{}/{filename}", base.trim_end_matches('/')),
            );

            let uploaded = match self.media.upload_from_url(&fetch_url, &filename) {
                Ok(uploaded) => uploaded,
                Err(e) => {
                    self.push_message(format!(
                        "Failed to upload media {fetch_url} for tweet {}: {e}",
                        tweet.id
                    ));
                    return Err(e);
                }
            };

            if !media.display_url.is_empty() {
                content = content.replace(&media.display_url, "");
            }
            items.push(format!(
                "<!-- block:image -->\n<figure class=\"{CLASS_IMAGE}\"><img src=\"{}\" alt=\"\" class=\"media-{}\"/></figure>\n<!-- /block:image -->",
                uploaded.url, uploaded.id
            ));
        }

        content.push_str(&format!(
            "\n<!-- block:gallery -->\n<figure class=\"{CLASS_GALLERY}\">\n{}\n</figure>\n<!-- /block:gallery -->",
            items.join("\n")
        ));
        Ok(content)
    }
}

impl Processor for BlockProcessor {
    fn process(
        &mut self,
        tweet: &Tweet,
        thread: &[Tweet],
        on_duplicate: OnDuplicate,
    ) -> Result<()> {
        // Every invocation is independent: state from the previous tweet
        // must not leak into this one.
        self.status = ProcessorStatus::Pending;
        self.messages.clear();

        let result = self.run(tweet, thread, on_duplicate);
        self.status = match &result {
            Ok(()) => ProcessorStatus::Success,
            Err(_) => ProcessorStatus::Error,
        };
        result
    }

    fn status(&self) -> ProcessorStatus {
        self.status
    }

    fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// Timestamp for the compiled document.
///
/// An empty archive date falls back to the import time; a non-empty but
/// unparseable one fails the tweet.
fn document_timestamp(tweet: &Tweet) -> Result<DateTime<Utc>> {
    if tweet.date.trim().is_empty() {
        return Ok(Utc::now());
    }
    tweet.parsed_date().ok_or_else(|| XportError::InvalidDate {
        value: tweet.date.clone(),
        context: format!("tweet {}", tweet.id),
    })
}
