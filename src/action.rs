//! Bounded, cursor-resumable import runs.
//!
//! [`ImportAction`] drives one batch: resolve a processor, load the archive,
//! walk root tweets from the cursor, and hand each one (with its flattened
//! reply thread) to the processor. Per-tweet failures are recorded and the
//! run continues; only configuration problems abort it.

use crate::block::BlockProcessor;
use crate::collection::TweetCollection;
use crate::error::{Result, XportError};
use crate::loader::ArchiveLoader;
use crate::processor::{OnDuplicate, ProcessorRegistry};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Tweets attempted per batch when the caller does not say otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Parameters for one batch run.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Archive file to read.
    pub file_path: PathBuf,
    /// Mirror base for photo fetches. Consumed at processor construction;
    /// carried here so drivers have one place to thread it through.
    pub media_base_url: Option<String>,
    /// Maximum number of tweets attempted this run.
    pub batch_size: usize,
    /// What to do when a tweet already has a document.
    pub on_duplicate: OnDuplicate,
    /// Seconds a driver should wait between consecutive batches. The action
    /// itself never sleeps.
    pub delay: u64,
    /// Resume cursor: id of the last tweet attempted by a previous run.
    pub last_tweet_id: Option<String>,
    /// Registry selector naming the processor to run.
    pub processor: String,
}

impl ImportConfig {
    #[must_use]
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            media_base_url: None,
            batch_size: DEFAULT_BATCH_SIZE,
            on_duplicate: OnDuplicate::default(),
            delay: 0,
            last_tweet_id: None,
            processor: BlockProcessor::SELECTOR.to_string(),
        }
    }
}

/// Outcome accumulator for one batch run.
///
/// Mutated incrementally while the batch executes, read once at the end.
/// The sole reporting channel: diagnostics land in `messages`, outcomes in
/// the two id lists.
#[derive(Debug, Default, Serialize)]
pub struct ImportResponse {
    messages: Vec<String>,
    processed_ids: Vec<String>,
    failed_ids: Vec<String>,
    last_tweet_id: Option<String>,
}

impl ImportResponse {
    fn record_processed(&mut self, id: &str) {
        self.processed_ids.push(id.to_string());
        self.last_tweet_id = Some(id.to_string());
    }

    fn record_failure(&mut self, id: &str, error: &XportError) {
        self.messages
            .push(format!("Failed to process tweet: {id}. {error}"));
        self.failed_ids.push(id.to_string());
        self.last_tweet_id = Some(id.to_string());
    }

    fn append_messages(&mut self, messages: &[String]) {
        self.messages.extend_from_slice(messages);
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    #[must_use]
    pub fn processed_ids(&self) -> &[String] {
        &self.processed_ids
    }

    #[must_use]
    pub fn failed_ids(&self) -> &[String] {
        &self.failed_ids
    }

    #[must_use]
    pub fn last_tweet_id(&self) -> Option<&str> {
        self.last_tweet_id.as_deref()
    }

    /// Tweets attempted this run, successes and failures together.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.processed_ids.len() + self.failed_ids.len()
    }
}

/// Drives one bounded import pass from a cursor.
pub struct ImportAction {
    loader: Box<dyn ArchiveLoader>,
    processors: ProcessorRegistry,
}

impl ImportAction {
    #[must_use]
    pub fn new(loader: Box<dyn ArchiveLoader>, processors: ProcessorRegistry) -> Self {
        Self { loader, processors }
    }

    /// Run one batch.
    ///
    /// # Errors
    ///
    /// Fails on configuration problems only: an unresolvable processor
    /// selector or an unreadable archive. Per-tweet failures are recorded
    /// in the response and never abort the run.
    pub fn execute(&self, config: &ImportConfig) -> Result<ImportResponse> {
        let mut processor = self.processors.create(&config.processor)?;
        let raw = self.loader.load(&config.file_path)?;
        let collection = TweetCollection::new(raw);

        info!(
            "Starting import batch: archive {}, batch size {}, policy {}, cursor {:?}",
            config.file_path.display(),
            config.batch_size,
            config.on_duplicate,
            config.last_tweet_id
        );

        let mut response = ImportResponse::default();
        let mut cursor = config.last_tweet_id.clone().unwrap_or_default();

        for _ in 0..config.batch_size {
            let Some(tweet) = collection.get_next_tweet(&cursor, true) else {
                debug!("Archive exhausted at cursor {cursor:?}");
                break;
            };
            cursor = tweet.id.clone();

            let thread = collection.get_threaded_tweets(&tweet.id);
            match processor.process(&tweet, &thread, config.on_duplicate) {
                Ok(()) => response.record_processed(&tweet.id),
                Err(e) => {
                    warn!("Tweet {} failed: {e}", tweet.id);
                    response.record_failure(&tweet.id, &e);
                }
            }
            // The processor clears its messages on every invocation, so
            // they must be drained here or all but the last tweet's are lost.
            response.append_messages(processor.messages());
        }

        info!(
            "Batch finished: {} processed, {} failed",
            response.processed_ids.len(),
            response.failed_ids.len()
        );
        Ok(response)
    }
}
