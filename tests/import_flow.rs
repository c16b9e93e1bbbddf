//! Integration tests for xport.
//!
//! These tests verify end-to-end functionality including:
//! - Archive loading and batch execution
//! - Document persistence and attribute lookup in SQLite
//! - Duplicate handling across repeated imports

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use xport::block::{ATTR_THREAD_IDS, ATTR_TWEET_ID, ATTR_TWEET_JSON};
use xport::store::DocumentQuery;
use xport::{
    BlockOptions, BlockProcessor, ContentStore, FileArchiveLoader, ImportAction, ImportConfig,
    NullMediaUploader, OnDuplicate, ProcessorRegistry, SqliteStore,
};

/// Create a tweets part file with three roots and a two-deep reply chain
fn create_test_archive(dir: &TempDir) -> PathBuf {
    let content = r#"window.YTD.tweets.part0 = [
        {
            "tweet": {
                "id_str": "8001",
                "created_at": "Wed Jan 08 12:00:00 +0000 2025",
                "full_text": "Shipping the importer today #rust https://t.co/abc123",
                "favorite_count": "42",
                "retweet_count": "7",
                "entities": {
                    "hashtags": [{"text": "rust"}],
                    "user_mentions": [],
                    "urls": [
                        {
                            "url": "https://t.co/abc123",
                            "expanded_url": "https://example.com/launch",
                            "display_url": "example.com/launch"
                        }
                    ]
                }
            }
        },
        {
            "tweet": {
                "id_str": "8101",
                "in_reply_to_status_id": "8001",
                "created_at": "Wed Jan 08 12:05:00 +0000 2025",
                "full_text": "First follow-up with more detail",
                "entities": {"hashtags": [], "user_mentions": [], "urls": []}
            }
        },
        {
            "tweet": {
                "id_str": "8102",
                "in_reply_to_status_id": "8101",
                "created_at": "Wed Jan 08 12:10:00 +0000 2025",
                "full_text": "Second follow-up closing the thread",
                "entities": {"hashtags": [], "user_mentions": [], "urls": []}
            }
        },
        {
            "tweet": {
                "id_str": "8002",
                "created_at": "Thu Jan 09 14:30:00 +0000 2025",
                "full_text": "Thanks @friend for the review",
                "entities": {
                    "hashtags": [],
                    "user_mentions": [
                        {"name": "A Friend", "screen_name": "friend", "id_str": "42"}
                    ],
                    "urls": []
                }
            }
        },
        {
            "tweet": {
                "id_str": "8003",
                "created_at": "Fri Jan 10 09:15:00 +0000 2025",
                "full_text": "Plain closing tweet with no entities",
                "entities": {"hashtags": [], "user_mentions": [], "urls": []}
            }
        }
    ]"#;
    let path = dir.path().join("tweets.js");
    std::fs::write(&path, content).unwrap();
    path
}

/// Registry producing block processors backed by the given database file
fn registry_for(db_path: &Path) -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    let db_path = db_path.to_path_buf();
    registry.register(BlockProcessor::SELECTOR, move || {
        let store = SqliteStore::open(&db_path)?;
        Ok(Box::new(BlockProcessor::new(
            Box::new(store),
            Box::new(NullMediaUploader::new()),
            BlockOptions::default(),
        )))
    });
    registry
}

fn import_action(db_path: &Path) -> ImportAction {
    ImportAction::new(Box::new(FileArchiveLoader::new()), registry_for(db_path))
}

#[test]
fn test_full_import_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    let archive_path = create_test_archive(&temp_dir);
    let db_path = temp_dir.path().join("xport.db");

    // Import
    let action = import_action(&db_path);
    let config = ImportConfig::new(&archive_path);
    let response = action.execute(&config).unwrap();

    // Roots import, replies ride along inside their thread
    assert_eq!(response.processed_ids(), ["8001", "8002", "8003"]);
    assert!(response.failed_ids().is_empty());
    assert_eq!(response.last_tweet_id(), Some("8003"));
    assert_eq!(
        response
            .messages()
            .iter()
            .filter(|m| m.starts_with("Tweet created"))
            .count(),
        3
    );

    // Verify persisted documents
    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.document_count().unwrap(), 3);

    let doc = store
        .find(&DocumentQuery::new(ATTR_TWEET_ID, "8001"))
        .unwrap()
        .unwrap();
    assert_eq!(doc.title, "8001");
    assert_eq!(doc.status, "published");
    assert_eq!(doc.created_at.format("%Y-%m-%d").to_string(), "2025-01-08");

    // Paragraph block with substituted entities
    assert!(doc.body.contains("<!-- block:paragraph -->"));
    assert!(doc.body.contains(r#"id="tweet-8001""#));
    assert!(doc.body.contains(r#"class="xport--tweet""#));
    assert!(doc.body.contains(r#"class="xport--hashtag""#));
    assert!(doc.body.contains(r#"href="https://example.com/launch""#));
    assert!(!doc.body.contains("t.co/abc123"));

    // The two-deep reply chain renders as a collapsed thread
    assert!(doc.body.contains(r#"<details class="xport--thread">"#));
    assert!(doc.body.contains("<summary>Read 2 replies</summary>"));
    assert!(doc.body.contains(r#"id="tweet-8101""#));
    assert!(doc.body.contains(r#"id="tweet-8102""#));

    // Attributes
    assert_eq!(
        store.attribute(doc.id, ATTR_THREAD_IDS).unwrap(),
        Some("8101,8102".to_string())
    );
    let raw_json = store.attribute(doc.id, ATTR_TWEET_JSON).unwrap().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw_json).unwrap();
    assert_eq!(parsed["id"], "8001");

    // A tweet without replies still carries an (empty) thread attribute
    let doc2 = store
        .find(&DocumentQuery::new(ATTR_TWEET_ID, "8002"))
        .unwrap()
        .unwrap();
    assert!(doc2.body.contains(r#"class="xport--mention""#));
    assert!(doc2.body.contains(r#"href="https://x.com/friend""#));
    assert_eq!(
        store.attribute(doc2.id, ATTR_THREAD_IDS).unwrap(),
        Some(String::new())
    );
}

#[test]
fn test_batching_and_resume() {
    let temp_dir = TempDir::new().unwrap();
    let archive_path = create_test_archive(&temp_dir);
    let db_path = temp_dir.path().join("xport.db");

    let action = import_action(&db_path);

    // First batch of two
    let mut config = ImportConfig::new(&archive_path);
    config.batch_size = 2;
    let response = action.execute(&config).unwrap();
    assert_eq!(response.processed_ids(), ["8001", "8002"]);
    assert_eq!(response.last_tweet_id(), Some("8002"));

    // Resume picks up the remaining root
    config.last_tweet_id = response.last_tweet_id().map(String::from);
    let response = action.execute(&config).unwrap();
    assert_eq!(response.processed_ids(), ["8003"]);

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.document_count().unwrap(), 3);
}

#[test]
fn test_duplicate_policies_across_reimports() {
    let temp_dir = TempDir::new().unwrap();
    let archive_path = create_test_archive(&temp_dir);
    let db_path = temp_dir.path().join("xport.db");

    let action = import_action(&db_path);
    let mut config = ImportConfig::new(&archive_path);
    action.execute(&config).unwrap();

    // Skip leaves the originals untouched
    config.on_duplicate = OnDuplicate::Skip;
    let response = action.execute(&config).unwrap();
    assert_eq!(response.processed_ids().len(), 3);
    assert!(
        response
            .messages()
            .iter()
            .all(|m| m.contains("already exists and was skipped"))
    );
    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.document_count().unwrap(), 3);
    drop(store);

    // Update rewrites in place
    config.on_duplicate = OnDuplicate::Update;
    let response = action.execute(&config).unwrap();
    assert!(
        response
            .messages()
            .iter()
            .all(|m| m.starts_with("Tweet updated"))
    );
    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.document_count().unwrap(), 3);
    drop(store);

    // New duplicates every document
    config.on_duplicate = OnDuplicate::New;
    action.execute(&config).unwrap();
    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.document_count().unwrap(), 6);
}

#[test]
fn test_failed_tweets_do_not_block_the_batch() {
    let temp_dir = TempDir::new().unwrap();
    let content = r#"window.YTD.tweets.part0 = [
        {
            "tweet": {
                "id_str": "9001",
                "created_at": "Wed Jan 08 12:00:00 +0000 2025",
                "full_text": "Good tweet before the bad one",
                "entities": {"hashtags": [], "user_mentions": [], "urls": []}
            }
        },
        {
            "tweet": {
                "id_str": "9002",
                "created_at": "not a date",
                "full_text": "This one has an unparseable timestamp",
                "entities": {"hashtags": [], "user_mentions": [], "urls": []}
            }
        },
        {
            "tweet": {
                "id_str": "9003",
                "created_at": "Fri Jan 10 09:15:00 +0000 2025",
                "full_text": "Good tweet after the bad one",
                "entities": {"hashtags": [], "user_mentions": [], "urls": []}
            }
        }
    ]"#;
    let archive_path = temp_dir.path().join("tweets.js");
    std::fs::write(&archive_path, content).unwrap();
    let db_path = temp_dir.path().join("xport.db");

    let action = import_action(&db_path);
    let response = action.execute(&ImportConfig::new(&archive_path)).unwrap();

    assert_eq!(response.processed_ids(), ["9001", "9003"]);
    assert_eq!(response.failed_ids(), ["9002"]);
    assert!(
        response
            .messages()
            .iter()
            .any(|m| m.starts_with("Failed to process tweet: 9002."))
    );

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.document_count().unwrap(), 2);
}

#[test]
fn test_empty_archive() {
    let temp_dir = TempDir::new().unwrap();
    let archive_path = temp_dir.path().join("tweets.js");
    std::fs::write(&archive_path, "window.YTD.tweets.part0 = []").unwrap();
    let db_path = temp_dir.path().join("xport.db");

    let action = import_action(&db_path);
    let response = action.execute(&ImportConfig::new(&archive_path)).unwrap();

    assert!(response.processed_ids().is_empty());
    assert!(response.failed_ids().is_empty());
    assert_eq!(response.last_tweet_id(), None);

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.document_count().unwrap(), 0);
}
