//! Content-store collaborators.
//!
//! The import engine only knows the [`ContentStore`] contract: find a
//! document by attribute, create or update one, attach attributes. Two
//! implementations ship here: a `SQLite`-backed store for real imports and an
//! in-memory store for dry runs and tests.

use crate::error::{Result, XportError};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

const SCHEMA_VERSION: i32 = 1;

/// One persisted document compiled from a tweet and its thread.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
}

/// Fields for creating or updating a document.
#[derive(Debug, Clone)]
pub struct DocumentDraft {
    pub title: String,
    pub body: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
}

/// Attribute-equality lookup, e.g. `tweet_id == "123"`.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub attribute: String,
    pub value: String,
}

impl DocumentQuery {
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Storage contract consumed by processors.
pub trait ContentStore {
    /// Find the first document carrying the queried attribute value.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying storage fails; an absent document
    /// is `Ok(None)`.
    fn find(&self, query: &DocumentQuery) -> Result<Option<Document>>;

    /// Persist a new document.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be written.
    fn create(&mut self, draft: &DocumentDraft) -> Result<Document>;

    /// Overwrite an existing document.
    ///
    /// # Errors
    ///
    /// Returns an error when the document does not exist or cannot be
    /// written.
    fn update(&mut self, id: i64, draft: &DocumentDraft) -> Result<Document>;

    /// Attach or replace a named attribute on a document.
    ///
    /// # Errors
    ///
    /// Returns an error when the attribute cannot be written.
    fn set_attribute(&mut self, document_id: i64, key: &str, value: &str) -> Result<()>;
}

// =============================================================================
// SQLite store
// =============================================================================

/// `SQLite`-backed content store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())?;

        // Set pragmas for performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be initialized.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            ",
        )?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let current_version = self.get_schema_version();

        if current_version < SCHEMA_VERSION {
            info!(
                "Migrating database from version {} to {}",
                current_version, SCHEMA_VERSION
            );
            self.create_schema()?;
            self.set_schema_version(SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn get_schema_version(&self) -> i32 {
        let result: std::result::Result<i32, _> = self.conn.query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| {
                let value: String = row.get(0)?;
                Ok(value.parse().unwrap_or(0))
            },
        );

        // Treat missing schema table as version 0.
        result.unwrap_or_default()
    }

    fn set_schema_version(&self, version: i32) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?)",
            params![version.to_string()],
        )?;
        Ok(())
    }

    fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            -- Metadata table
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Compiled documents
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                author TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'published'
            );
            CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at);

            -- Free-form attributes (the tweet_id lookup key lives here)
            CREATE TABLE IF NOT EXISTS document_attributes (
                document_id INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (document_id, key),
                FOREIGN KEY (document_id) REFERENCES documents(id)
            );
            CREATE INDEX IF NOT EXISTS idx_attributes_lookup ON document_attributes(key, value);
            ",
        )?;

        Ok(())
    }

    /// Total number of stored documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub fn document_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Read a single attribute off a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup query fails.
    pub fn attribute(&self, document_id: i64, key: &str) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT value FROM document_attributes WHERE document_id = ? AND key = ?",
            params![document_id, key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_document(&self, id: i64) -> Result<Document> {
        let result = self.conn.query_row(
            "SELECT id, title, body, author, created_at, status FROM documents WHERE id = ?",
            params![id],
            map_document_row,
        );

        match result {
            Ok(doc) => Ok(doc),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(XportError::not_found("Document", id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn map_document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let created_at_str: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_or(DateTime::<Utc>::UNIX_EPOCH, |dt| dt.with_timezone(&Utc));

    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        author: row.get(3)?,
        created_at,
        status: row.get(5)?,
    })
}

impl ContentStore for SqliteStore {
    fn find(&self, query: &DocumentQuery) -> Result<Option<Document>> {
        let result = self.conn.query_row(
            r"
            SELECT d.id, d.title, d.body, d.author, d.created_at, d.status
            FROM documents d
            JOIN document_attributes a ON a.document_id = d.id
            WHERE a.key = ? AND a.value = ?
            ORDER BY d.id
            LIMIT 1
            ",
            params![query.attribute, query.value],
            map_document_row,
        );

        match result {
            Ok(doc) => Ok(Some(doc)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create(&mut self, draft: &DocumentDraft) -> Result<Document> {
        self.conn.execute(
            "INSERT INTO documents (title, body, author, created_at, status) VALUES (?, ?, ?, ?, ?)",
            params![
                draft.title,
                draft.body,
                draft.author,
                draft.created_at.to_rfc3339(),
                draft.status,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_document(id)
    }

    fn update(&mut self, id: i64, draft: &DocumentDraft) -> Result<Document> {
        let changed = self.conn.execute(
            "UPDATE documents SET title = ?, body = ?, author = ?, created_at = ?, status = ? WHERE id = ?",
            params![
                draft.title,
                draft.body,
                draft.author,
                draft.created_at.to_rfc3339(),
                draft.status,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(XportError::not_found("Document", id.to_string()));
        }
        self.get_document(id)
    }

    fn set_attribute(&mut self, document_id: i64, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO document_attributes (document_id, key, value) VALUES (?, ?, ?)",
            params![document_id, key, value],
        )?;
        Ok(())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// In-memory content store for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Vec<Document>,
    attributes: BTreeMap<(i64, String), String>,
    next_id: i64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored documents, in creation order.
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Look up one attribute value.
    #[must_use]
    pub fn attribute(&self, document_id: i64, key: &str) -> Option<&str> {
        self.attributes
            .get(&(document_id, key.to_string()))
            .map(String::as_str)
    }
}

impl ContentStore for MemoryStore {
    fn find(&self, query: &DocumentQuery) -> Result<Option<Document>> {
        let found = self.documents.iter().find(|doc| {
            self.attributes.get(&(doc.id, query.attribute.clone())) == Some(&query.value)
        });
        Ok(found.cloned())
    }

    fn create(&mut self, draft: &DocumentDraft) -> Result<Document> {
        self.next_id += 1;
        let doc = Document {
            id: self.next_id,
            title: draft.title.clone(),
            body: draft.body.clone(),
            author: draft.author.clone(),
            created_at: draft.created_at,
            status: draft.status.clone(),
        };
        self.documents.push(doc.clone());
        Ok(doc)
    }

    fn update(&mut self, id: i64, draft: &DocumentDraft) -> Result<Document> {
        let doc = self
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| XportError::not_found("Document", id.to_string()))?;
        doc.title = draft.title.clone();
        doc.body = draft.body.clone();
        doc.author = draft.author.clone();
        doc.created_at = draft.created_at;
        doc.status = draft.status.clone();
        Ok(doc.clone())
    }

    fn set_attribute(&mut self, document_id: i64, key: &str, value: &str) -> Result<()> {
        self.attributes
            .insert((document_id, key.to_string()), value.to_string());
        Ok(())
    }
}
