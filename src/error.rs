//! Custom error types for xport.
//!
//! Provides structured error handling with detailed context for better
//! diagnostics and user experience.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for xport operations.
///
/// Each variant provides specific context about what went wrong,
/// enabling better error messages and programmatic error handling.
#[derive(Error, Debug)]
pub enum XportError {
    // =========================================================================
    // Archive Errors
    // =========================================================================
    /// Archive file not found at the specified path.
    #[error("Archive not found at '{path}'")]
    ArchiveNotFound { path: PathBuf },

    // =========================================================================
    // Processor Errors
    // =========================================================================
    /// No processor is registered under the requested selector.
    #[error("Unknown processor '{selector}'")]
    UnknownProcessor {
        selector: String,
        known: Vec<String>,
    },

    /// A tweet could not be turned into a document.
    #[error("{reason}")]
    Processing { tweet_id: String, reason: String },

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// Content-store operation failed.
    #[error("{operation} failed: {reason}")]
    Persistence {
        operation: &'static str,
        reason: String,
    },

    /// Underlying database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Data not found.
    #[error("{item_type} with ID '{id}' not found")]
    NotFound { item_type: &'static str, id: String },

    // =========================================================================
    // Media Errors
    // =========================================================================
    /// Media fetch or sideload failed.
    #[error("Media upload failed for '{url}': {reason}")]
    MediaError { url: String, reason: String },

    // =========================================================================
    // IO Errors
    // =========================================================================
    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Data Validation Errors
    // =========================================================================
    /// Invalid date format in archive data.
    #[error("Invalid date format '{value}' in {context}")]
    InvalidDate { value: String, context: String },

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Catch-all for other errors with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for xport operations.
pub type Result<T> = std::result::Result<T, XportError>;

impl XportError {
    /// Create an archive not found error.
    pub fn archive_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ArchiveNotFound { path: path.into() }
    }

    /// Create a per-tweet processing error.
    pub fn processing(tweet_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Processing {
            tweet_id: tweet_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Persistence {
            operation,
            reason: reason.into(),
        }
    }

    /// Create a media error.
    pub fn media(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MediaError {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(item_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            item_type,
            id: id.into(),
        }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Wrap an error with additional context.
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Check whether this error is fatal to a whole batch run.
    ///
    /// A missing archive or unknown selector aborts the run before any tweet
    /// is attempted; everything else is recorded per-item and the batch
    /// continues.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ArchiveNotFound { .. } | Self::UnknownProcessor { .. }
        )
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ArchiveNotFound { .. } => Some(
                "Verify the archive path. Expected the tweets part file (e.g. data/tweets.js) from an extracted X export.",
            ),
            Self::UnknownProcessor { .. } => {
                Some("Run 'xport import --help' to see the registered processors.")
            }
            _ => None,
        }
    }
}

// =============================================================================
// CLI Error Formatting Utilities
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with an optional explanation and a list of
/// actionable suggestions.
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}

/// Calculate the Levenshtein edit distance between two strings.
///
/// This is used for "did you mean?" suggestions when users make typos.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Two rolling rows instead of the full matrix
    let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_chars.len()]
}

/// Find the closest candidate within `max_distance` edits of `input`
/// (default 2), ignoring case. Exact matches return `None`; a typo of a
/// valid option is the only thing worth suggesting.
#[must_use]
pub fn find_closest_match<'a>(
    input: &str,
    candidates: &[&'a str],
    max_distance: Option<usize>,
) -> Option<&'a str> {
    let max_dist = max_distance.unwrap_or(2);
    let input_lower = input.to_lowercase();

    candidates
        .iter()
        .map(|&candidate| {
            let distance = levenshtein_distance(&input_lower, &candidate.to_lowercase());
            (candidate, distance)
        })
        .filter(|(_, distance)| *distance <= max_dist && *distance > 0)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Format a "did you mean?" suggestion.
#[must_use]
pub fn format_did_you_mean(suggestion: &str) -> String {
    format!("Did you mean '{}'?", suggestion.green())
}

/// Format an error for an unknown value (`kind` names what it was, e.g.
/// "processor"), with a "did you mean?" line when a close match exists and
/// the full option list when it is short enough to show.
pub fn format_unknown_value_error(kind: &str, input: &str, valid_options: &[&str]) -> String {
    let title = format!("Unknown {kind}: '{input}'");

    let mut suggestions = Vec::new();

    if let Some(closest) = find_closest_match(input, valid_options, None) {
        suggestions.push(format_did_you_mean(closest));
    }

    if valid_options.len() <= 8 {
        suggestions.push(format!("Valid {kind}s: {}", valid_options.join(", ")));
    }

    let suggestion_refs: Vec<&str> = suggestions.iter().map(String::as_str).collect();
    format_error(&title, "", &suggestion_refs)
}

/// Render an [`XportError`] for terminal display.
///
/// Unknown-selector errors get "did you mean?" treatment; other variants
/// carry their standing suggestion when one applies.
#[must_use]
pub fn render_error(error: &XportError) -> String {
    if let XportError::UnknownProcessor { selector, known } = error {
        let known_refs: Vec<&str> = known.iter().map(String::as_str).collect();
        return format_unknown_value_error("processor", selector, &known_refs);
    }

    let suggestions: Vec<&str> = error.suggestion().into_iter().collect();
    format_error(&error.to_string(), "", &suggestions)
}
