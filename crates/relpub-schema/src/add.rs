//! Reply format of the add/pin route.
//!
//! The route answers with newline-delimited JSON, one object per added file
//! or directory:
//!
//! ```text
//! {"Name":"site/index.html","Hash":"QmX...","Size":"1042"}
//! {"Name":"site","Hash":"QmRoot...","Size":"4096"}
//! ```
//!
//! Errors raised after the response headers were sent arrive in the same
//! stream as `{"Message":"...","Type":"error"}` objects.

use serde::Deserialize;

use crate::cid::Cid;

/// One added file or directory, as reported by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddEntry {
    /// Path of the entry relative to the upload root.
    pub name: String,
    /// Identifier the endpoint assigned to the entry.
    pub cid: Cid,
}

/// Errors produced while interpreting an add reply.
#[derive(thiserror::Error, Debug)]
pub enum AddReplyError {
    /// The reply contained no entries.
    #[error("reply contained no entries")]
    Empty,

    /// A line could not be decoded.
    #[error("malformed reply line {line}: {source}")]
    Json {
        /// 1-based line number inside the reply.
        line: usize,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The endpoint reported an error inside the stream.
    #[error("endpoint reported: {0}")]
    Remote(String),
}

#[derive(Deserialize)]
struct RawLine {
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Hash", alias = "cid", alias = "Cid", default)]
    hash: Option<Cid>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "Type", default)]
    kind: Option<String>,
}

/// Parse a complete add reply and pick the root entry.
///
/// The root is the entry whose name equals `root`. When no entry carries
/// that name (e.g. a single-file upload, or a service that reports only the
/// root), the last entry is used. Lines without an identifier, such as
/// progress notices, are skipped.
///
/// # Errors
///
/// Returns [`AddReplyError::Json`] if a line is not valid JSON,
/// [`AddReplyError::Remote`] if the stream carries an error object, and
/// [`AddReplyError::Empty`] if no entry with an identifier was found.
pub fn parse_add_reply(body: &str, root: &str) -> Result<AddEntry, AddReplyError> {
    let mut entries = Vec::new();

    for (idx, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let raw: RawLine =
            serde_json::from_str(line).map_err(|source| AddReplyError::Json {
                line: idx + 1,
                source,
            })?;

        if raw.kind.as_deref() == Some("error") {
            return Err(AddReplyError::Remote(raw.message.unwrap_or_default()));
        }

        if let Some(cid) = raw.hash {
            entries.push(AddEntry {
                name: raw.name.unwrap_or_default(),
                cid,
            });
        }
    }

    let position = entries
        .iter()
        .position(|e| e.name == root)
        .or_else(|| entries.len().checked_sub(1))
        .ok_or(AddReplyError::Empty)?;

    Ok(entries.swap_remove(position))
}
