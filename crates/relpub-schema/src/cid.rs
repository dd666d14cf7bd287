//! Content identifier newtype.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque content identifier returned by a content-addressing service.
///
/// The value is never interpreted; the only guarantee is that it is
/// non-empty and contains no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cid(String);

/// Errors that can occur when constructing a [`Cid`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CidError {
    /// The identifier string is empty.
    #[error("content identifier is empty")]
    Empty,

    /// The identifier contains whitespace.
    #[error("content identifier contains whitespace: {0:?}")]
    Whitespace(String),
}

impl Cid {
    /// Validate and wrap an identifier string.
    ///
    /// # Errors
    ///
    /// Returns [`CidError::Empty`] for an empty string and
    /// [`CidError::Whitespace`] if any whitespace is present.
    pub fn new(value: impl Into<String>) -> Result<Self, CidError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CidError::Empty);
        }
        if value.chars().any(char::is_whitespace) {
            return Err(CidError::Whitespace(value));
        }
        Ok(Self(value))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Cid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Cid {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Cid {
    type Error = CidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}
