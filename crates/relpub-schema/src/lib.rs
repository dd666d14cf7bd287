//! Wire types shared by the relpub publisher, resolver and CLI.
//!
//! Nothing in here performs I/O. The types mirror the JSON payloads spoken by
//! content-addressing add/pin endpoints and the GitHub releases API.

pub mod add;
pub mod cid;
pub mod github;

// Re-exports
pub use add::{AddEntry, AddReplyError, parse_add_reply};
pub use cid::{Cid, CidError};
pub use github::{GithubAsset, GithubRelease};

/// Workflow output key the publisher writes the selected identifier under.
pub const DEFAULT_OUTPUT_KEY: &str = "ipfs-hash";
