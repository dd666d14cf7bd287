//! Subset of the GitHub releases API payloads.

use serde::{Deserialize, Serialize};

/// A release as returned by `GET /repos/{owner}/{repo}/releases[/...]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GithubRelease {
    /// Numeric release id.
    pub id: u64,
    /// Git tag the release points at.
    pub tag_name: String,
    /// Display name, if one was set.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the release is still a draft.
    #[serde(default)]
    pub draft: bool,
    /// Whether the release is marked as a pre-release.
    #[serde(default)]
    pub prerelease: bool,
    /// Uploaded assets, in API order.
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

/// A file attached to a release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GithubAsset {
    /// File name of the asset.
    pub name: String,
    /// Public download URL.
    pub browser_download_url: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

impl GithubRelease {
    /// First asset whose name equals `filename` exactly.
    pub fn find_asset(&self, filename: &str) -> Option<&GithubAsset> {
        self.assets.iter().find(|a| a.name == filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_release_ignores_extra_fields() {
        let json = r#"{
            "id": 42,
            "tag_name": "2021.05.01",
            "html_url": "https://github.com/o/r/releases/tag/2021.05.01",
            "assets": [
                {"name": "ytdl-patched", "browser_download_url": "https://dl/1", "size": 10, "id": 7},
                {"name": "ytdl-patched.exe", "browser_download_url": "https://dl/2"}
            ]
        }"#;
        let release: GithubRelease = serde_json::from_str(json).unwrap();
        assert_eq!(release.id, 42);
        assert!(!release.draft);
        assert_eq!(
            release.find_asset("ytdl-patched.exe").unwrap().browser_download_url,
            "https://dl/2"
        );
        assert!(release.find_asset("YTDL-PATCHED").is_none());
    }
}
