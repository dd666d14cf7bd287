//! Content-addressing endpoint addresses.

use std::fmt;
use std::str::FromStr;

use reqwest::Url;

/// Route appended to an endpoint's base path for add/pin requests.
pub const ADD_ROUTE: &str = "api/v0/add";

/// Address of a content-addressing service.
///
/// Only `http` and `https` URLs with a host are accepted. Any path on the
/// address is kept as a prefix of the add route, so gateway-style bases such
/// as `https://host/ipfs/` resolve to `https://host/ipfs/api/v0/add`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(Url);

/// Errors raised for malformed endpoint addresses.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EndpointError {
    /// The address could not be parsed as a URL.
    #[error("invalid endpoint address {input:?}: {reason}")]
    Parse {
        /// The rejected input.
        input: String,
        /// Parser message.
        reason: String,
    },

    /// The URL uses a scheme other than http(s).
    #[error("unsupported scheme {scheme:?} in endpoint {input:?}")]
    Scheme {
        /// The rejected input.
        input: String,
        /// Scheme found in the input.
        scheme: String,
    },

    /// The URL has no host.
    #[error("endpoint {0:?} has no host")]
    MissingHost(String),
}

impl Endpoint {
    /// Parse and validate an endpoint address.
    ///
    /// # Errors
    ///
    /// Returns an [`EndpointError`] if the address is not an absolute
    /// http(s) URL with a host.
    pub fn parse(input: &str) -> Result<Self, EndpointError> {
        let trimmed = input.trim();
        let url = Url::parse(trimmed).map_err(|e| EndpointError::Parse {
            input: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(EndpointError::Scheme {
                input: trimmed.to_string(),
                scheme: url.scheme().to_string(),
            });
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(EndpointError::MissingHost(trimmed.to_string()));
        }

        Ok(Self(url))
    }

    /// Parse a comma-separated list, skipping blank items.
    ///
    /// # Errors
    ///
    /// Returns the first [`EndpointError`] encountered.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, EndpointError> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// The configured base URL.
    pub fn url(&self) -> &Url {
        &self.0
    }

    /// Full URL of the add/pin route on this endpoint.
    pub fn add_url(&self) -> Url {
        let mut url = self.0.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/{ADD_ROUTE}"));
        url.set_query(None);
        url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_url_keeps_base_path() {
        let local = Endpoint::parse("http://127.0.0.1:5001").unwrap();
        assert_eq!(local.add_url().as_str(), "http://127.0.0.1:5001/api/v0/add");

        let gateway = Endpoint::parse("https://ipfs.oceanprotocol.com/ipfs/").unwrap();
        assert_eq!(
            gateway.add_url().as_str(),
            "https://ipfs.oceanprotocol.com/ipfs/api/v0/add"
        );
    }

    #[test]
    fn test_rejects_bad_addresses() {
        assert!(matches!(
            Endpoint::parse("not a url"),
            Err(EndpointError::Parse { .. })
        ));
        assert!(matches!(
            Endpoint::parse("ftp://example.com"),
            Err(EndpointError::Scheme { .. })
        ));
        assert!(Endpoint::parse("unix:/run/ipfs.sock").is_err());
    }

    #[test]
    fn test_parse_list() {
        let list = Endpoint::parse_list(" http://a:5001 , ,https://b/ ").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].url().host_str(), Some("b"));
        assert!(Endpoint::parse_list("").unwrap().is_empty());
    }
}
