//! Transmission of a bundle to one content-addressing endpoint.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use relpub_schema::{AddReplyError, Cid, parse_add_reply};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::source::{Bundle, EntryKind};

/// Longest slice of an error body kept in [`SubmitError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Bytes left alone by JavaScript's `encodeURIComponent`. The add endpoint
/// query-unescapes part file names, so everything else must be escaped.
const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Why a single submission failed.
///
/// These errors never leave the publisher on their own; they are folded
/// into [`crate::SubmissionResult::Failed`].
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Connection, TLS, or request-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("endpoint answered HTTP {status}: {body}")]
    Status {
        /// Numeric status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// The reply could not be interpreted.
    #[error("malformed reply: {0}")]
    Malformed(#[from] AddReplyError),

    /// No answer within the allotted time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The request body could not be built.
    #[error("could not encode request: {0}")]
    Encode(String),
}

/// Something that can add and pin a bundle on an endpoint.
#[async_trait]
pub trait ContentTransport: Send + Sync {
    /// Transmit `bundle` to `endpoint` and return the root identifier.
    async fn add(&self, endpoint: &Endpoint, bundle: &Bundle) -> Result<Cid, SubmitError>;
}

/// [`ContentTransport`] speaking the HTTP add/pin protocol.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    request_timeout: Option<Duration>,
}

impl HttpTransport {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            request_timeout: None,
        }
    }

    /// Bound each individual request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn form(bundle: &Bundle) -> Result<Form, SubmitError> {
        // Names are escaped below; reqwest must not escape them again.
        let mut form = Form::new().percent_encode_noop();
        for entry in bundle.entries() {
            let name = encode_file_name(&entry.path);
            let part = match &entry.kind {
                EntryKind::Directory => Part::bytes(Vec::new())
                    .file_name(name)
                    .mime_str("application/x-directory"),
                EntryKind::File(data) => Part::stream_with_length(
                    reqwest::Body::from(data.clone()),
                    data.len() as u64,
                )
                .file_name(name)
                .mime_str("application/octet-stream"),
            }
            .map_err(|e| SubmitError::Encode(e.to_string()))?;
            form = form.part("file", part);
        }
        Ok(form)
    }
}

/// Escape each `/`-separated component of a bundle path.
fn encode_file_name(path: &str) -> String {
    path.split('/')
        .map(|component| utf8_percent_encode(component, FILE_NAME_SET).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl ContentTransport for HttpTransport {
    async fn add(&self, endpoint: &Endpoint, bundle: &Bundle) -> Result<Cid, SubmitError> {
        let url = endpoint.add_url();
        debug!(%url, files = bundle.file_count(), "submitting bundle");

        let mut request = self
            .client
            .post(url)
            .query(&[("pin", "true"), ("progress", "false")])
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .multipart(Self::form(bundle)?);
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let body = response.text().await?;
        let entry = parse_add_reply(&body, bundle.root())?;
        debug!(endpoint = %endpoint, cid = %entry.cid, "endpoint accepted bundle");
        Ok(entry.cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BundleEntry;
    use bytes::Bytes;
    use mockito::{Matcher, Server};

    fn bundle() -> Bundle {
        Bundle::new(
            "dist",
            vec![
                BundleEntry {
                    path: "dist".to_string(),
                    kind: EntryKind::Directory,
                },
                BundleEntry {
                    path: "dist/a.txt".to_string(),
                    kind: EntryKind::File(Bytes::from_static(b"hello")),
                },
            ],
        )
    }

    #[tokio::test]
    async fn test_add_returns_root_cid() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/v0/add")
            .match_query(Matcher::UrlEncoded("pin".into(), "true".into()))
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data".into()),
            )
            .match_body(Matcher::Regex("application/x-directory".into()))
            .with_status(200)
            .with_body(concat!(
                "{\"Name\":\"dist/a.txt\",\"Hash\":\"QmFile\",\"Size\":\"13\"}\n",
                "{\"Name\":\"dist\",\"Hash\":\"QmRoot\",\"Size\":\"64\"}\n",
            ))
            .create_async()
            .await;

        let endpoint = Endpoint::parse(&server.url()).unwrap();
        let cid = HttpTransport::default()
            .add(&endpoint, &bundle())
            .await
            .unwrap();

        assert_eq!(cid.as_str(), "QmRoot");
        m.assert_async().await;
    }

    #[test]
    fn test_file_names_are_escaped_per_component() {
        assert_eq!(encode_file_name("dist/a.txt"), "dist/a.txt");
        assert_eq!(
            encode_file_name("dist/a+b c%.txt"),
            "dist/a%2Bb%20c%25.txt"
        );
        assert_eq!(encode_file_name("dist/(x)!~*'"), "dist/(x)!~*'");
        assert_eq!(encode_file_name("dist/ü.txt"), "dist/%C3%BC.txt");
    }

    #[tokio::test]
    async fn test_escaped_file_name_on_the_wire() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/v0/add")
            .match_query(Matcher::Any)
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"filename="dist/a%2Bb%20c%25\.txt""#.into()),
                Matcher::Regex(r#"filename="dist""#.into()),
            ]))
            .with_status(200)
            .with_body("{\"Name\":\"dist\",\"Hash\":\"QmRoot\"}\n")
            .create_async()
            .await;

        let bundle = Bundle::new(
            "dist",
            vec![
                BundleEntry {
                    path: "dist".to_string(),
                    kind: EntryKind::Directory,
                },
                BundleEntry {
                    path: "dist/a+b c%.txt".to_string(),
                    kind: EntryKind::File(Bytes::from_static(b"odd")),
                },
            ],
        );
        let endpoint = Endpoint::parse(&server.url()).unwrap();
        let cid = HttpTransport::default().add(&endpoint, &bundle).await.unwrap();

        assert_eq!(cid.as_str(), "QmRoot");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/v0/add")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let endpoint = Endpoint::parse(&server.url()).unwrap();
        let err = HttpTransport::default()
            .add(&endpoint, &bundle())
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::Status { status: 403, ref body } if body == "forbidden"));
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/v0/add")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let endpoint = Endpoint::parse(&server.url()).unwrap();
        let err = HttpTransport::default()
            .add(&endpoint, &bundle())
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Nothing listens on the discard port here.
        let endpoint = Endpoint::parse("http://127.0.0.1:9").unwrap();
        let err = HttpTransport::default()
            .with_request_timeout(Duration::from_secs(5))
            .add(&endpoint, &bundle())
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::Http(_)));
    }
}
