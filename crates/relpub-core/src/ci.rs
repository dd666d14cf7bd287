//! CI output channel.
//!
//! GitHub Actions accepts step outputs either as `key=value` lines appended
//! to the file named by `GITHUB_OUTPUT`, or through the older
//! `::set-output name=<key>::<value>` workflow command on stdout.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

/// Environment variable naming the step output file.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Errors raised when writing a CI output.
#[derive(Error, Debug)]
pub enum CiError {
    /// Key or value contains a line break, or the key is empty.
    #[error("invalid output {key:?}: keys must be non-empty and neither key nor value may contain line breaks")]
    InvalidValue {
        /// The rejected key.
        key: String,
    },

    /// Writing the output failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Where step outputs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiOutput {
    /// `::set-output` workflow commands on stdout.
    Stdout,
    /// `key=value` lines appended to a file.
    File(PathBuf),
    /// Outputs are dropped.
    Disabled,
}

impl CiOutput {
    /// Pick the channel from the process environment.
    pub fn from_env() -> Self {
        Self::from_var(std::env::var_os(GITHUB_OUTPUT_ENV))
    }

    /// Pick the channel from the value of `GITHUB_OUTPUT`, if set.
    pub fn from_var(value: Option<OsString>) -> Self {
        match value {
            Some(path) if !path.is_empty() => Self::File(PathBuf::from(path)),
            _ => Self::Stdout,
        }
    }

    /// Publish `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CiError::InvalidValue`] for keys or values that would break
    /// the line format, and [`CiError::Io`] if writing fails.
    pub fn set(&self, key: &str, value: &str) -> Result<(), CiError> {
        if key.is_empty() || [key, value].iter().any(|s| s.contains(['\n', '\r'])) {
            return Err(CiError::InvalidValue {
                key: key.to_string(),
            });
        }

        match self {
            Self::Stdout => {
                let mut out = io::stdout().lock();
                write_workflow_command(&mut out, key, value)?;
                out.flush()?;
            }
            Self::File(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                writeln!(file, "{key}={value}")?;
            }
            Self::Disabled => {}
        }

        debug!(key, value, channel = ?self, "ci output written");
        Ok(())
    }
}

/// Write a `::set-output` workflow command.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_workflow_command<W: Write>(out: &mut W, key: &str, value: &str) -> io::Result<()> {
    writeln!(out, "::set-output name={key}::{value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_workflow_command_format() {
        let mut buf = Vec::new();
        write_workflow_command(&mut buf, "ipfs-hash", "QmRoot").unwrap();
        assert_eq!(buf, b"::set-output name=ipfs-hash::QmRoot\n");
    }

    #[test]
    fn test_from_var() {
        assert_eq!(CiOutput::from_var(None), CiOutput::Stdout);
        assert_eq!(CiOutput::from_var(Some(OsString::new())), CiOutput::Stdout);
        assert_eq!(
            CiOutput::from_var(Some("/tmp/out".into())),
            CiOutput::File(PathBuf::from("/tmp/out"))
        );
    }

    #[test]
    fn test_file_channel_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("github_output");
        std::fs::write(&path, "earlier=1\n").unwrap();

        let output = CiOutput::File(path.clone());
        output.set("ipfs-hash", "QmRoot").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "earlier=1\nipfs-hash=QmRoot\n"
        );
    }

    #[test]
    fn test_rejects_line_breaks() {
        let output = CiOutput::Disabled;
        assert!(matches!(
            output.set("key", "a\nb"),
            Err(CiError::InvalidValue { .. })
        ));
        assert!(output.set("", "v").is_err());
        assert!(output.set("key", "value").is_ok());
    }
}
