//! Background daemon launcher with readiness detection.
//!
//! The daemon runs in its own process group with stdout and stderr appended to
//! a log file, so it holds no pipe to the launcher and keeps running after the
//! launcher exits. The launcher follows that file like `tail -f`, echoing each
//! line, until the readiness line shows up.
//!
//! ```text
//! launch(spec)
//!   -> open log (given path, or a kept temp file)
//!   -> spawn program, stdout + stderr -> log
//!   -> follow log from its previous end
//!        line == ready_line   -> Ok(DetachedDaemon)
//!        program exited       -> ExitedEarly
//!        timeout              -> kill, NotReady
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncSeekExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Line printed by an IPFS daemon once its API is up.
pub const DEFAULT_READY_LINE: &str = "Daemon is ready";

/// Default bound on how long to wait for readiness.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(120);

/// How often the log is re-read once it has been drained.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors raised while launching a daemon.
#[derive(Error, Debug)]
pub enum DaemonError {
    /// The program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that was requested.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The readiness line did not appear in time. The daemon was killed.
    #[error("daemon not ready after {timeout:?}")]
    NotReady {
        /// The bound that expired.
        timeout: Duration,
    },

    /// The daemon exited before reporting readiness.
    #[error("daemon exited before becoming ready ({status})")]
    ExitedEarly {
        /// Exit status as reported by the OS.
        status: String,
    },

    /// Opening or reading the daemon's log failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// What to run and how to recognise readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonSpec {
    /// Executable name or path.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Exact output line (ignoring trailing whitespace) that signals readiness.
    pub ready_line: String,
    /// Upper bound on the wait, `None` to wait forever.
    pub timeout: Option<Duration>,
    /// File receiving the daemon's output, appended to. `None` creates a new
    /// file in the temp directory that outlives the launcher.
    pub log_file: Option<PathBuf>,
}

impl Default for DaemonSpec {
    fn default() -> Self {
        Self {
            program: "ipfs".to_string(),
            args: vec!["daemon".to_string()],
            ready_line: DEFAULT_READY_LINE.to_string(),
            timeout: Some(DEFAULT_READY_TIMEOUT),
            log_file: None,
        }
    }
}

/// A daemon that reported readiness and now runs independently.
///
/// Dropping the handle does not stop the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedDaemon {
    pid: Option<u32>,
    log_file: PathBuf,
}

impl DetachedDaemon {
    /// OS process id, when the platform reports one.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Where the daemon keeps writing its output.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// A source of text lines that may have to wait for more input.
#[async_trait]
pub trait LineStream: Send {
    /// The next complete line without its terminator, or `None` once the
    /// stream has ended.
    async fn next_line(&mut self) -> io::Result<Option<String>>;
}

#[async_trait]
impl<L: LineStream + ?Sized> LineStream for &mut L {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        (**self).next_line().await
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LineStream for Lines<R> {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        Lines::next_line(self).await
    }
}

/// Consume `lines` until `matches` accepts a line.
///
/// Every line, including the matching one, is handed to `on_line` first.
/// Returns `Ok(None)` if the stream ends without a match.
///
/// # Errors
///
/// Propagates read errors.
pub async fn wait_for_line<L, P, F>(
    mut lines: L,
    mut matches: P,
    mut on_line: F,
) -> io::Result<Option<String>>
where
    L: LineStream,
    P: FnMut(&str) -> bool,
    F: FnMut(&str),
{
    while let Some(line) = lines.next_line().await? {
        on_line(&line);
        if matches(&line) {
            return Ok(Some(line));
        }
    }
    Ok(None)
}

/// Follows the log a running child writes to.
///
/// At end of file it polls until more output arrives. The stream ends once the
/// child has exited and everything it wrote has been read.
struct LogTail {
    reader: BufReader<tokio::fs::File>,
    child: Child,
    pending: Vec<u8>,
    exited: bool,
}

impl LogTail {
    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        self.pending.clear();
        line
    }
}

#[async_trait]
impl LineStream for LogTail {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.pending).await?;
            if self.pending.ends_with(b"\n") {
                return Ok(Some(self.take_line()));
            }
            if read > 0 {
                continue;
            }

            // End of file with no complete line.
            if self.exited {
                return Ok((!self.pending.is_empty()).then(|| self.take_line()));
            }
            if self.child.try_wait()?.is_some() {
                // One more pass picks up whatever it wrote last.
                self.exited = true;
                continue;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Open the log for appending and return it with its path and current length.
fn open_log(path: Option<&Path>) -> io::Result<(File, PathBuf, u64)> {
    match path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let offset = file.metadata()?.len();
            Ok((file, path.to_path_buf(), offset))
        }
        None => {
            let (file, path) = tempfile::Builder::new()
                .prefix("relpub-daemon-")
                .suffix(".log")
                .tempfile()?
                .keep()?;
            Ok((file, path, 0))
        }
    }
}

/// Start the daemon described by `spec` and wait until it is ready.
///
/// Output written before readiness is echoed to stdout. Only lines written
/// after this call started are considered, so an appended log from an
/// earlier run cannot signal readiness.
///
/// # Errors
///
/// - [`DaemonError::Io`] if the log cannot be opened or read; a started
///   child is killed.
/// - [`DaemonError::Spawn`] if the program cannot be started.
/// - [`DaemonError::NotReady`] if the timeout expires; the child is killed.
/// - [`DaemonError::ExitedEarly`] if it exits before the readiness line.
pub async fn launch(spec: &DaemonSpec) -> Result<DetachedDaemon, DaemonError> {
    let (log, log_file, offset) = open_log(spec.log_file.as_deref())?;
    let mut reader = tokio::fs::File::open(&log_file).await?;
    reader.seek(SeekFrom::Start(offset)).await?;
    debug!(log = %log_file.display(), offset, "daemon log opened");

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log))
        .kill_on_drop(false);

    // Own process group: signals aimed at the launcher's group leave it alone.
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|source| DaemonError::Spawn {
        program: spec.program.clone(),
        source,
    })?;
    let pid = child.id();
    info!(program = %spec.program, ?pid, log = %log_file.display(), "daemon started, waiting for readiness");

    let mut tail = LogTail {
        reader: BufReader::new(reader),
        child,
        pending: Vec::new(),
        exited: false,
    };
    let ready_line = spec.ready_line.as_str();
    let watch = wait_for_line(
        &mut tail,
        |line| line.trim_end() == ready_line,
        |line| println!("{line}"),
    );

    let waited = match spec.timeout {
        Some(limit) => tokio::time::timeout(limit, watch).await.map_err(|_| limit),
        None => Ok(watch.await),
    };

    let mut child = tail.child;
    match waited {
        Ok(Ok(Some(_))) => {
            info!(?pid, "daemon is ready");
            Ok(DetachedDaemon { pid, log_file })
        }
        Ok(Ok(None)) => {
            let status = match child.try_wait()? {
                Some(status) => status.to_string(),
                None => "unknown".to_string(),
            };
            warn!(%status, "daemon exited before readiness");
            Err(DaemonError::ExitedEarly { status })
        }
        Ok(Err(e)) => {
            child.kill().await.ok();
            Err(DaemonError::Io(e))
        }
        Err(limit) => {
            warn!(?limit, "daemon did not become ready, killing it");
            child.kill().await.ok();
            Err(DaemonError::NotReady { timeout: limit })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_wait_for_line_matches_and_mirrors() {
        let input: &[u8] = b"Initializing daemon...\nAPI server listening\nDaemon is ready\nlater\n";
        let mut seen = Vec::new();

        let found = wait_for_line(
            input.lines(),
            |l| l == DEFAULT_READY_LINE,
            |l| seen.push(l.to_string()),
        )
        .await
        .unwrap();

        assert_eq!(found.as_deref(), Some("Daemon is ready"));
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn test_wait_for_line_stream_closed() {
        let input: &[u8] = b"starting\nshutting down\n";
        let found = wait_for_line(input.lines(), |l| l == DEFAULT_READY_LINE, |_| {})
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_default_spec() {
        let spec = DaemonSpec::default();
        assert_eq!(spec.program, "ipfs");
        assert_eq!(spec.args, ["daemon"]);
        assert_eq!(spec.timeout, Some(DEFAULT_READY_TIMEOUT));
        assert_eq!(spec.log_file, None);
    }

    fn sh(script: &str, timeout_ms: u64, log: &Path) -> DaemonSpec {
        DaemonSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            ready_line: DEFAULT_READY_LINE.to_string(),
            timeout: Some(Duration::from_millis(timeout_ms)),
            log_file: Some(log.to_path_buf()),
        }
    }

    /// Poll for `path` for up to five seconds.
    async fn appears(path: &Path) -> bool {
        for _ in 0..100 {
            if path.exists() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_returns_once_ready() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("daemon.log");
        let spec = sh("echo booting; echo 'Daemon is ready  '; sleep 1", 5_000, &log);

        let daemon = launch(&spec).await.unwrap();

        assert!(daemon.pid().is_some());
        assert_eq!(daemon.log_file(), log);
        let written = std::fs::read_to_string(&log).unwrap();
        assert!(written.starts_with("booting\nDaemon is ready"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_daemon_keeps_writing_after_ready() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("daemon.log");
        let alive = tmp.path().join("alive");
        let script = format!(
            "echo 'Daemon is ready'; sleep 1; echo later-log; echo oops >&2; touch '{}'",
            alive.display()
        );

        let daemon = launch(&sh(&script, 5_000, &log)).await.unwrap();
        drop(daemon);

        assert!(appears(&alive).await, "daemon died after readiness");
        let written = std::fs::read_to_string(&log).unwrap();
        assert!(written.contains("later-log"));
        assert!(written.contains("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ready_line_on_stderr_counts() {
        let tmp = TempDir::new().unwrap();
        let spec = sh("echo 'Daemon is ready' >&2; sleep 1", 5_000, &tmp.path().join("d.log"));
        assert!(launch(&spec).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_earlier_runs_in_the_log_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("daemon.log");
        std::fs::write(&log, "Daemon is ready\n").unwrap();

        let err = launch(&sh("echo restarting; exit 1", 5_000, &log))
            .await
            .unwrap_err();

        assert!(matches!(err, DaemonError::ExitedEarly { .. }), "{err:?}");
        let written = std::fs::read_to_string(&log).unwrap();
        assert_eq!(written, "Daemon is ready\nrestarting\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_exited_early() {
        let tmp = TempDir::new().unwrap();
        let err = launch(&sh("echo nope; exit 3", 5_000, &tmp.path().join("d.log")))
            .await
            .unwrap_err();
        let DaemonError::ExitedEarly { status } = err else {
            panic!("expected ExitedEarly, got {err:?}");
        };
        assert!(status.contains('3'), "{status}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ready_line_without_newline_before_exit() {
        let tmp = TempDir::new().unwrap();
        let spec = sh("printf 'Daemon is ready'", 5_000, &tmp.path().join("d.log"));
        assert!(launch(&spec).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unready_daemon_is_killed_even_with_output_closed() {
        let tmp = TempDir::new().unwrap();
        let pid_file = tmp.path().join("pid");
        let script = format!(
            "echo $$ > '{}'; exec sleep 30 >/dev/null 2>&1",
            pid_file.display()
        );

        let err = launch(&sh(&script, 300, &tmp.path().join("d.log")))
            .await
            .unwrap_err();
        assert!(matches!(err, DaemonError::NotReady { .. }), "{err:?}");

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let still_there = std::process::Command::new("kill")
            .args(["-0", pid.trim()])
            .stderr(Stdio::null())
            .status()
            .unwrap()
            .success();
        assert!(!still_there, "process {} survived", pid.trim());
    }

    #[tokio::test]
    async fn test_launch_missing_program() {
        let tmp = TempDir::new().unwrap();
        let spec = DaemonSpec {
            program: "/nonexistent/relpub-daemon".to_string(),
            log_file: Some(tmp.path().join("d.log")),
            ..DaemonSpec::default()
        };
        assert!(matches!(
            launch(&spec).await,
            Err(DaemonError::Spawn { .. })
        ));
    }
}
