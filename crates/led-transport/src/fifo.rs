//! FIFO transport for the LED server
//!
//! A connection is a pair of named pipes derived from one base path:
//! `<base>_client` carries requests to the server and `<base>_server`
//! carries responses back.

use std::ffi::{CString, OsString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::unix::pipe;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use led_protocol::{CommandRegistry, Handler};

use crate::error::{TransportError, TransportResult};
use crate::handler::{wait_for_shutdown, ConnectionHandler, SessionEnd};

/// How often to retry opening the response pipe while no client reads it
const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Permission bits for newly created pipes (before umask)
const FIFO_MODE: libc::mode_t = 0o666;

/// Paths of the request and response pipes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoPaths {
    /// Client writes, server reads
    pub request: PathBuf,
    /// Server writes, client reads
    pub response: PathBuf,
}

impl FifoPaths {
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            request: with_suffix(base, "_client"),
            response: with_suffix(base, "_server"),
        }
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(base.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

/// Replace whatever is at `path` with a fresh FIFO
fn make_fifo(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed stale pipe"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"))?;

    // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), FIFO_MODE) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Open `path` for writing once some process has it open for reading.
///
/// A non-blocking open for write fails with `ENXIO` while the pipe has no
/// reader, so poll until it succeeds.
pub(crate) async fn open_sender_when_ready(path: &Path) -> io::Result<pipe::Sender> {
    loop {
        match pipe::OpenOptions::new().open_sender(path) {
            Ok(sender) => return Ok(sender),
            Err(e) if e.raw_os_error() == Some(libc::ENXIO) => {
                tokio::time::sleep(CONNECT_POLL_INTERVAL).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Serves LED commands over a FIFO pair, one client at a time.
///
/// The pipes are created by [`FifoServer::create`] and removed on drop.
pub struct FifoServer<H> {
    paths: FifoPaths,
    registry: Arc<CommandRegistry<H>>,
    read_timeout: Option<Duration>,
    once: bool,
    client_counter: AtomicU64,
}

impl<H: Handler> FifoServer<H> {
    /// Create both pipes under `base`, replacing stale files
    pub fn create(base: impl AsRef<Path>, registry: Arc<CommandRegistry<H>>) -> TransportResult<Self> {
        let paths = FifoPaths::new(base);

        for path in [&paths.request, &paths.response] {
            make_fifo(path).map_err(|source| TransportError::Setup {
                path: path.display().to_string(),
                source,
            })?;
        }

        Ok(Self {
            paths,
            registry,
            read_timeout: None,
            once: false,
            client_counter: AtomicU64::new(0),
        })
    }

    /// Drop clients that stay silent longer than `timeout`
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Stop after the first client disconnects
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Wait for a client to open both pipes.
    ///
    /// Returns `None` if shutdown is requested first.
    pub async fn accept(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> TransportResult<Option<(BufReader<pipe::Receiver>, pipe::Sender)>> {
        let receiver = pipe::OpenOptions::new().open_receiver(&self.paths.request)?;

        let sender = tokio::select! {
            sender = open_sender_when_ready(&self.paths.response) => sender?,
            _ = wait_for_shutdown(shutdown) => return Ok(None),
        };

        Ok(Some((BufReader::new(receiver), sender)))
    }

    /// Serve clients until shutdown (or after one client when `once` is set).
    ///
    /// A failed connection is logged and the next client is accepted.
    pub async fn run(
        &self,
        target: &mut H::Target,
        mut shutdown: watch::Receiver<bool>,
    ) -> TransportResult<()> {
        info!(
            request = %self.paths.request.display(),
            response = %self.paths.response.display(),
            "LED FIFO server listening"
        );

        loop {
            let Some((reader, writer)) = self.accept(&mut shutdown).await? else {
                info!("Stopped waiting for clients");
                return Ok(());
            };

            let client_id = format!("fifo:{}", self.client_counter.fetch_add(1, Ordering::Relaxed));
            info!(client = %client_id, "Client connected");

            let handler = ConnectionHandler::new(client_id.clone(), self.registry.clone())
                .with_read_timeout(self.read_timeout);

            match handler.serve(target, reader, writer, &mut shutdown).await {
                Ok(SessionEnd::Shutdown) => return Ok(()),
                Ok(end) => debug!(client = %client_id, reason = ?end, "Session ended"),
                Err(e) => error!(client = %client_id, error = %e, "Connection error"),
            }

            if self.once {
                return Ok(());
            }
        }
    }
}

impl<H> Drop for FifoServer<H> {
    fn drop(&mut self) {
        for path in [&self.paths.request, &self.paths.response] {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to remove pipe");
            }
        }
    }
}
