//! Connection handler - runs the request/response loop for one client

use bytes::BytesMut;
use led_protocol::{CommandRegistry, Handler, Outcome};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{TransportError, TransportResult};

/// Longest accepted request line, newline included
pub const MAX_LINE_LEN: usize = 4096;

/// Result of reading one request line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineRead {
    /// A line (or a final unterminated fragment) of this many bytes
    Line(usize),
    /// The line exceeded `MAX_LINE_LEN` and was discarded up to its `\n`
    TooLong,
    /// End of stream
    Closed,
}

/// Why a session stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed its end of the channel
    PeerClosed,
    /// The server is shutting down
    Shutdown,
    /// No request arrived within the read timeout
    IdleTimeout,
}

/// Handles a single client connection
pub struct ConnectionHandler<H> {
    /// Client ID used in logs
    pub client_id: String,
    /// Shared, read-only command table
    registry: Arc<CommandRegistry<H>>,
    /// Longest wait for the next request line
    read_timeout: Option<Duration>,
}

impl<H: Handler> ConnectionHandler<H> {
    pub fn new(client_id: String, registry: Arc<CommandRegistry<H>>) -> Self {
        Self {
            client_id,
            registry,
            read_timeout: None,
        }
    }

    /// End the session if no request arrives within `timeout`
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Process one raw request line and return the encoded response
    pub fn process(&self, target: &mut H::Target, data: &[u8]) -> BytesMut {
        let line = String::from_utf8_lossy(data);
        let outcome = self.registry.dispatch(target, &line);

        debug!(
            client = %self.client_id,
            request = %line.trim_end_matches('\n'),
            response = ?outcome,
            "Processed request"
        );

        outcome.encode()
    }

    /// Serve requests until the peer closes, the read times out, shutdown is
    /// signalled, or the channel fails.
    ///
    /// Each line is read, dispatched and answered before the next read starts.
    pub async fn serve<R, W>(
        &self,
        target: &mut H::Target,
        mut reader: R,
        mut writer: W,
        shutdown: &mut watch::Receiver<bool>,
    ) -> TransportResult<SessionEnd>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = Vec::with_capacity(256);

        loop {
            line.clear();

            let read = tokio::select! {
                read = read_request(&mut reader, &mut line, self.read_timeout) => read,
                _ = wait_for_shutdown(shutdown) => {
                    info!(client = %self.client_id, "Closing connection for shutdown");
                    return Ok(SessionEnd::Shutdown);
                }
            };

            let response = match read {
                None => {
                    info!(client = %self.client_id, "Client idle, closing connection");
                    return Ok(SessionEnd::IdleTimeout);
                }
                Some(Ok(LineRead::Closed)) => {
                    info!(client = %self.client_id, "Client disconnected");
                    return Ok(SessionEnd::PeerClosed);
                }
                Some(Ok(LineRead::Line(n))) => {
                    debug!(client = %self.client_id, bytes = n, "Read request");
                    self.process(target, &line)
                }
                Some(Ok(LineRead::TooLong)) => {
                    warn!(client = %self.client_id, max = MAX_LINE_LEN, "Request line too long");
                    Outcome::Failure.encode()
                }
                Some(Err(e)) => {
                    error!(client = %self.client_id, error = %e, "Read error");
                    return Err(TransportError::Read(e));
                }
            };

            if let Err(e) = write_response(&mut writer, &response).await {
                error!(client = %self.client_id, error = %e, "Write error");
                return Err(TransportError::Write(e));
            }
        }
    }
}

/// Read one request line. `None` means the timeout expired.
async fn read_request<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    timeout: Option<Duration>,
) -> Option<io::Result<LineRead>>
where
    R: AsyncBufRead + Unpin,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, read_line(reader, buf))
            .await
            .ok(),
        None => Some(read_line(reader, buf).await),
    }
}

/// Read up to and including the next `\n`, buffering at most
/// `MAX_LINE_LEN` bytes. The rest of an over-long line is skipped.
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let n = (&mut *reader)
        .take(MAX_LINE_LEN as u64 + 1)
        .read_until(b'\n', buf)
        .await?;

    if n == 0 {
        return Ok(LineRead::Closed);
    }
    if n <= MAX_LINE_LEN {
        return Ok(LineRead::Line(n));
    }
    if buf.last() != Some(&b'\n') {
        skip_line(reader).await?;
    }
    Ok(LineRead::TooLong)
}

/// Consume input through the next `\n` (or end of stream) without keeping it
async fn skip_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        let newline = available.iter().position(|&b| b == b'\n');
        let len = available.len();
        match newline {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => reader.consume(len),
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(response).await?;
    writer.flush().await
}

/// Resolve once shutdown has been requested or the sender is gone
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stop = *shutdown.borrow_and_update();
        if stop {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use led_core::LedDevice;
    use led_protocol::{led_registry, LedCommand, LedController};
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf};

    fn handler() -> ConnectionHandler<LedCommand> {
        ConnectionHandler::new("test".into(), Arc::new(led_registry().unwrap()))
    }

    fn controller() -> LedController {
        LedController::new(LedDevice::default()).unwrap()
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe gone")))
        }
    }

    #[test]
    fn test_process_encodes_outcome() {
        let handler = handler();
        let mut led = controller();

        assert_eq!(handler.process(&mut led, b"set-led-color blue\n").as_ref(), b"OK blue\n");
        assert_eq!(handler.process(&mut led, b"get-led-color\n").as_ref(), b"OK blue\n");
        assert_eq!(handler.process(&mut led, b"frobnicate\n").as_ref(), b"FAILED\n");
        assert_eq!(handler.process(&mut led, &[0xff, 0xfe, b'\n']).as_ref(), b"FAILED\n");
    }

    #[tokio::test]
    async fn test_serve_until_peer_closes() {
        let handler = handler();
        let mut led = controller();
        let (_tx, mut shutdown) = watch::channel(false);

        let (mut client, server) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);

        client
            .write_all(b"set-led-state on\nget-led-state\nset-led-rate 9\nget-led-rate")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        let end = handler
            .serve(&mut led, BufReader::new(read_half), write_half, &mut shutdown)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::PeerClosed);

        let mut responses = String::new();
        client.read_to_string(&mut responses).await.unwrap();
        assert_eq!(responses, "OK on\nOK on\nFAILED\nOK 0\n");
    }

    #[tokio::test]
    async fn test_one_response_per_request() {
        let handler = handler();
        let (_tx, mut shutdown) = watch::channel(false);

        let (client, server) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);

        let session = tokio::spawn(async move {
            let mut led = controller();
            handler
                .serve(&mut led, BufReader::new(read_half), write_half, &mut shutdown)
                .await
        });

        let (client_read, mut client_write) = tokio::io::split(client);
        let mut client_read = BufReader::new(client_read);

        for (request, expected) in [
            ("set-led-color green\n", "OK green\n"),
            ("get-led-color\n", "OK green\n"),
            ("get-led-color foo\n", "FAILED\n"),
        ] {
            client_write.write_all(request.as_bytes()).await.unwrap();
            let mut response = String::new();
            client_read.read_line(&mut response).await.unwrap();
            assert_eq!(response, expected);
        }

        drop(client_write);
        drop(client_read);
        assert_eq!(session.await.unwrap().unwrap(), SessionEnd::PeerClosed);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_blocked_read() {
        let handler = handler();
        let (tx, mut shutdown) = watch::channel(false);

        let (_client, server) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);

        let session = tokio::spawn(async move {
            let mut led = controller();
            handler
                .serve(&mut led, BufReader::new(read_half), write_half, &mut shutdown)
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        assert_eq!(session.await.unwrap().unwrap(), SessionEnd::Shutdown);
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let handler = handler().with_read_timeout(Some(Duration::from_millis(30)));
        let mut led = controller();
        let (_tx, mut shutdown) = watch::channel(false);

        let (_client, server) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);

        let end = handler
            .serve(&mut led, BufReader::new(read_half), write_half, &mut shutdown)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::IdleTimeout);
    }

    #[tokio::test]
    async fn test_read_error_ends_session() {
        let handler = handler();
        let mut led = controller();
        let (_tx, mut shutdown) = watch::channel(false);

        let result = handler
            .serve(&mut led, BufReader::new(FailingReader), tokio::io::sink(), &mut shutdown)
            .await;
        assert!(matches!(result, Err(TransportError::Read(ref e)) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[tokio::test]
    async fn test_oversized_line_fails_and_session_continues() {
        let handler = handler();
        let mut led = controller();
        let (_tx, mut shutdown) = watch::channel(false);

        let mut input = vec![b'a'; MAX_LINE_LEN * 4];
        input.extend_from_slice(b"\nset-led-rate 3\nget-led-rate\n");
        let mut output = Vec::new();

        let end = handler
            .serve(&mut led, BufReader::new(&input[..]), &mut output, &mut shutdown)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::PeerClosed);
        assert_eq!(output, b"FAILED\nOK 3\nOK 3\n");
    }

    #[tokio::test]
    async fn test_line_at_limit_is_processed() {
        let handler = handler();
        let mut led = controller();
        let (_tx, mut shutdown) = watch::channel(false);

        // Pad the parameter with leading zeros up to the limit, newline included
        let prefix = b"set-led-rate ";
        let mut input = prefix.to_vec();
        input.resize(MAX_LINE_LEN - 2, b'0');
        input.extend_from_slice(b"4\n");
        assert_eq!(input.len(), MAX_LINE_LEN);
        let mut output = Vec::new();

        handler
            .serve(&mut led, BufReader::new(&input[..]), &mut output, &mut shutdown)
            .await
            .unwrap();
        assert_eq!(output, b"OK 4\n");
        assert_eq!(led.device().rate().get(), 4);
    }

    #[tokio::test]
    async fn test_unterminated_flood_is_not_buffered() {
        let handler = handler();
        let mut led = controller();
        let (_tx, mut shutdown) = watch::channel(false);

        let flood = tokio::io::repeat(b'a').take(64 * MAX_LINE_LEN as u64);
        let mut output = Vec::new();

        let end = handler
            .serve(&mut led, BufReader::new(flood), &mut output, &mut shutdown)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::PeerClosed);
        assert_eq!(output, b"FAILED\n");
    }
}
