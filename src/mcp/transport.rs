//! MCP transport layer implementations.
//!
//! The duplex binding frames one JSON object per line over any async
//! reader/writer pair. Stdio is the production instance; tests drive the same
//! code over an in-memory `tokio::io::duplex` pipe.

use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::mcp::protocol::{JsonRpcError, JsonRpcMessage};

/// Channel capacity in each direction.
const CHANNEL_CAPACITY: usize = 100;

/// Longest accepted line, excluding the newline (4MB).
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send {
    /// Start the transport, returning the inbound raw frames and the sender
    /// feeding the single outbound writer.
    async fn start(&mut self) -> Result<(mpsc::Receiver<String>, mpsc::Sender<JsonRpcMessage>)>;

    /// Stop the transport, flushing whatever the writer still holds.
    async fn stop(&mut self) -> Result<()>;
}

/// Newline-delimited JSON transport over a reader/writer pair.
pub struct StreamTransport<R, W> {
    io: Option<(R, W)>,
    max_frame_bytes: usize,
    reader_task: Option<JoinHandle<()>>,
    writer_task: Option<JoinHandle<()>>,
}

/// Stdio transport for MCP.
pub type StdioTransport = StreamTransport<tokio::io::Stdin, tokio::io::Stdout>;

impl StdioTransport {
    /// Create a transport bound to the process stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Some((reader, writer)),
            max_frame_bytes: MAX_FRAME_BYTES,
            reader_task: None,
            writer_task: None,
        }
    }

    /// Override the line length limit. Longer lines are answered with a
    /// ParseError and skipped.
    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max.max(1);
        self
    }
}

#[async_trait]
impl<R, W> Transport for StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn start(&mut self) -> Result<(mpsc::Receiver<String>, mpsc::Sender<JsonRpcMessage>)> {
        let (reader, writer) = self
            .io
            .take()
            .ok_or_else(|| Error::Transport("transport already started".to_string()))?;

        let (incoming_tx, incoming_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (outgoing_tx, outgoing_rx) = mpsc::channel::<JsonRpcMessage>(CHANNEL_CAPACITY);

        self.reader_task = Some(tokio::spawn(read_frames(
            reader,
            incoming_tx,
            outgoing_tx.clone(),
            self.max_frame_bytes,
        )));
        self.writer_task = Some(tokio::spawn(write_frames(writer, outgoing_rx)));

        Ok((incoming_rx, outgoing_tx))
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(reader) = self.reader_task.take() {
            reader.abort();
        }
        // The writer exits once every outbound sender is dropped.
        if let Some(writer) = self.writer_task.take() {
            writer
                .await
                .map_err(|e| Error::Transport(format!("writer task failed: {}", e)))?;
        }
        Ok(())
    }
}

/// Outcome of reading one line.
enum Line {
    Frame,
    Oversized,
    Eof,
}

/// Read one line into `buf`, keeping at most `max` bytes of it. An oversized
/// line is consumed up to and including its newline and then discarded.
async fn read_line_capped<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> std::io::Result<Line> {
    let n = AsyncReadExt::take(&mut *reader, max as u64 + 1)
        .read_until(b'\n', buf)
        .await?;
    if n == 0 {
        return Ok(Line::Eof);
    }
    if buf.last() == Some(&b'\n') || n <= max {
        return Ok(Line::Frame);
    }

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(Line::Oversized);
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(i) => {
                AsyncBufReadExt::consume(reader, i + 1);
                return Ok(Line::Oversized);
            }
            None => {
                let len = available.len();
                AsyncBufReadExt::consume(reader, len);
            }
        }
    }
}

async fn read_frames<R: AsyncRead + Unpin>(
    reader: R,
    tx: mpsc::Sender<String>,
    replies: mpsc::Sender<JsonRpcMessage>,
    max_frame_bytes: usize,
) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match read_line_capped(&mut reader, &mut buf, max_frame_bytes).await {
            Ok(Line::Eof) => {
                debug!("EOF on input, stopping transport");
                break;
            }
            Ok(Line::Oversized) => {
                warn!("Discarded input line longer than {} bytes", max_frame_bytes);
                let error = JsonRpcError::parse_error(format!(
                    "message exceeds {} bytes",
                    max_frame_bytes
                ));
                if replies
                    .send(JsonRpcMessage::error_response(None, error))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Ok(Line::Frame) => {
                // Invalid UTF-8 still reaches the parser and gets a ParseError.
                let line = String::from_utf8_lossy(&buf);
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                trace!("Received: {}", trimmed);
                if tx.send(trimmed.to_string()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("Error reading input: {}", e);
                break;
            }
        }
    }
}

async fn write_frames<W: AsyncWrite + Unpin>(mut writer: W, mut rx: mpsc::Receiver<JsonRpcMessage>) {
    while let Some(msg) = rx.recv().await {
        let line = match msg.to_json() {
            Ok(s) => s,
            Err(e) => {
                error!("Error serializing message: {}", e);
                continue;
            }
        };

        trace!("Sending: {}", line);
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            error!("Error writing output: {}", e);
            break;
        }
        if let Err(e) = writer.write_all(b"\n").await {
            error!("Error writing newline: {}", e);
            break;
        }
        if let Err(e) = writer.flush().await {
            error!("Error flushing output: {}", e);
            break;
        }
    }

    if let Err(e) = writer.shutdown().await {
        warn!("Error closing output: {}", e);
    }
}
