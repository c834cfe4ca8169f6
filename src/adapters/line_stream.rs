//! JSON-lines transport over a byte stream.
//!
//! Used for sidecar deployments where a desktop shell spawns the bridge and
//! talks to it over stdio: events are written one per line and flushed
//! immediately, commands are read line-by-line by a background task.
//! Malformed lines are logged and skipped; the reader keeps going.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Mutex as StdMutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::codec::{encode_line, read_line_into, write_line, write_lines, DEFAULT_MAX_LINE_BYTES};
use super::{CommandInbox, UiAdapter};
use crate::schema::{UiCommand, UiEvent};
use crate::types::Result;

type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;
type BoxReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

/// Command input plus the bytes of a line cut short by a disconnect.
struct CommandSource {
    reader: BoxReader,
    pending: Vec<u8>,
}

impl CommandSource {
    fn new(reader: BoxReader) -> Self {
        Self {
            reader,
            pending: Vec::new(),
        }
    }
}

pub struct LineStreamAdapter {
    writer: Mutex<BoxWriter>,
    reader: StdMutex<Option<CommandSource>>,
    reader_task: StdMutex<Option<(CancellationToken, JoinHandle<CommandSource>)>>,
    inbox: CommandInbox,
    max_line_bytes: usize,
}

impl LineStreamAdapter {
    /// Events to `writer`, commands from `reader`.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self::build(Some(BufReader::new(reader)), Box::new(writer))
    }

    /// Outbound only; the command stream stays empty.
    pub fn writer_only<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::build(None, Box::new(writer))
    }

    /// Events to stdout, commands from stdin.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    fn build(reader: Option<BoxReader>, writer: BoxWriter) -> Self {
        Self {
            writer: Mutex::new(writer),
            reader: StdMutex::new(reader.map(CommandSource::new)),
            reader_task: StdMutex::new(None),
            inbox: CommandInbox::new(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inbox.is_connected()
    }
}

impl std::fmt::Debug for LineStreamAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStreamAdapter")
            .field("connected", &self.inbox.is_connected())
            .field("max_line_bytes", &self.max_line_bytes)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl UiAdapter for LineStreamAdapter {
    fn name(&self) -> &str {
        "line_stream"
    }

    async fn connect(&self) -> Result<()> {
        self.inbox.set_connected(true);

        let source = self
            .reader
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(source) = source else {
            // Already reading, or outbound only
            return Ok(());
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(read_commands(
            source,
            self.inbox.sender(),
            cancel.clone(),
            self.max_line_bytes,
        ));
        *self
            .reader_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some((cancel, handle));
        tracing::debug!("Line-stream command reader started");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.inbox.set_connected(false);

        let task = self
            .reader_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some((cancel, handle)) = task {
            cancel.cancel();
            match handle.await {
                // Keep the reader and any partial line so a later connect
                // resumes where we stopped
                Ok(source) => {
                    *self
                        .reader
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(source);
                }
                Err(err) => tracing::warn!(error = %err, "Line-stream reader task failed"),
            }
        }
        Ok(())
    }

    async fn emit(&self, event: &UiEvent) {
        let line = match encode_line(event) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(event_type = %event.event_type, error = %err, "Failed to encode event");
                return;
            }
        };
        let mut writer = self.writer.lock().await;
        if let Err(err) = write_line(&mut *writer, &line).await {
            tracing::debug!(error = %err, "Line-stream write failed");
        }
    }

    async fn emit_batch(&self, events: &[UiEvent]) {
        let lines: Vec<String> = events
            .iter()
            .filter_map(|event| match encode_line(event) {
                Ok(line) => Some(line),
                Err(err) => {
                    tracing::warn!(event_type = %event.event_type, error = %err, "Failed to encode event");
                    None
                }
            })
            .collect();
        let mut writer = self.writer.lock().await;
        if let Err(err) = write_lines(&mut *writer, &lines).await {
            tracing::debug!(error = %err, "Line-stream batch write failed");
        }
    }

    fn commands(&self) -> BoxStream<'static, UiCommand> {
        self.inbox.stream()
    }
}

/// Background reader: one command per line until EOF or cancellation.
///
/// Hands the source back so it can be reused after a reconnect.
async fn read_commands(
    mut source: CommandSource,
    commands: mpsc::UnboundedSender<UiCommand>,
    cancel: CancellationToken,
    max_line_bytes: usize,
) -> CommandSource {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            line = read_line_into(&mut source.reader, &mut source.pending, max_line_bytes) => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::debug!("Command input closed");
                        break;
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                        tracing::warn!(error = %err, "Skipping unreadable command line");
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Command input failed");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match UiCommand::from_json(&line) {
                    Ok(command) => {
                        if commands.send(command).is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "Skipping malformed command line"),
                }
            }
        }
    }
    source
}
