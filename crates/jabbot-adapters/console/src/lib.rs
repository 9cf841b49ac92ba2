//! Line-oriented JSON session for Jabbot.
//!
//! [`ConsoleSession`] speaks one JSON object per line over any async byte
//! pipe: stdin/stdout for local runs, a pair of in-memory pipes in tests, or
//! a socket bridged to a real chat server.
//!
//! # Inbound frames
//!
//! ```text
//! {"type":"private","from":"alice","to":"jabbot","content":"help"}
//! {"type":"room","room":"lobby","message":{"user":{"name":"bob"},"content":"hi"}}
//! ```
//!
//! Lines that do not parse are logged and skipped. End of input, or a fault
//! in the reader task, marks the session disconnected and closes the event
//! stream.
//!
//! The writer carries nothing but outbound frames; logs belong on stderr.
//!
//! # Outbound frames
//!
//! ```text
//! {"type":"private","to":"alice","text":"..."}
//! {"type":"room","room":"lobby","text":"..."}
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let (session, events) = ConsoleSession::stdio();
//! let runtime = JabbotRuntime::builder(config, session, events).build()?;
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use jabbot_core::{Credentials, InboundEvent, Session, SessionError, SessionResult};

/// Capacity of the inbound event channel.
pub const EVENT_BUFFER: usize = 64;

/// A console session on the process's stdin and stdout.
pub type StdioSession = ConsoleSession<tokio::io::Stdin, tokio::io::Stdout>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum InboundFrame {
    Private {
        from: String,
        to: String,
        content: String,
    },
    Room {
        room: String,
        message: Value,
    },
}

impl From<InboundFrame> for InboundEvent {
    fn from(frame: InboundFrame) -> Self {
        match frame {
            InboundFrame::Private { from, to, content } => Self::Private { from, to, content },
            InboundFrame::Room { room, message } => Self::Room {
                room,
                envelope: message,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OutboundFrame<'a> {
    Private { to: &'a str, text: &'a str },
    Room { room: &'a str, text: &'a str },
}

/// A [`Session`] over a pair of byte streams.
pub struct ConsoleSession<R, W> {
    reader: Mutex<Option<R>>,
    events: Mutex<Option<mpsc::Sender<InboundEvent>>>,
    writer: tokio::sync::Mutex<W>,
    connected: Arc<AtomicBool>,
}

impl<R, W> ConsoleSession<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Creates a session and the stream its inbound events arrive on.
    /// Nothing is read until [`Session::connect`] is called.
    pub fn new(reader: R, writer: W) -> (Arc<Self>, mpsc::Receiver<InboundEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let session = Arc::new(Self {
            reader: Mutex::new(Some(reader)),
            events: Mutex::new(Some(tx)),
            writer: tokio::sync::Mutex::new(writer),
            connected: Arc::new(AtomicBool::new(false)),
        });
        (session, rx)
    }

    async fn write_frame(&self, frame: OutboundFrame<'_>) -> SessionResult<()> {
        let mut line =
            serde_json::to_string(&frame).map_err(|e| SessionError::SendFailed(e.to_string()))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SessionError::Io(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| SessionError::Io(e.to_string()))?;
        trace!(frame = %line.trim_end(), "Sent frame");
        Ok(())
    }
}

impl StdioSession {
    /// A session on stdin/stdout.
    pub fn stdio() -> (Arc<Self>, mpsc::Receiver<InboundEvent>) {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> Session for ConsoleSession<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn connect(&self) -> SessionResult<bool> {
        let (Some(reader), Some(events)) = (self.reader.lock().take(), self.events.lock().take())
        else {
            debug!("Console session already started");
            return Ok(self.is_connected());
        };

        self.connected.store(true, Ordering::SeqCst);
        tokio::spawn(watch_reader(
            async move { read_frames(reader, &events).await },
            self.connected.clone(),
        ));

        info!("Console session connected");
        Ok(true)
    }

    async fn login(&self, credentials: &Credentials) -> SessionResult<bool> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        info!(name = %credentials.name, "Console session logged in");
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn private_reply(&self, to: &str, text: &str) -> SessionResult<()> {
        self.write_frame(OutboundFrame::Private { to, text }).await
    }

    async fn say_to_room(&self, room: &str, text: &str) -> SessionResult<()> {
        self.write_frame(OutboundFrame::Room { room, text }).await
    }
}

/// Runs the reader to completion, then marks the session disconnected
/// however it ended.
async fn watch_reader<F>(reader: F, connected: Arc<AtomicBool>)
where
    F: Future<Output = ()>,
{
    if let Err(panic) = AssertUnwindSafe(reader).catch_unwind().await {
        let message = panic
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");
        error!(panic = message, "Console reader panicked");
    }
    connected.store(false, Ordering::SeqCst);
}

async fn read_frames<R>(reader: R, events: &mpsc::Sender<InboundEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Console input closed");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read console input");
                return;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<InboundFrame>(line) {
            Ok(frame) => {
                trace!(?frame, "Received frame");
                if events.send(frame.into()).await.is_err() {
                    debug!("Event receiver dropped, stopping console reader");
                    return;
                }
            }
            Err(e) => warn!(error = %e, line, "Skipping malformed frame"),
        }
    }
}
