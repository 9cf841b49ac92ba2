//! A minimal Redis serialization protocol (RESP2) client.
//!
//! Only what the counter store needs: array-of-bulk-strings requests and
//! the scalar reply types. Array replies are rejected as a protocol error.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use jabbot_core::{CounterStore, StoreError, StoreResult};

use super::endpoint::StoreEndpoint;

/// Longest reply header line accepted.
const MAX_LINE_LEN: usize = 64 * 1024;

/// Longest bulk string accepted.
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    /// `None` is the nil bulk string.
    Bulk(Option<Vec<u8>>),
}

/// Encodes a command as a RESP array of bulk strings.
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", args.len()).into_bytes();
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Reads one reply.
pub async fn read_reply<R>(reader: &mut R) -> StoreResult<Reply>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    let Some((&kind, rest)) = line.split_first() else {
        return Err(StoreError::Protocol("empty reply line".into()));
    };
    let text = String::from_utf8_lossy(rest).into_owned();

    match kind {
        b'+' => Ok(Reply::Simple(text)),
        b'-' => Ok(Reply::Error(text)),
        b':' => text
            .parse()
            .map(Reply::Integer)
            .map_err(|_| StoreError::Protocol(format!("bad integer reply '{text}'"))),
        b'$' => {
            let len: i64 = text
                .parse()
                .map_err(|_| StoreError::Protocol(format!("bad bulk length '{text}'")))?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            let len = usize::try_from(len)
                .ok()
                .filter(|len| *len <= MAX_BULK_LEN)
                .ok_or_else(|| StoreError::Protocol(format!("bulk length {len} too large")))?;

            let mut data = vec![0; len + 2];
            reader.read_exact(&mut data).await?;
            if !data.ends_with(b"\r\n") {
                return Err(StoreError::Protocol("bulk string not terminated".into()));
            }
            data.truncate(len);
            Ok(Reply::Bulk(Some(data)))
        }
        b'*' => Err(StoreError::Protocol("array replies are not supported".into())),
        other => Err(StoreError::Protocol(format!(
            "unknown reply type '{}'",
            char::from(other)
        ))),
    }
}

async fn read_line<R>(reader: &mut R) -> StoreResult<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', &mut line)
        .await?;

    if read == 0 {
        return Err(StoreError::Connection("connection closed by store".into()));
    }
    if !line.ends_with(b"\r\n") {
        return Err(StoreError::Protocol("reply line not terminated".into()));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

// ============================================================================
// RespStore
// ============================================================================

struct Connection {
    stream: BufReader<TcpStream>,
}

impl Connection {
    async fn call(&mut self, args: &[&[u8]]) -> StoreResult<Reply> {
        self.stream.write_all(&encode_command(args)).await?;
        self.stream.flush().await?;
        read_reply(&mut self.stream).await
    }
}

/// A [`CounterStore`] backed by a Redis-compatible server.
///
/// The connection is opened on first use and reused. Any I/O or protocol
/// failure drops it, as does a reply that does not arrive within the
/// command timeout; the next command reconnects. Commands are serialized
/// over the single connection.
pub struct RespStore {
    endpoint: StoreEndpoint,
    connect_timeout: Duration,
    command_timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

impl RespStore {
    pub fn new(endpoint: StoreEndpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(2),
            conn: Mutex::new(None),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bounds the wait for each reply.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &StoreEndpoint {
        &self.endpoint
    }

    async fn connect(&self) -> StoreResult<Connection> {
        let stream = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(self.endpoint.addr()),
        )
        .await
        .map_err(|_| StoreError::Connection(format!("connecting to {} timed out", self.endpoint)))??;
        stream.set_nodelay(true)?;

        let mut conn = Connection {
            stream: BufReader::new(stream),
        };

        if let Some(password) = &self.endpoint.password {
            expect_ok(self.timed_call(&mut conn, &[b"AUTH", password.as_bytes()]).await?)?;
        }
        if let Some(db) = self.endpoint.database {
            let db = db.to_string();
            expect_ok(self.timed_call(&mut conn, &[b"SELECT", db.as_bytes()]).await?)?;
        }

        debug!(endpoint = %self.endpoint, "Connected to counter store");
        Ok(conn)
    }

    async fn timed_call(&self, conn: &mut Connection, args: &[&[u8]]) -> StoreResult<Reply> {
        tokio::time::timeout(self.command_timeout, conn.call(args))
            .await
            .map_err(|_| {
                StoreError::Connection(format!(
                    "no reply from {} within {:?}",
                    self.endpoint, self.command_timeout
                ))
            })?
    }

    /// Sends one command and returns its reply. Error replies become
    /// [`StoreError::Command`].
    pub async fn command(&self, args: &[&[u8]]) -> StoreResult<Reply> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }

        let result = match guard.as_mut() {
            Some(conn) => self.timed_call(conn, args).await,
            None => Err(StoreError::Connection("not connected".into())),
        };

        match result {
            Ok(Reply::Error(msg)) => Err(StoreError::Command(msg)),
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Dropping counter store connection");
                *guard = None;
                Err(e)
            }
        }
    }
}

fn expect_ok(reply: Reply) -> StoreResult<()> {
    match reply {
        Reply::Simple(s) if s == "OK" => Ok(()),
        Reply::Error(msg) => Err(StoreError::Command(msg)),
        other => Err(StoreError::Protocol(format!("expected OK, got {other:?}"))),
    }
}

fn expect_integer(reply: Reply) -> StoreResult<i64> {
    match reply {
        Reply::Integer(n) => Ok(n),
        other => Err(StoreError::Protocol(format!("expected integer, got {other:?}"))),
    }
}

#[async_trait]
impl CounterStore for RespStore {
    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        expect_ok(self.command(&[b"SET", key.as_bytes(), value.as_bytes()]).await?)
    }

    async fn hash_set_if_not_exists(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> StoreResult<bool> {
        let reply = self
            .command(&[b"HSETNX", key.as_bytes(), field.as_bytes(), value.as_bytes()])
            .await?;
        Ok(expect_integer(reply)? == 1)
    }

    async fn hash_increment(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let delta = delta.to_string();
        let reply = self
            .command(&[b"HINCRBY", key.as_bytes(), field.as_bytes(), delta.as_bytes()])
            .await;

        match reply {
            Err(StoreError::Command(msg)) if msg.contains("not an integer") => {
                Err(StoreError::NotAnInteger {
                    key: format!("{key}/{field}"),
                })
            }
            other => expect_integer(other?),
        }
    }
}
