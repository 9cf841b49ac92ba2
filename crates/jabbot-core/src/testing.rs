//! Test doubles for crates built on the core contracts.
//!
//! Enabled with the `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! jabbot-core = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{SessionError, SessionResult};
use crate::session::{BoxedSession, Credentials, Session};

/// An outbound message captured by [`RecordingSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Private { to: String, text: String },
    Room { room: String, text: String },
}

/// A session that records every outbound message.
///
/// Starts disconnected; `connect` flips it to connected unless told to
/// refuse or hang.
#[derive(Default)]
pub struct RecordingSession {
    sent: Mutex<Vec<Sent>>,
    connected: AtomicBool,
    fail_sends: AtomicBool,
    refuse_connect: AtomicBool,
    hang_connect: AtomicBool,
    logins: AtomicUsize,
}

impl RecordingSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The session as a [`BoxedSession`] plus a handle for assertions.
    pub fn shared() -> (BoxedSession, Arc<RecordingSession>) {
        let recorder = Self::new();
        (recorder.clone(), recorder)
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// Every later send fails with [`SessionError::SendFailed`].
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// `connect` fails with [`SessionError::ConnectFailed`].
    pub fn refuse_connect(&self) {
        self.refuse_connect.store(true, Ordering::SeqCst);
    }

    /// `connect` never completes.
    pub fn hang_connect(&self) {
        self.hang_connect.store(true, Ordering::SeqCst);
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    fn push(&self, sent: Sent) -> SessionResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SessionError::SendFailed("recording session told to fail".into()));
        }
        self.sent.lock().push(sent);
        Ok(())
    }
}

#[async_trait]
impl Session for RecordingSession {
    async fn connect(&self) -> SessionResult<bool> {
        if self.hang_connect.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.refuse_connect.load(Ordering::SeqCst) {
            return Err(SessionError::ConnectFailed {
                server: "recording".into(),
                reason: "refused".into(),
            });
        }
        self.set_connected(true);
        Ok(true)
    }

    async fn login(&self, _credentials: &Credentials) -> SessionResult<bool> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn private_reply(&self, to: &str, text: &str) -> SessionResult<()> {
        self.push(Sent::Private {
            to: to.to_string(),
            text: text.to_string(),
        })
    }

    async fn say_to_room(&self, room: &str, text: &str) -> SessionResult<()> {
        self.push(Sent::Room {
            room: room.to_string(),
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_sends_and_connect_state() {
        let (session, recorder) = RecordingSession::shared();
        assert!(!session.is_connected());
        assert!(session.connect().await.unwrap());
        assert!(session.is_connected());

        session.private_reply("alice", "hi").await.unwrap();
        session.say_to_room("lobby", "hello").await.unwrap();
        assert_eq!(
            recorder.sent(),
            vec![
                Sent::Private { to: "alice".into(), text: "hi".into() },
                Sent::Room { room: "lobby".into(), text: "hello".into() },
            ]
        );

        recorder.fail_sends();
        assert!(session.private_reply("alice", "again").await.is_err());
        assert_eq!(recorder.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_refused_connect_stays_disconnected() {
        let (session, recorder) = RecordingSession::shared();
        recorder.refuse_connect();
        assert!(matches!(
            session.connect().await,
            Err(SessionError::ConnectFailed { .. })
        ));
        assert!(!session.is_connected());
    }
}
