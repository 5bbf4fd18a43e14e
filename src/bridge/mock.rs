//! In-memory game connector and publisher for worker tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::bridge::session::{
    ChatHandler, ChatKind, ChatPublisher, GameConnector, RealmDirectory, RealmEndpoint,
    RealmLogon, SessionConfig, SessionKey, WorldSession,
};
use crate::common::error::{ConnectionError, RealmError, WorldError};
use crate::protocol::version::GameVersion;

/// How the mock realm logon behaves.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Logon {
    Succeed,
    Reject,
    Hang,
}

/// Observations shared between a connector, its worlds and the test.
#[derive(Default)]
pub(crate) struct Recorder {
    pub logons: AtomicUsize,
    pub worlds_opened: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub send_attempts: AtomicUsize,
    pub sent: Mutex<Vec<(String, String)>>,
    pub joined: Mutex<Vec<String>>,
    pub handlers: Mutex<Vec<(ChatKind, ChatHandler)>>,
}

impl Recorder {
    pub fn sent_lines(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockConnector {
    pub logon: Logon,
    pub realms: Vec<String>,
    pub roster: Vec<String>,
    pub roster_times_out: bool,
    /// Opening a world takes this long.
    pub open_world_delay: Option<Duration>,
    /// Every world reports a stream error from this poll check on (1-based).
    pub fail_on_poll: Option<usize>,
    /// Sends fail once this many have succeeded on a world.
    pub fail_sends_after: Option<usize>,
    pub recorder: Arc<Recorder>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self {
            logon: Logon::Succeed,
            realms: vec!["Lordaeron".to_string()],
            roster: vec!["Relay".to_string()],
            roster_times_out: false,
            open_world_delay: None,
            fail_on_poll: None,
            fail_sends_after: None,
            recorder: Arc::new(Recorder::default()),
        }
    }
}

#[async_trait]
impl GameConnector for MockConnector {
    type World = MockWorld;

    async fn logon(&self, _config: &SessionConfig) -> Result<RealmLogon, RealmError> {
        self.recorder.logons.fetch_add(1, Ordering::SeqCst);
        match self.logon {
            Logon::Succeed => {}
            Logon::Reject => return Err(ConnectionError::ConnectionClosed.into()),
            Logon::Hang => std::future::pending::<()>().await,
        }

        let realms: RealmDirectory = self
            .realms
            .iter()
            .enumerate()
            .map(|(id, name)| {
                (
                    name.clone(),
                    RealmEndpoint {
                        host: "127.0.0.1".to_string(),
                        port: 8085,
                        id: id as u32 + 1,
                    },
                )
            })
            .collect();

        Ok(RealmLogon {
            realms,
            session_key: SessionKey([0; 40]),
        })
    }

    async fn open_world(
        &self,
        _config: &SessionConfig,
        _endpoint: &RealmEndpoint,
        _key: &SessionKey,
    ) -> Result<MockWorld, WorldError> {
        if let Some(delay) = self.open_world_delay {
            tokio::time::sleep(delay).await;
        }
        self.recorder.worlds_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockWorld {
            roster: self.roster.clone(),
            roster_times_out: self.roster_times_out,
            fail_on_poll: self.fail_on_poll,
            fail_sends_after: self.fail_sends_after,
            polls: 0,
            sends: 0,
            closed: false,
            recorder: self.recorder.clone(),
        })
    }
}

pub(crate) struct MockWorld {
    roster: Vec<String>,
    roster_times_out: bool,
    fail_on_poll: Option<usize>,
    fail_sends_after: Option<usize>,
    polls: usize,
    sends: usize,
    closed: bool,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl WorldSession for MockWorld {
    async fn wait_characters(&mut self, timeout: Duration) -> Result<Vec<String>, WorldError> {
        if self.roster_times_out {
            tokio::time::sleep(timeout).await;
            return Err(WorldError::Timeout);
        }
        Ok(self.roster.clone())
    }

    async fn login(&mut self, character: &str) -> Result<(), WorldError> {
        if self
            .roster
            .iter()
            .any(|name| name.eq_ignore_ascii_case(character))
        {
            Ok(())
        } else {
            Err(WorldError::BadCharacter(character.to_string()))
        }
    }

    async fn join_channel(&mut self, channel: &str) -> Result<(), WorldError> {
        self.recorder.joined.lock().unwrap().push(channel.to_string());
        Ok(())
    }

    fn subscribe(&mut self, kind: ChatKind, handler: ChatHandler) {
        self.recorder.handlers.lock().unwrap().push((kind, handler));
    }

    async fn send_channel_message(&mut self, text: &str, channel: &str) -> Result<(), WorldError> {
        self.recorder.send_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_sends_after.is_some_and(|limit| self.sends >= limit) {
            return Err(WorldError::StreamBroken("send failed".to_string()));
        }
        self.sends += 1;
        self.recorder
            .sent
            .lock()
            .unwrap()
            .push((text.to_string(), channel.to_string()));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.closed = true;
        self.recorder.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn poll_error(&mut self) -> Option<WorldError> {
        self.polls += 1;
        if self.closed {
            return Some(WorldError::Closed);
        }
        match self.fail_on_poll {
            Some(n) if self.polls >= n => {
                Some(WorldError::StreamBroken("connection reset".to_string()))
            }
            _ => None,
        }
    }
}

/// Publisher that records what it was asked to publish.
#[derive(Default)]
pub(crate) struct RecordingPublisher {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

impl ChatPublisher for RecordingPublisher {
    fn publish(&self, user: &str, text: &str) {
        self.published
            .lock()
            .unwrap()
            .push((user.to_string(), text.to_string()));
    }
}

pub(crate) fn session_config() -> SessionConfig {
    SessionConfig {
        realm_host: "logon.example.org".to_string(),
        realm_port: 3724,
        realm_name: "Lordaeron".to_string(),
        account: "bridge".to_string(),
        password: "secret".to_string(),
        character: "Relay".to_string(),
        channel: "World".to_string(),
        version: GameVersion::ASCENSION,
    }
}
