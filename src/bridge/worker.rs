//! The bridge worker: owns the game session lifecycle and relays chat.
//!
//! All state transitions happen under one async mutex. Public operations lock
//! once and compose private `*_locked` helpers, so `reconnect` tears down and
//! re-establishes the session without another caller slipping in between.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, trace, warn};

use crate::bridge::fragment::{split_fragments, MAX_FRAGMENT_CHARS};
use crate::bridge::relay::InboundRelay;
use crate::bridge::session::{ChatKind, ChatPublisher, GameConnector, SessionConfig, WorldSession};
use crate::common::error::WorldError;

/// Upper bound on the realm logon, including the realm list.
pub const REALM_LOGON_TIMEOUT: Duration = Duration::from_secs(60);
/// Upper bound on opening the world server connection.
pub const WORLD_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on waiting for the character roster after opening a world session.
pub const CHARACTER_LIST_TIMEOUT: Duration = Duration::from_secs(60);
/// Cadence of the health-poll loop.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Current state plus the operator-facing status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub state: ConnectionState,
    pub message: String,
}

struct Connection<W> {
    state: ConnectionState,
    world: Option<W>,
}

/// Why a connect attempt failed.
#[derive(Debug)]
enum ConnectFailure {
    RealmTimeout,
    RealmRejected,
    RealmNotFound(String),
    WorldUnavailable,
    CharacterNotFound,
}

impl ConnectFailure {
    fn status(&self) -> String {
        match self {
            Self::RealmTimeout => "unable to connect to directory server; retrying".to_string(),
            Self::RealmRejected => "unable to connect; retrying".to_string(),
            Self::RealmNotFound(name) => format!("realm {} not found", name),
            Self::WorldUnavailable => "unable to connect to world server; retrying".to_string(),
            Self::CharacterNotFound => "character not found; reconnecting".to_string(),
        }
    }
}

pub struct BridgeWorker<C: GameConnector> {
    config: SessionConfig,
    connector: C,
    publisher: Arc<dyn ChatPublisher>,
    connection: Mutex<Connection<C::World>>,
    status: watch::Sender<StatusReport>,
    stop: watch::Sender<bool>,
}

impl<C: GameConnector> BridgeWorker<C> {
    pub fn new(config: SessionConfig, connector: C, publisher: Arc<dyn ChatPublisher>) -> Self {
        let (status, _) = watch::channel(StatusReport {
            state: ConnectionState::Disconnected,
            message: String::new(),
        });
        let (stop, _) = watch::channel(false);

        Self {
            config,
            connector,
            publisher,
            connection: Mutex::new(Connection {
                state: ConnectionState::Disconnected,
                world: None,
            }),
            status,
            stop,
        }
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusReport> {
        self.status.subscribe()
    }

    pub fn status(&self) -> StatusReport {
        self.status.borrow().clone()
    }

    pub async fn state(&self) -> ConnectionState {
        self.connection.lock().await.state
    }

    /// Run the health-poll loop until [`stop`](Self::stop) is called.
    pub async fn run(&self) {
        let mut stop_rx = self.stop.subscribe();
        info!("Bridge worker started");

        loop {
            self.tick().await;
            if *stop_rx.borrow_and_update() {
                break;
            }
            // Sleep one interval, waking early on stop
            if tokio::time::timeout(POLL_INTERVAL, stop_rx.wait_for(|stopped| *stopped))
                .await
                .is_ok()
            {
                break;
            }
        }

        info!("Bridge worker stopped");
    }

    /// One iteration of the health-poll loop.
    pub(crate) async fn tick(&self) {
        let mut conn = self.connection.lock().await;

        if conn.state == ConnectionState::Connected {
            let fault = match conn.world.as_mut() {
                Some(world) => world.poll_error(),
                None => Some(WorldError::Closed),
            };
            if let Some(err) = fault {
                warn!("Game session lost: {}", err);
                conn.world = None;
                conn.state = ConnectionState::Disconnected;
                self.set_status(ConnectionState::Disconnected, "disconnected");
            }
        } else {
            self.connect_locked(&mut conn).await;
        }
    }

    /// Establish a game session. Returns whether it succeeded.
    pub async fn connect(&self) -> bool {
        let mut conn = self.connection.lock().await;
        self.connect_locked(&mut conn).await
    }

    /// Relay an IRC message into the game channel. Dropped while disconnected.
    pub async fn send(&self, sender: &str, text: &str) {
        let mut conn = self.connection.lock().await;
        if conn.state != ConnectionState::Connected {
            trace!("Dropping message from {} while disconnected", sender);
            return;
        }
        let Some(world) = conn.world.as_mut() else {
            return;
        };

        for fragment in split_fragments(text, MAX_FRAGMENT_CHARS) {
            let line = format!("{}: {}", sender, fragment);
            if let Err(e) = world.send_channel_message(&line, &self.config.channel).await {
                debug!("Chat send failed, dropping remaining fragments: {}", e);
                break;
            }
        }
    }

    /// Ask the live session to terminate. The poll loop notices the closed
    /// session and moves to `Disconnected`.
    pub async fn disconnect(&self) {
        let mut conn = self.connection.lock().await;
        self.disconnect_locked(&mut conn);
    }

    /// Tear down and re-establish the session in one critical section.
    pub async fn reconnect(&self) -> bool {
        let mut conn = self.connection.lock().await;
        self.disconnect_locked(&mut conn);
        self.connect_locked(&mut conn).await
    }

    /// Disconnect and end the poll loop.
    pub async fn stop(&self) {
        self.disconnect().await;
        self.stop.send_replace(true);
    }

    fn disconnect_locked(&self, conn: &mut Connection<C::World>) {
        if conn.state != ConnectionState::Connected {
            return;
        }
        if let Some(world) = conn.world.as_mut() {
            info!("Disconnecting game session");
            world.disconnect();
        }
    }

    async fn connect_locked(&self, conn: &mut Connection<C::World>) -> bool {
        if let Some(mut stale) = conn.world.take() {
            stale.disconnect();
        }
        conn.state = ConnectionState::Connecting;
        self.set_status(ConnectionState::Connecting, "connecting");

        match self.establish().await {
            Ok(world) => {
                conn.world = Some(world);
                conn.state = ConnectionState::Connected;
                self.set_status(ConnectionState::Connected, "connected");
                true
            }
            Err(failure) => {
                conn.state = ConnectionState::Disconnected;
                self.set_status(ConnectionState::Disconnected, failure.status());
                false
            }
        }
    }

    async fn establish(&self) -> Result<C::World, ConnectFailure> {
        let logon =
            match tokio::time::timeout(REALM_LOGON_TIMEOUT, self.connector.logon(&self.config))
                .await
            {
                Err(_) => return Err(ConnectFailure::RealmTimeout),
                Ok(Err(e)) => {
                    debug!("Realm logon failed ({}): {}", e.category(), e);
                    return Err(ConnectFailure::RealmRejected);
                }
                Ok(Ok(logon)) => logon,
            };

        let endpoint = logon
            .realms
            .get(&self.config.realm_name)
            .ok_or_else(|| ConnectFailure::RealmNotFound(self.config.realm_name.clone()))?;

        let opened = tokio::time::timeout(
            WORLD_CONNECT_TIMEOUT,
            self.connector
                .open_world(&self.config, endpoint, &logon.session_key),
        )
        .await;
        let mut world = match opened {
            Err(_) => {
                debug!("World server did not answer within {:?}", WORLD_CONNECT_TIMEOUT);
                return Err(ConnectFailure::WorldUnavailable);
            }
            Ok(Err(e)) => {
                debug!("Opening world session failed: {}", e);
                return Err(ConnectFailure::WorldUnavailable);
            }
            Ok(Ok(world)) => world,
        };

        match world.wait_characters(CHARACTER_LIST_TIMEOUT).await {
            Ok(names) => debug!("Characters on account: {}", names.join(", ")),
            Err(e) => {
                debug!("Character list unavailable: {}", e);
                world.disconnect();
                return Err(ConnectFailure::WorldUnavailable);
            }
        }

        match world.login(&self.config.character).await {
            Ok(()) => {}
            Err(WorldError::BadCharacter(name)) => {
                debug!("Character {} not on account", name);
                world.disconnect();
                return Err(ConnectFailure::CharacterNotFound);
            }
            Err(e) => {
                debug!("Character login failed: {}", e);
                world.disconnect();
                return Err(ConnectFailure::WorldUnavailable);
            }
        }

        if let Err(e) = world.join_channel(&self.config.channel).await {
            debug!("Joining channel failed: {}", e);
            world.disconnect();
            return Err(ConnectFailure::WorldUnavailable);
        }

        let relay = Arc::new(InboundRelay::new(
            &self.config.channel,
            self.publisher.clone(),
        ));
        for kind in ChatKind::ALL {
            let relay = relay.clone();
            world.subscribe(kind, Arc::new(move |event| relay.handle(event)));
        }

        Ok(world)
    }

    fn set_status(&self, state: ConnectionState, message: impl Into<String>) {
        let message = message.into();
        warn!("Game: {}", message);
        self.status.send_replace(StatusReport { state, message });
    }
}
