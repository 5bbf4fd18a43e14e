//! World server session: a handle for the bridge worker and the task that owns
//! the socket.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::bridge::session::{ChatHandler, ChatKind, RealmEndpoint, SessionKey, WorldSession};
use crate::common::error::WorldError;
use crate::common::ChatEvent;
use crate::protocol::game::codec::{new_world_connection, WorldConnection};
use crate::protocol::game::handler::{ChatOutcome, WorldHandler};
use crate::protocol::game::packets::{
    AuthChallenge, AuthResponse, CharEnum, CharEnumRequest, CharacterInfo, KeepAlive,
    LoginVerifyWorld, Pong, TimeSyncRequest,
};
use crate::protocol::packets::opcodes::*;
use crate::protocol::packets::{Packet, PacketDecode};
use crate::protocol::version::GameVersion;

const PING_INTERVAL: Duration = Duration::from_secs(30);
const KEEPALIVE_DELAY: Duration = Duration::from_secs(15);

/// Requests from the handle to the session task.
enum WorldCommand {
    Login(CharacterInfo),
    JoinChannel(String),
    Subscribe(ChatKind, ChatHandler),
    Chat { text: String, channel: String },
    Disconnect,
}

/// Handle to a world session running on its own task.
///
/// The task records the reason it stopped in a watch slot; dropping the handle
/// closes the command channel, which also stops the task.
pub struct TcpWorldSession {
    commands: mpsc::UnboundedSender<WorldCommand>,
    roster_rx: Option<oneshot::Receiver<Vec<CharacterInfo>>>,
    roster: Vec<CharacterInfo>,
    fault: watch::Receiver<Option<WorldError>>,
}

impl TcpWorldSession {
    /// Connect to a world server and start the session task.
    pub async fn connect(
        endpoint: &RealmEndpoint,
        account: &str,
        key: &SessionKey,
        version: GameVersion,
    ) -> Result<Self, WorldError> {
        info!(
            "Connecting to world server at {}:{}",
            endpoint.host, endpoint.port
        );
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| WorldError::StreamBroken(e.to_string()))?;

        let handler = WorldHandler::new(account, key.0, endpoint.id, version.build as u32);
        Ok(Self::start(stream, handler))
    }

    /// Run a session over an established stream.
    pub fn start<S>(stream: S, handler: WorldHandler) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (roster_tx, roster_rx) = oneshot::channel();
        let (fault_tx, fault_rx) = watch::channel(None);

        tokio::spawn(async move {
            let mut task = SessionTask {
                connection: new_world_connection(stream),
                handler,
                commands: command_rx,
                roster_tx: Some(roster_tx),
                subscribers: HashMap::new(),
                started: Instant::now(),
                ping_sequence: 0,
            };
            let fault = match task.run().await {
                Ok(()) => WorldError::Closed,
                Err(e) => {
                    warn!("World session lost: {}", e);
                    e
                }
            };
            // Publish before the roster sender drops so waiters see the cause
            fault_tx.send_replace(Some(fault));
            drop(task);
        });

        Self {
            commands: command_tx,
            roster_rx: Some(roster_rx),
            roster: Vec::new(),
            fault: fault_rx,
        }
    }

    fn command(&self, command: WorldCommand) -> Result<(), WorldError> {
        self.commands
            .send(command)
            .map_err(|_| self.current_fault().unwrap_or(WorldError::Closed))
    }

    fn current_fault(&self) -> Option<WorldError> {
        self.fault.borrow().clone()
    }
}

#[async_trait]
impl WorldSession for TcpWorldSession {
    async fn wait_characters(&mut self, timeout: Duration) -> Result<Vec<String>, WorldError> {
        if let Some(rx) = self.roster_rx.take() {
            self.roster = match tokio::time::timeout(timeout, rx).await {
                Err(_) => return Err(WorldError::Timeout),
                Ok(Err(_)) => {
                    return Err(self
                        .current_fault()
                        .unwrap_or_else(|| WorldError::StreamBroken("session ended".to_string())))
                }
                Ok(Ok(roster)) => roster,
            };
        }
        Ok(self.roster.iter().map(|c| c.name.clone()).collect())
    }

    async fn login(&mut self, character: &str) -> Result<(), WorldError> {
        let info = WorldHandler::find_character(&self.roster, character)
            .cloned()
            .ok_or_else(|| WorldError::BadCharacter(character.to_string()))?;
        self.command(WorldCommand::Login(info))
    }

    async fn join_channel(&mut self, channel: &str) -> Result<(), WorldError> {
        self.command(WorldCommand::JoinChannel(channel.to_string()))
    }

    fn subscribe(&mut self, kind: ChatKind, handler: ChatHandler) {
        if self.command(WorldCommand::Subscribe(kind, handler)).is_err() {
            debug!("Subscription for {:?} dropped, session already closed", kind);
        }
    }

    async fn send_channel_message(&mut self, text: &str, channel: &str) -> Result<(), WorldError> {
        self.command(WorldCommand::Chat {
            text: text.to_string(),
            channel: channel.to_string(),
        })
    }

    fn disconnect(&mut self) {
        let _ = self.commands.send(WorldCommand::Disconnect);
    }

    fn poll_error(&mut self) -> Option<WorldError> {
        self.current_fault()
    }
}

/// State owned by the session task.
struct SessionTask<S> {
    connection: WorldConnection<S>,
    handler: WorldHandler,
    commands: mpsc::UnboundedReceiver<WorldCommand>,
    roster_tx: Option<oneshot::Sender<Vec<CharacterInfo>>>,
    subscribers: HashMap<ChatKind, Vec<ChatHandler>>,
    started: Instant,
    ping_sequence: u32,
}

impl<S> SessionTask<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn run(&mut self) -> Result<(), WorldError> {
        let now = Instant::now();

        let mut ping_interval = interval_at(now + PING_INTERVAL, PING_INTERVAL);
        ping_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut keepalive_interval = interval_at(now + KEEPALIVE_DELAY, PING_INTERVAL);
        keepalive_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                packet = self.connection.next() => {
                    match packet {
                        Some(Ok(packet)) => self.handle_packet(packet).await?,
                        Some(Err(e)) => return Err(WorldError::StreamBroken(e.to_string())),
                        None => {
                            return Err(WorldError::StreamBroken(
                                "connection closed by server".to_string(),
                            ))
                        }
                    }
                }

                command = self.commands.recv() => {
                    match command {
                        Some(WorldCommand::Disconnect) | None => {
                            info!("Closing world session");
                            return Ok(());
                        }
                        Some(command) => self.handle_command(command).await?,
                    }
                }

                _ = ping_interval.tick() => {
                    if self.handler.in_world {
                        self.ping_sequence = self.ping_sequence.wrapping_add(1);
                        let ping = self.handler.build_ping(self.ping_sequence);
                        self.send(ping.into()).await?;
                    }
                }

                _ = keepalive_interval.tick() => {
                    if self.handler.in_world {
                        self.send(KeepAlive.into()).await?;
                        debug!("Sent CMSG_KEEP_ALIVE");
                    }
                }
            }
        }
    }

    async fn send(&mut self, packet: Packet) -> Result<(), WorldError> {
        trace!("Sending {}", opcode_name(packet.opcode));
        self.connection
            .send(packet)
            .await
            .map_err(|e| WorldError::StreamBroken(e.to_string()))
    }

    async fn handle_packet(&mut self, packet: Packet) -> Result<(), WorldError> {
        let mut payload = packet.payload;

        match packet.opcode {
            SMSG_AUTH_CHALLENGE => {
                let challenge = AuthChallenge::decode(&mut payload).map_err(broken)?;
                let auth_session = self.handler.handle_auth_challenge(challenge);
                self.send(auth_session.into()).await?;
                self.connection.codec_mut().start_session();
                debug!("Sent auth session");
            }
            SMSG_AUTH_RESPONSE => {
                let response = AuthResponse::decode(&mut payload).map_err(broken)?;
                self.handler
                    .handle_auth_response(response)
                    .map_err(WorldError::AuthRejected)?;
                self.send(CharEnumRequest.into()).await?;
            }
            SMSG_CHAR_ENUM => {
                let roster = CharEnum::decode(&mut payload).map_err(broken)?;
                info!(
                    "Received character list with {} characters",
                    roster.characters.len()
                );
                if let Some(tx) = self.roster_tx.take() {
                    let _ = tx.send(roster.characters);
                }
            }
            SMSG_LOGIN_VERIFY_WORLD => {
                let verify = LoginVerifyWorld::decode(&mut payload).map_err(broken)?;
                self.handler.handle_login_verify_world(verify);
            }
            SMSG_MESSAGECHAT | SMSG_GM_MESSAGECHAT => {
                self.on_messagechat(packet.opcode, payload).await?;
            }
            SMSG_NAME_QUERY => match self.handler.handle_name_query(payload) {
                Ok(resolved) => {
                    for event in resolved {
                        self.dispatch(&event);
                    }
                }
                Err(e) => debug!("Bad name query response: {}", e),
            },
            SMSG_CHANNEL_NOTIFY => {
                if let Err(e) = self.handler.handle_channel_notify(payload) {
                    debug!("Bad channel notify: {}", e);
                }
            }
            SMSG_PONG => {
                if let Ok(pong) = Pong::decode(&mut payload) {
                    trace!("Received PONG with sequence: {}", pong.sequence);
                }
            }
            SMSG_TIME_SYNC_REQ => {
                let req = TimeSyncRequest::decode(&mut payload).map_err(broken)?;
                let ticks = self.started.elapsed().as_millis() as u32;
                let resp = self.handler.handle_time_sync_req(req, ticks);
                self.send(resp.into()).await?;
            }
            other => trace!("Ignoring {} (0x{:04X})", opcode_name(other), other),
        }

        Ok(())
    }

    async fn on_messagechat(&mut self, opcode: u16, payload: Bytes) -> Result<(), WorldError> {
        match self.handler.handle_messagechat(opcode, payload) {
            Ok(ChatOutcome::Ready(event)) => self.dispatch(&event),
            Ok(ChatOutcome::NeedsName(guid)) => {
                let query = self.handler.build_name_query(guid);
                self.send(query.into()).await?;
            }
            Ok(ChatOutcome::Queued) | Ok(ChatOutcome::Ignored) => {}
            Err(e) => debug!("Skipping undecodable chat packet: {}", e),
        }
        Ok(())
    }

    async fn handle_command(&mut self, command: WorldCommand) -> Result<(), WorldError> {
        match command {
            WorldCommand::Login(character) => {
                let login = self.handler.build_player_login(&character);
                self.send(login.into()).await?;
                info!("Sent player login for {}", character.name);
            }
            WorldCommand::JoinChannel(channel) => {
                let join = self.handler.build_join_channel(&channel);
                self.send(join.into()).await?;
                info!("Joining channel: {}", channel);
            }
            WorldCommand::Subscribe(kind, handler) => {
                self.subscribers.entry(kind).or_default().push(handler);
            }
            WorldCommand::Chat { text, channel } => {
                let msg = self.handler.build_channel_message(&text, &channel);
                self.send(msg.into()).await?;
            }
            WorldCommand::Disconnect => {}
        }
        Ok(())
    }

    fn dispatch(&self, event: &ChatEvent) {
        let Some(kind) = ChatKind::from_opcode(event.opcode) else {
            return;
        };
        if let Some(handlers) = self.subscribers.get(&kind) {
            for handler in handlers {
                handler(event);
            }
        }
    }
}

fn broken(e: crate::common::error::ProtocolError) -> WorldError {
    WorldError::StreamBroken(e.to_string())
}
