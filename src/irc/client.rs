//! IRC endpoint: channel membership, relaying and owner commands.

use futures::{SinkExt, StreamExt};
use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, trace, warn};

use crate::bridge::ChatPublisher;
use crate::common::error::IrcError;
use crate::common::{BridgeRequest, OutboundMessage, RunOutcome};
use crate::config::IrcConfig;
use crate::irc::commands::{CommandHandler, IrcCommand};
use crate::irc::message::IrcMessage;

const MAX_LINE_LENGTH: usize = 8192;

/// Open the TCP connection to the configured IRC server.
pub async fn connect(config: &IrcConfig) -> Result<TcpStream, IrcError> {
    let addr = format!("{}:{}", config.server, config.port);
    info!("Connecting to IRC server {}...", addr);
    TcpStream::connect(&addr)
        .await
        .map_err(|source| IrcError::ConnectFailed { addr, source })
}

/// Nickname to retry with when ours is taken.
pub fn alternate_nick(nick: &str) -> String {
    let base: String = nick.chars().take(26).collect();
    format!("{}_{}", base, rand::thread_rng().gen_range(1000..=9999))
}

/// Publishes game chat into the IRC channel.
#[derive(Clone)]
pub struct IrcPublisher {
    channel: String,
    outgoing: mpsc::UnboundedSender<String>,
}

impl ChatPublisher for IrcPublisher {
    fn publish(&self, user: &str, text: &str) {
        let line = IrcMessage::new("PRIVMSG", &[&self.channel, &format!("{}: {}", user, text)]);
        if self.outgoing.send(line.to_line()).is_err() {
            trace!("IRC connection gone, dropping message from {}", user);
        }
    }
}

/// One IRC connection's worth of bot state.
pub struct IrcRelay {
    nickname: String,
    channel: String,
    autorejoin: bool,
    commands: CommandHandler,
    requests: mpsc::UnboundedSender<BridgeRequest>,
    outgoing_tx: mpsc::UnboundedSender<String>,
    outgoing_rx: mpsc::UnboundedReceiver<String>,
}

impl IrcRelay {
    pub fn new(config: &IrcConfig, requests: mpsc::UnboundedSender<BridgeRequest>) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        Self {
            nickname: config.nickname.clone(),
            channel: config.channel.clone(),
            autorejoin: config.autorejoin,
            commands: CommandHandler::new(&config.command_prefix, &config.owners),
            requests,
            outgoing_tx,
            outgoing_rx,
        }
    }

    pub fn publisher(&self) -> IrcPublisher {
        IrcPublisher {
            channel: self.channel.clone(),
            outgoing: self.outgoing_tx.clone(),
        }
    }

    /// Register and serve the connection until it closes, an owner asks for a
    /// restart, or `shutdown` is raised.
    pub async fn run<S>(
        &mut self,
        stream: S,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<RunOutcome, IrcError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

        let nick = self.nickname.clone();
        send(&mut framed, IrcMessage::new("NICK", &[&nick])).await?;
        send(&mut framed, IrcMessage::new("USER", &[&nick, "0", "*", &nick])).await?;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Leaving IRC");
                        send(&mut framed, IrcMessage::new("QUIT", &["shutting down"])).await?;
                        return Ok(RunOutcome::Shutdown);
                    }
                }
                Some(line) = self.outgoing_rx.recv() => {
                    framed.send(format!("{}\r", line)).await?;
                }
                line = framed.next() => {
                    let line = match line {
                        Some(line) => line?,
                        None => return Err(IrcError::ConnectionClosed),
                    };
                    let Some(msg) = IrcMessage::parse(&line) else {
                        continue;
                    };
                    if let Some(outcome) = self.handle_message(&mut framed, msg).await? {
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    async fn handle_message<S>(
        &mut self,
        framed: &mut Framed<S, LinesCodec>,
        msg: IrcMessage,
    ) -> Result<Option<RunOutcome>, IrcError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match msg.command.as_str() {
            "PING" => {
                let token = msg.param(0).unwrap_or_default();
                send(framed, IrcMessage::new("PONG", &[token])).await?;
            }
            "001" => {
                info!("Registered on IRC as {}, joining {}", self.nickname, self.channel);
                send(framed, IrcMessage::new("JOIN", &[&self.channel])).await?;
            }
            "433" => {
                self.nickname = alternate_nick(&self.nickname);
                warn!("Nickname in use, retrying as {}", self.nickname);
                send(framed, IrcMessage::new("NICK", &[&self.nickname])).await?;
            }
            "KICK" => {
                let (Some(channel), Some(target)) = (msg.param(0), msg.param(1)) else {
                    return Ok(None);
                };
                if !target.eq_ignore_ascii_case(&self.nickname) {
                    return Ok(None);
                }
                warn!("Kicked from {}", channel);
                if self.autorejoin {
                    send(framed, IrcMessage::new("JOIN", &[channel])).await?;
                }
            }
            "PRIVMSG" => return self.handle_privmsg(framed, &msg).await,
            _ => {}
        }
        Ok(None)
    }

    async fn handle_privmsg<S>(
        &mut self,
        framed: &mut Framed<S, LinesCodec>,
        msg: &IrcMessage,
    ) -> Result<Option<RunOutcome>, IrcError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (Some(target), Some(text), Some(user)) = (msg.param(0), msg.param(1), msg.source_nick())
        else {
            return Ok(None);
        };
        if !target.eq_ignore_ascii_case(&self.channel) {
            debug!("Ignoring message to {} from {}", target, user);
            return Ok(None);
        }

        if self.commands.is_command(text) {
            match self.commands.parse(user, text) {
                Some(IrcCommand::Restart) => {
                    send(framed, IrcMessage::new("QUIT", &["restarting"])).await?;
                    return Ok(Some(RunOutcome::Restart));
                }
                Some(IrcCommand::Reconnect) => self.request(BridgeRequest::Reconnect),
                None => {}
            }
            return Ok(None);
        }

        self.request(BridgeRequest::Relay(OutboundMessage {
            sender: user.to_string(),
            text: text.to_string(),
        }));
        Ok(None)
    }

    fn request(&self, request: BridgeRequest) {
        if self.requests.send(request).is_err() {
            debug!("Bridge worker gone, dropping request");
        }
    }
}

async fn send<S>(framed: &mut Framed<S, LinesCodec>, msg: IrcMessage) -> Result<(), IrcError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let line = msg.to_line();
    trace!("IRC >> {}", line);
    framed.send(format!("{}\r", line)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn irc_config(autorejoin: bool) -> IrcConfig {
        IrcConfig {
            server: "irc.example.org".to_string(),
            port: 6667,
            nickname: "bot".to_string(),
            channel: "#wow".to_string(),
            autorejoin,
            command_prefix: "!".to_string(),
            owners: vec!["alice".to_string()],
        }
    }

    fn registration(builder: &mut Builder) -> &mut Builder {
        builder.write(b"NICK bot\r\n").write(b"USER bot 0 * bot\r\n")
    }

    #[tokio::test]
    async fn test_register_join_and_pong() {
        let stream = registration(&mut Builder::new())
            .read(b":srv 001 bot :Welcome\r\n")
            .write(b"JOIN #wow\r\n")
            .read(b"PING :srv.example.org\r\n")
            .write(b"PONG srv.example.org\r\n")
            .build();

        let (tx, _rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, mut shutdown) = watch::channel(false);
        let mut relay = IrcRelay::new(&irc_config(false), tx);

        let result = relay.run(stream, &mut shutdown).await;
        assert!(matches!(result, Err(IrcError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_channel_messages_and_commands() {
        let stream = registration(&mut Builder::new())
            .read(
                b":alice!a@host PRIVMSG #wow :hello there\r\n\
                  :bob!b@host PRIVMSG #wow :!reconnect\r\n\
                  :bob!b@host PRIVMSG bot :psst\r\n\
                  :alice!a@host PRIVMSG #WOW :!reconnect\r\n",
            )
            .build();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, mut shutdown) = watch::channel(false);
        let mut relay = IrcRelay::new(&irc_config(false), tx);

        let result = relay.run(stream, &mut shutdown).await;
        assert!(matches!(result, Err(IrcError::ConnectionClosed)));

        assert_eq!(
            rx.try_recv().unwrap(),
            BridgeRequest::Relay(OutboundMessage {
                sender: "alice".to_string(),
                text: "hello there".to_string(),
            })
        );
        assert_eq!(rx.try_recv().unwrap(), BridgeRequest::Reconnect);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_owner_restart_quits() {
        let stream = registration(&mut Builder::new())
            .read(b":alice!a@host PRIVMSG #wow :!restart\r\n")
            .write(b"QUIT restarting\r\n")
            .build();

        let (tx, _rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, mut shutdown) = watch::channel(false);
        let mut relay = IrcRelay::new(&irc_config(false), tx);

        let outcome = relay.run(stream, &mut shutdown).await.unwrap();
        assert_eq!(outcome, RunOutcome::Restart);
    }

    #[tokio::test]
    async fn test_kick_rejoin() {
        let stream = registration(&mut Builder::new())
            .read(b":op!o@host KICK #wow someone :bye\r\n:op!o@host KICK #wow bot :bye\r\n")
            .write(b"JOIN #wow\r\n")
            .build();

        let (tx, _rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, mut shutdown) = watch::channel(false);
        let mut relay = IrcRelay::new(&irc_config(true), tx);

        let result = relay.run(stream, &mut shutdown).await;
        assert!(matches!(result, Err(IrcError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_kick_without_autorejoin_stays_out() {
        let stream = registration(&mut Builder::new())
            .read(b":op!o@host KICK #wow bot :bye\r\n")
            .build();

        let (tx, _rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, mut shutdown) = watch::channel(false);
        let mut relay = IrcRelay::new(&irc_config(false), tx);

        let result = relay.run(stream, &mut shutdown).await;
        assert!(matches!(result, Err(IrcError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_publish_and_shutdown() {
        let stream = registration(&mut Builder::new())
            .write(b"PRIVMSG #wow :Thrall: for the horde\r\n")
            .write(b"QUIT :shutting down\r\n")
            .build();

        let (tx, _rx) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown) = watch::channel(false);
        let mut relay = IrcRelay::new(&irc_config(false), tx);

        relay.publisher().publish("Thrall", "for the horde");
        let run = relay.run(stream, &mut shutdown);
        tokio::pin!(run);

        // Let the queued message go out before asking to leave
        tokio::select! {
            _ = &mut run => panic!("relay ended early"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {}
        }
        shutdown_tx.send_replace(true);

        assert_eq!(run.await.unwrap(), RunOutcome::Shutdown);
    }

    #[tokio::test]
    async fn test_published_chat_stays_on_one_line() {
        let long = "x".repeat(600);
        let mut capped = format!("PRIVMSG #wow :Jaina: {}", long).into_bytes();
        capped.truncate(510);
        capped.extend_from_slice(b"\r\n");

        let stream = registration(&mut Builder::new())
            .write(b"PRIVMSG #wow :Thrall: hi  QUIT :pwned\r\n")
            .write(&capped)
            .write(b"QUIT :shutting down\r\n")
            .build();

        let (tx, _rx) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown) = watch::channel(false);
        let mut relay = IrcRelay::new(&irc_config(false), tx);

        let publisher = relay.publisher();
        publisher.publish("Thrall", "hi\r\nQUIT :pwned");
        publisher.publish("Jaina", &long);

        let run = relay.run(stream, &mut shutdown);
        tokio::pin!(run);
        tokio::select! {
            _ = &mut run => panic!("relay ended early"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {}
        }
        shutdown_tx.send_replace(true);

        assert_eq!(run.await.unwrap(), RunOutcome::Shutdown);
    }

    #[test]
    fn test_alternate_nick() {
        let nick = alternate_nick(&"n".repeat(40));
        let (base, suffix) = nick.rsplit_once('_').unwrap();
        assert_eq!(base, "n".repeat(26));
        let suffix: u32 = suffix.parse().unwrap();
        assert!((1000..=9999).contains(&suffix));

        assert!(alternate_nick("bot").starts_with("bot_"));
    }
}
