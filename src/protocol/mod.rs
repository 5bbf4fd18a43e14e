//! Game protocol: realm logon, world session and the connector the bridge
//! worker drives them through.

pub mod game;
pub mod packets;
pub mod realm;
pub mod version;

use async_trait::async_trait;

use crate::bridge::session::{
    GameConnector, RealmEndpoint, RealmLogon, SessionConfig, SessionKey,
};
use crate::common::error::{RealmError, WorldError};
use game::TcpWorldSession;

/// Connects to real realm and world servers over TCP.
///
/// Stateless: account, password and client version all come from the
/// `SessionConfig` passed to each call.
pub struct ProtocolConnector;

#[async_trait]
impl GameConnector for ProtocolConnector {
    type World = TcpWorldSession;

    async fn logon(&self, config: &SessionConfig) -> Result<RealmLogon, RealmError> {
        realm::connect_and_authenticate(
            &config.realm_host,
            config.realm_port,
            &config.account,
            &config.password,
            config.version,
        )
        .await
    }

    async fn open_world(
        &self,
        config: &SessionConfig,
        endpoint: &RealmEndpoint,
        key: &SessionKey,
    ) -> Result<TcpWorldSession, WorldError> {
        TcpWorldSession::connect(endpoint, &config.account, key, config.version).await
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::bridge::mock::session_config;
    use crate::protocol::packets::opcodes::{CMSG_AUTH_SESSION, SMSG_AUTH_CHALLENGE};
    use crate::protocol::version::GameVersion;

    #[tokio::test]
    async fn test_open_world_uses_session_config() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut config = session_config();
        config.account = "relaybot".to_string();
        config.version = GameVersion {
            build: 11723,
            ..GameVersion::ASCENSION
        };
        let endpoint = RealmEndpoint {
            host: "127.0.0.1".to_string(),
            port,
            id: 1,
        };

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            // SMSG_AUTH_CHALLENGE: size, opcode, 4 unknown bytes, seed
            let mut challenge = Vec::new();
            challenge.extend_from_slice(&10u16.to_be_bytes());
            challenge.extend_from_slice(&SMSG_AUTH_CHALLENGE.to_le_bytes());
            challenge.extend_from_slice(&[0, 0, 0, 0, 1, 2, 3, 4]);
            stream.write_all(&challenge).await.unwrap();

            let mut size = [0u8; 2];
            stream.read_exact(&mut size).await.unwrap();
            let mut body = vec![0u8; u16::from_be_bytes(size) as usize];
            stream.read_exact(&mut body).await.unwrap();
            body
        });

        let _world = ProtocolConnector
            .open_world(&config, &endpoint, &SessionKey([0; 40]))
            .await
            .unwrap();
        let body = server.await.unwrap();

        assert_eq!(u16::from_le_bytes([body[0], body[1]]), CMSG_AUTH_SESSION);
        assert_eq!(u32::from_le_bytes([body[2], body[3], body[4], body[5]]), 11723);
        assert_eq!(&body[10..18], b"RELAYBOT");
    }
}
