//! Realm server TCP connection and authentication.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::bridge::session::{RealmDirectory, RealmEndpoint, RealmLogon, SessionKey};
use crate::common::error::{ConnectionError, RealmError};
use crate::protocol::realm::handler::LogonHandshake;
use crate::protocol::version::GameVersion;

/// Connect to a realm server, authenticate and fetch the realm list.
pub async fn connect_and_authenticate(
    host: &str,
    port: u16,
    account: &str,
    password: &str,
    version: GameVersion,
) -> Result<RealmLogon, RealmError> {
    info!("Connecting to realm server at {}:{}", host, port);

    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| ConnectionError::ConnectFailed {
            host: host.to_string(),
            port,
            source: e,
        })?;

    info!("Connected to realm server");
    authenticate(stream, account, password, version).await
}

/// Run the logon exchange over an established stream.
pub async fn authenticate<S>(
    mut stream: S,
    account: &str,
    password: &str,
    version: GameVersion,
) -> Result<RealmLogon, RealmError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handshake = LogonHandshake::new(account, password, version);
    let mut read_buf = BytesMut::with_capacity(4096);

    // Step 1: AUTH_LOGON_CHALLENGE
    let challenge = handshake
        .build_logon_challenge()
        .map_err(RealmError::Crypto)?;
    debug!("Sending AUTH_LOGON_CHALLENGE ({} bytes)", challenge.len());
    send(&mut stream, &challenge).await?;

    read_some(&mut stream, &mut read_buf).await?;
    debug!("Received {} bytes for challenge response", read_buf.len());
    handshake
        .check_challenge_response(&read_buf)
        .map_err(RealmError::Challenge)?;

    // Step 2: AUTH_LOGON_PROOF
    let proof = handshake.build_logon_proof();
    debug!("Sending AUTH_LOGON_PROOF ({} bytes)", proof.len());
    send(&mut stream, &proof).await?;

    read_some(&mut stream, &mut read_buf).await?;
    debug!("Received {} bytes for proof response", read_buf.len());
    handshake
        .check_proof_response(&read_buf)
        .map_err(RealmError::Proof)?;

    info!("Realm authentication successful");

    // Step 3: REALM_LIST, which carries its own size header
    send(&mut stream, &handshake.build_realm_list_request()).await?;
    read_buf.clear();
    loop {
        let mut chunk = [0u8; 1024];
        let n = stream.read(&mut chunk).await.map_err(ConnectionError::Io)?;
        if n == 0 {
            return Err(ConnectionError::ConnectionClosed.into());
        }
        read_buf.extend_from_slice(&chunk[..n]);
        if read_buf.len() >= 3 {
            let size = u16::from_le_bytes([read_buf[1], read_buf[2]]) as usize;
            if read_buf.len() >= size + 3 {
                break;
            }
        }
    }

    debug!("Received {} bytes for realm list", read_buf.len());
    let realms = handshake.parse_realm_list(&read_buf).map_err(|e| {
        ConnectionError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })?;

    let mut directory = RealmDirectory::new();
    for realm in realms {
        match realm.parse_address() {
            Some((host, port)) => {
                directory.insert(
                    realm.name.clone(),
                    RealmEndpoint {
                        host: host.to_string(),
                        port,
                        id: realm.id as u32,
                    },
                );
            }
            None => debug!("Skipping realm '{}' with address '{}'", realm.name, realm.address),
        }
    }

    Ok(RealmLogon {
        realms: directory,
        session_key: SessionKey(handshake.session_key()),
    })
}

async fn send<S: AsyncWrite + Unpin>(stream: &mut S, data: &[u8]) -> Result<(), ConnectionError> {
    stream.write_all(data).await?;
    Ok(())
}

/// Replace `buf` with the next chunk read from the stream.
async fn read_some<S: AsyncRead + Unpin>(
    stream: &mut S,
    buf: &mut BytesMut,
) -> Result<(), ConnectionError> {
    let mut chunk = [0u8; 256];
    let n = stream.read(&mut chunk).await?;
    if n == 0 {
        return Err(ConnectionError::ConnectionClosed);
    }
    buf.clear();
    buf.extend_from_slice(&chunk[..n]);
    Ok(())
}
