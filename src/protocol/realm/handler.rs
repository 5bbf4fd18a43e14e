//! Ascension realm logon handshake: packet building, response checks and key
//! derivation.

use bytes::{Buf, BufMut, BytesMut};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use hmac::{digest::KeyInit as HmacKeyInit, Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, trace};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::common::error::ProtocolError;
use crate::protocol::packets::opcodes::realm;
use crate::protocol::packets::{ensure_remaining, read_cstring, MAX_CSTRING_SHORT};
use crate::protocol::realm::packets::{AuthResult, RealmInfo};
use crate::protocol::version::GameVersion;

type HmacSha256 = Hmac<Sha256>;

// Server-side constants of the logon protocol
const SERVER_PUBLIC_KEY: [u8; 32] =
    hex_literal::hex!("3642af852369154cfa1145950880108280a4341c26a376431b741e2aae9c2948");
const ENVELOPE_KEY: [u8; 32] =
    hex_literal::hex!("33ba3128ee614b5845e06b0dad176a9c79344dd7a7a1e2e8d8ad097da9b57f01");
const DERIVE_SALT: [u8; 32] =
    hex_literal::hex!("66d52b01e006cd246f090025d6312c62d13e847c9805956a1c5a10364baa7d82");
const ENVELOPE_NONCE: [u8; 12] = hex_literal::hex!("9201008ecafa7d60e0acc81e");
const PASSWORD_KEY_INFO: [u8; 32] =
    hex_literal::hex!("e815739f8ec810721b93554ca2eac597e05f375261dd72ff30837df951c7a5ed");
const SESSION_KEY_INFO: [u8; 32] =
    hex_literal::hex!("26986c8a73d24bc41cf386bcb58492416fb579784e1957701a889d97b6550140");
const PROOF_INFO: [u8; 2] = *b"OK";

const CLIENT_FINGERPRINT: &[u8] =
    b"1|1|DD541D7D87F3A757680395DD1BB309CC8A27D23F695307F3103BD5E283C57C92";

const XOR_MASK: u8 = 0xED;
const HEADER_MAGIC: u32 = 0xFCF4F4E6;
const LOGON_PROTOCOL_VERSION: u8 = 8;

/// Length of the session key handed to the world server.
pub const SESSION_KEY_LEN: usize = 40;

/// State of one logon attempt: ephemeral keys and the values derived from them.
pub struct LogonHandshake {
    account: String,
    password: String,
    version: GameVersion,
    public_key: PublicKey,
    password_key: [u8; 32],
    session_key: [u8; SESSION_KEY_LEN],
    expected_proof: [u8; 32],
    nonce: [u8; 12],
}

impl LogonHandshake {
    /// Generate fresh ephemeral keys for an account.
    pub fn new(account: &str, password: &str, version: GameVersion) -> Self {
        let secret_key = StaticSecret::random_from_rng(rand::thread_rng());
        let public_key = PublicKey::from(&secret_key);
        let shared_secret = secret_key.diffie_hellman(&PublicKey::from(SERVER_PUBLIC_KEY));

        let mut password_key = [0u8; 32];
        password_key.copy_from_slice(&derive_key(
            shared_secret.as_bytes(),
            &PASSWORD_KEY_INFO,
            32,
        ));

        let mut session_key = [0u8; SESSION_KEY_LEN];
        session_key.copy_from_slice(&derive_key(
            shared_secret.as_bytes(),
            &SESSION_KEY_INFO,
            SESSION_KEY_LEN,
        ));

        let expected_proof = hmac_sha256(&password_key, &PROOF_INFO);

        let mut nonce = [0u8; 12];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);

        Self {
            account: account.to_uppercase(),
            password: password.to_uppercase(),
            version,
            public_key,
            password_key,
            session_key,
            expected_proof,
            nonce,
        }
    }

    /// Session key for world server authentication.
    pub fn session_key(&self) -> [u8; SESSION_KEY_LEN] {
        self.session_key
    }

    /// Build the AUTH_LOGON_CHALLENGE packet.
    pub fn build_logon_challenge(&self) -> Result<Vec<u8>, ProtocolError> {
        let password_bytes = self.password.as_bytes();
        let cipher = ChaCha20Poly1305::new_from_slice(&self.password_key).map_err(crypto_error)?;
        let sealed = cipher
            .encrypt(Nonce::from_slice(&self.nonce), password_bytes)
            .map_err(crypto_error)?;
        let (password_ciphertext, password_tag) = sealed.split_at(password_bytes.len());

        let mut body = BytesMut::with_capacity(605 + password_bytes.len());
        put_padded(&mut body, CLIENT_FINGERPRINT, 256);
        body.put_slice(b"WoW\0");
        body.put_u8(self.version.major);
        body.put_u8(self.version.minor);
        body.put_u8(self.version.patch);
        body.put_u16_le(self.version.build);
        // Architecture, platform and locale are sent as reversed FourCCs
        body.put_slice(b"68x\0");
        body.put_slice(b"niW\0");
        body.put_slice(b"SUne");
        body.put_i32_le(180);
        body.put_slice(&[127, 0, 0, 1]);
        put_padded(&mut body, self.account.as_bytes(), 256);
        body.put_slice(self.public_key.as_bytes());
        body.put_slice(&self.nonce);
        body.put_slice(password_tag);
        body.put_u32_le(password_bytes.len() as u32);
        body.put_slice(password_ciphertext);

        trace!("Logon body size: {} bytes", body.len());

        let mut header = BytesMut::with_capacity(8);
        header.put_u8(realm::AUTH_LOGON_CHALLENGE);
        header.put_u8(LOGON_PROTOCOL_VERSION);
        header.put_u16_le((body.len() + 16) as u16);
        header.put_u32_le(HEADER_MAGIC);

        // The last four bytes travel in the clear after the sealed envelope
        let (sealed_part, tail) = body.split_at(body.len() - 4);
        let envelope = ChaCha20Poly1305::new_from_slice(&ENVELOPE_KEY).map_err(crypto_error)?;
        let encrypted = envelope
            .encrypt(
                Nonce::from_slice(&ENVELOPE_NONCE),
                Payload {
                    msg: sealed_part,
                    aad: &header[..],
                },
            )
            .map_err(crypto_error)?;
        let (encrypted_data, outer_tag) = encrypted.split_at(encrypted.len() - 16);

        let mut packet = Vec::with_capacity(header.len() + encrypted.len() + tail.len());
        packet.extend_from_slice(&header);
        packet.extend_from_slice(outer_tag);
        packet.extend(encrypted_data.iter().map(|b| b ^ XOR_MASK));
        packet.extend_from_slice(tail);

        debug!("Built AUTH_LOGON_CHALLENGE packet: {} bytes", packet.len());
        Ok(packet)
    }

    /// Check the AUTH_LOGON_CHALLENGE response.
    pub fn check_challenge_response(&self, data: &[u8]) -> Result<(), ProtocolError> {
        ensure_remaining(&data, 3)?;
        expect_opcode(data[0], realm::AUTH_LOGON_CHALLENGE)?;

        let result = AuthResult::from_code(data[2]);
        if !result.is_success() {
            return Err(ProtocolError::AuthFailed {
                reason: result.message(),
            });
        }

        // A non-zero trailing security flag means a second factor is required
        if data.len() >= 118 && data[data.len() - 1] != 0 {
            return Err(ProtocolError::AuthFailed {
                reason: "Two-factor authentication required".to_string(),
            });
        }

        debug!("Challenge response: success");
        Ok(())
    }

    /// Build the AUTH_LOGON_PROOF packet; the envelope already carried the credentials.
    pub fn build_logon_proof(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(75);
        packet.push(realm::AUTH_LOGON_PROOF);
        packet.extend_from_slice(&[0u8; 32]);
        packet.extend_from_slice(&[0u8; 20]);
        packet.extend_from_slice(&[0u8; 20]);
        packet.push(0);
        packet.push(0);
        packet
    }

    /// Check the AUTH_LOGON_PROOF response and the server's proof.
    pub fn check_proof_response(&self, data: &[u8]) -> Result<(), ProtocolError> {
        ensure_remaining(&data, 2)?;
        expect_opcode(data[0], realm::AUTH_LOGON_PROOF)?;

        let result = AuthResult::from_code(data[1]);
        if !result.is_success() {
            return Err(ProtocolError::AuthFailed {
                reason: result.message(),
            });
        }

        if data.len() >= 34 && data[2..34] != self.expected_proof {
            return Err(ProtocolError::AuthFailed {
                reason: "Server proof mismatch".to_string(),
            });
        }

        debug!("Proof response: success");
        Ok(())
    }

    /// Build the REALM_LIST request packet.
    pub fn build_realm_list_request(&self) -> Vec<u8> {
        vec![realm::REALM_LIST, 0, 0, 0, 0]
    }

    /// Parse the REALM_LIST response.
    pub fn parse_realm_list(&self, data: &[u8]) -> Result<Vec<RealmInfo>, ProtocolError> {
        let mut buf = data;
        ensure_remaining(&buf, 8)?;

        expect_opcode(buf.get_u8(), realm::REALM_LIST)?;
        let _size = buf.get_u16_le();
        let _unused = buf.get_u32_le();
        let realm_count = buf.get_u8();

        debug!("Realm count: {}", realm_count);

        let mut realms = Vec::with_capacity(realm_count as usize);
        for _ in 0..realm_count {
            ensure_remaining(&buf, 5)?;
            let _realm_type = buf.get_u32_le();
            let flags = buf.get_u8();
            let name = read_cstring(&mut buf, MAX_CSTRING_SHORT)?;
            let address = read_cstring(&mut buf, MAX_CSTRING_SHORT)?;

            ensure_remaining(&buf, 7)?;
            let _population = buf.get_f32_le();
            let _characters = buf.get_u8();
            let _timezone = buf.get_u8();
            let id = buf.get_u8();

            debug!("Realm: {} at {} (id={}, flags={})", name, address, id, flags);
            realms.push(RealmInfo { id, name, address });
        }

        Ok(realms)
    }
}

/// Two-step HMAC-SHA256 key derivation used by the logon protocol.
fn derive_key(key: &[u8], info: &[u8], size: usize) -> Vec<u8> {
    let interim = hmac_sha256(key, info);

    let mut block = DERIVE_SALT.to_vec();
    block.push(0x01);
    let mut output = hmac_sha256(&interim, &block).to_vec();

    if size > output.len() {
        let mut block = output.clone();
        block.extend_from_slice(&DERIVE_SALT);
        block.push(0x02);
        output.extend_from_slice(&hmac_sha256(&interim, &block));
    }

    output.truncate(size);
    output
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = <HmacSha256 as HmacKeyInit>::new_from_slice(key)
        .expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

fn put_padded(buf: &mut BytesMut, value: &[u8], width: usize) {
    let len = value.len().min(width - 1);
    buf.put_slice(&value[..len]);
    buf.put_bytes(0, width - len);
}

fn expect_opcode(actual: u8, expected: u8) -> Result<(), ProtocolError> {
    if actual != expected {
        return Err(ProtocolError::UnexpectedOpcode {
            expected: expected as u16,
            actual: actual as u16,
        });
    }
    Ok(())
}

fn crypto_error(e: impl std::fmt::Display) -> ProtocolError {
    ProtocolError::EncryptionError {
        message: e.to_string(),
    }
}
