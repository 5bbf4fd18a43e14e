//! World server connection and protocol handling.

pub mod chat;
pub mod codec;
pub mod handler;
pub mod packets;
pub mod session;

pub use session::TcpWorldSession;
