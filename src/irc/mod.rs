//! IRC side of the bridge.

pub mod client;
pub mod commands;
pub mod message;

pub use client::{connect, IrcRelay};
