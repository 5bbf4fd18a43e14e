//! Game side of the bridge.
//!
//! ## Module Structure
//!
//! - `session`: collaborator contracts (`GameConnector`, `WorldSession`, `ChatPublisher`)
//! - `worker`: the connection state machine (`BridgeWorker`)
//! - `relay`: inbound game chat to IRC
//! - `fragment`: outbound message splitting

pub mod fragment;
pub mod relay;
pub mod session;
pub mod worker;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub use session::{ChatPublisher, GameConnector, SessionConfig};
pub use worker::{BridgeWorker, ConnectionState};

use crate::common::BridgeRequest;

/// Drain IRC requests into the worker.
///
/// The IRC endpoint only enqueues, so it keeps answering the server while a
/// request waits on the worker's lock. Ends when every sender is dropped.
pub fn spawn_request_forwarder<C: GameConnector>(
    worker: Arc<BridgeWorker<C>>,
    mut requests: mpsc::UnboundedReceiver<BridgeRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            match request {
                BridgeRequest::Relay(msg) => worker.send(&msg.sender, &msg.text).await,
                BridgeRequest::Reconnect => {
                    info!("Reconnect requested");
                    if !worker.reconnect().await {
                        debug!("Reconnect attempt failed; poll loop will retry");
                    }
                }
            }
        }
        info!("IRC -> game forwarding task ended");
    })
}
