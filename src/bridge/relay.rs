//! Inbound chat relay: game channel to IRC.

use std::sync::Arc;

use tracing::trace;

use crate::bridge::session::{ChatKind, ChatPublisher};
use crate::common::ChatEvent;

/// Forwards chat events from the configured game channel to the IRC side.
pub struct InboundRelay {
    channel: String,
    publisher: Arc<dyn ChatPublisher>,
}

impl InboundRelay {
    pub fn new(channel: &str, publisher: Arc<dyn ChatPublisher>) -> Self {
        Self {
            channel: channel.to_lowercase(),
            publisher,
        }
    }

    pub fn handle(&self, event: &ChatEvent) {
        if ChatKind::from_opcode(event.opcode).is_none() {
            return;
        }
        match &event.channel {
            Some(channel) if channel.to_lowercase() == self.channel => {}
            _ => {
                trace!("Not relaying chat from {:?}", event.channel);
                return;
            }
        }
        self.publisher.publish(&event.sender, &event.text);
    }
}
