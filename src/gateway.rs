//! Gateway connector.
//!
//! The websocket session itself (identify, heartbeat, resume, reconnect) is
//! delegated to `twilight_gateway`. This module only converts twilight's
//! typed events into the generic [`Event`] envelope and feeds them into the
//! channel consumed by [`Bot::run`](crate::bot::Bot::run); swapping the
//! transport means touching this file and nothing else.

use async_channel::Receiver;
use serde_json::Value;
use tracing::{info, warn};
use twilight_gateway::{Event as WireEvent, Intents, Shard, ShardId};

use crate::events::{Event, MESSAGE_REACTION_ADD, READY};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Options for the gateway session.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub token: String,
    pub intents: Intents,
}

impl GatewayConfig {
    /// Intents covering everything the bot listens for.
    pub fn with_default_intents(token: String) -> Self {
        Self {
            token,
            intents: Intents::GUILDS
                | Intents::GUILD_MESSAGE_REACTIONS
                | Intents::DIRECT_MESSAGE_REACTIONS,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A running gateway session.
#[derive(Debug)]
pub struct GatewayHandle {
    /// Converted events in delivery order. Closes once the session hits a
    /// fatal error.
    pub events: Receiver<Event>,
}

/// Start the gateway session on a background task.
pub fn connect(config: GatewayConfig) -> GatewayHandle {
    let (tx, rx) = async_channel::bounded(64);
    let mut shard = Shard::new(ShardId::ONE, config.token, config.intents);

    tokio::spawn(async move {
        info!("gateway session starting");

        loop {
            let wire = match shard.next_event().await {
                Ok(wire) => wire,
                Err(source) => {
                    warn!(error = %source, "error receiving gateway event");
                    if source.is_fatal() {
                        break;
                    }
                    continue;
                }
            };

            let Some(event) = convert(wire) else {
                continue;
            };
            if tx.send(event).await.is_err() {
                // Bot side dropped the receiver.
                break;
            }
        }

        info!("gateway session ended");
    });

    GatewayHandle { events: rx }
}

/// Convert a twilight event into the generic envelope.
///
/// READY and MESSAGE_REACTION_ADD keep their payloads; every other dispatch
/// event is forwarded by name with a null body so the unhandled-event policy
/// still sees it. Non-dispatch frames (heartbeats and the like) end here.
fn convert(wire: WireEvent) -> Option<Event> {
    match wire {
        WireEvent::Ready(ready) => payload(READY, &*ready),
        WireEvent::ReactionAdd(reaction) => payload(MESSAGE_REACTION_ADD, &reaction.0),
        other => other
            .kind()
            .name()
            .map(|name| Event::new(name, Value::Null)),
    }
}

fn payload<T: serde::Serialize>(name: &str, body: &T) -> Option<Event> {
    match serde_json::to_value(body) {
        Ok(data) => Some(Event::new(name, data)),
        Err(e) => {
            warn!(event = name, error = %e, "failed to encode gateway payload");
            None
        }
    }
}
