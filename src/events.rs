//! The generic event envelope and typed payloads.
//!
//! Events arrive from the transport as a dispatch name plus a JSON body. The
//! dispatcher routes on the name alone; handlers that care about the body
//! deserialize it into one of the typed structs below so the rest of the
//! codebase never digs through `serde_json::Value` by hand.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Discord IDs are snowflakes transmitted as strings in JSON.
pub type Snowflake = String;

// ---------------------------------------------------------------------------
// Dispatch names
// ---------------------------------------------------------------------------

/// Session-ready dispatch; carries the authenticated user.
pub const READY: &str = "READY";
/// A user attached an emoji reaction to an existing message.
pub const MESSAGE_REACTION_ADD: &str = "MESSAGE_REACTION_ADD";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A named payload as delivered by the transport.
///
/// Transient: handlers copy out what they need and the envelope is dropped.
#[derive(Debug, Clone)]
pub struct Event {
    /// Dispatch name, e.g. `MESSAGE_REACTION_ADD`.
    pub name: String,
    /// Raw JSON body; `Value::Null` when the transport had nothing to attach.
    pub data: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

// ---------------------------------------------------------------------------
// READY
// ---------------------------------------------------------------------------

/// The slice of the READY payload this bot cares about: its own identity.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyEvent {
    pub user: User,
}

// ---------------------------------------------------------------------------
// MESSAGE_REACTION_ADD
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionAdd {
    /// The reacting user.
    pub user_id: Snowflake,
    /// Channel holding the reacted-to message.
    pub channel_id: Snowflake,
    /// The reacted-to message itself.
    pub message_id: Snowflake,
    /// Guild member record of the reactor; absent for DM reactions.
    #[serde(default)]
    pub member: Option<Member>,
    pub emoji: Emoji,
}

impl ReactionAdd {
    /// Display name of the reactor: guild nickname first, account username
    /// as fallback. `None` when the payload carries neither.
    pub fn actor_name(&self) -> Option<&str> {
        let member = self.member.as_ref()?;
        member
            .nick
            .as_deref()
            .or_else(|| member.user.as_ref().map(|user| user.username.as_str()))
    }
}

/// Partial guild member as embedded in reaction payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Emoji descriptor: unicode emoji carry only a name, custom emoji also an id.
#[derive(Debug, Clone, Deserialize)]
pub struct Emoji {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<Snowflake>,
}

impl Emoji {
    /// Message-embeddable form: the plain name for unicode emoji, the
    /// `<:name:id>` token for custom emoji. `None` when the name is missing.
    pub fn render(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        Some(match &self.id {
            Some(id) => format!("<:{name}:{id}>"),
            None => name.to_string(),
        })
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Some(repr) => f.write_str(&repr),
            None => f.write_str("<unnamed emoji>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
