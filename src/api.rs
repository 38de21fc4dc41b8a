//! Typed REST endpoints and the outbound client seam.
//!
//! Every REST call the bot makes is described by an [`Endpoint`] value; path
//! and body assembly live here and nowhere else. The actual transport hides
//! behind [`ApiClient`], so the orchestration code (and its tests) never know
//! whether a call went over the network or into a mock.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::events::Snowflake;

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// One variant per REST endpoint the bot uses, parameterized by typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Fetch a single message.
    GetChannelMessage {
        channel_id: Snowflake,
        message_id: Snowflake,
    },
    /// Open (or reuse) a direct-message channel with a user.
    CreateDmChannel { recipient_id: Snowflake },
    /// Post a text message into a channel.
    CreateMessage {
        channel_id: Snowflake,
        content: String,
    },
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::GetChannelMessage { .. } => Method::Get,
            Endpoint::CreateDmChannel { .. } | Endpoint::CreateMessage { .. } => Method::Post,
        }
    }

    /// Request path relative to the API root.
    pub fn path(&self) -> String {
        match self {
            Endpoint::GetChannelMessage {
                channel_id,
                message_id,
            } => format!("/channels/{channel_id}/messages/{message_id}"),
            Endpoint::CreateDmChannel { .. } => "/users/@me/channels".to_string(),
            Endpoint::CreateMessage { channel_id, .. } => {
                format!("/channels/{channel_id}/messages")
            }
        }
    }

    /// JSON request body, or `None` for body-less calls.
    pub fn body(&self) -> Option<Value> {
        match self {
            Endpoint::GetChannelMessage { .. } => None,
            Endpoint::CreateDmChannel { recipient_id } => {
                Some(json!({ "recipient_id": recipient_id }))
            }
            Endpoint::CreateMessage { content, .. } => Some(json!({ "content": content })),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    /// Non-success status from the platform.
    Status {
        status: u16,
        body: String,
        path: String,
    },
    /// Network or client-internal failure.
    Transport(String),
    /// Response body could not be parsed into the expected shape.
    Decode(String),
    /// The request itself was malformed (bad snowflake, rejected content).
    InvalidArgument(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Status { status, body, path } => {
                write!(f, "API error {status} on {path}: {body}")
            }
            ApiError::Transport(e) => write!(f, "transport error: {e}"),
            ApiError::Decode(e) => write!(f, "response decode error: {e}"),
            ApiError::InvalidArgument(e) => write!(f, "invalid argument: {e}"),
        }
    }
}

impl Error for ApiError {}

// ---------------------------------------------------------------------------
// Client seam
// ---------------------------------------------------------------------------

/// Outbound REST client.
///
/// Implementations perform the call described by `endpoint` and hand back the
/// parsed response body. The orchestrator awaits each call before issuing the
/// next, so an implementation only ever sees one request of a chain at a time.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn call(&self, endpoint: Endpoint) -> Result<Value, ApiError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
