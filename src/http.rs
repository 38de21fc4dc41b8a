//! REST connector.
//!
//! Wraps `twilight_http::Client`: each typed [`Endpoint`] maps onto the
//! corresponding twilight request, and the typed response is re-serialized
//! into the JSON body the chain orchestrator consumes. Auth headers, rate
//! limiting, and retries all live inside twilight.

use std::fmt;
use std::num::NonZeroU64;

use async_trait::async_trait;
use serde_json::Value;
use twilight_http::error::ErrorType;
use twilight_http::Client;
use twilight_model::id::Id;

use crate::api::{ApiClient, ApiError, Endpoint};

// ---------------------------------------------------------------------------
// RestClient
// ---------------------------------------------------------------------------

/// [`ApiClient`] backed by the Discord REST API.
pub struct RestClient {
    http: Client,
}

impl RestClient {
    /// Create a client authenticating with the given bot token.
    pub fn new(token: String) -> Self {
        Self {
            http: Client::new(token),
        }
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl ApiClient for RestClient {
    async fn call(&self, endpoint: Endpoint) -> Result<Value, ApiError> {
        let path = endpoint.path();

        match endpoint {
            Endpoint::GetChannelMessage {
                channel_id,
                message_id,
            } => {
                let message = self
                    .http
                    .message(parse_id(&channel_id)?, parse_id(&message_id)?)
                    .await
                    .map_err(|e| request_error(&path, e))?
                    .model()
                    .await
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                encode(&message)
            }
            Endpoint::CreateDmChannel { recipient_id } => {
                let channel = self
                    .http
                    .create_private_channel(parse_id(&recipient_id)?)
                    .await
                    .map_err(|e| request_error(&path, e))?
                    .model()
                    .await
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                encode(&channel)
            }
            Endpoint::CreateMessage {
                channel_id,
                content,
            } => {
                let message = self
                    .http
                    .create_message(parse_id(&channel_id)?)
                    .content(&content)
                    .map_err(|e| ApiError::InvalidArgument(e.to_string()))?
                    .await
                    .map_err(|e| request_error(&path, e))?
                    .model()
                    .await
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                encode(&message)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a wire snowflake into a typed twilight id.
fn parse_id<T>(raw: &str) -> Result<Id<T>, ApiError> {
    raw.parse::<NonZeroU64>()
        .map(Id::from)
        .map_err(|_| ApiError::InvalidArgument(format!("malformed snowflake `{raw}`")))
}

fn request_error(path: &str, source: twilight_http::Error) -> ApiError {
    match source.kind() {
        ErrorType::Response { status, .. } => ApiError::Status {
            status: status.get(),
            body: source.to_string(),
            path: path.to_string(),
        },
        _ => ApiError::Transport(source.to_string()),
    }
}

fn encode<T: serde::Serialize>(body: &T) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
