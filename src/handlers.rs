//! Event handlers.
//!
//! Each public function handles one dispatch name. Handlers receive the
//! shared [`Context`] plus the raw event and do their own payload decoding;
//! anything that goes wrong is returned as a [`HandlerError`] and reported by
//! the event loop without disturbing later events.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, Endpoint};
use crate::bot::Context;
use crate::dispatch::HandlerError;
use crate::events::{Event, ReactionAdd, ReadyEvent};
use crate::text::filter;

/// Mention triggers scrubbed from outbound notification text.
const SCRUBBED_MENTIONS: &[&str] = &["@everyone", "@here"];

// ---------------------------------------------------------------------------
// READY handler
// ---------------------------------------------------------------------------

/// Stores the session identity delivered with READY.
///
/// The identity cell is write-once: the transport delivers READY before any
/// message or reaction event, and a re-delivered READY (session resume) keeps
/// the original value.
pub fn on_ready(ctx: &Context, event: Event) -> Result<(), HandlerError> {
    let ready: ReadyEvent = serde_json::from_value(event.data)?;

    info!(user = %ready.user.username, "session ready");

    if ctx.identity.set(ready.user).is_err() {
        warn!("duplicate READY, keeping the first session identity");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// MESSAGE_REACTION_ADD handler
// ---------------------------------------------------------------------------

/// Notifies the author of the reacted-to message via DM.
///
/// Decodes the payload, composes the notification line, then runs the
/// three-step request chain under the configured deadline.
pub async fn on_reaction_add(ctx: &Context, event: Event) -> Result<(), HandlerError> {
    let reaction: ReactionAdd = serde_json::from_value(event.data)?;

    // The bot's own reactions would have it DM authors about itself.
    if let Some(identity) = ctx.identity.get() {
        if identity.id == reaction.user_id {
            debug!("ignoring the bot's own reaction");
            return Ok(());
        }
    }

    let content = compose_notification(&reaction)?;
    debug!(
        channel_id = %reaction.channel_id,
        message_id = %reaction.message_id,
        %content,
        "starting notification chain"
    );

    let deadline = ctx.config.chain_timeout;
    match tokio::time::timeout(deadline, notify_author(ctx.api.as_ref(), &reaction, content)).await
    {
        Ok(result) => result,
        Err(_elapsed) => Err(HandlerError::Timeout(deadline)),
    }
}

/// Builds the `"<actor> reacted <emoji>"` line.
///
/// The result is scrubbed of mention triggers so a crafted nickname cannot
/// smuggle `@everyone` into a message the bot sends.
pub fn compose_notification(reaction: &ReactionAdd) -> Result<String, HandlerError> {
    let actor = reaction
        .actor_name()
        .ok_or(HandlerError::MissingField("member.nick"))?;
    let emoji = reaction
        .emoji
        .render()
        .ok_or(HandlerError::MissingField("emoji.name"))?;

    let mut content = format!("{actor} reacted {emoji}");
    for mention in SCRUBBED_MENTIONS {
        content = filter(&content, mention)?;
    }

    Ok(content)
}

/// The chained notification pipeline, in strict order:
///
/// 1. fetch the reacted-to message,
/// 2. open a DM with its author (the author, not the reactor),
/// 3. post `content` into that DM channel.
///
/// Each step needs a field from the previous response; the first failure or
/// missing field aborts the remainder. Steps already performed (an opened DM
/// channel, say) are not rolled back.
pub async fn notify_author(
    api: &dyn ApiClient,
    reaction: &ReactionAdd,
    content: String,
) -> Result<(), HandlerError> {
    let message = api
        .call(Endpoint::GetChannelMessage {
            channel_id: reaction.channel_id.clone(),
            message_id: reaction.message_id.clone(),
        })
        .await?;
    let author_id = message
        .get("author")
        .and_then(|author| author.get("id"))
        .and_then(Value::as_str)
        .ok_or(HandlerError::MissingField("author.id"))?;

    let dm_channel = api
        .call(Endpoint::CreateDmChannel {
            recipient_id: author_id.to_string(),
        })
        .await?;
    let dm_channel_id = dm_channel
        .get("id")
        .and_then(Value::as_str)
        .ok_or(HandlerError::MissingField("id"))?;

    api.call(Endpoint::CreateMessage {
        channel_id: dm_channel_id.to_string(),
        content,
    })
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::api::ApiError;
    use crate::bot::BotConfig;
    use crate::events::MESSAGE_REACTION_ADD;

    // -- Scripted mock client ---------------------------------------------

    /// Records every call and replays a scripted response per step.
    struct ScriptedClient {
        calls: Mutex<Vec<Endpoint>>,
        responses: Mutex<VecDeque<Result<Value, ApiError>>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<Value, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            })
        }

        fn calls(&self) -> Vec<Endpoint> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ApiClient for ScriptedClient {
        async fn call(&self, endpoint: Endpoint) -> Result<Value, ApiError> {
            self.calls.lock().unwrap().push(endpoint);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Transport("script exhausted".into())))
        }
    }

    /// Never answers; for exercising the chain deadline.
    struct StalledClient;

    #[async_trait]
    impl ApiClient for StalledClient {
        async fn call(&self, _endpoint: Endpoint) -> Result<Value, ApiError> {
            std::future::pending().await
        }
    }

    // -- Fixtures ----------------------------------------------------------

    fn reaction_event(nick: &str, emoji: Value) -> Event {
        Event::new(
            MESSAGE_REACTION_ADD,
            json!({
                "user_id": "U1",
                "channel_id": "C1",
                "message_id": "M1",
                "member": {"nick": nick, "user": {"id": "U1", "username": "alice01"}},
                "emoji": emoji,
            }),
        )
    }

    fn context(api: Arc<dyn ApiClient>) -> Context {
        Context::new(api, BotConfig::default())
    }

    fn happy_path_responses() -> Vec<Result<Value, ApiError>> {
        vec![
            Ok(json!({"id": "M1", "author": {"id": "U9"}})),
            Ok(json!({"id": "D5", "recipients": [{"id": "U9"}]})),
            Ok(json!({"id": "M2", "content": "delivered"})),
        ]
    }

    // -- The full chain ----------------------------------------------------

    #[tokio::test]
    async fn chain_issues_all_three_requests_in_order() {
        let api = ScriptedClient::new(happy_path_responses());
        let ctx = context(api.clone());

        on_reaction_add(&ctx, reaction_event("Alice", json!({"name": "smile", "id": null})))
            .await
            .unwrap();

        assert_eq!(
            api.calls(),
            vec![
                Endpoint::GetChannelMessage {
                    channel_id: "C1".into(),
                    message_id: "M1".into(),
                },
                Endpoint::CreateDmChannel {
                    recipient_id: "U9".into(),
                },
                Endpoint::CreateMessage {
                    channel_id: "D5".into(),
                    content: "Alice reacted smile".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn custom_emoji_uses_compound_token_in_content() {
        let api = ScriptedClient::new(happy_path_responses());
        let ctx = context(api.clone());

        on_reaction_add(&ctx, reaction_event("Alice", json!({"name": "party", "id": "77"})))
            .await
            .unwrap();

        let calls = api.calls();
        assert_eq!(
            calls[2],
            Endpoint::CreateMessage {
                channel_id: "D5".into(),
                content: "Alice reacted <:party:77>".into(),
            }
        );
    }

    #[tokio::test]
    async fn missing_author_aborts_before_dm_steps() {
        let api = ScriptedClient::new(vec![Ok(json!({"id": "M1", "content": "no author"}))]);
        let ctx = context(api.clone());

        let err = on_reaction_add(&ctx, reaction_event("Alice", json!({"name": "smile"})))
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::MissingField("author.id")));
        assert_eq!(api.calls().len(), 1, "steps B and C must never be issued");
    }

    #[tokio::test]
    async fn failed_dm_open_aborts_final_post() {
        let api = ScriptedClient::new(vec![
            Ok(json!({"author": {"id": "U9"}})),
            Err(ApiError::Status {
                status: 403,
                body: "cannot DM this user".into(),
                path: "/users/@me/channels".into(),
            }),
        ]);
        let ctx = context(api.clone());

        let err = on_reaction_add(&ctx, reaction_event("Alice", json!({"name": "smile"})))
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::Api(_)));
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn stalled_chain_times_out() {
        let api: Arc<dyn ApiClient> = Arc::new(StalledClient);
        let ctx = Context::new(
            api,
            BotConfig {
                chain_timeout: Duration::from_millis(20),
                ..BotConfig::default()
            },
        );

        let err = on_reaction_add(&ctx, reaction_event("Alice", json!({"name": "smile"})))
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::Timeout(_)));
    }

    #[tokio::test]
    async fn own_reactions_are_ignored() {
        let api = ScriptedClient::new(happy_path_responses());
        let ctx = context(api.clone());
        on_ready(
            &ctx,
            Event::new(
                crate::events::READY,
                json!({"user": {"id": "U1", "username": "courier", "bot": true}}),
            ),
        )
        .unwrap();

        on_reaction_add(&ctx, reaction_event("Courier", json!({"name": "smile"})))
            .await
            .unwrap();

        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_reported_not_panicked() {
        let api = ScriptedClient::new(Vec::new());
        let ctx = context(api.clone());

        let err = on_reaction_add(&ctx, Event::new(MESSAGE_REACTION_ADD, json!({"nope": 1})))
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::Payload(_)));
        assert!(api.calls().is_empty());
    }

    // -- compose_notification ---------------------------------------------

    #[test]
    fn composed_content_scrubs_mention_triggers() {
        let reaction: ReactionAdd = serde_json::from_value(json!({
            "user_id": "U1",
            "channel_id": "C1",
            "message_id": "M1",
            "member": {"nick": "mal@everyoneicious", "user": null},
            "emoji": {"name": "smile"},
        }))
        .unwrap();

        assert_eq!(
            compose_notification(&reaction).unwrap(),
            "malicious reacted smile"
        );
    }

    #[test]
    fn compose_fails_without_any_actor_name() {
        let reaction: ReactionAdd = serde_json::from_value(json!({
            "user_id": "U1",
            "channel_id": "C1",
            "message_id": "M1",
            "emoji": {"name": "smile"},
        }))
        .unwrap();

        assert!(matches!(
            compose_notification(&reaction).unwrap_err(),
            HandlerError::MissingField("member.nick")
        ));
    }

    #[test]
    fn compose_fails_on_nameless_emoji() {
        let reaction: ReactionAdd = serde_json::from_value(json!({
            "user_id": "U1",
            "channel_id": "C1",
            "message_id": "M1",
            "member": {"nick": "Alice"},
            "emoji": {"id": "77"},
        }))
        .unwrap();

        assert!(matches!(
            compose_notification(&reaction).unwrap_err(),
            HandlerError::MissingField("emoji.name")
        ));
    }

    // -- on_ready ----------------------------------------------------------

    #[test]
    fn ready_populates_identity_once() {
        let api = ScriptedClient::new(Vec::new());
        let ctx = context(api);

        on_ready(
            &ctx,
            Event::new(
                crate::events::READY,
                json!({"user": {"id": "B1", "username": "courier"}}),
            ),
        )
        .unwrap();
        on_ready(
            &ctx,
            Event::new(
                crate::events::READY,
                json!({"user": {"id": "B2", "username": "impostor"}}),
            ),
        )
        .unwrap();

        assert_eq!(ctx.identity.get().map(|user| user.id.as_str()), Some("B1"));
    }
}
