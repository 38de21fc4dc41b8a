//! Bot core: configuration, shared context, and the event loop.
//!
//! [`Bot::run`] is the single logical event loop: it pulls events off the
//! transport channel and dispatches them one at a time. Handler failures are
//! reported and the loop moves on; only the transport closing its channel
//! ends the loop.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_channel::Receiver;
use tracing::{error, info};

use crate::api::ApiClient;
use crate::dispatch::{Dispatcher, OnUnhandled};
use crate::events::{Event, User, MESSAGE_REACTION_ADD, READY};
use crate::handlers;

/// Deadline applied to each notification chain.
pub const DEFAULT_CHAIN_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct BotConfig {
    /// Policy for events no handler is registered for.
    pub on_unhandled: OnUnhandled,
    /// Per-chain deadline for the reaction notification pipeline.
    pub chain_timeout: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            on_unhandled: OnUnhandled::Ignore,
            chain_timeout: DEFAULT_CHAIN_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared context
// ---------------------------------------------------------------------------

/// State shared with every handler.
pub struct Context {
    /// Outbound REST seam.
    pub api: Arc<dyn ApiClient>,
    /// The bot's own user, written exactly once when READY arrives and
    /// read-only afterwards.
    pub identity: OnceLock<User>,
    pub config: BotConfig,
}

impl Context {
    pub fn new(api: Arc<dyn ApiClient>, config: BotConfig) -> Self {
        Self {
            api,
            identity: OnceLock::new(),
            config,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("identity", &self.identity.get())
            .field("config", &self.config)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

/// The assembled bot: shared context plus the populated dispatcher.
pub struct Bot {
    ctx: Arc<Context>,
    dispatcher: Dispatcher,
}

impl Bot {
    /// Build a bot with the default READY and MESSAGE_REACTION_ADD handlers
    /// registered.
    pub fn new(api: Arc<dyn ApiClient>, config: BotConfig) -> Self {
        let policy = config.on_unhandled;
        let ctx = Arc::new(Context::new(api, config));
        let mut dispatcher = Dispatcher::with_policy(policy);

        let ready_ctx = Arc::clone(&ctx);
        dispatcher.on(READY, move |event| {
            let ctx = Arc::clone(&ready_ctx);
            async move { handlers::on_ready(&ctx, event) }
        });

        let reaction_ctx = Arc::clone(&ctx);
        dispatcher.on(MESSAGE_REACTION_ADD, move |event| {
            let ctx = Arc::clone(&reaction_ctx);
            async move { handlers::on_reaction_add(&ctx, event).await }
        });

        Self { ctx, dispatcher }
    }

    pub fn context(&self) -> Arc<Context> {
        Arc::clone(&self.ctx)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Access the registry for additional registrations before the loop
    /// starts. Registration during dispatch is unsupported by construction:
    /// this borrows the bot mutably while [`run`](Self::run) consumes it.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Drive the event loop until the transport closes the channel.
    ///
    /// Events are handled strictly in arrival order, one at a time; a chain
    /// therefore runs to completion (or its deadline) before the next event
    /// is looked at.
    pub async fn run(self, events: Receiver<Event>) {
        while let Ok(event) = events.recv().await {
            let name = event.name.clone();
            if let Err(e) = self.dispatcher.dispatch(event).await {
                error!(event = %name, error = %e, "event processing failed");
            }
        }

        info!("event stream closed, shutting down");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
