//! Bot entry point.
//!
//! Wires the connectors to the core: read the token, build the REST client
//! and default handlers, connect the gateway, run the loop until the
//! transport gives up.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use reaction_courier::bot::{Bot, BotConfig};
use reaction_courier::gateway::{self, GatewayConfig};
use reaction_courier::http::RestClient;
use reaction_courier::token::{read_token, DEFAULT_TOKEN_FILE};

#[tokio::main]
async fn main() {
    // Logs go to stderr; respects RUST_LOG, defaults to info.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenv::dotenv().ok();

    info!("starting bot");

    let token_file =
        std::env::var("TOKEN_FILE").unwrap_or_else(|_| DEFAULT_TOKEN_FILE.to_string());
    let token = match read_token(&token_file) {
        Ok(token) => token,
        Err(e) => {
            error!(
                file = %token_file,
                error = %e,
                "no usable credential; copy `token.eg.dat` to `token.dat` and put your bot token in it"
            );
            process::exit(1);
        }
    };

    let api = Arc::new(RestClient::new(token.clone()));
    let bot = Bot::new(api, config_from_env());

    let gw = gateway::connect(GatewayConfig::with_default_intents(token));

    bot.run(gw.events).await;
}

/// Ad-hoc env overrides: `UNHANDLED_EVENTS` (`ignore|log|error`) and
/// `CHAIN_TIMEOUT_SECS`.
fn config_from_env() -> BotConfig {
    let mut config = BotConfig::default();

    if let Ok(raw) = std::env::var("UNHANDLED_EVENTS") {
        match raw.parse() {
            Ok(policy) => config.on_unhandled = policy,
            Err(e) => warn!(error = %e, "ignoring UNHANDLED_EVENTS"),
        }
    }

    if let Ok(raw) = std::env::var("CHAIN_TIMEOUT_SECS") {
        match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => config.chain_timeout = Duration::from_secs(secs),
            _ => warn!(value = %raw, "ignoring CHAIN_TIMEOUT_SECS"),
        }
    }

    config
}
