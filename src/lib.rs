//! A reaction notification bot for Discord.
//!
//! When someone reacts to a message, the author of that message gets a DM:
//! `"<actor> reacted <emoji>"`. The crate splits into a transport-agnostic
//! core (credential loading, string filtering, name-keyed event dispatch,
//! and the chained notification pipeline) and two thin connectors behind
//! the `io` feature that delegate the actual gateway and REST work to the
//! `twilight` stack.

pub mod api;
pub mod bot;
pub mod dispatch;
pub mod events;
pub mod handlers;
pub mod text;
pub mod token;

#[cfg(feature = "io")]
pub mod gateway;
#[cfg(feature = "io")]
pub mod http;

pub use api::{ApiClient, ApiError, Endpoint, Method};
pub use bot::{Bot, BotConfig, Context};
pub use dispatch::{DispatchError, Dispatcher, HandlerError, OnUnhandled};
pub use events::Event;
