//! Name-keyed event dispatch.
//!
//! The registry is built once at startup (`register` needs `&mut self`) and
//! is read-only for the rest of the process; dispatch itself never mutates.
//! A failing handler is reported to the caller and leaves the registry
//! untouched, so one malformed payload can never halt the event stream.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::api::ApiError;
use crate::events::Event;
use crate::text::TextError;

// ---------------------------------------------------------------------------
// Handler contract
// ---------------------------------------------------------------------------

/// What a handler invocation resolves to.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'static>>;

/// A registered event callback.
pub type Handler = Box<dyn Fn(Event) -> HandlerFuture + Send + Sync>;

/// Why a single event (or the request chain it started) failed.
///
/// One failure taxonomy serves both levels: a chain failure surfaces as the
/// failure of the event that started the chain.
#[derive(Debug)]
pub enum HandlerError {
    /// The payload could not be decoded into the expected shape.
    Payload(serde_json::Error),
    /// The payload or a step response lacked a required field.
    MissingField(&'static str),
    /// Outbound text processing failed.
    Text(TextError),
    /// A REST call in the chain failed.
    Api(ApiError),
    /// The chain did not complete within the configured deadline.
    Timeout(Duration),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Payload(e) => write!(f, "malformed payload: {e}"),
            HandlerError::MissingField(field) => write!(f, "missing expected field `{field}`"),
            HandlerError::Text(e) => write!(f, "text processing failed: {e}"),
            HandlerError::Api(e) => write!(f, "request failed: {e}"),
            HandlerError::Timeout(after) => {
                write!(f, "chain timed out after {}s", after.as_secs_f64())
            }
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HandlerError::Payload(e) => Some(e),
            HandlerError::Text(e) => Some(e),
            HandlerError::Api(e) => Some(e),
            HandlerError::MissingField(_) | HandlerError::Timeout(_) => None,
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::Payload(e)
    }
}

impl From<TextError> for HandlerError {
    fn from(e: TextError) -> Self {
        HandlerError::Text(e)
    }
}

impl From<ApiError> for HandlerError {
    fn from(e: ApiError) -> Self {
        HandlerError::Api(e)
    }
}

// ---------------------------------------------------------------------------
// Unhandled-event policy
// ---------------------------------------------------------------------------

/// What to do with an event no handler is registered for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnUnhandled {
    /// Drop it silently.
    #[default]
    Ignore,
    /// Log the event name at debug level.
    Log,
    /// Report it as a dispatch failure.
    Error,
}

impl FromStr for OnUnhandled {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(OnUnhandled::Ignore),
            "log" => Ok(OnUnhandled::Log),
            "error" => Ok(OnUnhandled::Error),
            other => Err(format!("unknown unhandled-event policy `{other}`")),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum DispatchError {
    /// The registered handler for `event` failed.
    Handler { event: String, source: HandlerError },
    /// No handler registered and the policy is [`OnUnhandled::Error`].
    Unhandled(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Handler { event, source } => {
                write!(f, "handler for `{event}` failed: {source}")
            }
            DispatchError::Unhandled(event) => write!(f, "no handler registered for `{event}`"),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DispatchError::Handler { source, .. } => Some(source),
            DispatchError::Unhandled(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Event-name → handler registry.
pub struct Dispatcher {
    handlers: HashMap<String, Handler>,
    on_unhandled: OnUnhandled,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_policy(OnUnhandled::default())
    }

    pub fn with_policy(on_unhandled: OnUnhandled) -> Self {
        Self {
            handlers: HashMap::new(),
            on_unhandled,
        }
    }

    /// Insert or replace the handler for `name`.
    pub fn register(&mut self, name: impl Into<String>, handler: Handler) {
        self.handlers.insert(name.into(), handler);
    }

    /// Like [`register`](Self::register), but boxes a plain async closure.
    pub fn on<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.register(
            name,
            Box::new(move |event| Box::pin(handler(event)) as HandlerFuture),
        );
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Invoke the handler registered for the event's name, if any.
    ///
    /// Handler failures are returned, not propagated as panics, and never
    /// affect the registry; the caller reports them and moves on to the next
    /// event.
    pub async fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        let Some(handler) = self.handlers.get(&event.name) else {
            return match self.on_unhandled {
                OnUnhandled::Ignore => Ok(()),
                OnUnhandled::Log => {
                    debug!(event = %event.name, "no handler registered");
                    Ok(())
                }
                OnUnhandled::Error => Err(DispatchError::Unhandled(event.name)),
            };
        };

        let name = event.name.clone();
        handler(event)
            .await
            .map_err(|source| DispatchError::Handler {
                event: name,
                source,
            })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("handlers", &names)
            .field("on_unhandled", &self.on_unhandled)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::Value;
    use static_assertions::assert_impl_all;

    assert_impl_all!(Dispatcher: Send, Sync);

    fn counting_handler(hits: Arc<AtomicUsize>) -> impl Fn(Event) -> HandlerFuture {
        move |_event| -> HandlerFuture {
            let hits = Arc::clone(&hits);
            Box::pin(async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn unregistered_event_is_a_silent_no_op() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.on("FOO", counting_handler(Arc::clone(&hits)));

        dispatcher
            .dispatch(Event::new("BAR", Value::Null))
            .await
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_handler_does_not_block_later_events() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.on("FOO", |_event| async {
            Err::<(), HandlerError>(HandlerError::MissingField("whatever"))
        });
        dispatcher.on("BAZ", counting_handler(Arc::clone(&hits)));

        let err = dispatcher
            .dispatch(Event::new("FOO", Value::Null))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Handler { .. }));

        dispatcher
            .dispatch(Event::new("BAZ", Value::Null))
            .await
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn registering_twice_replaces_the_handler() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.on("FOO", counting_handler(Arc::clone(&first)));
        dispatcher.on("FOO", counting_handler(Arc::clone(&second)));

        dispatcher
            .dispatch(Event::new("FOO", Value::Null))
            .await
            .unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_policy_reports_unhandled_events() {
        let dispatcher = Dispatcher::with_policy(OnUnhandled::Error);
        let err = dispatcher
            .dispatch(Event::new("MYSTERY", Value::Null))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Unhandled(name) if name == "MYSTERY"));
    }

    #[tokio::test]
    async fn log_policy_swallows_unhandled_events() {
        let dispatcher = Dispatcher::with_policy(OnUnhandled::Log);
        dispatcher
            .dispatch(Event::new("MYSTERY", Value::Null))
            .await
            .unwrap();
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("ignore".parse(), Ok(OnUnhandled::Ignore));
        assert_eq!("log".parse(), Ok(OnUnhandled::Log));
        assert_eq!("error".parse(), Ok(OnUnhandled::Error));
        assert!("shout".parse::<OnUnhandled>().is_err());
    }

    #[test]
    fn handler_errors_render_their_cause() {
        let err = HandlerError::MissingField("author.id");
        assert!(err.to_string().contains("author.id"));

        let err = DispatchError::Handler {
            event: "MESSAGE_REACTION_ADD".into(),
            source: HandlerError::Timeout(Duration::from_secs(30)),
        };
        assert!(err.to_string().contains("MESSAGE_REACTION_ADD"));
    }
}
