//! Synchronous event dispatching for Relay
//!
//! This crate provides an in-process registry of named events and the
//! listeners connected to them, plus three ways of dispatching an event.
//!
//! ## Features
//!
//! - **Broadcast** - `notify` runs every listener in connection order
//! - **Short-circuit** - `notify_until` stops at the first listener that handles the event
//! - **Filter** - `filter` threads a value through every listener
//! - **Snapshot dispatch** - connecting or disconnecting during a dispatch never
//!   disturbs the chain being iterated
//! - **No global state** - every `Dispatcher` is an independent instance
//!
//! ## Quick Start
//!
//! ```rust
//! use relay_events::*;
//! use std::sync::Arc;
//!
//! struct User;
//!
//! let dispatcher = Dispatcher::new();
//!
//! dispatcher.connect(
//!     "user.change_culture",
//!     Listener::notify(|event| {
//!         assert_eq!(event.get("culture")?, "fr");
//!         Ok(())
//!     }),
//! );
//!
//! let user = Arc::new(User);
//! let mut event = Event::for_subject(&user, "user.change_culture")
//!     .unwrap()
//!     .with_parameter("culture", "fr");
//!
//! dispatcher.notify(&mut event).unwrap();
//! ```
//!
//! ## Handling Unknown Calls
//!
//! ```rust,ignore
//! dispatcher.connect("foo.method_is_not_found", Listener::until(|event| {
//!     if event.get("method")? != "bar" {
//!         return Ok(false);
//!     }
//!     event.set_return_value(42);
//!     Ok(true)
//! }));
//!
//! if dispatcher.notify_until(&mut event)? {
//!     println!("handled: {:?}", event.return_value());
//! }
//! ```
//!
//! ## Filtering
//!
//! ```rust,ignore
//! dispatcher.connect("post.content", Listener::filter(|_, value| {
//!     Ok(value.as_str().unwrap_or_default().trim().into())
//! }));
//!
//! let content = dispatcher.filter(&mut event, "  hello  ")?;
//! assert_eq!(event.return_value(), Some(&content));
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! let dispatcher = DispatcherBuilder::new()
//!     .enable_logging(true)      // tracing output for connections and dispatches
//!     .warn_on_unheard(true)     // warn when nobody listens
//!     .build();
//!
//! // or from RELAY_EVENTS_LOG / RELAY_EVENTS_WARN_UNHEARD
//! let dispatcher = DispatcherBuilder::from_env().build();
//! ```
//!
//! ## Error Handling
//!
//! Listener errors are never swallowed; the first one aborts the dispatch.
//!
//! ```rust,ignore
//! match dispatcher.notify(&mut event) {
//!     Ok(()) => {}
//!     Err(DispatchError::ListenerFailed { position, source, .. }) => {
//!         eprintln!("listener #{position} failed: {source}");
//!     }
//!     Err(e) => eprintln!("dispatch error: {e}"),
//! }
//! ```

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod listener;
pub mod registry;

pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::{DispatchError, EventError, ListenerError};
pub use event::{Event, EventMetadata, Parameters, Subject};
pub use listener::{Listener, ListenerKind, ListenerResult, Protocol};
pub use registry::ListenerRegistry;
