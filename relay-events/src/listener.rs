//! Listener handles
//!
//! A [`Listener`] is a closed set of callable shapes, one per dispatch
//! protocol. Handles are reference counted; clones share identity, which is
//! what [`Dispatcher::disconnect`](crate::Dispatcher::disconnect) matches on.

use crate::error::{DispatchError, ListenerError};
use crate::event::Event;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Result returned by listener callables
pub type ListenerResult<T> = Result<T, ListenerError>;

type NotifyFn = dyn Fn(&mut Event) -> ListenerResult<()> + Send + Sync;
type UntilFn = dyn Fn(&mut Event) -> ListenerResult<bool> + Send + Sync;
type FilterFn = dyn Fn(&mut Event, Value) -> ListenerResult<Value> + Send + Sync;

/// A registered event listener.
///
/// # Examples
///
/// ```rust
/// use relay_events::{Listener, ListenerKind};
///
/// let log = Listener::notify(|event| {
///     println!("saw {}", event.name());
///     Ok(())
/// });
/// let same = log.clone();
///
/// assert_eq!(log.kind(), ListenerKind::Notify);
/// assert!(log.same_as(&same));
/// ```
#[derive(Clone)]
pub enum Listener {
    /// Reacts to an event, returns nothing.
    Notify(Arc<NotifyFn>),

    /// Returns `true` when it handled the event.
    Until(Arc<UntilFn>),

    /// Receives the current value and returns the next one.
    Filter(Arc<FilterFn>),
}

impl Listener {
    /// Wrap a broadcast callable
    pub fn notify<F>(f: F) -> Self
    where
        F: Fn(&mut Event) -> ListenerResult<()> + Send + Sync + 'static,
    {
        Listener::Notify(Arc::new(f))
    }

    /// Wrap a callable that reports whether it handled the event
    pub fn until<F>(f: F) -> Self
    where
        F: Fn(&mut Event) -> ListenerResult<bool> + Send + Sync + 'static,
    {
        Listener::Until(Arc::new(f))
    }

    /// Wrap a callable that maps the current value to the next one
    pub fn filter<F>(f: F) -> Self
    where
        F: Fn(&mut Event, Value) -> ListenerResult<Value> + Send + Sync + 'static,
    {
        Listener::Filter(Arc::new(f))
    }

    /// Shape of this listener
    pub fn kind(&self) -> ListenerKind {
        match self {
            Listener::Notify(_) => ListenerKind::Notify,
            Listener::Until(_) => ListenerKind::Until,
            Listener::Filter(_) => ListenerKind::Filter,
        }
    }

    /// Identity comparison: true only for clones of the same handle.
    pub fn same_as(&self, other: &Listener) -> bool {
        match (self, other) {
            (Listener::Notify(a), Listener::Notify(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Listener::Until(a), Listener::Until(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Listener::Filter(a), Listener::Filter(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }

    fn address(&self) -> *const () {
        match self {
            Listener::Notify(f) => Arc::as_ptr(f) as *const (),
            Listener::Until(f) => Arc::as_ptr(f) as *const (),
            Listener::Filter(f) => Arc::as_ptr(f) as *const (),
        }
    }

    fn mismatch(&self, event: &Event, position: usize, protocol: Protocol) -> DispatchError {
        DispatchError::InvalidListener {
            event: event.name().to_string(),
            position,
            protocol,
            kind: self.kind(),
        }
    }

    /// Rejects listeners whose shape the protocol does not accept.
    fn ensure(&self, event: &Event, position: usize, protocol: Protocol) -> Result<(), DispatchError> {
        if protocol.accepts(self.kind()) {
            Ok(())
        } else {
            Err(self.mismatch(event, position, protocol))
        }
    }

    fn failed(event: &Event, position: usize, source: ListenerError) -> DispatchError {
        DispatchError::ListenerFailed {
            event: event.name().to_string(),
            position,
            source,
        }
    }

    /// Invoke under the broadcast protocol. Boolean results are ignored.
    pub(crate) fn call_notify(&self, event: &mut Event, position: usize) -> Result<(), DispatchError> {
        self.ensure(event, position, Protocol::Notify)?;
        let outcome = match self {
            Listener::Notify(f) => f(event),
            Listener::Until(f) => f(event).map(drop),
            Listener::Filter(_) => return Err(self.mismatch(event, position, Protocol::Notify)),
        };
        outcome.map_err(|source| Self::failed(event, position, source))
    }

    pub(crate) fn call_until(&self, event: &mut Event, position: usize) -> Result<bool, DispatchError> {
        self.ensure(event, position, Protocol::NotifyUntil)?;
        match self {
            Listener::Until(f) => f(event).map_err(|source| Self::failed(event, position, source)),
            _ => Err(self.mismatch(event, position, Protocol::NotifyUntil)),
        }
    }

    pub(crate) fn call_filter(
        &self,
        event: &mut Event,
        position: usize,
        value: Value,
    ) -> Result<Value, DispatchError> {
        self.ensure(event, position, Protocol::Filter)?;
        match self {
            Listener::Filter(f) => {
                f(event, value).map_err(|source| Self::failed(event, position, source))
            }
            _ => Err(self.mismatch(event, position, Protocol::Filter)),
        }
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("kind", &self.kind())
            .field("address", &self.address())
            .finish()
    }
}

/// Shape of a listener callable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Notify,
    Until,
    Filter,
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListenerKind::Notify => "notify",
            ListenerKind::Until => "until",
            ListenerKind::Filter => "filter",
        })
    }
}

/// Dispatch protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Every listener, return values ignored
    Notify,

    /// Stop at the first listener returning `true`
    NotifyUntil,

    /// Thread a value through every listener
    Filter,
}

impl Protocol {
    /// Whether a listener of `kind` can be invoked under this protocol.
    pub fn accepts(&self, kind: ListenerKind) -> bool {
        matches!(
            (self, kind),
            (Protocol::Notify, ListenerKind::Notify | ListenerKind::Until)
                | (Protocol::NotifyUntil, ListenerKind::Until)
                | (Protocol::Filter, ListenerKind::Filter)
        )
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Notify => "notify",
            Protocol::NotifyUntil => "notify_until",
            Protocol::Filter => "filter",
        })
    }
}
