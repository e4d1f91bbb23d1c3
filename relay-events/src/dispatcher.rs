//! Event dispatcher implementation

use crate::error::DispatchError;
use crate::event::Event;
use crate::listener::Listener;
use crate::registry::ListenerRegistry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Environment variable toggling dispatch logging
pub const LOG_ENV: &str = "RELAY_EVENTS_LOG";

/// Environment variable toggling warnings for events nobody listens to
pub const WARN_UNHEARD_ENV: &str = "RELAY_EVENTS_WARN_UNHEARD";

/// Synchronous event dispatcher.
///
/// Listeners run on the caller's thread, one at a time, in connection order.
/// Cloning a `Dispatcher` shares its registry; separately constructed
/// dispatchers are fully independent.
#[derive(Clone)]
pub struct Dispatcher {
    /// Listener chains keyed by event name
    registry: Arc<ListenerRegistry>,

    /// Configuration
    config: Arc<DispatcherConfig>,
}

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Emit `tracing` output for connections and dispatches
    pub enable_logging: bool,

    /// Warn when an event is dispatched with no listeners
    pub warn_on_unheard: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            warn_on_unheard: false,
        }
    }
}

impl DispatcherConfig {
    /// Load configuration from `RELAY_EVENTS_LOG` and `RELAY_EVENTS_WARN_UNHEARD`.
    ///
    /// Unset or unrecognised values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            enable_logging: lookup(LOG_ENV)
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.enable_logging),
            warn_on_unheard: lookup(WARN_UNHEARD_ENV)
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.warn_on_unheard),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Dispatcher {
    /// Create new dispatcher
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create dispatcher with custom config
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            registry: Arc::new(ListenerRegistry::new()),
            config: Arc::new(config),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Underlying listener registry
    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    /// Connect a listener to an event name
    ///
    /// # Examples
    ///
    /// ```rust
    /// use relay_events::{Dispatcher, Listener};
    ///
    /// let dispatcher = Dispatcher::new();
    /// dispatcher.connect("user.created", Listener::notify(|_| Ok(())));
    /// assert!(dispatcher.has_listeners("user.created"));
    /// ```
    pub fn connect(&self, event_name: &str, listener: Listener) {
        if self.config.enable_logging {
            debug!(event = event_name, kind = %listener.kind(), "Connected listener");
        }
        self.registry.connect(event_name, listener);
    }

    /// Disconnect a listener. Unknown listeners are ignored.
    pub fn disconnect(&self, event_name: &str, listener: &Listener) -> bool {
        let removed = self.registry.disconnect(event_name, listener);
        if removed && self.config.enable_logging {
            debug!(event = event_name, kind = %listener.kind(), "Disconnected listener");
        }
        removed
    }

    /// Disconnect all listeners for an event name
    pub fn disconnect_all(&self, event_name: &str) -> usize {
        let removed = self.registry.disconnect_all(event_name);
        if self.config.enable_logging {
            debug!(event = event_name, removed, "Disconnected all listeners");
        }
        removed
    }

    /// Whether any listener is connected to `event_name`
    pub fn has_listeners(&self, event_name: &str) -> bool {
        self.registry.has_listeners(event_name)
    }

    /// Number of listeners connected to `event_name`
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.registry.listener_count(event_name)
    }

    /// Snapshot of the listeners connected to `event_name`
    pub fn listeners(&self, event_name: &str) -> Vec<Listener> {
        self.registry.listeners_for(event_name)
    }

    /// Clear all listeners
    pub fn clear(&self) {
        self.registry.clear();
        if self.config.enable_logging {
            debug!("Cleared all event listeners");
        }
    }

    /// Invoke every listener for the event, ignoring their results.
    ///
    /// The first listener error aborts the remaining chain and is returned.
    pub fn notify(&self, event: &mut Event) -> Result<(), DispatchError> {
        let listeners = self.snapshot(event);

        for (position, listener) in listeners.iter().enumerate() {
            self.trace_call(event, position, listener);
            listener
                .call_notify(event, position)
                .inspect_err(|e| self.log_failure(e))?;
        }

        Ok(())
    }

    /// Invoke listeners until one returns `true` or marks the event processed.
    ///
    /// The event is then marked processed and the remaining listeners are
    /// skipped. An event that is already processed reaches no listener.
    /// Returns whether the event is processed afterwards.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use relay_events::{Dispatcher, Event, Listener};
    ///
    /// let dispatcher = Dispatcher::new();
    /// dispatcher.connect(
    ///     "foo.method_is_not_found",
    ///     Listener::until(|event| {
    ///         if event.get("method")? != "bar" {
    ///             return Ok(false);
    ///         }
    ///         event.set_return_value(42);
    ///         Ok(true)
    ///     }),
    /// );
    ///
    /// let mut event = Event::new("foo.method_is_not_found")
    ///     .unwrap()
    ///     .with_parameter("method", "bar");
    ///
    /// assert!(dispatcher.notify_until(&mut event).unwrap());
    /// assert_eq!(event.return_value().unwrap(), 42);
    /// ```
    pub fn notify_until(&self, event: &mut Event) -> Result<bool, DispatchError> {
        if event.is_processed() {
            if self.config.enable_logging {
                debug!(event = event.name(), id = %event.id(), "Event already processed");
            }
            return Ok(true);
        }

        let listeners = self.snapshot(event);

        for (position, listener) in listeners.iter().enumerate() {
            self.trace_call(event, position, listener);
            let handled = listener
                .call_until(event, position)
                .inspect_err(|e| self.log_failure(e))?;

            if handled || event.is_processed() {
                event.set_processed();
                if self.config.enable_logging {
                    debug!(
                        event = event.name(),
                        id = %event.id(),
                        position,
                        "Event processed, skipping remaining listeners"
                    );
                }
                break;
            }
        }

        Ok(event.is_processed())
    }

    /// Thread `value` through every listener and return the result.
    ///
    /// The final value is also stored as the event's return value. With no
    /// listeners the initial value comes back unchanged.
    pub fn filter(&self, event: &mut Event, value: impl Into<Value>) -> Result<Value, DispatchError> {
        let listeners = self.snapshot(event);
        let mut value = value.into();

        for (position, listener) in listeners.iter().enumerate() {
            self.trace_call(event, position, listener);
            value = listener
                .call_filter(event, position, value)
                .inspect_err(|e| self.log_failure(e))?;
        }

        event.set_return_value(value.clone());
        Ok(value)
    }

    /// Typed variant of [`filter`](Self::filter).
    ///
    /// The value is converted to JSON before the pipeline runs and back into
    /// `T` afterwards.
    pub fn filter_as<T>(&self, event: &mut Event, value: T) -> Result<T, DispatchError>
    where
        T: Serialize + DeserializeOwned,
    {
        let value = serde_json::to_value(value)?;
        let filtered = self.filter(event, value)?;
        Ok(serde_json::from_value(filtered)?)
    }

    fn snapshot(&self, event: &Event) -> Vec<Listener> {
        let listeners = self.registry.listeners_for(event.name());

        if self.config.enable_logging {
            if listeners.is_empty() && self.config.warn_on_unheard {
                warn!(event = event.name(), id = %event.id(), "No listeners connected for event");
            } else {
                debug!(
                    event = event.name(),
                    id = %event.id(),
                    listeners = listeners.len(),
                    "Dispatching event"
                );
            }
        }

        listeners
    }

    fn trace_call(&self, event: &Event, position: usize, listener: &Listener) {
        if self.config.enable_logging {
            trace!(event = event.name(), position, kind = %listener.kind(), "Invoking listener");
        }
    }

    fn log_failure(&self, err: &DispatchError) {
        if self.config.enable_logging {
            error!(label = err.as_label(), "Dispatch aborted: {}", err);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatcher builder
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    /// Create new dispatcher builder
    pub fn new() -> Self {
        Self {
            config: DispatcherConfig::default(),
        }
    }

    /// Start from environment-derived configuration
    pub fn from_env() -> Self {
        Self {
            config: DispatcherConfig::from_env(),
        }
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Enable/disable warnings for events without listeners
    pub fn warn_on_unheard(mut self, enabled: bool) -> Self {
        self.config.warn_on_unheard = enabled;
        self
    }

    /// Build the dispatcher
    pub fn build(self) -> Dispatcher {
        Dispatcher::with_config(self.config)
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
