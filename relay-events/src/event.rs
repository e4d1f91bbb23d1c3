//! Event definitions
//!
//! An [`Event`] is a named occurrence carrying an optional subject, a bag of
//! parameters and the mutable result state that dispatch protocols read and
//! write (`processed` flag and return value).

use crate::error::EventError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Object that raised an event.
pub type Subject = dyn Any + Send + Sync;

/// Event parameter bag
pub type Parameters = HashMap<String, Value>;

/// Event identity metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event ID
    pub id: Uuid,

    /// Event name
    pub name: String,

    /// Timestamp when the event was created
    pub timestamp: DateTime<Utc>,

    /// Optional correlation ID shared by a cascade of related events
    pub correlation_id: Option<Uuid>,

    /// Optional causation ID (ID of the event that caused this event)
    pub causation_id: Option<Uuid>,
}

impl EventMetadata {
    /// Create new event metadata
    ///
    /// Fails with [`EventError::InvalidArgument`] when `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, EventError> {
        let name = name.into();
        if name.is_empty() {
            return Err(EventError::InvalidArgument(
                "event name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            timestamp: Utc::now(),
            correlation_id: None,
            causation_id: None,
        })
    }

    /// Set correlation ID
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Set causation ID
    pub fn with_causation_id(mut self, id: Uuid) -> Self {
        self.causation_id = Some(id);
        self
    }
}

/// A named event passed through the dispatcher.
///
/// Listeners receive `&mut Event` and may read or write parameters, set the
/// return value, or mark the event as processed.
///
/// # Examples
///
/// ```rust
/// use relay_events::Event;
/// use serde_json::json;
///
/// let mut event = Event::new("user.change_culture")
///     .unwrap()
///     .with_parameter("culture", "fr");
///
/// assert_eq!(event.get("culture").unwrap(), &json!("fr"));
///
/// event.set_return_value(42);
/// event.set_processed();
/// assert!(event.is_processed());
/// ```
#[derive(Clone)]
pub struct Event {
    metadata: EventMetadata,
    subject: Option<Weak<Subject>>,
    parameters: Parameters,
    processed: bool,
    return_value: Option<Value>,
}

impl Event {
    /// Create an event without a subject.
    pub fn new(name: impl Into<String>) -> Result<Self, EventError> {
        Ok(Self {
            metadata: EventMetadata::new(name)?,
            subject: None,
            parameters: Parameters::new(),
            processed: false,
            return_value: None,
        })
    }

    /// Create an event raised by `subject`.
    ///
    /// Only a weak reference is kept, so the event never extends the
    /// subject's lifetime.
    pub fn for_subject<T>(subject: &Arc<T>, name: impl Into<String>) -> Result<Self, EventError>
    where
        T: Any + Send + Sync,
    {
        let weak: Weak<T> = Arc::downgrade(subject);
        let weak: Weak<Subject> = weak;
        let mut event = Self::new(name)?;
        event.subject = Some(weak);
        Ok(event)
    }

    /// Replace the parameter bag.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Add a single parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Set correlation ID
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.metadata = self.metadata.with_correlation_id(id);
        self
    }

    /// Set causation ID
    pub fn with_causation_id(mut self, id: Uuid) -> Self {
        self.metadata = self.metadata.with_causation_id(id);
        self
    }

    /// Create a follow-up event caused by this one.
    ///
    /// The new event shares this event's subject and correlation ID (or uses
    /// this event's ID as correlation root) and records this event as cause.
    pub fn caused_event(&self, name: impl Into<String>) -> Result<Self, EventError> {
        let mut event = Self::new(name)?
            .with_correlation_id(self.metadata.correlation_id.unwrap_or(self.metadata.id))
            .with_causation_id(self.metadata.id);
        event.subject = self.subject.clone();
        Ok(event)
    }

    /// Event name
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Unique event ID
    pub fn id(&self) -> Uuid {
        self.metadata.id
    }

    /// Creation timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.metadata.timestamp
    }

    /// Identity metadata
    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    /// The subject, if one was given and it is still alive.
    pub fn subject(&self) -> Option<Arc<Subject>> {
        self.subject.as_ref().and_then(Weak::upgrade)
    }

    /// The subject downcast to a concrete type.
    pub fn subject_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.subject().and_then(|s| s.downcast::<T>().ok())
    }

    /// All parameters
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Mutable access to the parameter bag
    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    /// Read a parameter.
    ///
    /// Fails with [`EventError::KeyNotFound`] when the key is missing.
    pub fn get(&self, key: &str) -> Result<&Value, EventError> {
        self.parameters
            .get(key)
            .ok_or_else(|| EventError::KeyNotFound(key.to_string()))
    }

    /// Read a parameter and deserialize it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, EventError> {
        let value = self.get(key)?;
        T::deserialize(value).map_err(|source| EventError::InvalidParameter {
            key: key.to_string(),
            source,
        })
    }

    /// Write a parameter, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.parameters.insert(key.into(), value.into())
    }

    /// Whether a parameter exists
    pub fn has(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    /// Remove a parameter, returning its value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.parameters.remove(key)
    }

    /// Set the return value, replacing any previous one
    pub fn set_return_value(&mut self, value: impl Into<Value>) {
        self.return_value = Some(value.into());
    }

    /// The return value, `None` while unset.
    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    /// Take the return value, leaving it unset
    pub fn take_return_value(&mut self) -> Option<Value> {
        self.return_value.take()
    }

    /// Mark the event as handled. Calling it again has no effect.
    pub fn set_processed(&mut self) {
        self.processed = true;
    }

    /// Whether a listener marked the event as handled
    pub fn is_processed(&self) -> bool {
        self.processed
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("metadata", &self.metadata)
            .field("has_subject", &self.subject().is_some())
            .field("parameters", &self.parameters)
            .field("processed", &self.processed)
            .field("return_value", &self.return_value)
            .finish()
    }
}
