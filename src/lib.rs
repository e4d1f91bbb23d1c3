// Relay - a synchronous, in-process event dispatcher
//
// This library connects listeners to named events and dispatches events to
// them with broadcast, short-circuit and filter semantics.

// Re-export core functionality
pub use relay_events::*;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        DispatchError,
        Dispatcher,
        DispatcherBuilder,
        DispatcherConfig,
        Event,
        EventError,
        Listener,
        ListenerError,
        ListenerResult,
    };
    pub use serde_json::{Value, json};
}
