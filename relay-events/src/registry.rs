//! Listener registry

use crate::listener::Listener;
use dashmap::DashMap;

/// Maps event names to listener chains in connection order.
///
/// Reads hand out owned snapshots, so a dispatch never holds a shard lock
/// while listeners run and concurrent `connect`/`disconnect` calls cannot
/// disturb a chain that is being iterated.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    chains: DashMap<String, Vec<Listener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `listener` to the chain for `event_name`.
    ///
    /// Connecting the same handle twice yields two entries.
    pub fn connect(&self, event_name: &str, listener: Listener) {
        self.chains
            .entry(event_name.to_string())
            .or_default()
            .push(listener);
    }

    /// Remove the first entry identical to `listener`.
    ///
    /// Returns `false` (and changes nothing) when no such entry exists.
    pub fn disconnect(&self, event_name: &str, listener: &Listener) -> bool {
        let removed = match self.chains.get_mut(event_name) {
            Some(mut chain) => match chain.iter().position(|l| l.same_as(listener)) {
                Some(pos) => {
                    chain.remove(pos);
                    true
                }
                None => false,
            },
            None => false,
        };

        if removed {
            self.chains.remove_if(event_name, |_, chain| chain.is_empty());
        }
        removed
    }

    /// Remove every listener for `event_name`, returning how many were removed.
    pub fn disconnect_all(&self, event_name: &str) -> usize {
        self.chains
            .remove(event_name)
            .map(|(_, chain)| chain.len())
            .unwrap_or(0)
    }

    pub fn has_listeners(&self, event_name: &str) -> bool {
        self.listener_count(event_name) > 0
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        self.chains.get(event_name).map(|c| c.len()).unwrap_or(0)
    }

    /// Snapshot of the chain for `event_name` in connection order.
    pub fn listeners_for(&self, event_name: &str) -> Vec<Listener> {
        self.chains
            .get(event_name)
            .map(|chain| chain.clone())
            .unwrap_or_default()
    }

    /// Names of all events with at least one listener, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .chains
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.chains.clear();
    }
}
