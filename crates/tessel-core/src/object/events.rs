//! Per-object event listeners

use super::Object;
use crate::value::Value;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Event callback
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by [`Object::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A dispatched event
#[derive(Debug, Clone)]
pub struct Event {
    kind: String,
    target: Object,
    value: Option<Value>,
    old_value: Option<Value>,
}

impl Event {
    pub(crate) fn new(kind: &str, target: Object, value: Option<Value>, old_value: Option<Value>) -> Self {
        Self {
            kind: kind.to_string(),
            target,
            value,
            old_value,
        }
    }

    /// Event name
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Object that fired the event
    pub fn target(&self) -> &Object {
        &self.target
    }

    /// Payload of a data event (the new value for property changes)
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Previous value for property changes
    pub fn old_value(&self) -> Option<&Value> {
        self.old_value.as_ref()
    }
}

/// Listener table of one object
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    by_event: FxHashMap<String, Vec<(ListenerId, Listener)>>,
}

impl Listeners {
    pub(crate) fn add(&mut self, event: &str, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.by_event
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        for list in self.by_event.values_mut() {
            if let Some(pos) = list.iter().position(|(lid, _)| *lid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Listeners of an event, in registration order
    pub(crate) fn snapshot(&self, event: &str) -> Vec<Listener> {
        self.by_event
            .get(event)
            .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.by_event.get(event).map_or(0, Vec::len)
    }

    pub(crate) fn clear(&mut self) {
        self.by_event.clear();
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: FxHashMap<&str, usize> = self
            .by_event
            .iter()
            .map(|(event, list)| (event.as_str(), list.len()))
            .collect();
        f.debug_struct("Listeners").field("events", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove() {
        let mut listeners = Listeners::default();
        let first = listeners.add("change", Arc::new(|_| {}));
        let second = listeners.add("change", Arc::new(|_| {}));
        listeners.add("close", Arc::new(|_| {}));
        assert_ne!(first, second);
        assert_eq!(listeners.count("change"), 2);

        assert!(listeners.remove(first));
        assert!(!listeners.remove(first));
        assert_eq!(listeners.snapshot("change").len(), 1);

        listeners.clear();
        assert_eq!(listeners.count("close"), 0);
    }
}
