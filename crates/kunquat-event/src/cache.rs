//! The event cache: stores the most recently seen value per event name,
//! so a bind predicate can read "what did event X last carry" in O(1).
//!
//! Grounded in `Bind.c`'s per-trigger `Cblist` walk: [`Bind::create_cache`]
//! pre-registers every predicate event name once at load, so dispatch-time
//! lookups never allocate.

use std::collections::HashMap;

use crate::value::Value;

/// Last-value-per-name cache. Pre-registered names read as `None` until
/// their first update.
#[derive(Debug, Default, Clone)]
pub struct EventCache {
    values: HashMap<String, Option<Value>>,
}

impl EventCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` with no value yet, if not already present. Called
    /// once per predicate event name while walking a [`crate::bind::Bind`].
    pub fn register(&mut self, name: &str) {
        self.values.entry(name.to_string()).or_insert(None);
    }

    /// Records `value` as the most recent value seen for `name`, whether
    /// or not it was pre-registered.
    pub fn update(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), Some(value));
    }

    /// The most recently recorded value for `name`, if any update has
    /// occurred (and the name is known to the cache).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).and_then(|v| v.as_ref())
    }

    /// Number of distinct names the cache tracks.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the cache tracks no names at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_name_reads_as_none_until_updated() {
        let mut cache = EventCache::new();
        cache.register("c.v");
        assert!(cache.get("c.v").is_none());
        cache.update("c.v", Value::Float(0.5));
        assert_eq!(cache.get("c.v"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn unregistered_name_reads_as_none() {
        let cache = EventCache::new();
        assert!(cache.get("anything").is_none());
    }

    #[test]
    fn update_without_prior_registration_still_records() {
        let mut cache = EventCache::new();
        cache.update("x", Value::Int(1));
        assert_eq!(cache.get("x"), Some(&Value::Int(1)));
    }
}
