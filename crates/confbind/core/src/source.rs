//! The capability every configuration source provides, plus an in-memory source.

use crate::arg::ArgKind;
use crate::error::ConfError;
use crate::registry::Registry;
use crate::tree::ArgTree;
use crate::value::Value;
use indexmap::IndexMap;
use std::ops::ControlFlow;

/// What a source may look at while parsing.
///
/// Flag scanning needs to know which keys are booleans, and file generation
/// needs the tree of defaults; neither may mutate shared state.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    registry: &'a Registry,
    tree: &'a ArgTree,
}

impl<'a> SourceContext<'a> {
    pub fn new(registry: &'a Registry, tree: &'a ArgTree) -> Self {
        Self { registry, tree }
    }

    /// Kind of the argument registered under `key`, if any.
    pub fn kind_of(&self, key: &str) -> Option<ArgKind> {
        self.registry.kind(key)
    }

    /// Current value of the argument registered under `key`.
    pub fn value(&self, key: &str) -> Option<Value> {
        self.registry.value(key)
    }

    pub fn tree(&self) -> &'a ArgTree {
        self.tree
    }
}

/// A provider of configuration values.
///
/// The binder calls [`parse`](Source::parse) once per pass and then visits
/// every pair through [`range`](Source::range). `range` must honour an early
/// [`ControlFlow::Break`] and must not disturb later `parse`/`range` calls.
pub trait Source {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Populate the source's own key/value set from its medium.
    ///
    /// Pairs collected before a failure stay visible to `range`.
    fn parse(&mut self, ctx: &SourceContext<'_>) -> Result<(), ConfError>;

    /// Visit every pair until `visit` breaks.
    fn range(&self, visit: &mut dyn FnMut(&str, &Value) -> ControlFlow<()>);

    /// Point lookup into the source's own state.
    fn get(&self, key: &str) -> Option<&Value>;
}

/// Insertion-ordered key/value store backing the bundled sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KvStore {
    entries: IndexMap<String, Value>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Store `value` under `key`; a repeated key keeps its first position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn range(&self, visit: &mut dyn FnMut(&str, &Value) -> ControlFlow<()>) {
        for (key, value) in &self.entries {
            if visit(key, value).is_break() {
                break;
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for KvStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = KvStore::new();
        for (k, v) in iter {
            store.set(k, v);
        }
        store
    }
}

/// Programmatic overrides held in memory.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    name: String,
    values: KvStore,
}

impl MapSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: KvStore::new(),
        }
    }

    /// Add a pair, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.set(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.set(key, value);
    }
}

impl Source for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&mut self, _ctx: &SourceContext<'_>) -> Result<(), ConfError> {
        Ok(())
    }

    fn range(&self, visit: &mut dyn FnMut(&str, &Value) -> ControlFlow<()>) {
        self.values.range(visit);
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_stops_on_break_and_restarts() {
        let store: KvStore = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();

        let mut seen = Vec::new();
        store.range(&mut |k, _| {
            seen.push(k.to_string());
            if k == "b" {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(seen, vec!["a", "b"]);

        let mut count = 0;
        store.range(&mut |_, _| {
            count += 1;
            ControlFlow::Continue(())
        });
        assert_eq!(count, 3);
    }

    #[test]
    fn test_set_keeps_first_position() {
        let mut store = KvStore::new();
        store.set("x", 1);
        store.set("y", 2);
        store.set("x", 3);

        let mut keys = Vec::new();
        store.range(&mut |k, _| {
            keys.push(k.to_string());
            ControlFlow::Continue(())
        });
        assert_eq!(keys, vec!["x", "y"]);
        assert_eq!(store.get("x"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_map_source_lookup() {
        let source = MapSource::new("overrides").with("t_name", "svc");
        assert_eq!(source.name(), "overrides");
        assert_eq!(source.get("t_name"), Some(&Value::from("svc")));
        assert!(source.get("t_other").is_none());
    }
}
