//! Flat key → argument map; the single source of truth for current values.

use crate::arg::{Arg, ArgKind};
use crate::value::Value;
use std::collections::HashMap;

/// Arguments keyed by their fully-qualified, underscore-joined key.
#[derive(Debug, Default)]
pub struct Registry {
    args: HashMap<String, Arg>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Arg> {
        self.args.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Arg> {
        self.args.get_mut(key)
    }

    /// Insert `arg` under `key`.
    ///
    /// A key that is already present is replaced (last registration wins) and
    /// the previous argument is returned.
    pub fn insert(&mut self, key: impl Into<String>, arg: Arg) -> Option<Arg> {
        let key = key.into();
        let previous = self.args.insert(key.clone(), arg);
        if previous.is_some() {
            tracing::debug!(key = %key, "registry key registered twice, keeping the latest");
        }
        previous
    }

    pub fn contains(&self, key: &str) -> bool {
        self.args.contains_key(key)
    }

    pub fn kind(&self, key: &str) -> Option<ArgKind> {
        self.args.get(key).map(Arg::kind)
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.args.get(key).map(Arg::value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.args.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}
