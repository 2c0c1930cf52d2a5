//! Hierarchical mirror of the registry.
//!
//! Branches stand for registered or nested structs, leaves for scalar fields.
//! Child order is declaration order and is the order used for printing and
//! for document export.

use serde_json::{Map, Value as Json};

/// One node of the argument tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgTree {
    key: String,
    value: String,
    children: Vec<ArgTree>,
}

impl ArgTree {
    /// A node with local key segment `key` and default snapshot `value`.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            children: Vec::new(),
        }
    }

    pub fn append_child(&mut self, child: ArgTree) {
        self.children.push(child);
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn children(&self) -> &[ArgTree] {
        &self.children
    }

    /// A node without children, whatever it was built as.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Visit every leaf depth-first with its fully-qualified key.
    ///
    /// Empty key segments (the unnamed root) do not contribute to the key.
    pub fn walk_leaves<'a>(&'a self, visit: &mut dyn FnMut(String, &'a ArgTree)) {
        let mut prefix = Vec::new();
        self.walk(&mut prefix, visit);
    }

    fn walk<'a>(&'a self, prefix: &mut Vec<&'a str>, visit: &mut dyn FnMut(String, &'a ArgTree)) {
        if self.is_leaf() {
            let mut parts = prefix.clone();
            parts.push(&self.key);
            visit(parts.join("_"), self);
            return;
        }
        let pushed = !self.key.is_empty();
        if pushed {
            prefix.push(&self.key);
        }
        for child in &self.children {
            child.walk(prefix, visit);
        }
        if pushed {
            prefix.pop();
        }
    }

    /// Fully-qualified keys of every leaf, in tree order.
    pub fn leaf_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.walk_leaves(&mut |key, _| keys.push(key));
        keys
    }

    /// Export the children of this node as a nested mapping of default values.
    ///
    /// Branches become nested objects keyed by their segment, leaves become
    /// string entries holding their default snapshot.
    pub fn to_document(&self) -> Json {
        let mut map = Map::new();
        for child in &self.children {
            if child.is_leaf() {
                map.insert(child.key.clone(), Json::String(child.value.clone()));
            } else {
                map.insert(child.key.clone(), child.to_document());
            }
        }
        Json::Object(map)
    }
}
