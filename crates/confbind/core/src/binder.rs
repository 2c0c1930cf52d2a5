//! The binding facade.
//!
//! A [`Binder`] owns the registry, the argument tree and the ordered source
//! list. Structures and sources are registered first; [`Binder::parse`] then
//! builds the schema for every structure before merging any source.

use crate::arg::Arg;
use crate::error::{ConfError, ParseError};
use crate::lens::Bound;
use crate::merge::{MergeOutcome, merge_source};
use crate::registry::Registry;
use crate::schema::{Configurable, SchemaBuilder};
use crate::source::{Source, SourceContext};
use crate::tree::ArgTree;
use crate::value::Value;
use std::fmt;

/// One printed configuration entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: Value,
    pub default: String,
    pub usage: String,
}

impl fmt::Display for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "-{}:{}, default:{}, usage:{}",
            self.key, self.value, self.default, self.usage
        )
    }
}

/// What the result handler is called with.
#[derive(Debug, Clone, Copy)]
pub enum ParseResult<'a> {
    Failed(&'a ParseError),
    Succeeded(&'a [ConfigEntry]),
}

/// Receives parse failures and printed results.
pub type ResultHandler = Box<dyn Fn(ParseResult<'_>)>;

/// Logs failures and prints entries to stdout.
///
/// Terminating the process is left to the caller, which receives the same
/// error from [`Binder::parse`].
pub fn default_result_handler(result: ParseResult<'_>) {
    match result {
        ParseResult::Failed(err) => tracing::error!("{err}"),
        ParseResult::Succeeded(entries) => {
            for entry in entries {
                println!("{entry}");
            }
        }
    }
}

/// A structure waiting for its schema to be built.
trait PendingConf {
    fn build(&self, builder: &mut SchemaBuilder<'_>) -> ArgTree;
}

/// Binds sources onto registered configuration structures.
pub struct Binder {
    services: Vec<Box<dyn PendingConf>>,
    sources: Vec<Box<dyn Source>>,
    registry: Registry,
    tree: ArgTree,
    handler: ResultHandler,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("pending", &self.services.len())
            .field("sources", &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("registry", &self.registry)
            .field("tree", &self.tree)
            .finish_non_exhaustive()
    }
}

impl Binder {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> BinderBuilder {
        BinderBuilder::default()
    }

    /// Register a structure under the normalised form of its type name.
    ///
    /// The binder takes ownership; the returned handle shares it.
    pub fn register_conf<T: Configurable>(&mut self, conf: T) -> Bound<T> {
        self.enqueue(None, Bound::new(conf))
    }

    /// Register a structure under `name`; an empty name falls back to the type name.
    pub fn register_conf_with_name<T: Configurable>(
        &mut self,
        name: impl Into<String>,
        conf: T,
    ) -> Bound<T> {
        self.enqueue(Some(name.into()), Bound::new(conf))
    }

    /// Register a structure that is already behind a shared handle.
    pub fn register_bound<T: Configurable>(&mut self, conf: &Bound<T>) {
        self.enqueue(None, conf.clone());
    }

    /// Register a shared structure under `name`.
    pub fn register_bound_with_name<T: Configurable>(
        &mut self,
        name: impl Into<String>,
        conf: &Bound<T>,
    ) {
        self.enqueue(Some(name.into()), conf.clone());
    }

    fn enqueue<T: Configurable>(&mut self, name: Option<String>, conf: Bound<T>) -> Bound<T> {
        struct Service<T> {
            name: Option<String>,
            conf: Bound<T>,
        }

        impl<T: Configurable> PendingConf for Service<T> {
            fn build(&self, builder: &mut SchemaBuilder<'_>) -> ArgTree {
                builder.build(self.name.as_deref(), &self.conf)
            }
        }

        self.services.push(Box::new(Service {
            name,
            conf: conf.clone(),
        }));
        conf
    }

    /// Append a source; earlier sources take priority.
    pub fn register_source(&mut self, source: impl Source + 'static) {
        self.sources.push(Box::new(source));
    }

    /// Build the schema of every pending structure, then merge every source.
    ///
    /// All failures are collected; if there are any, the result handler sees
    /// them and they are returned. Values that could be applied stay applied.
    pub fn parse(&mut self) -> Result<(), ParseError> {
        let mut errors = Vec::new();

        let services = std::mem::take(&mut self.services);
        let mut builder = SchemaBuilder::new(&mut self.registry, &mut errors);
        for service in &services {
            let branch = service.build(&mut builder);
            self.tree.append_child(branch);
        }

        for source in &mut self.sources {
            let ctx = SourceContext::new(&self.registry, &self.tree);
            if let Err(e) = source.parse(&ctx) {
                tracing::debug!(source = source.name(), error = %e, "source parse failed");
                errors.push(e);
            }
            let outcome = merge_source(&mut self.registry, source.as_ref());
            errors.extend(outcome.failures);
        }

        if errors.is_empty() {
            return Ok(());
        }
        let err = ParseError::new(errors);
        (self.handler)(ParseResult::Failed(&err));
        Err(err)
    }

    /// Replay `source`'s pairs without parsing it again.
    pub fn apply(&mut self, source: &dyn Source) -> MergeOutcome {
        merge_source(&mut self.registry, source)
    }

    /// Current value of `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.registry.value(key)
    }

    /// Set `key` directly, bypassing source priority.
    ///
    /// An unknown key gets an untyped argument holding `value`. A known key
    /// coerces `value` and, on success, is marked as set so later merges leave
    /// it alone.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ConfError> {
        let value = value.into();
        match self.registry.get_mut(key) {
            Some(arg) => {
                arg.set_value(value)?;
                arg.mark_set();
            }
            None => {
                self.registry.insert(key, Arg::untyped(value));
            }
        }
        Ok(())
    }

    pub fn arg(&self, key: &str) -> Option<&Arg> {
        self.registry.get(key)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tree(&self) -> &ArgTree {
        &self.tree
    }

    /// Nested mapping of default values, in tree order.
    pub fn document(&self) -> serde_json::Value {
        self.tree.to_document()
    }

    /// Every tree leaf with its current value, default and usage.
    pub fn entries(&self) -> Vec<ConfigEntry> {
        let mut entries = Vec::new();
        self.tree.walk_leaves(&mut |key, _| {
            if let Some(arg) = self.registry.get(&key) {
                entries.push(ConfigEntry {
                    value: arg.value(),
                    default: arg.default_value().to_string(),
                    usage: arg.description().to_string(),
                    key,
                });
            }
        });
        entries
    }

    /// Hand every entry to the result handler and return them.
    pub fn print_result(&self) -> Vec<ConfigEntry> {
        let entries = self.entries();
        (self.handler)(ParseResult::Succeeded(&entries));
        entries
    }
}

/// Builder for [`Binder`].
#[derive(Default)]
pub struct BinderBuilder {
    handler: Option<ResultHandler>,
}

impl BinderBuilder {
    /// Replace [`default_result_handler`].
    pub fn result_handler(mut self, handler: impl Fn(ParseResult<'_>) + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn build(self) -> Binder {
        Binder {
            services: Vec::new(),
            sources: Vec::new(),
            registry: Registry::new(),
            tree: ArgTree::default(),
            handler: self
                .handler
                .unwrap_or_else(|| Box::new(default_result_handler)),
        }
    }
}
