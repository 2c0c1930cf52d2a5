//! Binding and merge engine for the confbind library family.
//!
//! This crate provides:
//! - [`Configurable`] trait and derive: field-descriptor tables for config structs
//! - [`Binder`]: registration, parse, get/set and introspection
//! - [`Registry`] and [`ArgTree`]: the flat and hierarchical views of every argument
//! - [`Source`] trait: the capability contract for value providers, with [`MapSource`]
//!   for in-memory overrides
//!
//! Sources merge in registration order and the first source to set a key wins.

extern crate self as confbind;

pub mod arg;
pub mod binder;
pub mod error;
pub mod lens;
mod merge;
pub mod registry;
pub mod schema;
pub mod source;
pub mod tree;
pub mod value;

pub use arg::{Arg, ArgKind, Slot};
pub use binder::{Binder, BinderBuilder, ConfigEntry, ParseResult, default_result_handler};
pub use error::{ConfError, ErrorKind, FileOp, ParseError};
pub use lens::{Bound, Lens};
pub use merge::MergeOutcome;
pub use registry::Registry;
pub use schema::{Configurable, Field, FieldKind, Unsupported, snake_case};
pub use source::{KvStore, MapSource, Source, SourceContext};
pub use tree::ArgTree;
pub use value::Value;

pub use confbind_macros::Configurable;
