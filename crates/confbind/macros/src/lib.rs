//! Proc macros for the confbind library family.
//!
//! This crate provides:
//! - `#[derive(Configurable)]` for describing a config struct's fields to the binder

mod configurable;

use proc_macro::TokenStream;

/// Derive macro for implementing the `Configurable` trait.
///
/// # Usage
///
/// ```ignore
/// use confbind::Configurable;
///
/// #[derive(Configurable, Default)]
/// struct Server {
///     #[conf(tag = "host,default=localhost,usage=address to bind")]
///     host: String,
///     #[conf(tag = "port,default=8080")]
///     port: u16,
///     #[conf(flatten)]
///     limits: Limits,
///     #[conf(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[conf(tag = "...")]`: Tag mini-language passed to the binder verbatim.
///   `"-"` ignores the field.
/// - `#[conf(skip)]`: Ignore the field. Its type need not be describable.
/// - `#[conf(flatten)]`: Bind a nested struct's fields under the parent's key path.
///
/// Scalars (`bool`, integers up to 64 bits, `f32`, `f64`, `String`) become
/// arguments. Other path types are treated as nested `Configurable` structs.
/// Collections, pointers, trait objects and the like are reported to the
/// binder as unsupported.
#[proc_macro_derive(Configurable, attributes(conf))]
pub fn derive_configurable(input: TokenStream) -> TokenStream {
    configurable::expand(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
