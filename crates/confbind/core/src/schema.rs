//! Field-descriptor tables and the schema builder that turns them into
//! registry entries and tree nodes.
//!
//! A configuration struct describes itself through [`Configurable::fields`],
//! usually generated by `#[derive(Configurable)]`. The table lists every field
//! in declaration order with its Rust name, its raw `conf` tag and what kind
//! of field it is. Nested structs contribute their own tables, already
//! projected onto the registered root.
//!
//! # Tag mini-language
//!
//! `"<name>[,default=<v>][,usage=<text>]"`. A bare token names the argument,
//! `name=`, `default=` and `usage=` set the name, default and description, and
//! anything else is ignored. A tag of exactly `-` ignores the field. For
//! nested structs only a leading bare name is honoured.

use crate::arg::{Arg, Scalar, Slot, bind_field};
use crate::error::ConfError;
use crate::lens::{Bound, Lens};
use crate::registry::Registry;
use crate::tree::ArgTree;
use std::fmt;

/// A struct whose fields can be bound to configuration arguments.
pub trait Configurable: Sized + 'static {
    /// Rust type name, normalised into the root key when no name is given.
    fn type_name() -> &'static str;

    /// Describe every field, reaching each one from `R` through `at`.
    fn fields<R: 'static>(at: &Lens<R, Self>) -> Vec<Field<R>>;
}

/// Field kinds that cannot be bound to a scalar argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unsupported {
    Struct,
    Pointer,
    Slice,
    Map,
    Interface,
    Complex,
    Unknown,
}

impl Unsupported {
    /// Whether hitting this kind stops the rest of the enclosing field list.
    pub fn aborts_field_list(self) -> bool {
        matches!(self, Unsupported::Struct | Unsupported::Pointer)
    }
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unsupported::Struct => "struct",
            Unsupported::Pointer => "ptr",
            Unsupported::Slice => "slice",
            Unsupported::Map => "map",
            Unsupported::Interface => "interface",
            Unsupported::Complex => "complex",
            Unsupported::Unknown => "unknown",
        })
    }
}

type BindFn<R> = Box<dyn Fn(&Bound<R>) -> Slot>;

/// What a field is, as far as binding is concerned.
pub enum FieldKind<R> {
    /// A scalar; the closure binds it inside a registered root.
    Scalar(BindFn<R>),
    /// A nested struct. Embedded structs share the parent's key path.
    Struct { embedded: bool, fields: Vec<Field<R>> },
    Unsupported(Unsupported),
    /// Excluded from binding altogether.
    Skipped,
}

/// One entry of a field-descriptor table.
pub struct Field<R> {
    ident: &'static str,
    tag: Option<&'static str>,
    kind: FieldKind<R>,
}

impl<R: 'static> Field<R> {
    pub fn scalar<V>(ident: &'static str, tag: Option<&'static str>, lens: Lens<R, V>) -> Self
    where
        V: Scalar,
        V::Wide: fmt::Display + Clone,
    {
        Self {
            ident,
            tag,
            kind: FieldKind::Scalar(Box::new(move |root| bind_field(root, &lens))),
        }
    }

    pub fn nested(ident: &'static str, tag: Option<&'static str>, fields: Vec<Field<R>>) -> Self {
        Self {
            ident,
            tag,
            kind: FieldKind::Struct {
                embedded: false,
                fields,
            },
        }
    }

    pub fn embedded(ident: &'static str, fields: Vec<Field<R>>) -> Self {
        Self {
            ident,
            tag: None,
            kind: FieldKind::Struct {
                embedded: true,
                fields,
            },
        }
    }

    pub fn unsupported(ident: &'static str, tag: Option<&'static str>, kind: Unsupported) -> Self {
        Self {
            ident,
            tag,
            kind: FieldKind::Unsupported(kind),
        }
    }

    pub fn skipped(ident: &'static str) -> Self {
        Self {
            ident,
            tag: Some(IGNORE_TAG),
            kind: FieldKind::Skipped,
        }
    }
}

impl<R> Field<R> {
    pub fn ident(&self) -> &'static str {
        self.ident
    }

    pub fn tag(&self) -> Option<&'static str> {
        self.tag
    }

    pub fn kind(&self) -> &FieldKind<R> {
        &self.kind
    }
}

impl<R> fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            FieldKind::Scalar(_) => "scalar".to_string(),
            FieldKind::Struct { embedded: true, .. } => "embedded".to_string(),
            FieldKind::Struct { .. } => "struct".to_string(),
            FieldKind::Unsupported(k) => format!("unsupported({k})"),
            FieldKind::Skipped => "skipped".to_string(),
        };
        f.debug_struct("Field")
            .field("ident", &self.ident)
            .field("tag", &self.tag)
            .field("kind", &kind)
            .finish()
    }
}

const IGNORE_TAG: &str = "-";

/// Attributes parsed from a scalar field's tag.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagAttrs {
    pub name: String,
    pub default: String,
    pub usage: String,
}

impl TagAttrs {
    pub fn parse(tag: &str) -> Self {
        let mut attrs = TagAttrs::default();
        for token in tag.split(',') {
            match token.split_once('=') {
                None => attrs.name = token.to_string(),
                Some(("name", v)) => attrs.name = v.to_string(),
                Some(("default", v)) => attrs.default = v.to_string(),
                Some(("usage", v)) => attrs.usage = v.to_string(),
                Some(_) => {}
            }
        }
        attrs
    }
}

/// Name override for a nested struct: the leading token, if it is bare.
fn branch_name(tag: Option<&str>) -> Option<&str> {
    let first = tag?.split(',').next()?;
    (!first.is_empty() && !first.contains('=')).then_some(first)
}

/// Lower-case `name`, inserting `_` before every upper-case letter but the first.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Walks field-descriptor tables, filling the registry and building tree branches.
pub(crate) struct SchemaBuilder<'a> {
    registry: &'a mut Registry,
    errors: &'a mut Vec<ConfError>,
}

impl<'a> SchemaBuilder<'a> {
    pub(crate) fn new(registry: &'a mut Registry, errors: &'a mut Vec<ConfError>) -> Self {
        Self { registry, errors }
    }

    /// Build the branch for one registered struct.
    pub(crate) fn build<T: Configurable>(
        &mut self,
        name: Option<&str>,
        root: &Bound<T>,
    ) -> ArgTree {
        let name = name
            .filter(|n| !n.is_empty())
            .map_or_else(|| snake_case(T::type_name()), str::to_string);
        let fields = T::fields(&Lens::identity());

        let mut tree = ArgTree::new(name.clone(), "");
        let mut path = vec![name];
        self.walk(root, &mut tree, fields, &mut path);
        tree
    }

    fn walk<R: 'static>(
        &mut self,
        root: &Bound<R>,
        tree: &mut ArgTree,
        fields: Vec<Field<R>>,
        path: &mut Vec<String>,
    ) {
        for field in fields {
            if field.tag == Some(IGNORE_TAG) || matches!(field.kind, FieldKind::Skipped) {
                continue;
            }

            let (binder, unsupported) = match field.kind {
                FieldKind::Struct {
                    embedded: true,
                    fields,
                } => {
                    self.walk(root, tree, fields, path);
                    continue;
                }
                FieldKind::Struct {
                    embedded: false,
                    fields,
                } => {
                    let segment = branch_name(field.tag)
                        .map_or_else(|| snake_case(field.ident), str::to_string);
                    let mut branch = ArgTree::new(segment.clone(), "");
                    path.push(segment);
                    self.walk(root, &mut branch, fields, path);
                    path.pop();
                    tree.append_child(branch);
                    continue;
                }
                FieldKind::Scalar(binder) => (Some(binder), None),
                FieldKind::Unsupported(kind) => (None, Some(kind)),
                FieldKind::Skipped => continue,
            };

            let attrs = TagAttrs::parse(field.tag.unwrap_or_default());
            let name = if attrs.name.is_empty() {
                snake_case(field.ident)
            } else {
                attrs.name.clone()
            };
            let key = path
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(name.as_str()))
                .collect::<Vec<_>>()
                .join("_");

            if let Some(kind) = unsupported {
                self.errors.push(ConfError::UnsupportedFieldKind {
                    field: field.ident.to_string(),
                    key,
                    kind,
                });
                if kind.aborts_field_list() {
                    return;
                }
                continue;
            }
            let Some(binder) = binder else { continue };

            let mut arg = Arg::new(binder(root));
            arg.set_default_value(attrs.default.clone());
            if !attrs.default.is_empty() {
                if let Err(e) = arg.set_value(attrs.default.as_str().into()) {
                    self.errors.push(ConfError::DefaultApplication {
                        key: key.clone(),
                        default: attrs.default.clone(),
                        cause: Box::new(e),
                    });
                }
            }
            arg.set_description(attrs.usage);

            tracing::trace!(key = %key, kind = %arg.kind(), "registered argument");
            self.registry.insert(key, arg);
            tree.append_child(ArgTree::new(name, attrs.default));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct Listen {
        host: String,
        port: u16,
    }

    #[derive(Debug, Default)]
    struct Server {
        listen: Listen,
        admin: Listen,
        workers: u32,
        tags: Vec<String>,
        debug: bool,
    }

    fn listen_lens<R: 'static>(at: &Lens<R, Listen>) -> Vec<Field<R>> {
        vec![
            Field::scalar(
                "host",
                Some("host,default=localhost"),
                at.then(Lens::new(|l: &Listen| &l.host, |l: &mut Listen| &mut l.host)),
            ),
            Field::scalar(
                "port",
                Some("port,default=8080,usage=listen port"),
                at.then(Lens::new(|l: &Listen| &l.port, |l: &mut Listen| &mut l.port)),
            ),
        ]
    }

    impl Configurable for Server {
        fn type_name() -> &'static str {
            "HttpServer"
        }

        fn fields<R: 'static>(at: &Lens<R, Self>) -> Vec<Field<R>> {
            vec![
                Field::embedded(
                    "listen",
                    listen_lens(&at.then(Lens::new(
                        |s: &Server| &s.listen,
                        |s: &mut Server| &mut s.listen,
                    ))),
                ),
                Field::nested(
                    "admin",
                    Some("adm"),
                    listen_lens(&at.then(Lens::new(
                        |s: &Server| &s.admin,
                        |s: &mut Server| &mut s.admin,
                    ))),
                ),
                Field::unsupported("tags", None, Unsupported::Slice),
                Field::scalar(
                    "workers",
                    Some("default=many"),
                    at.then(Lens::new(|s: &Server| &s.workers, |s: &mut Server| &mut s.workers)),
                ),
                Field::scalar(
                    "debug",
                    None,
                    at.then(Lens::new(|s: &Server| &s.debug, |s: &mut Server| &mut s.debug)),
                ),
                Field::skipped("internal"),
            ]
        }
    }

    fn build(name: Option<&str>) -> (Registry, ArgTree, Vec<ConfError>, Bound<Server>) {
        let mut registry = Registry::new();
        let mut errors = Vec::new();
        let root = Bound::new(Server::default());
        let tree = SchemaBuilder::new(&mut registry, &mut errors).build(name, &root);
        (registry, tree, errors, root)
    }

    #[test]
    fn test_tag_attrs_parse() {
        assert_eq!(
            TagAttrs::parse("int_default,default=123,usage=an int"),
            TagAttrs {
                name: "int_default".into(),
                default: "123".into(),
                usage: "an int".into(),
            }
        );
        assert_eq!(TagAttrs::parse("name=x,bogus=1").name, "x");
        assert_eq!(TagAttrs::parse("usage=a=b").usage, "a=b");
        assert_eq!(TagAttrs::parse(""), TagAttrs::default());
    }

    #[test]
    fn test_branch_name_only_honours_bare_leading_token() {
        assert_eq!(branch_name(Some("c")), Some("c"));
        assert_eq!(branch_name(Some("c,default=1")), Some("c"));
        assert_eq!(branch_name(Some("default=1")), None);
        assert_eq!(branch_name(Some("")), None);
        assert_eq!(branch_name(None), None);
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("TestFlagNestedChild"), "test_flag_nested_child");
        assert_eq!(snake_case("child_bbbbb"), "child_bbbbb");
        assert_eq!(snake_case("YamlConf"), "yaml_conf");
        assert_eq!(snake_case("HTTP"), "h_t_t_p");
    }

    #[test]
    fn test_build_keys_embedding_and_defaults() {
        let (registry, tree, errors, root) = build(Some("srv"));

        let mut keys: Vec<&str> = registry.keys().collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["srv_adm_host", "srv_adm_port", "srv_debug", "srv_host", "srv_port", "srv_workers"]
        );
        assert_eq!(
            tree.leaf_keys(),
            vec!["srv_host", "srv_port", "srv_adm_host", "srv_adm_port", "srv_workers", "srv_debug"]
        );

        let server = root.borrow();
        assert_eq!(server.listen.host, "localhost");
        assert_eq!(server.admin.port, 8080);
        assert_eq!(server.workers, 0);
        drop(server);

        let port = registry.get("srv_port").unwrap();
        assert_eq!(port.description(), "listen port");
        assert_eq!(port.default_value(), "8080");
        assert!(!port.has_set());

        let kinds: Vec<ErrorKind> = errors.iter().map(ConfError::kind).collect();
        assert_eq!(
            kinds,
            vec![ErrorKind::UnsupportedFieldKind, ErrorKind::DefaultApplication]
        );
    }

    #[test]
    fn test_failed_default_still_registers() {
        let (registry, _, errors, _) = build(Some("srv"));
        let workers = registry.get("srv_workers").unwrap();
        assert_eq!(workers.default_value(), "many");
        assert_eq!(workers.value(), Value::Uint(0));
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfError::DefaultApplication { key, .. } if key == "srv_workers"
        )));
    }

    #[test]
    fn test_name_derived_from_type() {
        let (registry, tree, _, _) = build(None);
        assert_eq!(tree.key(), "http_server");
        assert!(registry.contains("http_server_adm_port"));
    }

    struct Aborting {
        before: String,
        after: String,
    }

    impl Configurable for Aborting {
        fn type_name() -> &'static str {
            "Aborting"
        }

        fn fields<R: 'static>(at: &Lens<R, Self>) -> Vec<Field<R>> {
            vec![
                Field::scalar(
                    "before",
                    None,
                    at.then(Lens::new(|a: &Aborting| &a.before, |a: &mut Aborting| &mut a.before)),
                ),
                Field::unsupported("next", None, Unsupported::Pointer),
                Field::scalar(
                    "after",
                    None,
                    at.then(Lens::new(|a: &Aborting| &a.after, |a: &mut Aborting| &mut a.after)),
                ),
            ]
        }
    }

    #[test]
    fn test_pointer_field_aborts_remaining_fields() {
        let mut registry = Registry::new();
        let mut errors = Vec::new();
        let root = Bound::new(Aborting {
            before: String::new(),
            after: String::new(),
        });
        SchemaBuilder::new(&mut registry, &mut errors).build(Some("a"), &root);

        assert!(registry.contains("a_before"));
        assert!(!registry.contains("a_after"));
        assert!(matches!(
            errors.as_slice(),
            [ConfError::UnsupportedFieldKind {
                kind: Unsupported::Pointer,
                key,
                ..
            }] if key == "a_next"
        ));
    }

    proptest! {
        #[test]
        fn prop_snake_case_is_lowercase_and_idempotent(name in "[A-Za-z][A-Za-z0-9]{0,12}") {
            let once = snake_case(&name);
            prop_assert!(!once.chars().any(|c| c.is_ascii_uppercase()));
            prop_assert_eq!(snake_case(&once), once.clone());
        }
    }
}
