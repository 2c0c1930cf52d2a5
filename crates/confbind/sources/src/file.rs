//! Structured-file source.
//!
//! The file's location is itself configuration: [`FileConf`] is registered
//! with the binder (conventionally as `yaml`, giving the key `yaml_filepath`)
//! so that a source merged earlier, such as the command line, can redirect it.
//!
//! A missing file is generated from the argument tree's defaults and nothing
//! is merged from it in that pass. An existing file is flattened into
//! underscore-joined keys.
//!
//! A leaf without a default is generated as an empty string. Reading one back
//! into a boolean or numeric argument would fail coercion, so an empty string
//! under such a key counts as unset and is not merged.

use crate::writer::write_atomic;
use confbind::{
    ArgKind, Bound, ConfError, Configurable, FileOp, KvStore, Source, SourceContext, Value,
};
use serde_json::{Map, Value as Json};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

const DEFAULT_PATH: &str = "config.yaml";

/// Settings of a [`FileSource`].
#[derive(Configurable, Debug, Clone, PartialEq, Eq)]
pub struct FileConf {
    #[conf(tag = "filepath,default=config.yaml,usage=configuration file path")]
    pub filepath: String,
}

impl Default for FileConf {
    fn default() -> Self {
        Self {
            filepath: DEFAULT_PATH.to_string(),
        }
    }
}

/// Document format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Toml,
}

impl Format {
    /// Guess from the file extension, falling back to YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Yaml,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
            Format::Toml => "toml",
        }
    }

    /// Render a document in this format.
    pub fn render(self, doc: &Json) -> Result<String, ConfError> {
        let rendered = match self {
            Format::Yaml => serde_yaml::to_string(doc).map_err(|e| e.to_string()),
            Format::Json => serde_json::to_string_pretty(doc)
                .map(|s| s + "\n")
                .map_err(|e| e.to_string()),
            Format::Toml => toml::to_string(doc).map_err(|e| e.to_string()),
        };
        rendered.map_err(|e| ConfError::source_parse(self.as_str(), e))
    }

    fn read(self, text: &str) -> Result<Json, String> {
        if text.trim().is_empty() {
            return Ok(Json::Null);
        }
        match self {
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// Reads configuration values from a YAML, JSON or TOML document.
#[derive(Debug, Clone)]
pub struct FileSource {
    conf: Bound<FileConf>,
    format: Option<Format>,
    values: KvStore,
    generated: bool,
}

impl Default for FileSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSource {
    /// A source reading `config.yaml` unless redirected through [`FileSource::conf`].
    pub fn new() -> Self {
        Self {
            conf: Bound::new(FileConf::default()),
            format: None,
            values: KvStore::new(),
            generated: false,
        }
    }

    pub fn with_path(path: impl Into<String>) -> Self {
        let source = Self::new();
        source.conf.borrow_mut().filepath = path.into();
        source
    }

    pub fn yaml(self) -> Self {
        self.with_format(Format::Yaml)
    }

    pub fn json(self) -> Self {
        self.with_format(Format::Json)
    }

    pub fn toml(self) -> Self {
        self.with_format(Format::Toml)
    }

    fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Handle to register with the binder so other sources can set the path.
    pub fn conf(&self) -> Bound<FileConf> {
        self.conf.clone()
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.conf.borrow().filepath)
    }

    pub fn format(&self) -> Format {
        self.format
            .unwrap_or_else(|| Format::from_path(&self.path()))
    }

    /// Whether the last parse wrote a fresh document instead of reading one.
    pub fn generated(&self) -> bool {
        self.generated
    }

    fn generate(
        &self,
        path: &Path,
        format: Format,
        ctx: &SourceContext<'_>,
    ) -> Result<(), ConfError> {
        let doc = ctx.tree().to_document();
        let text = format.render(&doc)?;
        write_atomic(path, &text)?;
        tracing::info!(
            path = %path.display(),
            format = format.as_str(),
            "generated configuration file from defaults"
        );
        Ok(())
    }
}

/// Whether `value` is the empty placeholder written for a leaf without a default.
fn is_unset_placeholder(ctx: &SourceContext<'_>, key: &str, value: &Value) -> bool {
    let typed = !matches!(ctx.kind_of(key), None | Some(ArgKind::Str | ArgKind::Untyped));
    typed && value.as_str().is_some_and(str::is_empty)
}

fn flatten(ctx: &SourceContext<'_>, prefix: &str, map: Map<String, Json>, out: &mut KvStore) {
    for (key, value) in map {
        let key = format!("{prefix}{key}");
        match value {
            Json::Object(inner) => flatten(ctx, &format!("{key}_"), inner, out),
            other => {
                let value = Value::from(other);
                if is_unset_placeholder(ctx, &key, &value) {
                    tracing::trace!(key = %key, "skipping empty value for typed argument");
                    continue;
                }
                out.set(key, value);
            }
        }
    }
}

impl Source for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn parse(&mut self, ctx: &SourceContext<'_>) -> Result<(), ConfError> {
        self.values.clear();
        self.generated = false;

        let path = self.path();
        let format = self.format();

        if !path.exists() {
            self.generate(&path, format, ctx)?;
            self.generated = true;
            return Ok(());
        }

        let text = std::fs::read_to_string(&path)
            .map_err(|e| ConfError::file_access(FileOp::Read, &path, e))?;
        let doc = format.read(&text).map_err(|e| {
            ConfError::source_parse(format.as_str(), format!("{}: {e}", path.display()))
        })?;

        match doc {
            Json::Object(map) => flatten(ctx, "", map, &mut self.values),
            Json::Null => {}
            other => {
                return Err(ConfError::source_parse(
                    format.as_str(),
                    format!("{}: expected a mapping at the top level, got {other}", path.display()),
                ));
            }
        }

        tracing::debug!(
            path = %path.display(),
            keys = self.values.len(),
            "read configuration file"
        );
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
    use confbind::{ArgTree, Registry};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn tree() -> ArgTree {
        let mut nest = ArgTree::new("struct", "");
        nest.append_child(ArgTree::new("name", "nest"));
        nest.append_child(ArgTree::new("value", "1024"));
        let mut t = ArgTree::new("t", "");
        t.append_child(nest);
        let mut root = ArgTree::default();
        root.append_child(t);
        root
    }

    fn parse(source: &mut FileSource) -> Result<(), ConfError> {
        let registry = Registry::new();
        let tree = tree();
        source.parse(&SourceContext::new(&registry, &tree))
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/b.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("b.TOML")), Format::Toml);
        assert_eq!(Format::from_path(Path::new("b.yml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("config")), Format::Yaml);
    }

    #[test]
    fn test_missing_file_is_generated_for_each_format() {
        let temp = TempDir::new().unwrap();
        for name in ["gen.yaml", "gen.json", "gen.toml"] {
            let path = temp.path().join(name);
            let mut source = FileSource::with_path(path.to_string_lossy());
            parse(&mut source).unwrap();

            assert!(source.generated());
            assert_eq!(source.values.len(), 0);
            let text = std::fs::read_to_string(&path).unwrap();
            let doc = source.format().read(&text).unwrap();
            assert_eq!(doc["t"]["struct"]["name"], "nest", "{name}");
            assert_eq!(doc["t"]["struct"]["value"], "1024", "{name}");
        }
    }

    #[test]
    fn test_nested_mappings_are_flattened() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf.yaml");
        std::fs::write(
            &path,
            "t:\n  struct:\n    name: custom\n    value: 11011\n  on: true\nlist: [1, 2]\n",
        )
        .unwrap();

        let mut source = FileSource::with_path(path.to_string_lossy());
        parse(&mut source).unwrap();

        assert!(!source.generated());
        assert_eq!(source.get("t_struct_name"), Some(&Value::from("custom")));
        assert_eq!(source.get("t_struct_value"), Some(&Value::Int(11011)));
        assert_eq!(source.get("t_on"), Some(&Value::Bool(true)));
        assert_eq!(
            source.get("list"),
            Some(&Value::Other(serde_json::json!([1, 2])))
        );
    }

    #[test]
    fn test_explicit_format_overrides_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.conf");
        std::fs::write(&path, "[t]\nname = \"toml\"\n").unwrap();

        let mut source = FileSource::with_path(path.to_string_lossy()).toml();
        parse(&mut source).unwrap();
        assert_eq!(source.get("t_name"), Some(&Value::from("toml")));
    }

    #[test]
    fn test_empty_value_for_typed_argument_is_not_collected() {
        use confbind::arg::bind_field;
        use confbind::{Arg, Lens};

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blank.yaml");
        std::fs::write(&path, "t:\n  on: ''\n  name: ''\n  count: ''\n").unwrap();

        let mut registry = Registry::new();
        let on = Bound::new(false);
        let name = Bound::new(String::from("kept"));
        registry.insert("t_on", Arg::new(bind_field(&on, &Lens::<bool, bool>::identity())));
        registry.insert(
            "t_name",
            Arg::new(bind_field(&name, &Lens::<String, String>::identity())),
        );
        let tree = tree();

        let mut source = FileSource::with_path(path.to_string_lossy());
        source.parse(&SourceContext::new(&registry, &tree)).unwrap();

        assert!(source.get("t_on").is_none());
        assert_eq!(source.get("t_name"), Some(&Value::from("")));
        assert_eq!(source.get("t_count"), Some(&Value::from("")));
    }

    #[test]
    fn test_malformed_document_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut source = FileSource::with_path(path.to_string_lossy());
        let err = parse(&mut source).unwrap_err();
        assert_eq!(err.kind(), confbind::ErrorKind::SourceParse);
    }

    #[test]
    fn test_scalar_root_is_rejected_and_empty_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scalar.yaml");
        std::fs::write(&path, "just text\n").unwrap();
        let mut source = FileSource::with_path(path.to_string_lossy());
        assert!(parse(&mut source).is_err());

        std::fs::write(&path, "").unwrap();
        parse(&mut source).unwrap();
        assert_eq!(source.values.len(), 0);
    }
}
