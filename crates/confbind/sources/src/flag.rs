//! Command-line flag source.
//!
//! Grammar: `-key=value`, `--key=value`, `-key value`, and a bare `-key` for
//! boolean arguments. `--` ends the flags; so does the first token that is not
//! a flag. Everything after the stop point is kept as [`FlagSource::remaining`].

use confbind::{ArgKind, ConfError, KvStore, Source, SourceContext, Value};
use std::ops::ControlFlow;

const SOURCE_NAME: &str = "flag";

/// Reads configuration values from an argument vector.
#[derive(Debug, Clone, Default)]
pub struct FlagSource {
    args: Vec<String>,
    remaining: Vec<String>,
    values: KvStore,
}

impl FlagSource {
    /// Scan the process arguments, minus the program name.
    pub fn new() -> Self {
        Self::from_args(std::env::args().skip(1))
    }

    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            remaining: Vec::new(),
            values: KvStore::new(),
        }
    }

    /// Arguments left over after flag scanning stopped.
    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }
}

/// Outcome of scanning a single token.
enum Step {
    /// A flag was stored or skipped; keep scanning.
    Flag,
    /// Flag scanning is over.
    Stop,
}

struct Scanner<'a, 'c> {
    args: &'a [String],
    pos: usize,
    ctx: &'a SourceContext<'c>,
}

impl Scanner<'_, '_> {
    fn next_flag(&mut self, values: &mut KvStore) -> Result<Step, ConfError> {
        let Some(token) = self.args.get(self.pos) else {
            return Ok(Step::Stop);
        };
        if token.len() < 2 || !token.starts_with('-') {
            return Ok(Step::Stop);
        }

        let name = match token.strip_prefix("--") {
            Some("") => {
                self.pos += 1;
                return Ok(Step::Stop);
            }
            Some(rest) => rest,
            None => &token[1..],
        };
        if name.is_empty() || name.starts_with('-') || name.starts_with('=') {
            return Err(ConfError::source_parse(
                SOURCE_NAME,
                format!("bad flag syntax: {token}"),
            ));
        }
        self.pos += 1;

        let (name, inline) = match name.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (name, None),
        };

        let Some(kind) = self.ctx.kind_of(name) else {
            tracing::warn!(flag = name, "flag provided but not defined: -{name}");
            return Ok(Step::Flag);
        };

        let value = match (inline, kind) {
            (Some(value), _) => value.to_string(),
            (None, ArgKind::Bool) => "true".to_string(),
            (None, _) => {
                let Some(next) = self.args.get(self.pos) else {
                    return Err(ConfError::source_parse(
                        SOURCE_NAME,
                        format!("flag needs an argument: -{name}"),
                    ));
                };
                self.pos += 1;
                next.clone()
            }
        };

        values.set(name, Value::Str(value));
        Ok(Step::Flag)
    }
}

impl Source for FlagSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn parse(&mut self, ctx: &SourceContext<'_>) -> Result<(), ConfError> {
        self.values.clear();
        self.remaining.clear();

        let mut scanner = Scanner {
            args: &self.args,
            pos: 0,
            ctx,
        };
        let result = loop {
            match scanner.next_flag(&mut self.values) {
                Ok(Step::Flag) => {}
                Ok(Step::Stop) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.remaining = self.args[scanner.pos..].to_vec();

        tracing::debug!(
            flags = self.values.len(),
            remaining = self.remaining.len(),
            "scanned command line"
        );
        result
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
    use confbind::arg::bind_field;
    use confbind::{Arg, ArgTree, Bound, Lens, Registry};

    /// `t_bool` is a real boolean; the others only need to exist.
    fn registry() -> Registry {
        let mut registry = Registry::new();
        let flag = Bound::new(false);
        registry.insert("t_bool", Arg::new(bind_field(&flag, &Lens::<bool, bool>::identity())));
        registry.insert("t_int", Arg::untyped(Value::Int(0)));
        registry.insert("t_string", Arg::untyped(Value::from("")));
        registry
    }

    fn parse(args: &[&str]) -> (FlagSource, Result<(), ConfError>) {
        let registry = registry();
        let tree = ArgTree::default();
        let ctx = SourceContext::new(&registry, &tree);
        let mut source = FlagSource::from_args(args.iter().copied());
        let result = source.parse(&ctx);
        (source, result)
    }

    #[test]
    fn test_equals_and_separate_values() {
        let (source, result) = parse(&["-t_string=1", "--t_int", "2", "-t_bool"]);
        result.unwrap();
        assert_eq!(source.get("t_string"), Some(&Value::from("1")));
        assert_eq!(source.get("t_int"), Some(&Value::from("2")));
        assert_eq!(source.get("t_bool"), Some(&Value::from("true")));
        assert!(source.remaining().is_empty());
    }

    #[test]
    fn test_double_dash_terminates() {
        let (source, result) = parse(&["-t_int=1", "--", "-t_string=x", "rest"]);
        result.unwrap();
        assert!(source.get("t_string").is_none());
        assert_eq!(source.remaining(), ["-t_string=x", "rest"]);
    }

    #[test]
    fn test_positional_stops_scanning() {
        let (source, result) = parse(&["-t_bool", "serve", "-t_int=3"]);
        result.unwrap();
        assert_eq!(source.get("t_bool"), Some(&Value::from("true")));
        assert!(source.get("t_int").is_none());
        assert_eq!(source.remaining(), ["serve", "-t_int=3"]);
    }

    #[test]
    fn test_bool_flag_does_not_consume_next() {
        let (source, result) = parse(&["-t_bool", "-t_int=4"]);
        result.unwrap();
        assert_eq!(source.get("t_int"), Some(&Value::from("4")));
    }

    #[test]
    fn test_undefined_flag_is_skipped() {
        let (source, result) = parse(&["-t_missing=1", "-t_int=5"]);
        result.unwrap();
        assert!(source.get("t_missing").is_none());
        assert_eq!(source.get("t_int"), Some(&Value::from("5")));
    }

    #[test]
    fn test_bad_syntax_keeps_earlier_values() {
        let (source, result) = parse(&["-t_int=6", "-=x", "-t_string=y"]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("bad flag syntax: -=x"), "got: {err}");
        assert_eq!(source.get("t_int"), Some(&Value::from("6")));
        assert!(source.get("t_string").is_none());
    }

    #[test]
    fn test_missing_value_is_an_error() {
        let (_, result) = parse(&["-t_int"]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("flag needs an argument: -t_int"));
    }

    #[test]
    fn test_reparse_starts_over() {
        let registry = registry();
        let tree = ArgTree::default();
        let ctx = SourceContext::new(&registry, &tree);
        let mut source = FlagSource::from_args(["-t_int=1", "tail"]);
        source.parse(&ctx).unwrap();
        source.parse(&ctx).unwrap();
        assert_eq!(source.remaining(), ["tail"]);
        assert_eq!(source.values.len(), 1);
    }
}
