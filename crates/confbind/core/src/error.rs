//! Error types for binding and merging configuration.

use crate::arg::ArgKind;
use crate::schema::Unsupported;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error raised while building the schema, coercing a value, or reading a source.
#[derive(Error, Debug)]
pub enum ConfError {
    /// A field whose type cannot be bound to a single scalar.
    #[error("field type not supported: field:{field}, key:{key}, type:{kind}")]
    UnsupportedFieldKind {
        field: String,
        key: String,
        kind: Unsupported,
    },

    /// A value could not be coerced into the argument's type.
    #[error("invalid value {value:?} for {kind} argument: {reason}")]
    InvalidValue {
        kind: ArgKind,
        value: String,
        reason: String,
    },

    /// A `default=` tag value failed coercion.
    #[error("set default value err: key:{key} default:{default}")]
    DefaultApplication {
        key: String,
        default: String,
        #[source]
        cause: Box<ConfError>,
    },

    /// A value yielded by a source failed coercion during merge.
    #[error("source `{source_name}` could not set arg {key} to {value}")]
    SourceMerge {
        source_name: String,
        key: String,
        value: String,
        #[source]
        cause: Box<ConfError>,
    },

    /// Opening, reading or writing a file-backed source failed.
    #[error("{op} file {} failed", .path.display())]
    FileAccess {
        op: FileOp,
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    /// A source could not make sense of its medium (bad flag, malformed document).
    #[error("source `{source_name}`: {message}")]
    SourceParse {
        source_name: String,
        message: String,
    },
}

/// Discriminant of [`ConfError`], for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedFieldKind,
    InvalidValue,
    DefaultApplication,
    SourceMerge,
    FileAccess,
    SourceParse,
}

/// File operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Open,
    Read,
    Write,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileOp::Open => "open",
            FileOp::Read => "read",
            FileOp::Write => "write",
        })
    }
}

impl ConfError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfError::UnsupportedFieldKind { .. } => ErrorKind::UnsupportedFieldKind,
            ConfError::InvalidValue { .. } => ErrorKind::InvalidValue,
            ConfError::DefaultApplication { .. } => ErrorKind::DefaultApplication,
            ConfError::SourceMerge { .. } => ErrorKind::SourceMerge,
            ConfError::FileAccess { .. } => ErrorKind::FileAccess,
            ConfError::SourceParse { .. } => ErrorKind::SourceParse,
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value<V: ToString, R: ToString>(kind: ArgKind, value: V, reason: R) -> Self {
        ConfError::InvalidValue {
            kind,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a source parse error.
    pub fn source_parse<N: ToString, M: ToString>(source_name: N, message: M) -> Self {
        ConfError::SourceParse {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a file access error.
    pub fn file_access(op: FileOp, path: impl Into<PathBuf>, cause: std::io::Error) -> Self {
        ConfError::FileAccess {
            op,
            path: path.into(),
            cause,
        }
    }
}

/// Every error collected during one [`Binder::parse`](crate::Binder::parse) pass.
#[derive(Debug)]
pub struct ParseError {
    errors: Vec<ConfError>,
}

impl ParseError {
    pub(crate) fn new(errors: Vec<ConfError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[ConfError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// True if any collected error is of `kind`.
    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind() == kind)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config parse fail: ")?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
            let mut cause = std::error::Error::source(err);
            while let Some(inner) = cause {
                write!(f, ": {inner}")?;
                cause = inner.source();
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .first()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
