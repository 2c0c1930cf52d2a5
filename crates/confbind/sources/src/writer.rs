//! Atomic file writing for generated configuration documents.
//!
//! The document is written to a temporary file and renamed into place, so a
//! reader never sees a partially written file.

use atomicwrites::{AllowOverwrite, AtomicFile};
use confbind::{ConfError, FileOp};
use std::io::Write;
use std::path::Path;

/// Write `contents` to `path` atomically, creating parent directories first.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), ConfError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfError::file_access(FileOp::Write, parent, e))?;
    }

    let af = AtomicFile::new(path, AllowOverwrite);
    af.write(|f| f.write_all(contents.as_bytes()))
        .map_err(|e| {
            let cause = match e {
                atomicwrites::Error::Internal(e) | atomicwrites::Error::User(e) => e,
            };
            ConfError::file_access(FileOp::Write, path, cause)
        })?;

    Ok(())
}
