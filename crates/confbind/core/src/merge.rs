//! Commits a source's pairs into the registry under the first-writer-wins rule.

use crate::error::ConfError;
use crate::registry::Registry;
use crate::source::Source;
use std::ops::ControlFlow;

/// What happened to the pairs of one merge pass.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Pairs committed into the registry.
    pub applied: usize,
    /// Pairs whose key is not registered.
    pub unknown: usize,
    /// Pairs discarded because an earlier writer already set the key.
    pub shadowed: usize,
    /// Coercion failures, plus a parse failure if the source reported one.
    pub failures: Vec<ConfError>,
}

impl MergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Visit every pair of `source` and commit it into `registry`.
///
/// An unregistered key is discarded, a key whose has-been-set flag is up is
/// discarded, anything else goes through the argument's coercing setter. A
/// failed coercion is recorded and leaves the flag down.
pub(crate) fn merge_source(registry: &mut Registry, source: &dyn Source) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let source_name = source.name();

    source.range(&mut |key, value| {
        let Some(arg) = registry.get_mut(key) else {
            tracing::trace!(source = source_name, key, "discarding unknown key");
            outcome.unknown += 1;
            return ControlFlow::Continue(());
        };
        if arg.has_set() {
            tracing::trace!(
                source = source_name,
                key,
                "discarding value shadowed by earlier source"
            );
            outcome.shadowed += 1;
            return ControlFlow::Continue(());
        }
        match arg.set_value(value.clone()) {
            Ok(()) => {
                arg.mark_set();
                outcome.applied += 1;
            }
            Err(cause) => outcome.failures.push(ConfError::SourceMerge {
                source_name: source_name.to_string(),
                key: key.to_string(),
                value: value.to_string(),
                cause: Box::new(cause),
            }),
        }
        ControlFlow::Continue(())
    });

    tracing::debug!(
        source = source_name,
        applied = outcome.applied,
        unknown = outcome.unknown,
        shadowed = outcome.shadowed,
        failed = outcome.failures.len(),
        "merged source"
    );
    outcome
}
