//! Atomic write of accumulated changes
//!
//! The new text is computed in full before the store is touched. Only then is
//! one update opened, overwritten and committed, so any failure leaves the
//! stored file as it was.

use crate::error::{SessionError, SessionResult};
use modreg_change::{apply_changes, ChangeSet, ContentHash};
use modreg_source::SourceFile;
use modreg_workspace::VirtualTree;

/// Outcome of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedResult {
    /// Path written
    pub path: String,
    /// Number of changes applied
    pub applied: usize,
    /// Hash of the stored text before the write
    pub before: ContentHash,
    /// Hash of the written text
    pub after: ContentHash,
    /// Written text
    pub text: String,
}

impl CommittedResult {
    /// True when the write left the text as it was
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.before == self.after
    }
}

/// Apply `changes` to the snapshot and write the result through `store`
///
/// `last_committed` is the hash of the text this session wrote before, if any.
/// The stored file must match it or the snapshot itself.
pub(crate) fn commit_changes(
    store: &mut impl VirtualTree,
    source: &SourceFile,
    changes: &ChangeSet,
    last_committed: Option<ContentHash>,
) -> SessionResult<CommittedResult> {
    let path = source.path();
    let text = apply_changes(source.text(), changes.as_slice())?;

    let stored = store.read_text(path).map_err(SessionError::from_read)?;
    let before = ContentHash::compute(stored.as_bytes());
    if before != source.hash() && Some(before) != last_committed {
        tracing::warn!(%path, "stored file changed since it was parsed");
        return Err(SessionError::StaleSnapshot {
            path: path.to_string(),
            expected: source.hash().short(),
            actual: before.short(),
        });
    }

    let after = ContentHash::compute(text.as_bytes());
    let mut update = store.begin_update(path)?;
    update.overwrite(text.as_bytes());
    store.commit_update(update)?;

    tracing::info!(
        %path,
        applied = changes.len(),
        before = %before.short(),
        after = %after.short(),
        "committed changes"
    );

    Ok(CommittedResult {
        path: path.to_string(),
        applied: changes.len(),
        before,
        after,
        text,
    })
}
