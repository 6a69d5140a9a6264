//! Single-pass application of change records
//!
//! Changes are ordered by `(offset, insertion index)` with a stable sort, so
//! the caller's order only matters between changes at the same offset. Every
//! offset refers to the original text; nothing is re-based while applying.

use crate::change::Change;

/// Errors applying changes to a snapshot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// Two changes address overlapping ranges
    #[error(
        "overlapping edits: change #{first} ({first_range:?}) \
         and change #{second} ({second_range:?})"
    )]
    OverlappingEditConflict {
        first: usize,
        second: usize,
        first_range: std::ops::Range<usize>,
        second_range: std::ops::Range<usize>,
    },

    /// Offset or end lies past the text
    #[error("change #{index} addresses {offset} but the text has {len} bytes")]
    OffsetOutOfBounds { index: usize, offset: usize, len: usize },

    /// Offset splits a UTF-8 sequence, or a range ends before it starts
    #[error("change #{index} has an invalid boundary at {offset}")]
    NotCharBoundary { index: usize, offset: usize },
}

/// Apply `changes` to `original`, producing the new text
///
/// # Errors
/// - [`ApplyError::OffsetOutOfBounds`] / [`ApplyError::NotCharBoundary`] for
///   offsets that are not valid in `original`
/// - [`ApplyError::OverlappingEditConflict`] when two ranges overlap, or an
///   insertion falls inside (or, by order, behind) a replaced range
pub fn apply_changes(original: &str, changes: &[Change]) -> Result<String, ApplyError> {
    for (index, change) in changes.iter().enumerate() {
        validate_bounds(original, index, change)?;
    }

    let mut order: Vec<usize> = (0..changes.len()).collect();
    order.sort_by_key(|&i| changes[i].offset());

    let capacity = original.len() + changes.iter().map(|c| c.text().len()).sum::<usize>();
    let mut out = String::with_capacity(capacity);
    let mut cursor = 0;
    let mut claimant: Option<usize> = None;

    for index in order {
        let change = &changes[index];
        if change.offset() < cursor {
            let first = claimant.unwrap_or(index);
            return Err(ApplyError::OverlappingEditConflict {
                first,
                second: index,
                first_range: changes[first].range(),
                second_range: change.range(),
            });
        }

        out.push_str(&original[cursor..change.offset()]);
        out.push_str(change.text());
        cursor = change.offset();

        if change.end() > cursor {
            cursor = change.end();
            claimant = Some(index);
        }
    }

    out.push_str(&original[cursor..]);
    Ok(out)
}

fn validate_bounds(original: &str, index: usize, change: &Change) -> Result<(), ApplyError> {
    for offset in [change.offset(), change.end()] {
        if offset > original.len() {
            return Err(ApplyError::OffsetOutOfBounds {
                index,
                offset,
                len: original.len(),
            });
        }
        if !original.is_char_boundary(offset) {
            return Err(ApplyError::NotCharBoundary { index, offset });
        }
    }
    if change.end() < change.offset() {
        return Err(ApplyError::NotCharBoundary {
            index,
            offset: change.end(),
        });
    }
    Ok(())
}
