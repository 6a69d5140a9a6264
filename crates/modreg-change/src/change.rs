//! Change records
//!
//! A [`Change`] describes one textual edit against a parsed snapshot. It is
//! never applied in place: changes accumulate in a [`ChangeSet`] and are
//! spliced into the original text in one pass by
//! [`apply_changes`](crate::apply_changes).

use std::fmt::{self, Display, Formatter};
use std::ops::Range;
use std::sync::Arc;

/// Edit kind of a [`Change`]
///
/// Both insert kinds place their text at the byte boundary `offset`. The kind
/// records which neighbour the text belongs to: `InsertBefore` attaches to the
/// text that follows, `InsertAfter` to the node that ends at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Insert at `offset`, ahead of the following text
    InsertBefore,
    /// Insert at `offset`, behind the preceding node
    InsertAfter,
    /// Replace `offset..end` with the payload
    Replace {
        /// Exclusive end of the replaced range
        end: usize,
    },
    /// Remove `offset..end`; the payload is empty
    Remove {
        /// Exclusive end of the removed range
        end: usize,
    },
}

/// Registration that produced a change
///
/// Sessions deduplicate pending work by origin, so an origin must describe the
/// logical registration, not the text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeOrigin {
    /// An import binding of `symbol` from `module`
    Import { symbol: String, module: String },
    /// An entry appended to an existing metadata array
    SlotEntry { slot: String, symbol: String },
    /// A metadata property created together with its entries
    SlotCreation { slot: String, entries: Vec<String> },
    /// A route literal appended to the router's routes array
    Route { literal: String },
    /// Anything built by hand
    Manual,
}

/// One immutable textual edit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Change {
    offset: usize,
    kind: ChangeKind,
    text: String,
    origin: ChangeOrigin,
    description: String,
}

impl Change {
    /// Create a change with a generated description
    #[must_use]
    pub fn new(
        offset: usize,
        kind: ChangeKind,
        text: impl Into<String>,
        origin: ChangeOrigin,
    ) -> Self {
        let text = match kind {
            ChangeKind::Remove { .. } => String::new(),
            _ => text.into(),
        };
        let mut change = Self {
            offset,
            kind,
            text,
            origin,
            description: String::new(),
        };
        change.description = change.to_string();
        change
    }

    /// Insert `text` at `offset`, attached to what follows
    #[inline]
    #[must_use]
    pub fn insert_before(offset: usize, text: impl Into<String>, origin: ChangeOrigin) -> Self {
        Self::new(offset, ChangeKind::InsertBefore, text, origin)
    }

    /// Insert `text` at `offset`, attached to the node ending there
    #[inline]
    #[must_use]
    pub fn insert_after(offset: usize, text: impl Into<String>, origin: ChangeOrigin) -> Self {
        Self::new(offset, ChangeKind::InsertAfter, text, origin)
    }

    /// Replace `range` with `text`
    #[inline]
    #[must_use]
    pub fn replace(range: Range<usize>, text: impl Into<String>, origin: ChangeOrigin) -> Self {
        Self::new(range.start, ChangeKind::Replace { end: range.end }, text, origin)
    }

    /// Remove `range`
    #[inline]
    #[must_use]
    pub fn remove(range: Range<usize>, origin: ChangeOrigin) -> Self {
        Self::new(range.start, ChangeKind::Remove { end: range.end }, "", origin)
    }

    /// Override the generated description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Same edit with a different payload
    #[must_use]
    pub fn with_text(&self, text: impl Into<String>, origin: ChangeOrigin) -> Self {
        Self::new(self.offset, self.kind, text, origin)
    }

    /// Start offset in the snapshot text
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Exclusive end offset; equals `offset` for insertions
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        match self.kind {
            ChangeKind::InsertBefore | ChangeKind::InsertAfter => self.offset,
            ChangeKind::Replace { end } | ChangeKind::Remove { end } => end,
        }
    }

    /// Byte range the change consumes from the snapshot
    #[inline]
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// Edit kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// Text payload
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Registration that produced this change
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &ChangeOrigin {
        &self.origin
    }

    /// Human-readable description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// True for both insert kinds
    #[inline]
    #[must_use]
    pub fn is_insertion(&self) -> bool {
        matches!(self.kind, ChangeKind::InsertBefore | ChangeKind::InsertAfter)
    }

    /// True for `Remove`
    #[inline]
    #[must_use]
    pub fn is_removal(&self) -> bool {
        matches!(self.kind, ChangeKind::Remove { .. })
    }
}

impl Display for Change {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind {
            ChangeKind::InsertBefore => write!(f, "insert {:?} before {}", self.text, self.offset),
            ChangeKind::InsertAfter => write!(f, "insert {:?} after {}", self.text, self.offset),
            ChangeKind::Replace { end } => {
                write!(f, "replace {}..{} with {:?}", self.offset, end, self.text)
            }
            ChangeKind::Remove { end } => write!(f, "remove {}..{}", self.offset, end),
        }
    }
}

/// Ordered, copy-on-write sequence of changes
///
/// Cloning is cheap and yields an independent snapshot: pushing to one
/// `ChangeSet` never changes a clone somebody else is iterating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(Arc<Vec<Change>>);

impl ChangeSet {
    /// Empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change
    pub fn push(&mut self, change: Change) {
        Arc::make_mut(&mut self.0).push(change);
    }

    /// Substitute the change at `index`, returning the previous one
    pub fn replace(&mut self, index: usize, change: Change) -> Option<Change> {
        let slot = Arc::make_mut(&mut self.0).get_mut(index)?;
        Some(std::mem::replace(slot, change))
    }

    /// Remove every change
    pub fn clear(&mut self) {
        self.0 = Arc::default();
    }

    /// Number of changes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no change is pending
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Change at `index`
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Change> {
        self.0.get(index)
    }

    /// Changes in insertion order
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.0.iter()
    }

    /// Borrow as a slice
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Change] {
        &self.0
    }

    /// Index of the first change matching `predicate`
    #[must_use]
    pub fn position(&self, predicate: impl Fn(&Change) -> bool) -> Option<usize> {
        self.0.iter().position(predicate)
    }

    /// New set keeping only the changes matching `predicate`, order preserved
    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&Change) -> bool) -> Self {
        self.0.iter().filter(|c| predicate(*c)).cloned().collect()
    }

    /// True when any change has the given origin
    #[must_use]
    pub fn contains_origin(&self, origin: &ChangeOrigin) -> bool {
        self.0.iter().any(|c| c.origin() == origin)
    }
}

impl From<Vec<Change>> for ChangeSet {
    fn from(changes: Vec<Change>) -> Self {
        Self(Arc::new(changes))
    }
}

impl FromIterator<Change> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Change>>(iter: I) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
