//! modreg change records
//!
//! Immutable descriptions of textual edits and the single-pass splicer that
//! applies them.
//!
//! # Core Concepts
//!
//! - [`Change`]: one edit at a byte offset of a parsed snapshot
//! - [`ChangeKind`]: insert before/after, replace range, remove range
//! - [`ChangeOrigin`]: the registration that produced a change, used for dedup
//! - [`ChangeSet`]: ordered copy-on-write sequence of pending changes
//! - [`apply_changes`]: stable `(offset, insertion index)` application
//! - [`ContentHash`]: Blake3 hash of a text snapshot
//!
//! # Example
//!
//! ```rust
//! use modreg_change::{apply_changes, Change, ChangeOrigin};
//!
//! let text = "declarations: [AppComponent]";
//! let end = text.find(']').unwrap();
//! let change = Change::insert_after(end, ", WidgetComponent", ChangeOrigin::Manual);
//!
//! let updated = apply_changes(text, &[change]).unwrap();
//! assert_eq!(updated, "declarations: [AppComponent, WidgetComponent]");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod apply;
mod change;
mod hash;

pub use apply::{apply_changes, ApplyError};
pub use change::{Change, ChangeKind, ChangeOrigin, ChangeSet};
pub use hash::ContentHash;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
