//! modreg source snapshots
//!
//! Parses TypeScript module files once with tree-sitter and answers structural
//! questions against the snapshot: which imports exist, where the decorated
//! declaration sits, and where a new entry belongs in one of its metadata
//! slots.
//!
//! # Core Concepts
//!
//! - [`SourceFile`]: immutable parsed snapshot with its import table
//! - [`ImportTable`]: import declarations and the minimal import edit
//! - [`DeclarationSelector`]: which decorator marks the target declaration
//! - [`locate_slot`]: resolve a metadata slot to an [`InsertionPoint`]
//! - [`locate_routes`]: resolve the routes array of a router registration
//!
//! # Example
//!
//! ```rust
//! use modreg_change::{apply_changes, ChangeOrigin};
//! use modreg_source::{locate_slot, DeclarationSelector, SourceFile};
//!
//! let text = "@NgModule({declarations: [AppComponent]})\nexport class AppModule {}\n";
//! let source = SourceFile::parse("app.module.ts", text).unwrap();
//!
//! let slot = locate_slot(&source, &DeclarationSelector::default(), "declarations").unwrap();
//! let change = slot
//!     .point
//!     .entry_change("declarations", "WidgetComponent", 0, ChangeOrigin::Manual);
//!
//! let updated = apply_changes(source.text(), &[change]).unwrap();
//! assert!(updated.contains("[AppComponent, WidgetComponent]"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod imports;
mod resolver;
mod source_file;
mod syntax;

pub use imports::{Binding, ImportDecl, ImportEntry, ImportTable};
pub use resolver::{
    describe_declaration, is_symbol_present, locate_routes, locate_slot,
    router_module_declaration, DeclarationInfo, DeclarationSelector, InsertionPoint,
    ResolveError, RouterDeclaration, SlotLocation, ANGULAR_CORE,
};
pub use source_file::{ParseError, SourceFile};
pub use syntax::{walk, Lookup, Syntax, SyntaxVisitor, Walk};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
