//! modreg registration sessions
//!
//! Accumulates registrations against one parsed snapshot of a module file
//! and writes them back in a single atomic update.
//!
//! # Core Concepts
//!
//! - [`Session`]: one snapshot, one ordered change list, idempotent mutations
//! - [`SessionCache`]: explicit per-run map from path to session
//! - [`CommittedResult`]: what a commit wrote, with before/after hashes
//! - [`SessionError`]: every lower error, wrapped for `?`
//!
//! # Example
//!
//! ```rust
//! use modreg_session::{SessionCache, SessionConfig};
//! use modreg_workspace::{MemoryTree, VirtualTree};
//!
//! let mut tree = MemoryTree::new().with_file(
//!     "/src/app/app.module.ts",
//!     "@NgModule({declarations: [AppComponent]})\nexport class AppModule {}\n",
//! );
//! let mut cache = SessionCache::new(SessionConfig::default());
//!
//! let session = cache.session(&tree, "/src/app/app.module.ts").unwrap();
//! session.add_declaration("WidgetComponent", Some("/widget.component")).unwrap();
//! session.commit(&mut tree).unwrap();
//!
//! let text = tree.read_text("/src/app/app.module.ts").unwrap();
//! assert!(text.starts_with("import { WidgetComponent } from './widget.component';\n"));
//! assert!(text.contains("declarations: [AppComponent, WidgetComponent]"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod cache;
mod commit;
mod error;
mod session;

pub use cache::SessionCache;
pub use commit::CommittedResult;
pub use error::{SessionError, SessionResult};
pub use session::{Session, SessionConfig, SessionState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
