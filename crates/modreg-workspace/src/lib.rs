//! modreg workspace access
//!
//! The host side of a rewrite run: the file store the session reads from and
//! commits to, and the Angular workspace configuration that names the root
//! module of a project.
//!
//! # Core Concepts
//!
//! - [`VirtualTree`]: read / begin update / commit update, nothing else
//! - [`MemoryTree`]: in-memory store with a single-writer check at commit
//! - [`WorkspaceConfig`]: typed view of `angular.json`
//! - [`resolve_root_module_path`]: project → main file → bootstrapped module
//!
//! # Example
//!
//! ```rust
//! use modreg_workspace::{MemoryTree, VirtualTree};
//!
//! let mut tree =
//!     MemoryTree::new().with_file("src/app/app.module.ts", "export class AppModule {}");
//!
//! let mut update = tree.begin_update("/src/app/app.module.ts").unwrap();
//! update.overwrite("export class RootModule {}");
//! tree.commit_update(update).unwrap();
//!
//! assert_eq!(tree.read_text("src/app/app.module.ts").unwrap(), "export class RootModule {}");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod tree;

pub use config::{
    resolve_root_module_path, ConfigError, ProjectConfig, TargetConfig, TargetOptions,
    WorkspaceConfig, WORKSPACE_CONFIG_PATH,
};
pub use tree::{normalize_path, MemoryTree, StoreError, UpdateRecorder, VirtualTree};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
