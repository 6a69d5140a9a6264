//! Per-run session cache
//!
//! One [`Session`] per normalized path, created on first request and kept for
//! the rest of the run. Callers targeting the same file share one snapshot and
//! one change list, which lets independent registrations land in one write.

use crate::commit::CommittedResult;
use crate::error::SessionResult;
use crate::session::{Session, SessionConfig};
use indexmap::map::Entry;
use indexmap::IndexMap;
use modreg_workspace::{normalize_path, resolve_root_module_path, VirtualTree};

/// Caller-owned map from path to session
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    config: SessionConfig,
    sessions: IndexMap<String, Session>,
}

impl SessionCache {
    /// Empty cache; sessions it creates use `config`
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: IndexMap::new(),
        }
    }

    /// Session for `path`, parsing it from the store on first request
    ///
    /// # Errors
    /// `FileNotFound` and parse errors on first request
    pub fn session(&mut self, store: &impl VirtualTree, path: &str) -> SessionResult<&mut Session> {
        match self.sessions.entry(normalize_path(path)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let session = Session::open(store, entry.key(), self.config.clone())?;
                Ok(entry.insert(session))
            }
        }
    }

    /// Session for the root module of `project` (or the default project)
    ///
    /// # Errors
    /// Configuration errors, then as [`SessionCache::session`]
    pub fn root_session(
        &mut self,
        store: &impl VirtualTree,
        project: Option<&str>,
    ) -> SessionResult<&mut Session> {
        let path = resolve_root_module_path(store, project)?;
        self.session(store, &path)
    }

    /// Cached session for `path`, without touching the store
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Session> {
        self.sessions.get(&normalize_path(path))
    }

    /// Cached paths in creation order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    /// Number of cached sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session was created yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Commit every session with pending changes, in creation order
    ///
    /// Stops at the first error; sessions committed before it stay committed.
    ///
    /// # Errors
    /// The first commit error
    pub fn commit_all(
        &mut self,
        store: &mut impl VirtualTree,
    ) -> SessionResult<Vec<CommittedResult>> {
        let mut results = Vec::new();
        for session in self.sessions.values_mut() {
            if session.accumulated().is_empty() {
                continue;
            }
            results.push(session.commit(store)?);
        }
        Ok(results)
    }

    /// Drop every cached session
    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}
