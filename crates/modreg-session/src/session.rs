//! Registration session
//!
//! A [`Session`] owns one parsed snapshot of a module file and the ordered
//! list of changes requested against it. Every mutation consults both the
//! snapshot and the pending changes, so repeating a request is a no-op. Pending
//! work is recognized by [`ChangeOrigin`], which keeps deduplication correct
//! after the list is overridden or discarded.

use crate::commit::{commit_changes, CommittedResult};
use crate::error::{SessionError, SessionResult};
use modreg_change::{Change, ChangeOrigin, ChangeSet, ContentHash};
use modreg_source::{
    locate_routes, locate_slot, router_module_declaration, DeclarationSelector, ImportEntry,
    RouterDeclaration, SlotLocation, SourceFile,
};
use modreg_workspace::{normalize_path, VirtualTree};

/// Session behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Prefix joined with module suffixes to build import specifiers
    pub import_base: String,
    /// Which declaration receives metadata entries
    pub selector: DeclarationSelector,
}

impl SessionConfig {
    /// Config with the given import base and the default selector
    #[must_use]
    pub fn with_import_base(import_base: impl Into<String>) -> Self {
        Self {
            import_base: import_base.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            import_base: ".".to_string(),
            selector: DeclarationSelector::default(),
        }
    }
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Snapshot parsed, nothing pending
    Parsed,
    /// Changes pending
    Accumulating,
    /// Last commit succeeded and nothing was added since
    Committed,
}

/// Mutation session over one module file
#[derive(Debug, Clone)]
pub struct Session {
    source: SourceFile,
    changes: ChangeSet,
    config: SessionConfig,
    state: SessionState,
    last_committed: Option<ContentHash>,
}

impl Session {
    /// Session over an already parsed snapshot
    #[must_use]
    pub fn new(source: SourceFile, config: SessionConfig) -> Self {
        tracing::info!(path = source.path(), hash = %source.hash().short(), "session created");
        Self {
            source,
            changes: ChangeSet::new(),
            config,
            state: SessionState::Parsed,
            last_committed: None,
        }
    }

    /// Read and parse `path` from the store
    ///
    /// # Errors
    /// [`SessionError::FileNotFound`] when absent, store and parse errors
    pub fn open(
        store: &impl VirtualTree,
        path: &str,
        config: SessionConfig,
    ) -> SessionResult<Self> {
        let path = normalize_path(path);
        let text = store.read_text(&path).map_err(SessionError::from_read)?;
        let source = SourceFile::parse(path, text)?;
        Ok(Self::new(source, config))
    }

    /// Path of the target file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        self.source.path()
    }

    /// The snapshot every change is computed against
    #[inline]
    #[must_use]
    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    /// Session behaviour
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Pending changes in insertion order
    ///
    /// The returned set is a snapshot; later mutations do not show through it.
    #[must_use]
    pub fn accumulated(&self) -> ChangeSet {
        self.changes.clone()
    }

    /// Replace the pending changes wholesale
    pub fn override_accumulated(&mut self, changes: ChangeSet) {
        tracing::debug!(path = self.path(), count = changes.len(), "pending changes overridden");
        self.changes = changes;
        self.state = if self.changes.is_empty() {
            self.idle_state()
        } else {
            SessionState::Accumulating
        };
    }

    /// Drop every pending change; the store is not touched
    pub fn discard_accumulated(&mut self) {
        tracing::debug!(
            path = self.path(),
            count = self.changes.len(),
            "pending changes discarded"
        );
        self.changes.clear();
        self.state = self.idle_state();
    }

    fn idle_state(&self) -> SessionState {
        if self.last_committed.is_some() {
            SessionState::Committed
        } else {
            SessionState::Parsed
        }
    }

    /// Import specifier for a suffix: the import base joined with `suffix`
    #[must_use]
    pub fn module_path(&self, suffix: Option<&str>) -> String {
        join_module_path(&self.config.import_base, suffix.unwrap_or_default())
    }

    fn record(&mut self, change: Change) -> Change {
        tracing::debug!(path = self.path(), change = change.description(), "change recorded");
        self.changes.push(change.clone());
        self.state = SessionState::Accumulating;
        change
    }

    /// Bind `entry` unless the snapshot or a pending change already does
    fn ensure_import(&mut self, entry: &ImportEntry) -> Option<Change> {
        if self.changes.contains_origin(&entry.origin()) {
            tracing::debug!(
                symbol = %entry.symbol,
                module = %entry.module,
                "import already pending"
            );
            return None;
        }
        let change = self
            .source
            .imports()
            .ensure_import(entry, self.changes.as_slice())?;
        Some(self.record(change))
    }

    /// Add an import statement for `symbol` from `module`, used verbatim
    pub fn add_import_only(
        &mut self,
        symbol: &str,
        module: &str,
        is_default: bool,
    ) -> Option<Change> {
        let entry = if is_default {
            ImportEntry::default_export(symbol, module)
        } else {
            ImportEntry::named(symbol, module)
        };
        self.ensure_import(&entry)
    }

    /// True when `symbol` is bound from the suffixed module, in the snapshot
    /// or by a pending change
    #[must_use]
    pub fn is_imported(&self, symbol: &str, module_suffix: Option<&str>) -> bool {
        let module = self.module_path(module_suffix);
        self.source.imports().is_imported(symbol, &module)
            || self.changes.contains_origin(&ChangeOrigin::Import {
                symbol: symbol.to_string(),
                module,
            })
    }

    /// Register `symbol` in a metadata slot and import it from the suffixed
    /// module
    ///
    /// Returns the changes recorded by this call: the import first, then the
    /// slot entry. Either is omitted when already present or pending.
    ///
    /// # Errors
    /// Resolver errors; the session is left untouched
    pub fn add_to_slot(
        &mut self,
        slot: &str,
        symbol: &str,
        module_suffix: Option<&str>,
    ) -> SessionResult<Vec<Change>> {
        let module = self.module_path(module_suffix);
        self.add_symbol_to_metadata(slot, symbol, Some(&module))
    }

    /// Register `symbol` in a metadata slot, importing it from `module` used
    /// verbatim, or not at all when `module` is `None`
    ///
    /// # Errors
    /// Resolver errors; the session is left untouched
    pub fn add_symbol_to_metadata(
        &mut self,
        slot: &str,
        symbol: &str,
        module: Option<&str>,
    ) -> SessionResult<Vec<Change>> {
        let location = locate_slot(&self.source, &self.config.selector, slot)?;

        let mut recorded = Vec::new();
        if let Some(module) = module {
            let entry = ImportEntry::named(root_identifier(symbol), module);
            recorded.extend(self.ensure_import(&entry));
        }
        recorded.extend(self.record_slot_entry(&location, symbol));
        Ok(recorded)
    }

    fn record_slot_entry(&mut self, location: &SlotLocation, symbol: &str) -> Option<Change> {
        let slot = location.slot.as_str();
        if location.contains(symbol) {
            tracing::debug!(slot, symbol, "entry already present");
            return None;
        }

        let pending_in_slot = |origin: &ChangeOrigin| match origin {
            ChangeOrigin::SlotEntry { slot: s, symbol: e } => s == slot && same_entry(e, symbol),
            ChangeOrigin::SlotCreation { slot: s, entries } => {
                s == slot && entries.iter().any(|e| same_entry(e, symbol))
            }
            _ => false,
        };
        if self.changes.iter().any(|c| pending_in_slot(c.origin())) {
            tracing::debug!(slot, symbol, "entry already pending");
            return None;
        }

        let creation = self.changes.position(|c| {
            matches!(c.origin(), ChangeOrigin::SlotCreation { slot: s, .. } if s == slot)
        });
        if location.point.creates_slot() {
            let previous = creation.and_then(|i| self.changes.get(i)).map(Change::origin);
            let mut entries = match previous {
                Some(ChangeOrigin::SlotCreation { entries, .. }) => entries.clone(),
                _ => Vec::new(),
            };
            entries.push(symbol.to_string());
            let origin = ChangeOrigin::SlotCreation {
                slot: slot.to_string(),
                entries: entries.clone(),
            };
            // Creations of other slots queued ahead of this one share its offset
            let ahead = creation.unwrap_or(self.changes.len());
            let pending = self.changes.as_slice()[..ahead]
                .iter()
                .filter(|c| matches!(c.origin(), ChangeOrigin::SlotCreation { .. }))
                .count();
            let change = location
                .point
                .creation_change(slot, &entries, pending, origin)
                .with_description(format!("create {slot} with [{}]", entries.join(", ")));

            if let Some(index) = creation {
                tracing::debug!(slot, symbol, "pending slot creation extended");
                self.changes.replace(index, change.clone());
                self.state = SessionState::Accumulating;
                return Some(change);
            }
            return Some(self.record(change));
        }

        let pending = self
            .changes
            .iter()
            .filter(|c| {
                matches!(c.origin(), ChangeOrigin::SlotEntry { slot: s, .. } if s == slot)
            })
            .count();
        let origin = ChangeOrigin::SlotEntry {
            slot: slot.to_string(),
            symbol: symbol.to_string(),
        };
        let change = location
            .point
            .entry_change(slot, symbol, pending, origin)
            .with_description(format!("add {symbol} to {slot}"));
        Some(self.record(change))
    }

    /// Add to `declarations`
    ///
    /// # Errors
    /// See [`Session::add_to_slot`]
    pub fn add_declaration(
        &mut self,
        symbol: &str,
        module_suffix: Option<&str>,
    ) -> SessionResult<Vec<Change>> {
        self.add_to_slot("declarations", symbol, module_suffix)
    }

    /// Add to `imports`
    ///
    /// # Errors
    /// See [`Session::add_to_slot`]
    pub fn add_import(
        &mut self,
        symbol: &str,
        module_suffix: Option<&str>,
    ) -> SessionResult<Vec<Change>> {
        self.add_to_slot("imports", symbol, module_suffix)
    }

    /// Add to `providers`
    ///
    /// # Errors
    /// See [`Session::add_to_slot`]
    pub fn add_provider(
        &mut self,
        symbol: &str,
        module_suffix: Option<&str>,
    ) -> SessionResult<Vec<Change>> {
        self.add_to_slot("providers", symbol, module_suffix)
    }

    /// Add to `exports`
    ///
    /// # Errors
    /// See [`Session::add_to_slot`]
    pub fn add_export(
        &mut self,
        symbol: &str,
        module_suffix: Option<&str>,
    ) -> SessionResult<Vec<Change>> {
        self.add_to_slot("exports", symbol, module_suffix)
    }

    /// Add to `bootstrap`
    ///
    /// # Errors
    /// See [`Session::add_to_slot`]
    pub fn add_bootstrap(
        &mut self,
        symbol: &str,
        module_suffix: Option<&str>,
    ) -> SessionResult<Vec<Change>> {
        self.add_to_slot("bootstrap", symbol, module_suffix)
    }

    /// Add to `entryComponents`
    ///
    /// Ivy ignores this slot; it is kept for older workspaces.
    ///
    /// # Errors
    /// See [`Session::add_to_slot`]
    pub fn add_entry_component(
        &mut self,
        symbol: &str,
        module_suffix: Option<&str>,
    ) -> SessionResult<Vec<Change>> {
        self.add_to_slot("entryComponents", symbol, module_suffix)
    }

    /// The router registration in the `imports` slot, if any
    ///
    /// # Errors
    /// Declaration errors from the resolver
    pub fn router_module_declaration(&self) -> SessionResult<Option<RouterDeclaration>> {
        Ok(router_module_declaration(&self.source, &self.config.selector)?)
    }

    /// Add a route literal to the router's routes array
    ///
    /// Identical literals, present or pending, are not added twice.
    ///
    /// # Errors
    /// `RouterModuleNotFound` / `RoutesNotResolvable` from the resolver
    pub fn add_route_declaration(&mut self, route_literal: &str) -> SessionResult<Option<Change>> {
        let location = locate_routes(&self.source, &self.config.selector)?;
        let literal = route_literal.trim();
        if location.contains(literal) {
            tracing::debug!(literal, "route already present");
            return Ok(None);
        }

        let mut pending = 0;
        for change in &self.changes {
            if let ChangeOrigin::Route { literal: existing } = change.origin() {
                if same_entry(existing, literal) {
                    tracing::debug!(literal, "route already pending");
                    return Ok(None);
                }
                pending += 1;
            }
        }

        let origin = ChangeOrigin::Route {
            literal: literal.to_string(),
        };
        let change = location
            .point
            .entry_change("routes", literal, pending, origin)
            .with_description("add route declaration");
        Ok(Some(self.record(change)))
    }

    /// Apply every pending change to the snapshot and write the file once
    ///
    /// The pending list is kept: committing again without new mutations
    /// writes the same text.
    ///
    /// # Errors
    /// Apply errors, [`SessionError::StaleSnapshot`] when another writer
    /// changed the file, store errors. Nothing is written on error.
    pub fn commit(&mut self, store: &mut impl VirtualTree) -> SessionResult<CommittedResult> {
        let result = commit_changes(store, &self.source, &self.changes, self.last_committed)?;
        self.last_committed = Some(result.after);
        self.state = SessionState::Committed;
        Ok(result)
    }

    /// Re-read and re-parse the file, dropping pending changes
    ///
    /// # Errors
    /// [`SessionError::FileNotFound`] when the file disappeared, parse errors
    pub fn refresh(&mut self, store: &impl VirtualTree) -> SessionResult<()> {
        let text = store.read_text(self.path()).map_err(SessionError::from_read)?;
        let source = SourceFile::parse(self.path(), text)?;
        tracing::info!(path = source.path(), hash = %source.hash().short(), "session refreshed");
        self.source = source;
        self.changes.clear();
        self.state = SessionState::Parsed;
        self.last_committed = None;
        Ok(())
    }
}

/// Identifier an entry expression refers to: `RouterModule.forRoot(x)`
/// imports `RouterModule`
fn root_identifier(symbol: &str) -> &str {
    symbol
        .split(['.', '(', '<'])
        .next()
        .map_or(symbol, str::trim)
}

fn same_entry(a: &str, b: &str) -> bool {
    a.chars()
        .filter(|c| !c.is_whitespace())
        .eq(b.chars().filter(|c| !c.is_whitespace()))
}

/// Join an import base with a suffix and normalize the result, keeping a
/// leading `./` or `../`
fn join_module_path(base: &str, suffix: &str) -> String {
    let combined = format!("{base}{suffix}");
    let absolute = combined.starts_with('/');
    let relative = combined == "." || combined.starts_with("./") || combined.starts_with("..");

    let mut parts: Vec<&str> = Vec::new();
    for part in combined.split('/') {
        match part {
            "" | "." => {}
            ".." if parts.last().is_some_and(|p| *p != "..") => {
                parts.pop();
            }
            ".." if absolute => {}
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if relative && joined.is_empty() {
        ".".to_string()
    } else if relative && !joined.starts_with("..") {
        format!("./{joined}")
    } else {
        joined
    }
}
