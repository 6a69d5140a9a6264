//! Import table
//!
//! Typed view of the snapshot's `import` statements and the policy for adding
//! a binding. Deduplication is on the exact `(symbol, module)` pair: a symbol
//! bound from another module under the same name is a different import.

use crate::syntax::{named_children, string_value, text_of, walk, Syntax, SyntaxVisitor, Walk};
use modreg_change::{Change, ChangeOrigin};
use std::ops::Range;
use tree_sitter::{Node, Tree};

/// A requested import binding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportEntry {
    /// Local name of the binding
    pub symbol: String,
    /// Module specifier, e.g. `./widget.component`
    pub module: String,
    /// `import Symbol from` instead of `import { Symbol } from`
    pub is_default: bool,
}

impl ImportEntry {
    /// Named import request
    #[must_use]
    pub fn named(symbol: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            module: module.into(),
            is_default: false,
        }
    }

    /// Default import request
    #[must_use]
    pub fn default_export(symbol: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            module: module.into(),
            is_default: true,
        }
    }

    /// Origin tag for changes adding this binding
    #[must_use]
    pub fn origin(&self) -> ChangeOrigin {
        ChangeOrigin::Import {
            symbol: self.symbol.clone(),
            module: self.module.clone(),
        }
    }

    /// Statement text binding this entry
    #[must_use]
    pub fn statement(&self) -> String {
        if self.is_default {
            format!("import {} from '{}'", self.symbol, self.module)
        } else {
            format!("import {{ {} }} from '{}'", self.symbol, self.module)
        }
    }
}

/// One binding inside an import clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Exported name
    pub imported: String,
    /// Name bound in this file (alias if any)
    pub local: String,
    /// Byte range of the specifier
    pub span: Range<usize>,
}

/// One `import ... from '...'` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Module specifier without quotes
    pub module: String,
    /// Byte range of the quoted module specifier
    pub module_span: Range<usize>,
    /// Default binding
    pub default: Option<Binding>,
    /// Named bindings in source order
    pub named: Vec<Binding>,
    /// Byte range of `{ ... }`, when present
    pub braces: Option<Range<usize>>,
    /// Local name of `* as name`
    pub namespace: Option<String>,
    /// `import type ...`
    pub type_only: bool,
    /// Byte range of the whole statement
    pub span: Range<usize>,
}

impl ImportDecl {
    /// True when the statement binds `symbol` as a value
    #[must_use]
    pub fn binds(&self, symbol: &str) -> bool {
        !self.type_only
            && (self.default.as_ref().is_some_and(|b| b.local == symbol)
                || self.named.iter().any(|b| b.local == symbol))
    }

    fn from_node(source: &str, node: Node<'_>) -> Option<Self> {
        let module_node = node.child_by_field_name("source")?;
        let mut decl = Self {
            module: string_value(source, module_node),
            module_span: module_node.byte_range(),
            default: None,
            named: Vec::new(),
            braces: None,
            namespace: None,
            type_only: false,
            span: node.byte_range(),
        };

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "type" => decl.type_only = true,
                "import_clause" => decl.read_clause(source, child),
                _ => {}
            }
        }
        Some(decl)
    }

    fn read_clause(&mut self, source: &str, clause: Node<'_>) {
        for part in named_children(clause) {
            match part.kind() {
                "identifier" => {
                    let name = text_of(source, part).to_string();
                    self.default = Some(Binding {
                        imported: "default".to_string(),
                        local: name,
                        span: part.byte_range(),
                    });
                }
                "namespace_import" => {
                    self.namespace = named_children(part)
                        .last()
                        .map(|n| text_of(source, *n).to_string());
                }
                "named_imports" => {
                    self.braces = Some(part.byte_range());
                    self.named = named_children(part)
                        .into_iter()
                        .filter(|s| s.kind() == "import_specifier")
                        .filter_map(|s| Self::read_specifier(source, s))
                        .collect();
                }
                _ => {}
            }
        }
    }

    fn read_specifier(source: &str, specifier: Node<'_>) -> Option<Binding> {
        let name = specifier.child_by_field_name("name")?;
        let imported = match name.kind() {
            "string" => string_value(source, name),
            _ => text_of(source, name).to_string(),
        };
        let local = specifier
            .child_by_field_name("alias")
            .map_or_else(|| imported.clone(), |alias| text_of(source, alias).to_string());
        Some(Binding {
            imported,
            local,
            span: specifier.byte_range(),
        })
    }
}

/// Import statements of one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    decls: Vec<ImportDecl>,
    use_strict_end: Option<usize>,
}

struct ImportCollector<'s> {
    source: &'s str,
    decls: Vec<ImportDecl>,
}

impl<'t> SyntaxVisitor<'t> for ImportCollector<'_> {
    fn visit(&mut self, syntax: Syntax<'t>) -> Walk {
        match syntax {
            Syntax::Program(_) => Walk::Descend,
            Syntax::Import(node) => {
                if let Some(decl) = ImportDecl::from_node(self.source, node) {
                    self.decls.push(decl);
                }
                Walk::Skip
            }
            _ => Walk::Skip,
        }
    }
}

impl ImportTable {
    /// Collect top-level imports from a parsed tree
    #[must_use]
    pub fn from_tree(tree: &Tree, source: &str) -> Self {
        let root = tree.root_node();
        let mut collector = ImportCollector {
            source,
            decls: Vec::new(),
        };
        walk(root, &mut collector);

        Self {
            decls: collector.decls,
            use_strict_end: use_strict_directive(source, root),
        }
    }

    /// All import statements in source order
    #[inline]
    #[must_use]
    pub fn declarations(&self) -> &[ImportDecl] {
        &self.decls
    }

    /// Number of import statements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// True when the file has no import statements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Every value binding as an entry
    #[must_use]
    pub fn entries(&self) -> Vec<ImportEntry> {
        self.decls
            .iter()
            .filter(|d| !d.type_only)
            .flat_map(|d| {
                let default = d
                    .default
                    .iter()
                    .map(|b| ImportEntry::default_export(b.local.clone(), d.module.clone()));
                let named = d
                    .named
                    .iter()
                    .map(|b| ImportEntry::named(b.local.clone(), d.module.clone()));
                default.chain(named).collect::<Vec<_>>()
            })
            .collect()
    }

    /// True when `symbol` is bound from exactly `module`
    #[must_use]
    pub fn is_imported(&self, symbol: &str, module: &str) -> bool {
        self.decls
            .iter()
            .any(|d| d.module == module && d.binds(symbol))
    }

    /// Local names bound to `export` of `module`, aliases included
    #[must_use]
    pub fn local_names(&self, export: &str, module: &str) -> Vec<String> {
        self.decls
            .iter()
            .filter(|d| d.module == module && !d.type_only)
            .flat_map(|d| d.named.iter())
            .filter(|b| b.imported == export)
            .map(|b| b.local.clone())
            .collect()
    }

    /// Module a local binding is imported from
    #[must_use]
    pub fn module_of(&self, local: &str) -> Option<&str> {
        self.decls
            .iter()
            .find(|d| d.binds(local))
            .map(|d| d.module.as_str())
    }

    /// Change needed to bind `entry`, or `None` when the snapshot has it
    ///
    /// Named bindings merge into an existing `{ ... }` clause of the same
    /// module. Everything else becomes a new statement after the last import,
    /// after a `'use strict'` directive, or at the top of the file.
    ///
    /// `pending` holds changes already queued against this snapshot. An empty
    /// `{}` clause takes one merged binding; later ones become new statements.
    #[must_use]
    pub fn ensure_import(&self, entry: &ImportEntry, pending: &[Change]) -> Option<Change> {
        if self.is_imported(&entry.symbol, &entry.module) {
            tracing::debug!(
                symbol = %entry.symbol,
                module = %entry.module,
                "import already present"
            );
            return None;
        }

        if !entry.is_default {
            if let Some(change) = self.merge_into_clause(entry, pending) {
                return Some(change);
            }
        }

        let statement = entry.statement();
        let origin = entry.origin();
        let change = match (self.decls.last(), self.use_strict_end) {
            (Some(last), _) => {
                Change::insert_after(last.module_span.end, format!(";\n{statement}"), origin)
            }
            (None, Some(end)) => Change::insert_after(end, format!(";\n{statement}"), origin),
            (None, None) => Change::insert_before(0, format!("{statement};\n"), origin),
        };
        Some(change.with_description(format!(
            "add import of {} from '{}'",
            entry.symbol, entry.module
        )))
    }

    fn merge_into_clause(&self, entry: &ImportEntry, pending: &[Change]) -> Option<Change> {
        let decl = self
            .decls
            .iter()
            .find(|d| d.module == entry.module && !d.type_only && d.braces.is_some())?;

        let change = match (decl.named.last(), &decl.braces) {
            (Some(last), _) => {
                Change::insert_after(last.span.end, format!(", {}", entry.symbol), entry.origin())
            }
            (None, Some(braces)) => {
                let offset = braces.end - 1;
                let filled = pending.iter().any(|c| {
                    c.offset() == offset && matches!(c.origin(), ChangeOrigin::Import { .. })
                });
                if filled {
                    return None;
                }
                Change::insert_before(offset, format!(" {} ", entry.symbol), entry.origin())
            }
            (None, None) => return None,
        };
        Some(change.with_description(format!(
            "add {} to existing import from '{}'",
            entry.symbol, entry.module
        )))
    }
}

fn use_strict_directive(source: &str, root: Node<'_>) -> Option<usize> {
    let first = named_children(root).into_iter().next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = named_children(first).into_iter().next()?;
    (literal.kind() == "string" && string_value(source, literal) == "use strict")
        .then(|| literal.end_byte())
}
