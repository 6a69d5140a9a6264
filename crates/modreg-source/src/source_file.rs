//! Parsed source snapshots
//!
//! A [`SourceFile`] is parsed once with tree-sitter and never re-parsed. Every
//! offset a resolver hands out is a byte offset into [`SourceFile::text`].

use crate::imports::ImportTable;
use modreg_change::ContentHash;
use std::fmt;
use tree_sitter::{Node, Parser, Tree};

/// Errors creating a snapshot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The TypeScript grammar could not be loaded
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// tree-sitter returned no tree
    #[error("parse failed for {path}")]
    ParseFailed { path: String },
}

/// Immutable parsed representation of one file
#[derive(Clone)]
pub struct SourceFile {
    path: String,
    text: String,
    tree: Tree,
    hash: ContentHash,
    imports: ImportTable,
}

impl SourceFile {
    /// Parse TypeScript source text
    ///
    /// Syntax errors do not fail the parse; tree-sitter recovers and the
    /// resolver works on whatever structure survived.
    ///
    /// # Errors
    /// Returns error if the grammar cannot be loaded or tree-sitter gives up
    pub fn parse(path: impl Into<String>, text: impl Into<String>) -> Result<Self, ParseError> {
        let path = path.into();
        let text = text.into();

        let language: tree_sitter::Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| ParseError::ParserInit(e.to_string()))?;

        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| ParseError::ParseFailed { path: path.clone() })?;

        if tree.root_node().has_error() {
            tracing::debug!(%path, "source contains syntax errors, continuing with recovered tree");
        }

        let imports = ImportTable::from_tree(&tree, &text);
        let hash = ContentHash::compute(text.as_bytes());

        Ok(Self {
            path,
            text,
            tree,
            hash,
            imports,
        })
    }

    /// File path the snapshot was read from
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Syntax tree
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Root `program` node
    #[inline]
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Hash of the raw text
    #[inline]
    #[must_use]
    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    /// Import declarations found at parse time
    #[inline]
    #[must_use]
    pub fn imports(&self) -> &ImportTable {
        &self.imports
    }

    /// Text of a node from this snapshot
    #[inline]
    #[must_use]
    pub fn node_text(&self, node: Node<'_>) -> &str {
        crate::syntax::text_of(&self.text, node)
    }

    /// True when tree-sitter had to recover from syntax errors
    #[inline]
    #[must_use]
    pub fn has_syntax_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("path", &self.path)
            .field("len", &self.text.len())
            .field("hash", &self.hash.short())
            .field("imports", &self.imports.len())
            .finish_non_exhaustive()
    }
}
