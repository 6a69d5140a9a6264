//! Typed view over the tree-sitter TypeScript tree
//!
//! The resolver only cares about a handful of node kinds. [`Syntax`] closes
//! that set; everything else is [`Syntax::Other`]. Visitors receive classified
//! nodes in pre-order and steer the walk with [`Walk`].

use tree_sitter::Node;

/// Closed set of node kinds the resolver understands
#[derive(Debug, Clone, Copy)]
pub enum Syntax<'t> {
    /// `program`
    Program(Node<'t>),
    /// `import_statement`
    Import(Node<'t>),
    /// `decorator`
    Decorator(Node<'t>),
    /// `call_expression`
    Call(Node<'t>),
    /// `object` literal
    Object(Node<'t>),
    /// `pair` inside an object literal
    Pair(Node<'t>),
    /// `array` literal
    Array(Node<'t>),
    /// `variable_declarator`
    VariableDeclarator(Node<'t>),
    /// `string` literal
    Str(Node<'t>),
    /// `identifier`, `property_identifier`, `shorthand_property_identifier`
    Identifier(Node<'t>),
    /// Any other node
    Other(Node<'t>),
}

impl<'t> Syntax<'t> {
    /// Classify a tree-sitter node
    #[must_use]
    pub fn classify(node: Node<'t>) -> Self {
        match node.kind() {
            "program" => Self::Program(node),
            "import_statement" => Self::Import(node),
            "decorator" => Self::Decorator(node),
            "call_expression" => Self::Call(node),
            "object" => Self::Object(node),
            "pair" => Self::Pair(node),
            "array" => Self::Array(node),
            "variable_declarator" => Self::VariableDeclarator(node),
            "string" => Self::Str(node),
            "identifier" | "property_identifier" | "shorthand_property_identifier" => {
                Self::Identifier(node)
            }
            _ => Self::Other(node),
        }
    }

    /// Underlying node
    #[must_use]
    pub fn node(&self) -> Node<'t> {
        match *self {
            Self::Program(n)
            | Self::Import(n)
            | Self::Decorator(n)
            | Self::Call(n)
            | Self::Object(n)
            | Self::Pair(n)
            | Self::Array(n)
            | Self::VariableDeclarator(n)
            | Self::Str(n)
            | Self::Identifier(n)
            | Self::Other(n) => n,
        }
    }
}

/// Walk control returned by a visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Visit the children of this node
    Descend,
    /// Continue with the next sibling
    Skip,
    /// End the walk
    Stop,
}

/// Pre-order visitor over classified nodes
pub trait SyntaxVisitor<'t> {
    /// Visit one node
    fn visit(&mut self, syntax: Syntax<'t>) -> Walk;
}

/// Walk the subtree rooted at `root`
pub fn walk<'t, V: SyntaxVisitor<'t>>(root: Node<'t>, visitor: &mut V) {
    let mut cursor = root.walk();
    loop {
        match visitor.visit(Syntax::classify(cursor.node())) {
            Walk::Stop => return,
            Walk::Descend if cursor.goto_first_child() => continue,
            Walk::Descend | Walk::Skip => {}
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Tagged result of a structural lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// Exactly one match
    Found(T),
    /// No match
    NotFound,
    /// Several matches, in source order
    Ambiguous(Vec<T>),
}

impl<T> Lookup<T> {
    /// Tag a list of matches
    #[must_use]
    pub fn from_matches(mut matches: Vec<T>) -> Self {
        match matches.len() {
            0 => Self::NotFound,
            1 => matches.pop().map_or(Self::NotFound, Self::Found),
            _ => Self::Ambiguous(matches),
        }
    }

    /// The single match, or the first of several
    #[must_use]
    pub fn first(self) -> Option<T> {
        match self {
            Self::Found(item) => Some(item),
            Self::NotFound => None,
            Self::Ambiguous(items) => items.into_iter().next(),
        }
    }

    /// True for `NotFound`
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Named children, comments excluded
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

/// Source text of a node
pub(crate) fn text_of<'s>(source: &'s str, node: Node<'_>) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// Value of a string literal without its quotes
pub(crate) fn string_value(source: &str, node: Node<'_>) -> String {
    let raw = text_of(source, node);
    let mut chars = raw.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) if open == close && matches!(open, '\'' | '"' | '`') => {
            chars.as_str().to_string()
        }
        _ => raw.to_string(),
    }
}

/// Text with every whitespace character removed, for structural comparison
pub(crate) fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Line break and indentation of `offset` when only whitespace precedes it on
/// its line, e.g. `("\n", "    ")`
pub(crate) fn own_line_indent(source: &str, offset: usize) -> Option<(&'static str, &str)> {
    let before = source.get(..offset)?;
    let line_start = before.rfind('\n')?;
    let indent = &before[line_start + 1..];
    if !indent.chars().all(char::is_whitespace) {
        return None;
    }
    let newline = if before[..line_start].ends_with('\r') {
        "\r\n"
    } else {
        "\n"
    };
    Some((newline, indent))
}

/// Separator to place after the node starting at `start` before a new sibling
pub(crate) fn list_separator(source: &str, start: usize) -> String {
    match own_line_indent(source, start) {
        Some((newline, indent)) => format!(",{newline}{indent}"),
        None => ", ".to_string(),
    }
}
