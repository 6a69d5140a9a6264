//! Symbol resolver
//!
//! Locates the target declaration (the first class decorated with the
//! selected decorator), its metadata object, and a named array slot inside it.
//! Every location is expressed as an [`InsertionPoint`] against the snapshot,
//! so callers can build changes without touching the tree again.

use crate::source_file::SourceFile;
use crate::syntax::{
    compact, list_separator, named_children, string_value, text_of, walk, Lookup, Syntax,
    SyntaxVisitor, Walk,
};
use modreg_change::{Change, ChangeOrigin};
use std::ops::Range;
use tree_sitter::Node;

/// Module the default decorator is imported from
pub const ANGULAR_CORE: &str = "@angular/core";

/// Errors resolving structure in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No declaration carries the decorator
    #[error("no declaration decorated with @{decorator} in {path}")]
    DeclarationNotFound { decorator: String, path: String },

    /// The decorator argument is not an object literal
    #[error("@{decorator} metadata in {path} is not an object literal")]
    MetadataNotObject { decorator: String, path: String },

    /// The slot exists but its value is not an array literal
    #[error("metadata property '{slot}' is not an array literal")]
    SlotNotArray { slot: String },

    /// No `RouterModule.forRoot/forChild` in the `imports` slot
    #[error("no RouterModule declaration found in {path}")]
    RouterModuleNotFound { path: String },

    /// The router's routes could not be traced to an array literal
    #[error("routes not resolvable: {reason}")]
    RoutesNotResolvable { reason: String },
}

/// Selects the target declaration: the first one decorated with
/// `@decorator(...)`
///
/// With a module set, local aliases of the decorator imported from that module
/// match as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSelector {
    decorator: String,
    module: Option<String>,
}

impl DeclarationSelector {
    /// Match the decorator by name only
    #[must_use]
    pub fn new(decorator: impl Into<String>) -> Self {
        Self {
            decorator: decorator.into(),
            module: None,
        }
    }

    /// Match the decorator by name or by alias imported from `module`
    #[must_use]
    pub fn from_module(decorator: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            decorator: decorator.into(),
            module: Some(module.into()),
        }
    }

    /// `@NgModule` from `@angular/core`
    #[must_use]
    pub fn ng_module() -> Self {
        Self::from_module("NgModule", ANGULAR_CORE)
    }

    /// Decorator name
    #[must_use]
    pub fn decorator(&self) -> &str {
        &self.decorator
    }

    fn local_names(&self, source: &SourceFile) -> Vec<String> {
        let mut names = vec![self.decorator.clone()];
        if let Some(module) = &self.module {
            names.extend(source.imports().local_names(&self.decorator, module));
        }
        names
    }
}

impl Default for DeclarationSelector {
    fn default() -> Self {
        Self::ng_module()
    }
}

/// Owned summary of the target declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationInfo {
    /// Name of the decorated class, if it has one
    pub class_name: Option<String>,
    /// Byte range of the decorator
    pub decorator_span: Range<usize>,
    /// Byte range of the metadata object literal
    pub metadata_span: Range<usize>,
}

/// Where and how a new entry goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertionPoint {
    /// Non-empty array: after the last element, preceded by `separator`
    AppendToArray { offset: usize, separator: String },
    /// Empty array: just before `]`
    FillEmptyArray { offset: usize },
    /// Before an element that must stay last, followed by `separator`
    PrependToElement { offset: usize, separator: String },
    /// Slot absent: create `<prefix><slot>: [<entries>]`
    CreateSlot {
        offset: usize,
        prefix: String,
        attach_after: bool,
    },
}

impl InsertionPoint {
    /// Change adding one entry
    ///
    /// `pending` counts entries already queued at this point, so a second
    /// entry in an empty array gets its separator.
    #[must_use]
    pub fn entry_change(
        &self,
        slot: &str,
        entry: &str,
        pending: usize,
        origin: ChangeOrigin,
    ) -> Change {
        match self {
            Self::AppendToArray { offset, separator } => {
                Change::insert_after(*offset, format!("{separator}{entry}"), origin)
            }
            Self::FillEmptyArray { offset } => {
                let lead = if pending == 0 { "" } else { ", " };
                Change::insert_before(*offset, format!("{lead}{entry}"), origin)
            }
            Self::PrependToElement { offset, separator } => {
                Change::insert_before(*offset, format!("{entry}{separator}"), origin)
            }
            Self::CreateSlot { .. } => {
                self.creation_change(slot, &[entry.to_string()], pending, origin)
            }
        }
    }

    /// Change creating the slot with `entries`; other points append the
    /// entries one by one
    ///
    /// `pending` counts other slots created earlier at this point. In an empty
    /// metadata object every creation shares the offset before `}`, so all but
    /// the first need a leading separator.
    #[must_use]
    pub fn creation_change(
        &self,
        slot: &str,
        entries: &[String],
        pending: usize,
        origin: ChangeOrigin,
    ) -> Change {
        match self {
            Self::CreateSlot {
                offset,
                prefix,
                attach_after,
            } => {
                let lead = if prefix.is_empty() && pending > 0 { ", " } else { prefix.as_str() };
                let text = format!("{lead}{slot}: [{}]", entries.join(", "));
                if *attach_after {
                    Change::insert_after(*offset, text, origin)
                } else {
                    Change::insert_before(*offset, text, origin)
                }
            }
            _ => {
                let joined = entries.join(", ");
                self.entry_change(slot, &joined, pending, origin)
            }
        }
    }

    /// Byte offset the point anchors to
    #[must_use]
    pub fn offset(&self) -> usize {
        match self {
            Self::AppendToArray { offset, .. }
            | Self::FillEmptyArray { offset }
            | Self::PrependToElement { offset, .. }
            | Self::CreateSlot { offset, .. } => *offset,
        }
    }

    /// True when the slot has to be created
    #[must_use]
    pub fn creates_slot(&self) -> bool {
        matches!(self, Self::CreateSlot { .. })
    }
}

/// A resolved array slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotLocation {
    /// Slot name
    pub slot: String,
    /// Existing entries, whitespace removed
    pub existing: Vec<String>,
    /// Where new entries go
    pub point: InsertionPoint,
}

impl SlotLocation {
    /// True when `symbol` is already an entry
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        let wanted = compact(symbol);
        self.existing.iter().any(|e| *e == wanted)
    }
}

/// The router registration in the `imports` slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterDeclaration {
    /// Source text, e.g. `RouterModule.forRoot(routes)`
    pub text: String,
    /// `forRoot` or `forChild`
    pub method: String,
    /// Byte range of the call
    pub span: Range<usize>,
}

struct Declaration<'t> {
    decorator: Node<'t>,
    metadata: Node<'t>,
}

struct DecoratorFinder<'s, 't> {
    source: &'s str,
    names: Vec<String>,
    found: Option<(Node<'t>, Node<'t>)>,
}

impl<'t> SyntaxVisitor<'t> for DecoratorFinder<'_, 't> {
    fn visit(&mut self, syntax: Syntax<'t>) -> Walk {
        let Syntax::Decorator(node) = syntax else {
            return Walk::Descend;
        };
        let call = named_children(node)
            .into_iter()
            .find(|child| child.kind() == "call_expression");
        if let Some(call) = call {
            let callee = call
                .child_by_field_name("function")
                .map(|f| text_of(self.source, f));
            if callee.is_some_and(|name| self.names.iter().any(|n| n == name)) {
                self.found = Some((node, call));
                return Walk::Stop;
            }
        }
        Walk::Skip
    }
}

fn locate_declaration<'t>(
    source: &'t SourceFile,
    selector: &DeclarationSelector,
) -> Result<Declaration<'t>, ResolveError> {
    let mut finder = DecoratorFinder {
        source: source.text(),
        names: selector.local_names(source),
        found: None,
    };
    walk(source.root(), &mut finder);

    let (decorator, call) = finder.found.ok_or_else(|| ResolveError::DeclarationNotFound {
        decorator: selector.decorator.clone(),
        path: source.path().to_string(),
    })?;

    let metadata = call
        .child_by_field_name("arguments")
        .and_then(|args| named_children(args).into_iter().next())
        .filter(|arg| arg.kind() == "object")
        .ok_or_else(|| ResolveError::MetadataNotObject {
            decorator: selector.decorator.clone(),
            path: source.path().to_string(),
        })?;

    Ok(Declaration { decorator, metadata })
}

/// Resolve the target declaration
///
/// # Errors
/// [`ResolveError::DeclarationNotFound`] or [`ResolveError::MetadataNotObject`]
pub fn describe_declaration(
    source: &SourceFile,
    selector: &DeclarationSelector,
) -> Result<DeclarationInfo, ResolveError> {
    let decl = locate_declaration(source, selector)?;
    Ok(DeclarationInfo {
        class_name: class_name(source, decl.decorator),
        decorator_span: decl.decorator.byte_range(),
        metadata_span: decl.metadata.byte_range(),
    })
}

fn class_name(source: &SourceFile, decorator: Node<'_>) -> Option<String> {
    let parent = decorator.parent()?;
    let class = match parent.kind() {
        "export_statement" => parent.child_by_field_name("declaration")?,
        _ => parent,
    };
    class
        .child_by_field_name("name")
        .map(|name| source.node_text(name).to_string())
}

/// Property name of an object member, for `pair` and shorthand members
fn property_name(source: &str, member: Node<'_>) -> Option<String> {
    match member.kind() {
        "pair" => {
            let key = member.child_by_field_name("key")?;
            match key.kind() {
                "string" => Some(string_value(source, key)),
                _ => Some(text_of(source, key).to_string()),
            }
        }
        "shorthand_property_identifier" => Some(text_of(source, member).to_string()),
        _ => None,
    }
}

fn array_location(source: &str, slot: &str, array: Node<'_>) -> SlotLocation {
    let elements = named_children(array);
    let existing = elements.iter().map(|e| compact(text_of(source, *e))).collect();
    let point = match elements.last() {
        Some(last) => InsertionPoint::AppendToArray {
            offset: last.end_byte(),
            separator: list_separator(source, last.start_byte()),
        },
        None => InsertionPoint::FillEmptyArray {
            offset: array.end_byte().saturating_sub(1),
        },
    };
    SlotLocation {
        slot: slot.to_string(),
        existing,
        point,
    }
}

fn find_slot<'t>(source: &str, metadata: Node<'t>, slot: &str) -> Lookup<Node<'t>> {
    Lookup::from_matches(
        named_children(metadata)
            .into_iter()
            .filter(|member| property_name(source, *member).as_deref() == Some(slot))
            .collect(),
    )
}

/// Locate a metadata slot of the target declaration
///
/// An absent slot resolves to [`InsertionPoint::CreateSlot`], so it is handled
/// exactly like an empty one by callers.
///
/// # Errors
/// Declaration errors from [`describe_declaration`], and
/// [`ResolveError::SlotNotArray`] when the slot is not an array literal
pub fn locate_slot(
    source: &SourceFile,
    selector: &DeclarationSelector,
    slot: &str,
) -> Result<SlotLocation, ResolveError> {
    let text = source.text();
    let decl = locate_declaration(source, selector)?;

    let member = match find_slot(text, decl.metadata, slot) {
        Lookup::Found(member) => member,
        Lookup::Ambiguous(members) => {
            tracing::warn!(
                slot,
                count = members.len(),
                "slot declared more than once, using the first"
            );
            members[0]
        }
        Lookup::NotFound => {
            let point = match named_children(decl.metadata).last() {
                Some(last) => InsertionPoint::CreateSlot {
                    offset: last.end_byte(),
                    prefix: list_separator(text, last.start_byte()),
                    attach_after: true,
                },
                None => InsertionPoint::CreateSlot {
                    offset: decl.metadata.end_byte().saturating_sub(1),
                    prefix: String::new(),
                    attach_after: false,
                },
            };
            return Ok(SlotLocation {
                slot: slot.to_string(),
                existing: Vec::new(),
                point,
            });
        }
    };

    let array = member
        .child_by_field_name("value")
        .filter(|value| value.kind() == "array")
        .ok_or_else(|| ResolveError::SlotNotArray {
            slot: slot.to_string(),
        })?;

    Ok(array_location(text, slot, array))
}

/// True when `symbol` is already an entry of `slot`
///
/// # Errors
/// Same as [`locate_slot`]
pub fn is_symbol_present(
    source: &SourceFile,
    selector: &DeclarationSelector,
    slot: &str,
    symbol: &str,
) -> Result<bool, ResolveError> {
    Ok(locate_slot(source, selector, slot)?.contains(symbol))
}

fn router_call<'t>(
    source: &'t SourceFile,
    selector: &DeclarationSelector,
) -> Result<Option<(Node<'t>, String)>, ResolveError> {
    let text = source.text();
    let decl = locate_declaration(source, selector)?;
    let Some(member) = find_slot(text, decl.metadata, "imports").first() else {
        return Ok(None);
    };
    let Some(array) = member
        .child_by_field_name("value")
        .filter(|value| value.kind() == "array")
    else {
        return Ok(None);
    };

    for element in named_children(array) {
        if element.kind() != "call_expression" {
            continue;
        }
        let Some(callee) = element
            .child_by_field_name("function")
            .filter(|f| f.kind() == "member_expression")
        else {
            continue;
        };
        let object = callee.child_by_field_name("object").map(|o| text_of(text, o));
        let method = callee.child_by_field_name("property").map(|p| text_of(text, p));
        if let (Some("RouterModule"), Some(method @ ("forRoot" | "forChild"))) = (object, method) {
            return Ok(Some((element, method.to_string())));
        }
    }
    Ok(None)
}

/// The `RouterModule.forRoot(...)` / `forChild(...)` entry of `imports`
///
/// # Errors
/// Declaration errors from [`describe_declaration`]
pub fn router_module_declaration(
    source: &SourceFile,
    selector: &DeclarationSelector,
) -> Result<Option<RouterDeclaration>, ResolveError> {
    Ok(router_call(source, selector)?.map(|(call, method)| RouterDeclaration {
        text: source.node_text(call).to_string(),
        method,
        span: call.byte_range(),
    }))
}

struct ArrayBinding<'s, 't> {
    source: &'s str,
    name: &'s str,
    found: Option<Node<'t>>,
}

impl<'t> SyntaxVisitor<'t> for ArrayBinding<'_, 't> {
    fn visit(&mut self, syntax: Syntax<'t>) -> Walk {
        let Syntax::VariableDeclarator(node) = syntax else {
            return Walk::Descend;
        };
        let named = node
            .child_by_field_name("name")
            .is_some_and(|n| text_of(self.source, n) == self.name);
        let array = node
            .child_by_field_name("value")
            .filter(|v| v.kind() == "array");
        match (named, array) {
            (true, Some(array)) => {
                self.found = Some(array);
                Walk::Stop
            }
            _ => Walk::Descend,
        }
    }
}

fn is_wildcard_route(source: &str, element: Node<'_>) -> bool {
    element.kind() == "object"
        && named_children(element).into_iter().any(|member| {
            property_name(source, member).as_deref() == Some("path")
                && member
                    .child_by_field_name("value")
                    .is_some_and(|v| v.kind() == "string" && string_value(source, v) == "**")
        })
}

/// Locate the routes array of the router registration
///
/// Inline arrays (`forRoot([...])`) and identifiers bound to an array literal
/// in the same file are supported. New routes go before a wildcard route.
///
/// # Errors
/// [`ResolveError::RouterModuleNotFound`] when there is no router
/// registration, [`ResolveError::RoutesNotResolvable`] when its argument
/// cannot be traced to an array literal
pub fn locate_routes(
    source: &SourceFile,
    selector: &DeclarationSelector,
) -> Result<SlotLocation, ResolveError> {
    let text = source.text();
    let (call, _) =
        router_call(source, selector)?.ok_or_else(|| ResolveError::RouterModuleNotFound {
            path: source.path().to_string(),
        })?;

    let argument = call
        .child_by_field_name("arguments")
        .and_then(|args| named_children(args).into_iter().next())
        .ok_or_else(|| ResolveError::RoutesNotResolvable {
            reason: "router registration has no routes argument".to_string(),
        })?;

    let array = match argument.kind() {
        "array" => argument,
        "identifier" => {
            let name = text_of(text, argument);
            let mut binding = ArrayBinding {
                source: text,
                name,
                found: None,
            };
            walk(source.root(), &mut binding);
            binding.found.ok_or_else(|| ResolveError::RoutesNotResolvable {
                reason: format!("'{name}' is not bound to an array literal in {}", source.path()),
            })?
        }
        other => {
            return Err(ResolveError::RoutesNotResolvable {
                reason: format!("unsupported routes argument of kind '{other}'"),
            })
        }
    };

    let mut location = array_location(text, "routes", array);
    if let Some(wildcard) = named_children(array)
        .into_iter()
        .find(|element| is_wildcard_route(text, *element))
    {
        location.point = InsertionPoint::PrependToElement {
            offset: wildcard.start_byte(),
            separator: list_separator(text, wildcard.start_byte()),
        };
    }
    Ok(location)
}
