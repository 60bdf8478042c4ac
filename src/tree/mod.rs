//! Rendered text tree
//!
//! The rendered view of a document is held as an arena of nodes referenced
//! by [`NodeId`]. Containers carry an ordered list of children and may be
//! blocks (paragraphs, headings, list items...) or inline spans (emphasis,
//! links...). Leaves carry text. Highlight wrappers are containers the
//! annotation engine inserts and removes; nothing else mutates the tree
//! after it has been rendered.
//!
//! # Mutation journal
//!
//! Every structural edit goes through a small set of primitives
//! (`split_text`, `split_container`, `wrap_children`, `dissolve`,
//! `merge_siblings`, `set_kind`). While a [`Savepoint`] is open each
//! primitive records the prior state of the nodes it touches, so a caller
//! can undo a half-finished multi-step edit with [`RenderedTree::rollback`].
//!
//! Node slots are never reused: a removed node stays in the arena as dead,
//! so a stale `NodeId` can never alias a different node.

pub mod render;

pub use render::{render_markdown, render_markdown_with_options, MarkdownOptions};

use crate::annotations::{ColorRef, SpanId};
use crate::error::{Error, Result};
use std::fmt::Write as _;
use std::ops::Range;

// ─────────────────────────────────────────────────────────────────────────────
// Node Types
// ─────────────────────────────────────────────────────────────────────────────

/// Index of a node in a [`RenderedTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Structural containers a highlight wrapper must never straddle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Document,
    Paragraph,
    Heading { level: u8 },
    BlockQuote,
    List { ordered: bool },
    ListItem { checked: Option<bool> },
    CodeBlock { info: String },
    Table,
    TableRow,
    TableCell,
    ThematicBreak,
    FootnoteDefinition { name: String },
}

/// Inline containers that may be split around a highlight boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineKind {
    Emphasis,
    Strong,
    Strikethrough,
    Link { url: String },
    Image { url: String },
    Code,
}

/// What a node is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Block(BlockKind),
    Inline(InlineKind),
    Text(String),
    /// A wrapper carrying highlight styling for one single-block piece of a span
    Highlight { span: SpanId, color: ColorRef },
}

impl NodeKind {
    /// Whether this is a structural block container.
    pub fn is_block(&self) -> bool {
        matches!(self, NodeKind::Block(_))
    }

    /// Whether this is a text leaf.
    pub fn is_text(&self) -> bool {
        matches!(self, NodeKind::Text(_))
    }

    /// Whether this is a highlight wrapper.
    pub fn is_highlight(&self) -> bool {
        matches!(self, NodeKind::Highlight { .. })
    }

    fn label(&self) -> String {
        match self {
            NodeKind::Block(BlockKind::Document) => "document".into(),
            NodeKind::Block(BlockKind::Paragraph) => "paragraph".into(),
            NodeKind::Block(BlockKind::Heading { level }) => format!("heading{}", level),
            NodeKind::Block(BlockKind::BlockQuote) => "blockquote".into(),
            NodeKind::Block(BlockKind::List { ordered: true }) => "ordered-list".into(),
            NodeKind::Block(BlockKind::List { ordered: false }) => "list".into(),
            NodeKind::Block(BlockKind::ListItem { checked: None }) => "item".into(),
            NodeKind::Block(BlockKind::ListItem { checked: Some(c) }) => {
                format!("task[{}]", if *c { "x" } else { " " })
            }
            NodeKind::Block(BlockKind::CodeBlock { info }) => format!("code-block({})", info),
            NodeKind::Block(BlockKind::Table) => "table".into(),
            NodeKind::Block(BlockKind::TableRow) => "row".into(),
            NodeKind::Block(BlockKind::TableCell) => "cell".into(),
            NodeKind::Block(BlockKind::ThematicBreak) => "hr".into(),
            NodeKind::Block(BlockKind::FootnoteDefinition { name }) => {
                format!("footnote({})", name)
            }
            NodeKind::Inline(InlineKind::Emphasis) => "em".into(),
            NodeKind::Inline(InlineKind::Strong) => "strong".into(),
            NodeKind::Inline(InlineKind::Strikethrough) => "del".into(),
            NodeKind::Inline(InlineKind::Link { url }) => format!("link({})", url),
            NodeKind::Inline(InlineKind::Image { url }) => format!("image({})", url),
            NodeKind::Inline(InlineKind::Code) => "code".into(),
            NodeKind::Text(text) => format!("{:?}", text),
            NodeKind::Highlight { span, color } => {
                format!("highlight#{}({})", span.value(), color.name())
            }
        }
    }
}

/// Arena slot.
#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    alive: bool,
}

/// Marks a point the tree can be rolled back to.
#[must_use = "a savepoint must be committed or rolled back"]
#[derive(Debug)]
pub struct Savepoint {
    journal_len: usize,
    node_count: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// RenderedTree
// ─────────────────────────────────────────────────────────────────────────────

/// Arena-backed rendered tree of one document.
#[derive(Debug, Clone)]
pub struct RenderedTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    revision: u64,
    journal: Vec<(NodeId, NodeData)>,
    open_savepoints: usize,
}

impl Default for RenderedTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderedTree {
    /// Create a tree holding only an empty document root.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Block(BlockKind::Document),
                parent: None,
                children: Vec::new(),
                alive: true,
            }],
            root: NodeId(0),
            revision: 0,
            journal: Vec::new(),
            open_savepoints: 0,
        }
    }

    /// The content root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Counter bumped by every mutation. Indexes built at one revision are
    /// invalid at any other.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read access
    // ─────────────────────────────────────────────────────────────────────────

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).filter(|n| n.alive)
    }

    fn live(&self, id: NodeId) -> Result<&NodeData> {
        self.data(id)
            .ok_or_else(|| Error::shape(format!("node {} does not exist", id.0)))
    }

    /// Whether `id` names a node currently in the tree.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.data(id).is_some()
    }

    /// Kind of a live node.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).map(|n| &n.kind)
    }

    /// Parent of a live node (`None` for the root).
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).and_then(|n| n.parent)
    }

    /// Children of a live node; empty for leaves and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Text payload of a live leaf.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Whether `id` is a block container.
    pub fn is_block(&self, id: NodeId) -> bool {
        self.kind(id).is_some_and(NodeKind::is_block)
    }

    /// Position of `id` among its parent's children.
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Whether `node` is `ancestor` or lies beneath it.
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        if !self.is_alive(node) {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Nearest block container at or above `id`. The root counts as a block.
    pub fn enclosing_block(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.is_block(node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Text leaves under `node` in pre-order.
    pub fn leaves_under(&self, node: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(data) = self.data(id) else { continue };
            if data.kind.is_text() {
                leaves.push(id);
            } else {
                stack.extend(data.children.iter().rev().copied());
            }
        }
        leaves
    }

    /// All text leaves under the root in pre-order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.leaves_under(self.root)
    }

    /// Concatenated leaf text under `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        self.leaves_under(node)
            .into_iter()
            .filter_map(|leaf| self.text(leaf))
            .collect()
    }

    /// Highlight wrappers carrying `span`, in document order.
    pub fn wrappers_of(&self, span: SpanId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(data) = self.data(id) else { continue };
            if let NodeKind::Highlight { span: s, .. } = &data.kind {
                if *s == span {
                    found.push(id);
                }
            }
            stack.extend(data.children.iter().rev().copied());
        }
        found
    }

    /// Indented structural dump of the tree.
    ///
    /// Adjacent text leaves are printed merged, so two trees that differ only
    /// in how their text is split into leaves produce the same outline.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(self.root, 0, &mut out);
        out
    }

    fn write_outline(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(data) = self.data(id) else { return };
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), data.kind.label());

        let mut pending_text = String::new();
        let mut has_text = false;
        for child in &data.children {
            if let Some(text) = self.text(*child) {
                pending_text.push_str(text);
                has_text = true;
                continue;
            }
            if has_text {
                let _ = writeln!(out, "{}{:?}", "  ".repeat(depth + 1), pending_text);
                pending_text.clear();
                has_text = false;
            }
            self.write_outline(*child, depth + 1, out);
        }
        if has_text {
            let _ = writeln!(out, "{}{:?}", "  ".repeat(depth + 1), pending_text);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Building
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a new node as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId> {
        if self.live(parent)?.kind.is_text() {
            return Err(Error::shape("cannot append a child to a text leaf"));
        }
        let id = self.push_node(kind, Some(parent));
        self.touch(parent);
        self.nodes[parent.0].children.push(id);
        self.bump();
        Ok(id)
    }

    /// Append a text leaf under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> Result<NodeId> {
        self.append(parent, NodeKind::Text(text.into()))
    }

    fn push_node(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
            alive: true,
        });
        id
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    /// Record the prior state of a node before it is modified.
    fn touch(&mut self, id: NodeId) {
        if self.open_savepoints > 0 {
            self.journal.push((id, self.nodes[id.0].clone()));
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Journal
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a savepoint. Savepoints nest; each must be committed or rolled back.
    pub fn savepoint(&mut self) -> Savepoint {
        self.open_savepoints += 1;
        Savepoint {
            journal_len: self.journal.len(),
            node_count: self.nodes.len(),
        }
    }

    /// Keep every change made since `savepoint`.
    pub fn commit(&mut self, savepoint: Savepoint) {
        let _ = savepoint;
        self.close_savepoint();
    }

    /// Undo every change made since `savepoint`.
    pub fn rollback(&mut self, savepoint: Savepoint) {
        while self.journal.len() > savepoint.journal_len {
            if let Some((id, data)) = self.journal.pop() {
                self.nodes[id.0] = data;
            }
        }
        self.nodes.truncate(savepoint.node_count);
        self.bump();
        self.close_savepoint();
    }

    fn close_savepoint(&mut self) {
        self.open_savepoints = self.open_savepoints.saturating_sub(1);
        if self.open_savepoints == 0 {
            self.journal.clear();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation primitives
    // ─────────────────────────────────────────────────────────────────────────

    /// Split a text leaf at character `at`, inserting the tail as a new
    /// sibling directly after it. Returns the tail leaf.
    pub fn split_text(&mut self, leaf: NodeId, at: usize) -> Result<NodeId> {
        let text = self
            .text(leaf)
            .ok_or_else(|| Error::shape(format!("node {} is not a text leaf", leaf.0)))?;
        let len = crate::string_utils::char_count(text);
        if at == 0 || at >= len {
            return Err(Error::shape(format!(
                "split point {} is not inside a leaf of length {}",
                at, len
            )));
        }
        let (head, tail) = crate::string_utils::split_at_char(text, at);
        let (head, tail) = (head.to_string(), tail.to_string());

        self.touch(leaf);
        self.nodes[leaf.0].kind = NodeKind::Text(head);
        self.insert_after(leaf, NodeKind::Text(tail))
    }

    /// Split a container so that its children from `child_idx` onwards move
    /// into a new sibling of the same kind directly after it. Returns the
    /// new sibling.
    pub fn split_container(&mut self, node: NodeId, child_idx: usize) -> Result<NodeId> {
        let data = self.live(node)?;
        if data.kind.is_text() {
            return Err(Error::shape("split_container called on a text leaf"));
        }
        if child_idx == 0 || child_idx >= data.children.len() {
            return Err(Error::shape(format!(
                "split index {} is not inside a container with {} children",
                child_idx,
                data.children.len()
            )));
        }
        let kind = data.kind.clone();

        let sibling = self.insert_after(node, kind)?;
        self.touch(node);
        let moved = self.nodes[node.0].children.split_off(child_idx);
        for child in &moved {
            self.touch(*child);
            self.nodes[child.0].parent = Some(sibling);
        }
        self.nodes[sibling.0].children = moved;
        Ok(sibling)
    }

    fn insert_after(&mut self, node: NodeId, kind: NodeKind) -> Result<NodeId> {
        let parent = self
            .parent(node)
            .ok_or_else(|| Error::shape("cannot insert a sibling of the root"))?;
        let index = self
            .child_index(node)
            .ok_or_else(|| Error::shape("node is not listed under its parent"))?;
        let id = self.push_node(kind, Some(parent));
        self.touch(parent);
        self.nodes[parent.0].children.insert(index + 1, id);
        self.bump();
        Ok(id)
    }

    /// Move the children of `parent` in `range` under a new container of
    /// `kind`, which takes their place. Returns the new container.
    pub fn wrap_children(
        &mut self,
        parent: NodeId,
        range: Range<usize>,
        kind: NodeKind,
    ) -> Result<NodeId> {
        let data = self.live(parent)?;
        if data.kind.is_text() {
            return Err(Error::shape("cannot wrap children of a text leaf"));
        }
        if range.start >= range.end || range.end > data.children.len() {
            return Err(Error::shape(format!(
                "child range {:?} is invalid for {} children",
                range,
                data.children.len()
            )));
        }

        let wrapper = self.push_node(kind, Some(parent));
        self.touch(parent);
        let moved: Vec<NodeId> = self.nodes[parent.0]
            .children
            .splice(range.clone(), std::iter::once(wrapper))
            .collect();
        for child in &moved {
            self.touch(*child);
            self.nodes[child.0].parent = Some(wrapper);
        }
        self.nodes[wrapper.0].children = moved;
        self.bump();
        Ok(wrapper)
    }

    /// Replace a container with its children. Returns the index range the
    /// children now occupy in the former parent.
    pub fn dissolve(&mut self, node: NodeId) -> Result<Range<usize>> {
        if self.live(node)?.kind.is_text() {
            return Err(Error::shape("cannot dissolve a text leaf"));
        }
        let parent = self
            .parent(node)
            .ok_or_else(|| Error::shape("cannot dissolve the root"))?;
        let index = self
            .child_index(node)
            .ok_or_else(|| Error::shape("node is not listed under its parent"))?;

        self.touch(node);
        let children = std::mem::take(&mut self.nodes[node.0].children);
        self.nodes[node.0].alive = false;
        self.nodes[node.0].parent = None;

        for child in &children {
            self.touch(*child);
            self.nodes[child.0].parent = Some(parent);
        }
        let count = children.len();
        self.touch(parent);
        self.nodes[parent.0]
            .children
            .splice(index..index + 1, children);
        self.bump();
        Ok(index..index + count)
    }

    /// Merge `right` into its immediately preceding sibling `left` when the
    /// two are text leaves or inline containers of the same kind. Merged
    /// containers have their own seam merged recursively. Returns whether a
    /// merge happened.
    pub fn merge_siblings(&mut self, left: NodeId, right: NodeId) -> Result<bool> {
        let parent = self.parent(left);
        if parent.is_none() || parent != self.parent(right) {
            return Ok(false);
        }
        match (self.child_index(left), self.child_index(right)) {
            (Some(l), Some(r)) if l + 1 == r => {}
            _ => return Ok(false),
        }
        let parent = parent.ok_or_else(|| Error::shape("merge without a parent"))?;

        match (self.live(left)?.kind.clone(), self.live(right)?.kind.clone()) {
            (NodeKind::Text(a), NodeKind::Text(b)) => {
                self.touch(left);
                self.nodes[left.0].kind = NodeKind::Text(a + &b);
                self.remove_child(parent, right);
                Ok(true)
            }
            (NodeKind::Inline(a), NodeKind::Inline(b)) if a == b => {
                let seam_left = self.children(left).last().copied();
                self.touch(right);
                let moved = std::mem::take(&mut self.nodes[right.0].children);
                for child in &moved {
                    self.touch(*child);
                    self.nodes[child.0].parent = Some(left);
                }
                let seam_right = moved.first().copied();
                self.touch(left);
                self.nodes[left.0].children.extend(moved);
                self.remove_child(parent, right);
                if let (Some(l), Some(r)) = (seam_left, seam_right) {
                    self.merge_siblings(l, r)?;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.touch(parent);
        self.nodes[parent.0].children.retain(|c| *c != child);
        self.touch(child);
        self.nodes[child.0].alive = false;
        self.nodes[child.0].parent = None;
        self.bump();
    }

    /// Replace the kind of a container in place.
    pub fn set_kind(&mut self, node: NodeId, kind: NodeKind) -> Result<()> {
        let current = &self.live(node)?.kind;
        if current.is_text() != kind.is_text() {
            return Err(Error::shape("set_kind cannot turn a leaf into a container"));
        }
        if *current == kind {
            return Ok(());
        }
        self.touch(node);
        self.nodes[node.0].kind = kind;
        self.bump();
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::PaletteColor;

    fn paragraph_tree(parts: &[&str]) -> (RenderedTree, NodeId) {
        let mut tree = RenderedTree::new();
        let para = tree
            .append(tree.root(), NodeKind::Block(BlockKind::Paragraph))
            .unwrap();
        for part in parts {
            tree.append_text(para, *part).unwrap();
        }
        (tree, para)
    }

    fn highlight(span: u64) -> NodeKind {
        NodeKind::Highlight {
            span: SpanId::new(span),
            color: ColorRef::Palette(PaletteColor::Yellow),
        }
    }

    #[test]
    fn test_new_tree_has_document_root() {
        let tree = RenderedTree::new();
        assert!(tree.is_block(tree.root()));
        assert!(tree.children(tree.root()).is_empty());
        assert_eq!(tree.outline(), "document\n");
    }

    #[test]
    fn test_leaves_in_document_order() {
        let mut tree = RenderedTree::new();
        let p1 = tree
            .append(tree.root(), NodeKind::Block(BlockKind::Paragraph))
            .unwrap();
        tree.append_text(p1, "one ").unwrap();
        let strong = tree
            .append(p1, NodeKind::Inline(InlineKind::Strong))
            .unwrap();
        tree.append_text(strong, "two").unwrap();
        let p2 = tree
            .append(tree.root(), NodeKind::Block(BlockKind::Paragraph))
            .unwrap();
        tree.append_text(p2, " three").unwrap();

        let text: String = tree
            .leaves()
            .into_iter()
            .filter_map(|l| tree.text(l).map(str::to_string))
            .collect();
        assert_eq!(text, "one two three");
        assert_eq!(tree.enclosing_block(strong), Some(p1));
    }

    #[test]
    fn test_append_to_leaf_is_rejected() {
        let (mut tree, para) = paragraph_tree(&["abc"]);
        let leaf = tree.children(para)[0];
        assert!(tree.append_text(leaf, "x").is_err());
    }

    #[test]
    fn test_split_text() {
        let (mut tree, para) = paragraph_tree(&["hello"]);
        let leaf = tree.children(para)[0];
        let tail = tree.split_text(leaf, 2).unwrap();

        assert_eq!(tree.text(leaf), Some("he"));
        assert_eq!(tree.text(tail), Some("llo"));
        assert_eq!(tree.children(para), &[leaf, tail]);
        assert!(tree.split_text(leaf, 0).is_err());
        assert!(tree.split_text(leaf, 2).is_err());
    }

    #[test]
    fn test_wrap_and_dissolve() {
        let (mut tree, para) = paragraph_tree(&["a", "b", "c"]);
        let before = tree.outline();
        let wrapper = tree.wrap_children(para, 1..3, highlight(1)).unwrap();

        assert_eq!(tree.children(para).len(), 2);
        assert_eq!(tree.text_content(wrapper), "bc");
        assert_eq!(tree.wrappers_of(SpanId::new(1)), vec![wrapper]);

        let range = tree.dissolve(wrapper).unwrap();
        assert_eq!(range, 1..3);
        assert!(!tree.is_alive(wrapper));
        assert_eq!(tree.outline(), before);
    }

    #[test]
    fn test_split_container_and_merge_back() {
        let mut tree = RenderedTree::new();
        let para = tree
            .append(tree.root(), NodeKind::Block(BlockKind::Paragraph))
            .unwrap();
        let em = tree
            .append(para, NodeKind::Inline(InlineKind::Emphasis))
            .unwrap();
        tree.append_text(em, "ab").unwrap();
        tree.append_text(em, "cd").unwrap();
        let before = tree.outline();

        let sibling = tree.split_container(em, 1).unwrap();
        assert_eq!(tree.children(para), &[em, sibling]);
        assert_eq!(tree.text_content(sibling), "cd");

        assert!(tree.merge_siblings(em, sibling).unwrap());
        assert_eq!(tree.children(para), &[em]);
        // The seam text leaves merged too
        assert_eq!(tree.children(em).len(), 1);
        assert_eq!(tree.outline(), before);
    }

    #[test]
    fn test_merge_refuses_different_kinds() {
        let mut tree = RenderedTree::new();
        let para = tree
            .append(tree.root(), NodeKind::Block(BlockKind::Paragraph))
            .unwrap();
        let em = tree
            .append(para, NodeKind::Inline(InlineKind::Emphasis))
            .unwrap();
        let strong = tree
            .append(para, NodeKind::Inline(InlineKind::Strong))
            .unwrap();
        assert!(!tree.merge_siblings(em, strong).unwrap());
    }

    #[test]
    fn test_rollback_restores_state() {
        let (mut tree, para) = paragraph_tree(&["hello world"]);
        let before = tree.outline();
        let leaf = tree.children(para)[0];

        let sp = tree.savepoint();
        let tail = tree.split_text(leaf, 5).unwrap();
        tree.wrap_children(para, 1..2, highlight(3)).unwrap();
        assert_ne!(tree.outline(), before);
        tree.rollback(sp);

        assert_eq!(tree.outline(), before);
        assert_eq!(tree.children(para), &[leaf]);
        assert!(!tree.is_alive(tail));
        assert_eq!(tree.text(leaf), Some("hello world"));
    }

    #[test]
    fn test_nested_savepoints() {
        let (mut tree, para) = paragraph_tree(&["abcdef"]);
        let leaf = tree.children(para)[0];

        let outer = tree.savepoint();
        tree.split_text(leaf, 3).unwrap();
        let after_first = tree.outline();
        let inner = tree.savepoint();
        tree.wrap_children(para, 0..1, highlight(9)).unwrap();
        tree.rollback(inner);
        assert_eq!(tree.outline(), after_first);
        tree.commit(outer);

        assert_eq!(tree.children(para).len(), 2);
    }

    #[test]
    fn test_revision_changes_on_mutation() {
        let (mut tree, para) = paragraph_tree(&["abc"]);
        let rev = tree.revision();
        let leaf = tree.children(para)[0];
        tree.split_text(leaf, 1).unwrap();
        assert!(tree.revision() > rev);
    }

    #[test]
    fn test_set_kind_restyles_wrapper() {
        let (mut tree, para) = paragraph_tree(&["abc"]);
        let wrapper = tree.wrap_children(para, 0..1, highlight(1)).unwrap();
        let green = NodeKind::Highlight {
            span: SpanId::new(1),
            color: ColorRef::Palette(PaletteColor::Green),
        };
        tree.set_kind(wrapper, green.clone()).unwrap();
        assert_eq!(tree.kind(wrapper), Some(&green));

        let leaf = tree.children(wrapper)[0];
        assert!(tree.set_kind(leaf, green).is_err());
    }

    #[test]
    fn test_is_descendant_of() {
        let (tree, para) = paragraph_tree(&["abc"]);
        let leaf = tree.children(para)[0];
        assert!(tree.is_descendant_of(leaf, tree.root()));
        assert!(tree.is_descendant_of(leaf, para));
        assert!(!tree.is_descendant_of(para, leaf));
    }
}
