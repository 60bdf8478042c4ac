//! Markdown rendering into a [`RenderedTree`] using comrak
//!
//! The rendered tree keeps only what the reader sees: block structure,
//! inline styling containers and visible text. Raw HTML and front matter
//! are dropped, code spans and code blocks keep their literal text, and
//! breaks become whitespace leaves.

use comrak::{
    nodes::{AstNode, NodeValue},
    parse_document, Arena, Options,
};
use log::debug;

use super::{BlockKind, InlineKind, NodeId, NodeKind, RenderedTree};
use crate::error::Result;

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Markdown extensions enabled while rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Enable GitHub Flavored Markdown tables
    pub tables: bool,
    /// Enable strikethrough syntax (~~text~~)
    pub strikethrough: bool,
    /// Enable autolink URLs and emails
    pub autolink: bool,
    /// Enable task lists (- [ ] and - [x])
    pub tasklist: bool,
    /// Enable footnotes
    pub footnotes: bool,
    /// Front matter delimiter; front matter is never shown
    pub front_matter_delimiter: Option<String>,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            autolink: true,
            tasklist: true,
            footnotes: true,
            front_matter_delimiter: Some("---".to_string()),
        }
    }
}

impl MarkdownOptions {
    fn to_comrak_options(&self) -> Options {
        let mut options = Options::default();
        options.extension.strikethrough = self.strikethrough;
        options.extension.table = self.tables;
        options.extension.autolink = self.autolink;
        options.extension.tasklist = self.tasklist;
        options.extension.footnotes = self.footnotes;
        options.extension.front_matter_delimiter = self.front_matter_delimiter.clone();
        options
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Render markdown source with default options.
///
/// # Example
/// ```ignore
/// let tree = render_markdown("# Title\n\nSome *text*")?;
/// assert_eq!(tree.text_content(tree.root()), "TitleSome text");
/// ```
pub fn render_markdown(markdown: &str) -> Result<RenderedTree> {
    render_markdown_with_options(markdown, &MarkdownOptions::default())
}

/// Render markdown source with explicit options.
pub fn render_markdown_with_options(
    markdown: &str,
    options: &MarkdownOptions,
) -> Result<RenderedTree> {
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &options.to_comrak_options());

    let mut tree = RenderedTree::new();
    let tree_root = tree.root();
    convert_children(root, &mut tree, tree_root)?;

    debug!(
        "Rendered {} bytes of markdown into {} text leaves",
        markdown.len(),
        tree.leaves().len()
    );
    Ok(tree)
}

fn convert_children<'a>(
    node: &'a AstNode<'a>,
    tree: &mut RenderedTree,
    parent: NodeId,
) -> Result<()> {
    for child in node.children() {
        convert_node(child, tree, parent)?;
    }
    Ok(())
}

/// Convert one comrak node (and its subtree) under `parent`.
fn convert_node<'a>(node: &'a AstNode<'a>, tree: &mut RenderedTree, parent: NodeId) -> Result<()> {
    let value = node.data.borrow().value.clone();

    let container = match value {
        NodeValue::Text(text) => {
            if !text.is_empty() {
                tree.append_text(parent, text)?;
            }
            return Ok(());
        }
        NodeValue::SoftBreak => {
            tree.append_text(parent, " ")?;
            return Ok(());
        }
        NodeValue::LineBreak => {
            tree.append_text(parent, "\n")?;
            return Ok(());
        }
        NodeValue::Code(code) => {
            let span = tree.append(parent, NodeKind::Inline(InlineKind::Code))?;
            if !code.literal.is_empty() {
                tree.append_text(span, code.literal)?;
            }
            return Ok(());
        }
        NodeValue::CodeBlock(code) => {
            let block = tree.append(
                parent,
                NodeKind::Block(BlockKind::CodeBlock { info: code.info }),
            )?;
            let literal = code.literal.trim_end_matches('\n');
            if !literal.is_empty() {
                tree.append_text(block, literal)?;
            }
            return Ok(());
        }
        NodeValue::FootnoteReference(reference) => {
            tree.append_text(parent, format!("[{}]", reference.name))?;
            return Ok(());
        }
        NodeValue::HtmlBlock(_) | NodeValue::HtmlInline(_) | NodeValue::FrontMatter(_) => {
            return Ok(());
        }
        NodeValue::ThematicBreak => {
            tree.append(parent, NodeKind::Block(BlockKind::ThematicBreak))?;
            return Ok(());
        }

        NodeValue::Paragraph => Some(NodeKind::Block(BlockKind::Paragraph)),
        NodeValue::Heading(heading) => Some(NodeKind::Block(BlockKind::Heading {
            level: heading.level,
        })),
        NodeValue::BlockQuote => Some(NodeKind::Block(BlockKind::BlockQuote)),
        NodeValue::List(list) => Some(NodeKind::Block(BlockKind::List {
            ordered: list.list_type == comrak::nodes::ListType::Ordered,
        })),
        NodeValue::Item(_) => Some(NodeKind::Block(BlockKind::ListItem { checked: None })),
        NodeValue::TaskItem(mark) => Some(NodeKind::Block(BlockKind::ListItem {
            checked: Some(mark.is_some()),
        })),
        NodeValue::Table(_) => Some(NodeKind::Block(BlockKind::Table)),
        NodeValue::TableRow(_) => Some(NodeKind::Block(BlockKind::TableRow)),
        NodeValue::TableCell => Some(NodeKind::Block(BlockKind::TableCell)),
        NodeValue::FootnoteDefinition(def) => Some(NodeKind::Block(
            BlockKind::FootnoteDefinition { name: def.name },
        )),

        NodeValue::Emph => Some(NodeKind::Inline(InlineKind::Emphasis)),
        NodeValue::Strong => Some(NodeKind::Inline(InlineKind::Strong)),
        NodeValue::Strikethrough => Some(NodeKind::Inline(InlineKind::Strikethrough)),
        NodeValue::Link(link) => Some(NodeKind::Inline(InlineKind::Link { url: link.url })),
        NodeValue::Image(image) => Some(NodeKind::Inline(InlineKind::Image { url: image.url })),

        // Description lists, superscript and anything newer render their
        // children in place
        _ => None,
    };

    match container {
        Some(kind) => {
            let id = tree.append(parent, kind)?;
            convert_children(node, tree, id)
        }
        None => convert_children(node, tree, parent),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
