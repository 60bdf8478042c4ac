//! egui view of a rendered tree
//!
//! Lays a [`RenderedTree`] out as one egui `LayoutJob` with highlight
//! backgrounds, and maps between view characters (which include the line
//! breaks between blocks) and document offsets (which do not), so a host
//! can turn egui cursor positions into selections.

use crate::annotations::{HostPoint, HostRange, TextIndex};
use crate::string_utils::char_count;
use crate::tree::{BlockKind, InlineKind, NodeId, NodeKind, RenderedTree};
use egui::text::LayoutJob;
use egui::{Color32, FontId, Stroke, TextFormat};

/// Fonts and colors of the rendered view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewStyle {
    pub body_size: f32,
    /// Size multipliers for heading levels 1 to 6
    pub heading_scale: [f32; 6],
    pub text_color: Color32,
    pub strong_color: Color32,
    pub link_color: Color32,
    pub code_background: Color32,
}

impl Default for ViewStyle {
    fn default() -> Self {
        Self {
            body_size: 14.0,
            heading_scale: [2.0, 1.6, 1.35, 1.2, 1.1, 1.0],
            text_color: Color32::from_rgb(40, 40, 40),
            strong_color: Color32::BLACK,
            link_color: Color32::from_rgb(0, 102, 204),
            code_background: Color32::from_rgb(240, 240, 240),
        }
    }
}

/// One leaf's text in both coordinate systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    leaf: NodeId,
    view_start: usize,
    doc_start: usize,
    len: usize,
}

/// Laid-out view text with offset mapping.
#[derive(Debug, Clone)]
pub struct ViewText {
    pub job: LayoutJob,
    runs: Vec<Run>,
    view_len: usize,
    doc_len: usize,
}

impl ViewText {
    /// Document offset of a view character position. A position on a block
    /// break maps to the start of the following block.
    pub fn document_offset(&self, view_char: usize) -> Option<usize> {
        if view_char > self.view_len {
            return None;
        }
        let i = self
            .runs
            .partition_point(|r| r.view_start + r.len <= view_char);
        Some(match self.runs.get(i) {
            Some(run) if run.view_start <= view_char => run.doc_start + (view_char - run.view_start),
            Some(run) => run.doc_start,
            None => self.doc_len,
        })
    }

    /// View character position of a document offset.
    pub fn view_offset(&self, doc_offset: usize) -> Option<usize> {
        if doc_offset > self.doc_len {
            return None;
        }
        let i = self
            .runs
            .partition_point(|r| r.doc_start + r.len <= doc_offset);
        Some(match self.runs.get(i) {
            Some(run) => run.view_start + (doc_offset - run.doc_start),
            None => self.view_len,
        })
    }

    /// Host selection for two view character positions (egui cursor indices).
    pub fn host_range(&self, anchor: usize, focus: usize) -> Option<HostRange> {
        Some(HostRange::new(
            self.host_point(anchor)?,
            self.host_point(focus)?,
        ))
    }

    fn host_point(&self, view_char: usize) -> Option<HostPoint> {
        let doc = self.document_offset(view_char)?;
        let i = self.runs.partition_point(|r| r.doc_start + r.len < doc);
        let run = match self.runs.get(i) {
            Some(run) => run,
            None => self.runs.last()?,
        };
        Some(HostPoint::new(run.leaf, doc.saturating_sub(run.doc_start).min(run.len)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Inherited {
    heading: Option<u8>,
    italics: bool,
    strong: bool,
    strike: bool,
    code: bool,
    link: bool,
    background: Option<Color32>,
}

struct Builder<'a> {
    tree: &'a RenderedTree,
    style: &'a ViewStyle,
    job: LayoutJob,
    runs: Vec<Run>,
    view_len: usize,
    doc_len: usize,
    pending_break: bool,
}

/// Lay out `tree` for display.
pub fn build_view(tree: &RenderedTree, style: &ViewStyle) -> ViewText {
    let mut builder = Builder {
        tree,
        style,
        job: LayoutJob::default(),
        runs: Vec::new(),
        view_len: 0,
        doc_len: 0,
        pending_break: false,
    };
    builder.visit(tree.root(), Inherited::default());
    debug_assert_eq!(builder.doc_len, TextIndex::build(tree).len());

    ViewText {
        job: builder.job,
        runs: builder.runs,
        view_len: builder.view_len,
        doc_len: builder.doc_len,
    }
}

impl Builder<'_> {
    fn visit(&mut self, node: NodeId, mut inherited: Inherited) {
        let tree = self.tree;
        let Some(kind) = tree.kind(node) else { return };
        match kind {
            NodeKind::Text(text) => {
                self.push_leaf(node, text, inherited);
                return;
            }
            NodeKind::Block(block) => {
                self.pending_break = true;
                match block {
                    BlockKind::Heading { level } => inherited.heading = Some(*level),
                    BlockKind::CodeBlock { .. } => inherited.code = true,
                    _ => {}
                }
            }
            NodeKind::Inline(inline) => match inline {
                InlineKind::Emphasis => inherited.italics = true,
                InlineKind::Strong => inherited.strong = true,
                InlineKind::Strikethrough => inherited.strike = true,
                InlineKind::Code => inherited.code = true,
                InlineKind::Link { .. } | InlineKind::Image { .. } => inherited.link = true,
            },
            NodeKind::Highlight { color, .. } => inherited.background = Some(color.to_color32()),
        }

        for child in tree.children(node) {
            self.visit(*child, inherited);
        }
        if kind.is_block() {
            self.pending_break = true;
        }
    }

    fn push_leaf(&mut self, leaf: NodeId, text: &str, inherited: Inherited) {
        let len = char_count(text);
        if len == 0 {
            return;
        }
        if self.pending_break && self.view_len > 0 {
            self.job.append("\n", 0.0, TextFormat::default());
            self.view_len += 1;
        }
        self.pending_break = false;

        let format = self.format(inherited);
        self.job.append(text, 0.0, format);
        self.runs.push(Run {
            leaf,
            view_start: self.view_len,
            doc_start: self.doc_len,
            len,
        });
        self.view_len += len;
        self.doc_len += len;
    }

    fn format(&self, inherited: Inherited) -> TextFormat {
        let size = match inherited.heading {
            Some(level) => {
                let i = usize::from(level.clamp(1, 6)) - 1;
                self.style.body_size * self.style.heading_scale[i]
            }
            None => self.style.body_size,
        };
        let font_id = if inherited.code {
            FontId::monospace(size)
        } else {
            FontId::proportional(size)
        };
        let color = if inherited.link {
            self.style.link_color
        } else if inherited.strong || inherited.heading.is_some() {
            self.style.strong_color
        } else {
            self.style.text_color
        };
        let background = match (inherited.background, inherited.code) {
            (Some(bg), _) => bg,
            (None, true) => self.style.code_background,
            (None, false) => Color32::TRANSPARENT,
        };

        TextFormat {
            font_id,
            color,
            background,
            italics: inherited.italics,
            strikethrough: if inherited.strike {
                Stroke::new(1.0, color)
            } else {
                Stroke::NONE
            },
            underline: if inherited.link {
                Stroke::new(1.0, color)
            } else {
                Stroke::NONE
            },
            ..Default::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
