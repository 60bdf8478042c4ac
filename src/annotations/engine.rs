//! Host-facing annotation engine
//!
//! `AnnotationEngine` ties the pieces together for one open document: it
//! owns the rendered tree while the document is shown in rendered mode,
//! the span registry over it, the custom color table and the storage the
//! highlights are saved to.
//!
//! Structural failures never reach the host. Highlight operations report
//! through `Option`/`bool` and the log; only explicit saves return errors.

use super::color::{ColorRef, ColorTable};
use super::persistence::{
    DocumentKey, HighlightStorage, JsonFileStorage, PersistedHighlightSet,
};
use super::registry::{HighlightSpan, SpanId, SpanRegistry};
use super::restore::{restore_spans, RestoreReport};
use super::selection::{from_host_selection, to_host_selection, HostRange};
use crate::config::AnnotationSettings;
use crate::error::{Result, ResultExt};
use crate::tree::RenderedTree;
use log::{debug, info, warn};

/// A resolved host selection waiting for a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingSelection {
    host: HostRange,
    start: usize,
    len: usize,
}

/// Annotation state of the open document.
pub struct AnnotationEngine {
    storage: Box<dyn HighlightStorage>,
    settings: AnnotationSettings,
    colors: ColorTable,
    tree: Option<RenderedTree>,
    registry: SpanRegistry,
    document: Option<DocumentKey>,
    pending: Option<PendingSelection>,
}

impl AnnotationEngine {
    /// Create an engine over `storage`, loading the custom color table.
    pub fn new(storage: Box<dyn HighlightStorage>, settings: AnnotationSettings) -> Self {
        let colors = storage
            .load_colors()
            .unwrap_or_warn_default(ColorTable::new(), "Failed to load custom colors");
        Self {
            storage,
            settings,
            colors,
            tree: None,
            registry: SpanRegistry::new(),
            document: None,
            pending: None,
        }
    }

    /// Create an engine storing JSON files in the configured data directory.
    pub fn with_json_storage(settings: AnnotationSettings) -> Result<Self> {
        let storage = JsonFileStorage::from_settings(&settings)?;
        Ok(Self::new(Box::new(storage), settings))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn settings(&self) -> &AnnotationSettings {
        &self.settings
    }

    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }

    pub fn storage(&self) -> &dyn HighlightStorage {
        self.storage.as_ref()
    }

    /// The rendered tree, while in rendered mode.
    pub fn tree(&self) -> Option<&RenderedTree> {
        self.tree.as_ref()
    }

    pub fn document_key(&self) -> Option<&DocumentKey> {
        self.document.as_ref()
    }

    pub fn registry(&self) -> &SpanRegistry {
        &self.registry
    }

    /// Every active span in document order.
    pub fn spans(&self) -> Vec<HighlightSpan> {
        self.registry.all()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Document lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Show `key`'s rendered tree and restore its saved highlights.
    ///
    /// A document still shown in rendered mode is saved first when
    /// `save_on_mode_switch` is set.
    pub fn open_document(&mut self, key: DocumentKey, tree: RenderedTree) -> RestoreReport {
        if self.settings.save_on_mode_switch {
            self.save_now()
                .unwrap_or_warn_default((), "Failed to save highlights of the previous document");
        }
        info!("Opening document {} in rendered mode", key);
        self.tree = Some(tree);
        self.registry.reset();
        self.pending = None;
        self.document = Some(key.clone());
        self.restore_for_document(&key)
    }

    /// Replace every current span with the saved highlights of `key`.
    pub fn restore_for_document(&mut self, key: &DocumentKey) -> RestoreReport {
        let Some(tree) = self.tree.as_mut() else {
            debug!("No rendered tree, nothing to restore {} into", key);
            return RestoreReport::default();
        };
        self.registry.clear_all(tree);
        self.document = Some(key.clone());

        let set = match self.storage.load_set(key) {
            Ok(Some(set)) => set,
            Ok(None) => return RestoreReport::default(),
            Err(e) => {
                warn!("Failed to load highlights for {}: {}", key, e);
                return RestoreReport::default();
            }
        };
        restore_spans(tree, &mut self.registry, &set, &self.colors, &self.settings)
    }

    /// Swap in a re-rendered tree and re-resolve every span against it.
    pub fn rerender(&mut self, tree: RenderedTree) -> RestoreReport {
        let key = self
            .document
            .clone()
            .unwrap_or_else(|| DocumentKey::new(String::new()));
        let snapshot = PersistedHighlightSet::from_spans(&key, &self.registry.all());

        self.registry.reset();
        self.pending = None;
        let tree = self.tree.insert(tree);
        debug!("Re-resolving {} span(s) after re-render", snapshot.spans.len());
        restore_spans(
            tree,
            &mut self.registry,
            &snapshot,
            &self.colors,
            &self.settings,
        )
    }

    /// Leave rendered mode: save if configured, then drop every wrapper and
    /// the tree. Spans are cleared even when the save fails.
    pub fn leave_rendered_mode(&mut self) -> Result<()> {
        let saved = if self.settings.save_on_mode_switch {
            self.save_now()
        } else {
            Ok(())
        };
        self.clear_all();
        self.tree = None;
        self.pending = None;
        saved
    }

    /// Save synchronously before the host exits.
    pub fn shutdown(&mut self) -> Result<()> {
        info!("Saving highlights before shutdown");
        self.save_now()
    }

    /// Write the current spans of the open document to storage.
    ///
    /// Spans only live in rendered mode, so outside it this is a no-op and
    /// the saved record is left alone. In rendered mode an empty span set
    /// deletes the document's saved record.
    pub fn save_now(&mut self) -> Result<()> {
        let Some(key) = &self.document else {
            debug!("No open document, nothing to save");
            return Ok(());
        };
        if self.tree.is_none() {
            debug!("{} is not in rendered mode, keeping its saved record", key);
            return Ok(());
        }
        let spans = self.registry.all();
        if spans.is_empty() {
            self.storage.delete_set(key)?;
            return Ok(());
        }
        let set = PersistedHighlightSet::from_spans(key, &spans);
        self.storage.save_set(&set)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Selection
    // ─────────────────────────────────────────────────────────────────────────

    /// Record the host's current selection. Returns whether the pending
    /// selection changed; repeating the same selection is a no-op.
    pub fn select_range(&mut self, host: HostRange) -> bool {
        if self.pending.is_some_and(|p| p.host == host) {
            return false;
        }
        let Some(tree) = &self.tree else {
            return false;
        };
        let resolved = from_host_selection(tree, &host).map(|(start, len)| PendingSelection {
            host,
            start,
            len,
        });
        let changed = resolved != self.pending;
        self.pending = resolved;
        changed
    }

    /// Pending selection as `(offset, length)`.
    pub fn pending_selection(&self) -> Option<(usize, usize)> {
        self.pending.map(|p| (p.start, p.len))
    }

    pub fn clear_selection(&mut self) {
        self.pending = None;
    }

    /// Where to place a color picker: the pending selection, or else the
    /// most recently touched span.
    pub fn picker_anchor(&self) -> Option<HostRange> {
        let tree = self.tree.as_ref()?;
        let (start, len) = self.pending_selection().or_else(|| {
            let span = self.registry.get(self.registry.last_touched()?)?;
            Some((span.start, span.len))
        })?;
        to_host_selection(tree, start, len)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Highlight operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Highlight the pending selection. `None` uses the default color.
    pub fn apply_highlight(&mut self, color: Option<ColorRef>) -> Option<SpanId> {
        let Some(pending) = self.pending else {
            debug!("No pending selection to highlight");
            return None;
        };
        let id = self.highlight_range(pending.start, pending.len, color)?;
        self.pending = None;
        Some(id)
    }

    /// Highlight an explicit document range.
    pub fn highlight_range(
        &mut self,
        start: usize,
        len: usize,
        color: Option<ColorRef>,
    ) -> Option<SpanId> {
        let tree = self.tree.as_mut()?;
        let color = color.unwrap_or_else(|| ColorRef::Palette(self.settings.default_color));
        self.registry.apply(tree, start, len, color)
    }

    pub fn recolor(&mut self, id: SpanId, color: ColorRef) -> bool {
        match self.tree.as_mut() {
            Some(tree) => self.registry.recolor(tree, id, color),
            None => false,
        }
    }

    /// Recolor the most recently created or recolored span.
    pub fn recolor_last(&mut self, color: ColorRef) -> Option<SpanId> {
        let tree = self.tree.as_mut()?;
        self.registry.recolor_last_touched(tree, color)
    }

    pub fn remove_highlight(&mut self, id: SpanId) -> bool {
        match self.tree.as_mut() {
            Some(tree) => self.registry.remove(tree, id),
            None => false,
        }
    }

    /// Remove every highlight. Returns how many were removed.
    pub fn clear_all(&mut self) -> usize {
        match self.tree.as_mut() {
            Some(tree) => self.registry.clear_all(tree),
            None => {
                self.registry.reset();
                0
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Custom colors
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a custom color and persist the color table.
    pub fn add_custom_color(&mut self, rgba: &str) -> Result<ColorRef> {
        let color = self.colors.add(rgba)?;
        self.storage.save_colors(&self.colors)?;
        Ok(color)
    }

    /// Delete a custom color, repaint its spans with the default color and
    /// persist the color table. Returns how many spans were repainted.
    pub fn delete_custom_color(&mut self, name: &str) -> Result<usize> {
        if !self.colors.remove(name) {
            debug!("Custom color {} not found", name);
            return Ok(0);
        }
        let fallback = ColorRef::Palette(self.settings.default_color);
        let repainted = match self.tree.as_mut() {
            Some(tree) => self.registry.reassign_color(tree, name, fallback),
            None => 0,
        };
        self.storage.save_colors(&self.colors)?;
        Ok(repainted)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
