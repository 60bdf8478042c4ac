//! Highlight colors
//!
//! A highlight is painted either with one of the fixed palette colors or
//! with a custom color the user added. Custom colors live in a global
//! [`ColorTable`] keyed by a generated name (`custom-1`, `custom-2`, ...)
//! and persisted separately from any document.

use crate::error::{Error, Result};
use egui::Color32;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Prefix of generated custom color names.
const CUSTOM_PREFIX: &str = "custom-";

// ─────────────────────────────────────────────────────────────────────────────
// Palette
// ─────────────────────────────────────────────────────────────────────────────

/// The fixed highlight palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
    Purple,
    Orange,
}

impl PaletteColor {
    /// Every palette entry, in picker order.
    pub const ALL: [PaletteColor; 6] = [
        PaletteColor::Yellow,
        PaletteColor::Green,
        PaletteColor::Blue,
        PaletteColor::Pink,
        PaletteColor::Purple,
        PaletteColor::Orange,
    ];

    /// Persisted name of the color.
    pub fn name(self) -> &'static str {
        match self {
            PaletteColor::Yellow => "yellow",
            PaletteColor::Green => "green",
            PaletteColor::Blue => "blue",
            PaletteColor::Pink => "pink",
            PaletteColor::Purple => "purple",
            PaletteColor::Orange => "orange",
        }
    }

    /// Look up a palette color by its persisted name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Translucent highlight background for this color.
    pub fn rgba(self) -> [u8; 4] {
        match self {
            PaletteColor::Yellow => [255, 235, 59, 140],
            PaletteColor::Green => [102, 187, 106, 120],
            PaletteColor::Blue => [66, 165, 245, 120],
            PaletteColor::Pink => [240, 98, 146, 120],
            PaletteColor::Purple => [171, 71, 188, 120],
            PaletteColor::Orange => [255, 167, 38, 130],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ColorRef
// ─────────────────────────────────────────────────────────────────────────────

/// The color of one highlight span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColorRef {
    Palette(PaletteColor),
    /// A user-added color; `rgba` is the CSS-style string it was added with
    Custom { name: String, rgba: String },
}

impl Default for ColorRef {
    fn default() -> Self {
        ColorRef::Palette(PaletteColor::default())
    }
}

impl From<PaletteColor> for ColorRef {
    fn from(color: PaletteColor) -> Self {
        ColorRef::Palette(color)
    }
}

impl ColorRef {
    /// Name written to the persisted record.
    pub fn name(&self) -> &str {
        match self {
            ColorRef::Palette(color) => color.name(),
            ColorRef::Custom { name, .. } => name,
        }
    }

    /// Whether this is a user-added color.
    pub fn is_custom(&self) -> bool {
        matches!(self, ColorRef::Custom { .. })
    }

    /// Background color for rendering.
    ///
    /// A custom entry whose string no longer parses renders with the default
    /// palette color.
    pub fn to_color32(&self) -> Color32 {
        let [r, g, b, a] = match self {
            ColorRef::Palette(color) => color.rgba(),
            ColorRef::Custom { rgba, .. } => {
                parse_rgba(rgba).unwrap_or_else(|_| PaletteColor::default().rgba())
            }
        };
        Color32::from_rgba_unmultiplied(r, g, b, a)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Color Parsing
// ─────────────────────────────────────────────────────────────────────────────

static FUNCTIONAL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static HEX_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn functional_re() -> Option<&'static Regex> {
    FUNCTIONAL_RE
        .get_or_init(|| {
            Regex::new(
                r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*(0|1|0?\.\d+|1\.0+)\s*)?\)$",
            )
            .ok()
        })
        .as_ref()
}

fn hex_re() -> Option<&'static Regex> {
    HEX_RE
        .get_or_init(|| Regex::new(r"^#([0-9a-fA-F]{6})([0-9a-fA-F]{2})?$").ok())
        .as_ref()
}

/// Parse `rgba(r, g, b[, a])`, `rgb(r, g, b)` or `#rrggbb[aa]` into RGBA bytes.
///
/// Alpha in the functional form is a fraction in `0..=1`.
pub fn parse_rgba(input: &str) -> Result<[u8; 4]> {
    let invalid = || Error::InvalidColor(input.to_string());
    let s = input.trim();

    if let Some(caps) = functional_re().and_then(|re| re.captures(s)) {
        let channel = |i: usize| -> Result<u8> {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u8>().ok())
                .ok_or_else(invalid)
        };
        let alpha = match caps.get(4) {
            Some(m) => {
                let fraction: f32 = m.as_str().parse().map_err(|_| invalid())?;
                (fraction.clamp(0.0, 1.0) * 255.0).round() as u8
            }
            None => 255,
        };
        return Ok([channel(1)?, channel(2)?, channel(3)?, alpha]);
    }

    if let Some(caps) = hex_re().and_then(|re| re.captures(s)) {
        let rgb = caps.get(1).map(|m| m.as_str()).ok_or_else(invalid)?;
        let byte = |hex: &str| u8::from_str_radix(hex, 16).map_err(|_| invalid());
        let alpha = match caps.get(2) {
            Some(m) => byte(m.as_str())?,
            None => 255,
        };
        return Ok([byte(&rgb[0..2])?, byte(&rgb[2..4])?, byte(&rgb[4..6])?, alpha]);
    }

    Err(invalid())
}

// ─────────────────────────────────────────────────────────────────────────────
// Custom Color Table
// ─────────────────────────────────────────────────────────────────────────────

/// User-added colors, keyed by generated name.
///
/// Serializes as a flat JSON object `{ "custom-1": "rgba(...)" }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorTable {
    entries: BTreeMap<String, String>,
}

impl ColorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, rgba)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Add a custom color under a freshly generated name.
    ///
    /// Adding a string already in the table returns the existing entry.
    pub fn add(&mut self, rgba: &str) -> Result<ColorRef> {
        parse_rgba(rgba)?;
        let rgba = rgba.trim().to_string();

        if let Some((name, _)) = self.entries.iter().find(|(_, v)| **v == rgba) {
            return Ok(ColorRef::Custom {
                name: name.clone(),
                rgba,
            });
        }

        let name = format!("{}{}", CUSTOM_PREFIX, self.next_index());
        debug!("Adding custom color {} = {}", name, rgba);
        self.entries.insert(name.clone(), rgba.clone());
        Ok(ColorRef::Custom { name, rgba })
    }

    fn next_index(&self) -> u32 {
        self.entries
            .keys()
            .filter_map(|k| k.strip_prefix(CUSTOM_PREFIX)?.parse::<u32>().ok())
            .max()
            .map_or(1, |n| n + 1)
    }

    /// Remove a custom color. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Custom entry by name.
    pub fn get(&self, name: &str) -> Option<ColorRef> {
        self.entries.get(name).map(|rgba| ColorRef::Custom {
            name: name.to_string(),
            rgba: rgba.clone(),
        })
    }

    /// Resolve a persisted color name: a palette name, then a custom name,
    /// then `fallback`.
    pub fn resolve(&self, name: &str, fallback: PaletteColor) -> ColorRef {
        if let Some(color) = PaletteColor::from_name(name) {
            return ColorRef::Palette(color);
        }
        if let Some(color) = self.get(name) {
            return color;
        }
        debug!(
            "Unknown highlight color '{}', using {}",
            name,
            fallback.name()
        );
        ColorRef::Palette(fallback)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_names_roundtrip() {
        for color in PaletteColor::ALL {
            assert_eq!(PaletteColor::from_name(color.name()), Some(color));
        }
        assert_eq!(PaletteColor::from_name("mauve"), None);
    }

    #[test]
    fn test_palette_serde_lowercase() {
        let json = serde_json::to_string(&PaletteColor::Purple).unwrap();
        assert_eq!(json, "\"purple\"");
    }

    #[test]
    fn test_parse_functional() {
        assert_eq!(parse_rgba("rgb(1, 2, 3)").unwrap(), [1, 2, 3, 255]);
        assert_eq!(parse_rgba("rgba(255,0,10,0.5)").unwrap(), [255, 0, 10, 128]);
        assert_eq!(parse_rgba("rgba(0,0,0,1)").unwrap(), [0, 0, 0, 255]);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_rgba("#ff8000").unwrap(), [255, 128, 0, 255]);
        assert_eq!(parse_rgba("#FF800080").unwrap(), [255, 128, 0, 128]);
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["", "red", "rgb(300,0,0)", "#fff", "rgba(1,2)", "rgba(1,2,3,2)"] {
            assert!(
                matches!(parse_rgba(bad), Err(Error::InvalidColor(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_table_add_generates_names() {
        let mut table = ColorTable::new();
        let first = table.add("rgba(10,20,30,0.4)").unwrap();
        let second = table.add("#123456").unwrap();

        assert_eq!(first.name(), "custom-1");
        assert_eq!(second.name(), "custom-2");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_add_existing_returns_same_entry() {
        let mut table = ColorTable::new();
        let a = table.add("#123456").unwrap();
        let b = table.add(" #123456 ").unwrap();
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_add_rejects_invalid() {
        let mut table = ColorTable::new();
        assert!(table.add("not a color").is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_table_names_not_reused_after_removal() {
        let mut table = ColorTable::new();
        table.add("#000001").unwrap();
        table.add("#000002").unwrap();
        assert!(table.remove("custom-1"));
        assert!(!table.remove("custom-1"));

        let next = table.add("#000003").unwrap();
        assert_eq!(next.name(), "custom-3");
    }

    #[test]
    fn test_resolve() {
        let mut table = ColorTable::new();
        let custom = table.add("#abcdef").unwrap();

        assert_eq!(
            table.resolve("green", PaletteColor::Yellow),
            ColorRef::Palette(PaletteColor::Green)
        );
        assert_eq!(table.resolve(custom.name(), PaletteColor::Yellow), custom);
        assert_eq!(
            table.resolve("custom-99", PaletteColor::Blue),
            ColorRef::Palette(PaletteColor::Blue)
        );
    }

    #[test]
    fn test_table_serializes_flat() {
        let mut table = ColorTable::new();
        table.add("rgba(1,2,3,0.5)").unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"custom-1":"rgba(1,2,3,0.5)"}"#);

        let back: ColorTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_custom_to_color32() {
        let color = ColorRef::Custom {
            name: "custom-1".into(),
            rgba: "#ff0000".into(),
        };
        assert_eq!(color.to_color32(), Color32::from_rgba_unmultiplied(255, 0, 0, 255));
    }
}
