//! UTF-8 Safe String Utilities
//!
//! Document offsets are counted in characters, while Rust strings are
//! sliced by byte. These helpers convert between the two without ever
//! slicing inside a multi-byte character.
//!
//! # Example
//! ```ignore
//! use md_annotate::string_utils::{char_slice, find_in_char_range};
//!
//! let text = "Hei på deg";
//! assert_eq!(char_slice(text, 4, 2), "på");
//! assert_eq!(find_in_char_range(text, "deg", 0, 10), Some(7));
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// Character Boundary Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the largest index that is less than or equal to `index`
/// and is on a UTF-8 character boundary.
///
/// If `index` is greater than the string length, returns the string length.
#[inline]
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let bytes = s.as_bytes();
    let mut i = index;
    while i > 0 && !is_utf8_char_start(bytes[i]) {
        i -= 1;
    }
    i
}

/// Check if a byte is the start of a UTF-8 character.
///
/// A byte is a char start if it's NOT a continuation byte (10xxxxxx).
#[inline]
fn is_utf8_char_start(byte: u8) -> bool {
    (byte & 0b11000000) != 0b10000000
}

// ─────────────────────────────────────────────────────────────────────────────
// Character / Byte Index Conversion
// ─────────────────────────────────────────────────────────────────────────────

/// Number of characters in `s`.
#[inline]
pub fn char_count(s: &str) -> usize {
    s.chars().count()
}

/// Convert a character index to a byte index.
///
/// Returns the string length if `char_index` is beyond the string.
pub fn char_index_to_byte_index(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Convert a byte index to a character index.
///
/// If the byte index is in the middle of a character, it counts
/// up to (but not including) that character.
pub fn byte_index_to_char_index(s: &str, byte_index: usize) -> usize {
    let byte_index = floor_char_boundary(s, byte_index);
    s[..byte_index].chars().count()
}

/// Slice `len` characters starting at character `start`.
///
/// Out-of-range bounds are clamped to the end of the string.
pub fn char_slice(s: &str, start: usize, len: usize) -> &str {
    let from = char_index_to_byte_index(s, start);
    let to = from + char_index_to_byte_index(&s[from..], len);
    &s[from..to]
}

/// Split `s` at a character index, returning the two halves.
pub fn split_at_char(s: &str, char_index: usize) -> (&str, &str) {
    s.split_at(char_index_to_byte_index(s, char_index))
}

// ─────────────────────────────────────────────────────────────────────────────
// Searching
// ─────────────────────────────────────────────────────────────────────────────

/// Find the first occurrence of `needle` lying entirely within the character
/// range `[from, to)` of `haystack`.
///
/// Returns the character index of the match in `haystack`. An empty needle
/// never matches.
pub fn find_in_char_range(haystack: &str, needle: &str, from: usize, to: usize) -> Option<usize> {
    if needle.is_empty() || from >= to {
        return None;
    }
    let from_byte = char_index_to_byte_index(haystack, from);
    let to_byte = char_index_to_byte_index(haystack, to);
    if from_byte >= to_byte {
        return None;
    }
    let window = &haystack[from_byte..to_byte];
    window
        .find(needle)
        .map(|pos| from + byte_index_to_char_index(window, pos))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
