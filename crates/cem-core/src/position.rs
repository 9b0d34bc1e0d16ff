//! Conversions between LSP positions (UTF-16 code units) and the UTF-8 byte
//! offsets used internally by the document content and its tree-sitter tree.
//!
//! Every crossing from LSP-land into tree-sitter-land must go through this
//! module; there is no other place in the codebase that should perform
//! arithmetic on `character`.

use tower_lsp_server::lsp_types::Position;

/// Converts a UTF-16 column on a line to the corresponding UTF-8 byte column.
///
/// Invalid UTF-8 bytes are treated as one byte contributing one UTF-16 unit,
/// so malformed input never panics or infinite-loops.
#[must_use]
pub fn utf16_to_byte_col(line: &str, utf16_col: u32) -> usize {
    let mut utf16_units = 0u32;
    for (byte_idx, ch) in line.char_indices() {
        if utf16_units >= utf16_col {
            return byte_idx;
        }
        utf16_units += ch.len_utf16() as u32;
    }
    line.len()
}

/// Converts a UTF-8 byte column on a line to the corresponding UTF-16 column.
#[must_use]
pub fn byte_to_utf16_col(line: &str, byte_col: usize) -> u32 {
    let clamped = byte_col.min(line.len());
    let mut utf16_units = 0u32;
    for (byte_idx, ch) in line.char_indices() {
        if byte_idx >= clamped {
            break;
        }
        utf16_units += ch.len_utf16() as u32;
    }
    utf16_units
}

/// Converts an LSP [`Position`] into a UTF-8 byte offset within `content`.
/// Out-of-range positions clamp to the end of the content.
#[must_use]
pub fn position_to_offset(content: &str, position: Position) -> usize {
    let mut offset = 0usize;
    for (line_no, line) in content.split('\n').enumerate() {
        if line_no as u32 == position.line {
            return offset + utf16_to_byte_col(line, position.character);
        }
        offset += line.len() + 1; // +1 for the '\n' consumed by split
    }
    content.len()
}

/// Converts a UTF-8 byte offset within `content` into an LSP [`Position`].
/// Offsets past the end of content clamp to the final position.
#[must_use]
pub fn offset_to_position(content: &str, offset: usize) -> Position {
    let clamped = offset.min(content.len());
    let mut consumed = 0usize;
    for (line_no, line) in content.split('\n').enumerate() {
        let line_end = consumed + line.len();
        if clamped <= line_end {
            let byte_col = clamped - consumed;
            return Position {
                line: line_no as u32,
                character: byte_to_utf16_col(line, byte_col),
            };
        }
        consumed = line_end + 1;
    }
    let line_count = content.split('\n').count().max(1);
    let last_line = content.split('\n').next_back().unwrap_or("");
    Position {
        line: (line_count - 1) as u32,
        character: byte_to_utf16_col(last_line, last_line.len()),
    }
}

/// A tree-sitter point (row, UTF-8 byte column) derived from an LSP position.
#[must_use]
pub fn position_to_ts_point(content: &str, position: Position) -> tree_sitter::Point {
    let offset = position_to_offset(content, position);
    let line_start = content[..offset].rfind('\n').map_or(0, |i| i + 1);
    tree_sitter::Point {
        row: position.line as usize,
        column: offset - line_start,
    }
}
