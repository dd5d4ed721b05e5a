use jsonnet_core::token::Position as CorePosition;
use ropey::Rope;
use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent};

// Convert LSP UTF-16 position to Rope char index (scalar values), clamped to the end of the line.
pub(crate) fn position_to_char_idx(text: &Rope, pos: Position) -> usize {
    let line_idx = pos.line as usize;
    if line_idx >= text.len_lines() {
        return text.len_chars();
    }
    let line_start_char = text.line_to_char(line_idx);
    let line_slice = text.line(line_idx);
    let target_utf16 = pos.character as usize;

    if let Some(s) = line_slice.as_str() {
        if s.is_ascii() {
            let len_chars = s.trim_end_matches(['\n', '\r']).len();
            let clamped = target_utf16.min(len_chars);
            return line_start_char + clamped;
        }
    }

    let mut seen_utf16 = 0usize;
    let mut chars_in_line = 0usize;
    for ch in line_slice.chars() {
        if ch == '\n' || ch == '\r' {
            break;
        }
        let u16_len = ch.len_utf16();
        if seen_utf16 + u16_len > target_utf16 {
            break;
        }
        seen_utf16 += u16_len;
        chars_in_line += 1;
        if seen_utf16 == target_utf16 {
            break;
        }
    }
    line_start_char + chars_in_line
}

// Apply incremental LSP changes to a rope buffer.
pub(crate) fn apply_incremental_change_rope(text: &mut Rope, change: &TextDocumentContentChangeEvent) {
    if let Some(range) = &change.range {
        let start_char = position_to_char_idx(text, range.start);
        let end_char = position_to_char_idx(text, range.end);
        let (s, e) = if start_char <= end_char {
            (start_char, end_char)
        } else {
            (end_char, start_char)
        };
        if s != e {
            text.remove(s..e);
        }
        if !change.text.is_empty() {
            text.insert(s, &change.text);
        }
    } else {
        *text = Rope::from_str(&change.text);
    }
}

/// LSP positions are 0-based UTF-16; the core counts 1-based chars.
pub(crate) fn lsp_to_core(text: &Rope, pos: Position) -> CorePosition {
    let idx = position_to_char_idx(text, pos);
    let line = text.char_to_line(idx);
    let column = idx - text.line_to_char(line);
    CorePosition::new(line as u32 + 1, column as u32 + 1, idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::Range;

    fn change(start: (u32, u32), end: (u32, u32), text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range::new(Position::new(start.0, start.1), Position::new(end.0, end.1))),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_position_clamps_to_line_end() {
        let rope = Rope::from_str("ab\ncd");
        assert_eq!(position_to_char_idx(&rope, Position::new(0, 10)), 2);
        assert_eq!(position_to_char_idx(&rope, Position::new(1, 1)), 4);
        assert_eq!(position_to_char_idx(&rope, Position::new(5, 0)), 5);
    }

    #[test]
    fn test_utf16_positions() {
        let rope = Rope::from_str("local s = '😀'; s");
        // the emoji takes two UTF-16 units but one char
        assert_eq!(position_to_char_idx(&rope, Position::new(0, 13)), 12);
        assert_eq!(position_to_char_idx(&rope, Position::new(0, 14)), 13);
    }

    #[test]
    fn test_incremental_edits() {
        let mut rope = Rope::from_str("local o = {x: 1};\no");
        apply_incremental_change_rope(&mut rope, &change((1, 1), (1, 1), "."));
        assert_eq!(rope.to_string(), "local o = {x: 1};\no.");
        apply_incremental_change_rope(&mut rope, &change((0, 11), (0, 12), "y"));
        assert_eq!(rope.to_string(), "local o = {y: 1};\no.");
    }

    #[test]
    fn test_lsp_to_core() {
        let rope = Rope::from_str("local o = {x: 1};\no.");
        let pos = lsp_to_core(&rope, Position::new(1, 2));
        assert_eq!((pos.line, pos.column, pos.offset), (2, 3, 20));
    }
}
