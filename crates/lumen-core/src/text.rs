use crate::LineCol;

/// Compute the 1-based (line, offset) position of a byte offset in `content`.
///
/// Offsets past the end of the content clamp to the final position.
pub fn line_col_at(content: &str, byte_offset: usize) -> LineCol {
    let mut line = 1u32;
    let mut col = 1u32;
    for (idx, ch) in content.char_indices() {
        if idx >= byte_offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    LineCol::new(line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        let text = "ab\ncd";
        assert_eq!(line_col_at(text, 0), LineCol::new(1, 1));
        assert_eq!(line_col_at(text, 1), LineCol::new(1, 2));
        assert_eq!(line_col_at(text, 3), LineCol::new(2, 1));
        assert_eq!(line_col_at(text, 4), LineCol::new(2, 2));
    }

    #[test]
    fn offsets_past_the_end_clamp() {
        assert_eq!(line_col_at("a", 100), LineCol::new(1, 2));
        assert_eq!(line_col_at("", 5), LineCol::new(1, 1));
    }
}
