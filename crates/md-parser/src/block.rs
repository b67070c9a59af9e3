//! Block splitting
//!
//! Splits source text into top-level blocks. A block ends at the end of
//! input, at a line break directly followed by `#` (so an ATX heading always
//! starts a new block), or at a run of blank lines.

use std::ops::Deref;

/// A contiguous run of source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block content, without the separator that followed it
    pub text: String,
    /// The blank-line run or heading delimiter that followed the block
    pub trailing: String,
    /// 1-based line number where the block starts
    pub line_number: usize,
}

impl Block {
    pub fn new(text: impl Into<String>, trailing: impl Into<String>, line_number: usize) -> Self {
        Self {
            text: text.into(),
            trailing: trailing.into(),
            line_number,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Deref for Block {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

/// Collapse `\r\n` and `\r` line endings to `\n`
pub fn normalize_newlines(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

pub(crate) fn count_lines(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'\n').count()
}

/// Split source text into blocks
///
/// Leading blank lines are skipped but still counted toward line numbers.
pub fn split_blocks(input: &str) -> Vec<Block> {
    let text = normalize_newlines(input);
    let mut blocks = Vec::new();

    let mut pos = leading_blank_len(&text);
    let mut line_number = 1 + count_lines(&text[..pos]);

    while pos < text.len() {
        let (end, trailing_end) = block_end(&text, pos);
        blocks.push(Block::new(
            &text[pos..end],
            &text[end..trailing_end],
            line_number,
        ));
        line_number += count_lines(&text[pos..trailing_end]);
        pos = trailing_end;
    }

    blocks
}

/// Length of the whitespace prefix up to and including its last newline
fn leading_blank_len(text: &str) -> usize {
    let ws_end = text
        .find(|c: char| !c.is_whitespace())
        .unwrap_or(text.len());
    text[..ws_end].rfind('\n').map_or(0, |i| i + 1)
}

/// Find where the block starting at `start` ends
///
/// Returns `(content_end, trailing_end)`. Scanning resumes at `trailing_end`.
fn block_end(text: &str, start: usize) -> (usize, usize) {
    // Content is never empty
    let mut search = start + text[start..].chars().next().map_or(0, char::len_utf8);

    while let Some(offset) = text[search..].find('\n') {
        let q = search + offset;
        if text[q + 1..].starts_with('#') {
            return (q, q + 1);
        }
        if let Some(run_end) = blank_run_end(text, q) {
            return (q, run_end);
        }
        search = q + 1;
    }

    (text.len(), text.len())
}

/// End of the blank-line run starting at the newline `nl`, if there is one
fn blank_run_end(text: &str, nl: usize) -> Option<usize> {
    let after = nl + 1;
    if after == text.len() {
        return Some(after);
    }
    let rest = &text[after..];
    let ws_len = rest
        .find(|c: char| !c.is_whitespace())
        .unwrap_or(rest.len());
    rest[..ws_len].rfind('\n').map(|i| after + i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(blocks: &[Block]) -> Vec<(&str, &str, usize)> {
        blocks
            .iter()
            .map(|b| (b.text.as_str(), b.trailing.as_str(), b.line_number))
            .collect()
    }

    #[test]
    fn test_split_on_blank_lines() {
        let blocks = split_blocks("a\nb\n\n\nc");
        assert_eq!(parts(&blocks), vec![("a\nb", "\n\n\n", 1), ("c", "", 5)]);
    }

    #[test]
    fn test_leading_blank_lines_are_counted() {
        let blocks = split_blocks("\n\n  \nfoo");
        assert_eq!(parts(&blocks), vec![("foo", "", 4)]);
    }

    #[test]
    fn test_heading_starts_new_block() {
        // A `#` line opens a block; lines after it stay with it
        let blocks = split_blocks("# A\n# B\npara");
        assert_eq!(parts(&blocks), vec![("# A", "\n", 1), ("# B\npara", "", 2)]);
    }

    #[test]
    fn test_whitespace_only_lines_separate_blocks() {
        let blocks = split_blocks("one\n   \ntwo");
        assert_eq!(parts(&blocks), vec![("one", "\n   \n", 1), ("two", "", 3)]);
    }

    #[test]
    fn test_trailing_newline() {
        let blocks = split_blocks("only\n");
        assert_eq!(parts(&blocks), vec![("only", "\n", 1)]);
    }

    #[test]
    fn test_line_endings_are_normalized() {
        let blocks = split_blocks("a\r\nb\r\rc");
        assert_eq!(parts(&blocks), vec![("a\nb", "\n\n", 1), ("c", "", 4)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(split_blocks("").is_empty());
        assert!(split_blocks("\n\n").is_empty());
    }
}
