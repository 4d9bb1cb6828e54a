//! Parse failure diagnostics.

use thiserror::Error;

/// Number of chars shown around the failure offset.
const CONTEXT: usize = 60;

/// The furthest point a parse reached, with the terminals that could have continued it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("({line},{col}): {}\n{context}", summary(.expected, .note))]
pub struct SyntaxError {
    /// Byte offset of the failure.
    pub offset: usize,
    /// 1-based.
    pub line: usize,
    /// 1-based, in chars.
    pub col: usize,
    /// Terminal kinds, deduplicated ignoring case, in the order they were first expected.
    pub expected: Vec<String>,
    /// Excerpt line and caret line, already formatted.
    pub context: String,
    /// Extra reason, e.g. the nesting limit was hit.
    pub note: Option<String>,
}

impl SyntaxError {
    pub fn new(input: &str, offset: usize, expected: impl IntoIterator<Item = String>) -> Self {
        let (line, col) = line_col(input, offset);

        let mut unique: Vec<String> = Vec::new();
        for kind in expected {
            let folded = kind.to_lowercase();
            if !unique.iter().any(|k| k.to_lowercase() == folded) {
                unique.push(kind);
            }
        }

        Self {
            offset,
            line,
            col,
            expected: unique,
            context: highlight(input, offset),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// `Expected: a, b (note)`, or just the note when nothing was expected.
fn summary(expected: &[String], note: &Option<String>) -> String {
    match (expected.is_empty(), note) {
        (false, None) => format!("Expected: {}", expected.join(", ")),
        (false, Some(note)) => format!("Expected: {} ({note})", expected.join(", ")),
        (true, Some(note)) => note.clone(),
        (true, None) => "Unexpected input".to_string(),
    }
}

/// 1-based line and char column of byte `offset`. `\r\n`, `\r` and `\n` each end a line.
pub fn line_col(input: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if i >= offset {
            break;
        }
        match c {
            '\r' => {
                if let Some(&(j, '\n')) = chars.peek() {
                    // A CRLF split by the offset still counts as one break.
                    if j < offset {
                        chars.next();
                    }
                }
                line += 1;
                col = 1;
            }
            '\n' => {
                line += 1;
                col = 1;
            }
            _ => col += 1,
        }
    }

    (line, col)
}

/// ```txt
/// ...<up to 60 chars around the offset>...
///    <caret under the offset>
/// ```
fn highlight(input: &str, offset: usize) -> String {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let at = chars.partition_point(|&(i, _)| i < offset);
    let from = at.saturating_sub(CONTEXT / 2);
    let to = (from + CONTEXT).min(chars.len());

    let mut excerpt = String::new();
    let mut caret = 0;
    for (k, &(_, c)) in chars[from..to].iter().enumerate() {
        let width = match c {
            '\r' => {
                excerpt.push_str("\\r");
                2
            }
            '\n' => {
                excerpt.push_str("\\n");
                2
            }
            c => {
                excerpt.push(c);
                1
            }
        };
        if from + k < at {
            caret += width;
        }
    }

    format!("...{excerpt}...\n   {}^", " ".repeat(caret))
}
