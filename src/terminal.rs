use std::fmt;

use crate::{tree::Kind, Error, Regex};

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    Literal(String),
    /// Matches the empty string everywhere. Used by recovery terminals.
    Empty,
}

/// A named token matcher.
#[derive(Debug, Clone)]
pub struct Terminal {
    kind: Kind,
    matcher: Matcher,
}

impl Terminal {
    /// Compile `pattern` into a longest-match terminal.
    pub fn regex(kind: &str, pattern: &str) -> Result<Self, Error> {
        Ok(Self {
            kind: kind.into(),
            matcher: Matcher::Regex(Regex::new(pattern)?),
        })
    }

    /// Exact text, named after itself.
    pub fn literal(text: &str) -> Self {
        Self::literal_with_kind(text, text)
    }

    pub fn literal_with_kind(text: &str, kind: &str) -> Self {
        Self {
            kind: kind.into(),
            matcher: Matcher::Literal(text.to_string()),
        }
    }

    pub fn empty(kind: &str) -> Self {
        Self {
            kind: kind.into(),
            matcher: Matcher::Empty,
        }
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.matcher, Matcher::Empty)
    }

    /// End offset of the token starting at `start`, if any.
    pub fn try_match(&self, input: &str, start: usize) -> Option<usize> {
        match &self.matcher {
            Matcher::Regex(regex) => regex.try_match(input, start),
            Matcher::Literal(text) => input
                .get(start..)
                .filter(|rest| rest.starts_with(text.as_str()))
                .map(|_| start + text.len()),
            Matcher::Empty => (start <= input.len()).then_some(start),
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.matcher {
            Matcher::Literal(text) => write!(f, "«{text}»"),
            _ => f.write_str(&self.kind),
        }
    }
}
