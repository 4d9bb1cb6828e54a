use thiserror::Error;

use crate::ast::{CharClass, CharRange, RegexNode};

/// Regex syntax error. Every variant carries the byte offset in the pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing operand at offset {0}")]
    MissingOperand(usize),
    #[error("unclosed parenthesis opened at offset {0}")]
    UnclosedParenthesis(usize),
    #[error("unexpected parenthesis at offset {0}")]
    UnexpectedParenthesis(usize),
    #[error("unclosed bracket expression opened at offset {0}")]
    UnclosedBracket(usize),
    #[error("invalid range {from:?}-{to:?} at offset {offset}")]
    InvalidRange { offset: usize, from: char, to: char },
    #[error("unexpected end of pattern at offset {0}, expected {1}")]
    UnexpectedEnd(usize, &'static str),
    #[error("empty expression at offset {0}")]
    Empty(usize),
}

impl ParseError {
    pub fn offset(&self) -> usize {
        match *self {
            ParseError::MissingOperand(offset)
            | ParseError::UnclosedParenthesis(offset)
            | ParseError::UnexpectedParenthesis(offset)
            | ParseError::UnclosedBracket(offset)
            | ParseError::InvalidRange { offset, .. }
            | ParseError::UnexpectedEnd(offset, _)
            | ParseError::Empty(offset) => offset,
        }
    }
}

struct Parser<'a> {
    pattern: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    // Number of currently open groups.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            chars: pattern.char_indices().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.get(self.pos + 1).map(|&(_, c)| c)
    }

    /// Byte offset of the next character.
    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.pattern.len(), |&(offset, _)| offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expect_char(&mut self, what: &'static str) -> Result<char, ParseError> {
        let offset = self.offset();
        self.bump().ok_or(ParseError::UnexpectedEnd(offset, what))
    }

    /// alternation := concat ('|' concat)*
    fn alternation(&mut self) -> Result<RegexNode, ParseError> {
        let offset = self.offset();
        let first = match self.concat()? {
            Some(node) => node,
            None => {
                return Err(match self.peek() {
                    Some('|') => ParseError::MissingOperand(offset),
                    Some(')') if self.depth == 0 => ParseError::UnexpectedParenthesis(offset),
                    _ => ParseError::Empty(offset),
                })
            }
        };

        let mut branches = vec![first];
        while self.peek() == Some('|') {
            self.bump();
            let offset = self.offset();
            match self.concat()? {
                Some(node) => branches.push(node),
                None => return Err(ParseError::MissingOperand(offset)),
            }
        }

        if branches.len() == 1 {
            Ok(branches.remove(0))
        } else {
            Ok(RegexNode::Alternation(branches))
        }
    }

    /// concat := repeat*
    fn concat(&mut self) -> Result<Option<RegexNode>, ParseError> {
        let mut nodes = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            nodes.push(self.repeat()?);
        }

        Ok(match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(RegexNode::Concat(nodes)),
        })
    }

    /// repeat := factor ('*' | '+' | '?')*
    fn repeat(&mut self) -> Result<RegexNode, ParseError> {
        let mut node = self.factor()?;

        macro_rules! quantifier {
            ($operator:expr) => {{
                self.bump();
                node = $operator(Box::new(node));
            }};
        }

        loop {
            match self.peek() {
                Some('*') => quantifier!(RegexNode::Star),
                Some('+') => quantifier!(RegexNode::Plus),
                Some('?') => quantifier!(RegexNode::Optional),
                _ => return Ok(node),
            }
        }
    }

    fn factor(&mut self) -> Result<RegexNode, ParseError> {
        let offset = self.offset();
        match self.expect_char("an expression")? {
            '(' => self.group(offset),
            '[' => self.bracket(offset),
            '.' => Ok(RegexNode::AnyChar),
            '\\' => self.escape(),
            '*' | '+' | '?' => Err(ParseError::MissingOperand(offset)),
            c => Ok(RegexNode::Char(c)),
        }
    }

    fn group(&mut self, open: usize) -> Result<RegexNode, ParseError> {
        if self.peek().is_none() {
            return Err(ParseError::UnclosedParenthesis(open));
        }

        self.depth += 1;
        let inner = self.alternation()?;
        self.depth -= 1;

        match self.bump() {
            Some(')') => Ok(RegexNode::Group(Box::new(inner))),
            _ => Err(ParseError::UnclosedParenthesis(open)),
        }
    }

    fn escape(&mut self) -> Result<RegexNode, ParseError> {
        let c = self.expect_char("an escaped character")?;
        Ok(match named_class(c) {
            Some(class) => RegexNode::Class(class),
            None => RegexNode::Char(control_escape(c)),
        })
    }

    /// bracket := '[' '^'? (escape | char ('-' char)?)+ ']'
    fn bracket(&mut self, open: usize) -> Result<RegexNode, ParseError> {
        let negated = self.peek() == Some('^');
        if negated {
            self.bump();
        }

        let mut classes = Vec::new();
        let mut ranges = Vec::new();
        // Index in `classes` where the literal ranges are printed.
        let mut ranges_at = None;

        loop {
            let offset = self.offset();
            let from = match self.bump() {
                None => return Err(ParseError::UnclosedBracket(open)),
                Some(']') if classes.is_empty() && ranges.is_empty() => {
                    return Err(ParseError::Empty(offset))
                }
                Some(']') => break,
                Some('\\') => {
                    let c = self.expect_char("an escaped character")?;
                    if let Some(class) = named_class(c) {
                        classes.push(class);
                        continue;
                    }
                    control_escape(c)
                }
                Some(c) => c,
            };

            let is_range =
                self.peek() == Some('-') && !matches!(self.peek_second(), Some(']') | None);
            let to = if is_range {
                self.bump();
                match self.expect_char("a range end")? {
                    '\\' => control_escape(self.expect_char("an escaped character")?),
                    c => c,
                }
            } else {
                from
            };

            if from > to {
                return Err(ParseError::InvalidRange { offset, from, to });
            }

            ranges_at.get_or_insert(classes.len());
            ranges.push(CharRange::new(from, to));
        }

        let class = match ranges_at {
            None if classes.len() == 1 && !negated => classes.remove(0),
            None => CharClass::Union { classes, negated },
            Some(_) if classes.is_empty() => CharClass::ranges(ranges, negated),
            Some(at) => {
                classes.insert(at, CharClass::ranges(ranges, false));
                CharClass::Union { classes, negated }
            }
        };

        Ok(RegexNode::Class(class))
    }
}

fn named_class(c: char) -> Option<CharClass> {
    Some(match c {
        'l' => CharClass::Letter { negated: false },
        'L' => CharClass::Letter { negated: true },
        'd' => CharClass::Digit { negated: false },
        'D' => CharClass::Digit { negated: true },
        'w' => CharClass::Word { negated: false },
        'W' => CharClass::Word { negated: true },
        's' => CharClass::Whitespace { negated: false },
        'S' => CharClass::Whitespace { negated: true },
        _ => return None,
    })
}

fn control_escape(c: char) -> char {
    match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        c => c,
    }
}

/// Parse a regular expression pattern into an abstract syntax tree (AST).
pub fn parse(pattern: &str) -> Result<RegexNode, ParseError> {
    let mut parser = Parser::new(pattern);
    let node = parser.alternation()?;

    // The only character `alternation` stops at on the top level.
    match parser.peek() {
        None => Ok(node),
        Some(_) => Err(ParseError::UnexpectedParenthesis(parser.offset())),
    }
}
