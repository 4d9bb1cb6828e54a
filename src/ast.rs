use std::fmt;

use crate::charset::{self, CharSet};

/// Inclusive range of characters inside a bracket expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharRange {
    pub from: char,
    pub to: char,
}

impl CharRange {
    pub fn new(from: char, to: char) -> Self {
        Self { from, to }
    }

    pub fn single(c: char) -> Self {
        Self { from: c, to: c }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CharClass {
    /// `\l` / `\L`
    Letter { negated: bool },
    /// `\d` / `\D`
    Digit { negated: bool },
    /// `\w` / `\W`
    Word { negated: bool },
    /// `\s` / `\S`
    Whitespace { negated: bool },
    /// `[a-z_]`, kept sorted and non-overlapping.
    Ranges { ranges: Vec<CharRange>, negated: bool },
    /// Bracket expression that mixes named classes with literal ranges, e.g. `[\l_]`.
    Union { classes: Vec<CharClass>, negated: bool },
}

impl CharClass {
    /// Build a `Ranges` class, sorting the ranges and merging the overlapping ones.
    pub fn ranges(ranges: impl IntoIterator<Item = CharRange>, negated: bool) -> Self {
        let mut ranges: Vec<CharRange> = ranges.into_iter().collect();
        ranges.sort();

        let mut merged: Vec<CharRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.from <= last.to => last.to = last.to.max(range.to),
                _ => merged.push(range),
            }
        }

        CharClass::Ranges {
            ranges: merged,
            negated,
        }
    }

    pub fn matches(&self, c: char) -> bool {
        match self {
            CharClass::Letter { negated } => c.is_alphabetic() ^ negated,
            CharClass::Digit { negated } => c.is_numeric() ^ negated,
            CharClass::Word { negated } => (c.is_alphanumeric() || c == '_') ^ negated,
            CharClass::Whitespace { negated } => c.is_whitespace() ^ negated,
            CharClass::Ranges { ranges, negated } => {
                ranges.iter().any(|r| r.from <= c && c <= r.to) ^ negated
            }
            CharClass::Union { classes, negated } => {
                classes.iter().any(|class| class.matches(c)) ^ negated
            }
        }
    }

    pub fn to_charset(&self) -> CharSet {
        match self {
            CharClass::Letter { negated } => charset::letters().clone().negate_if(*negated),
            CharClass::Digit { negated } => charset::digits().clone().negate_if(*negated),
            CharClass::Word { negated } => charset::word().clone().negate_if(*negated),
            CharClass::Whitespace { negated } => {
                charset::whitespace().clone().negate_if(*negated)
            }
            CharClass::Ranges { ranges, negated } => {
                CharSet::from_ranges(ranges.iter().map(|r| (r.from as u32, r.to as u32)))
                    .negate_if(*negated)
            }
            CharClass::Union { classes, negated } => classes
                .iter()
                .fold(CharSet::empty(), |acc, class| acc.union(&class.to_charset()))
                .negate_if(*negated),
        }
    }

    // Body of a bracket expression, without the brackets.
    fn fmt_items(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharClass::Ranges { ranges, .. } => {
                for range in ranges {
                    if range.from == range.to {
                        write!(f, "{}", EscapeInClass(range.from))?;
                    } else {
                        write!(f, "{}-{}", EscapeInClass(range.from), EscapeInClass(range.to))?;
                    }
                }
                Ok(())
            }
            CharClass::Union { classes, .. } => classes.iter().try_for_each(|c| c.fmt_items(f)),
            named => write!(f, "{named}"),
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn named(f: &mut fmt::Formatter<'_>, negated: bool, lower: char) -> fmt::Result {
            if negated {
                write!(f, "\\{}", lower.to_ascii_uppercase())
            } else {
                write!(f, "\\{lower}")
            }
        }

        match self {
            CharClass::Letter { negated } => named(f, *negated, 'l'),
            CharClass::Digit { negated } => named(f, *negated, 'd'),
            CharClass::Word { negated } => named(f, *negated, 'w'),
            CharClass::Whitespace { negated } => named(f, *negated, 's'),
            CharClass::Ranges { negated, .. } | CharClass::Union { negated, .. } => {
                f.write_str(if *negated { "[^" } else { "[" })?;
                self.fmt_items(f)?;
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegexNode {
    Char(char),
    AnyChar,
    Class(CharClass),
    Concat(Vec<RegexNode>),
    Alternation(Vec<RegexNode>),
    Star(Box<RegexNode>),
    Plus(Box<RegexNode>),
    Optional(Box<RegexNode>),
    Group(Box<RegexNode>),
}

// Binding strength used when printing, loosest first.
const ALTERNATION: u8 = 0;
const CONCAT: u8 = 1;
const REPEAT: u8 = 2;
const ATOM: u8 = 3;

impl RegexNode {
    /// The set of characters a single-character node accepts.
    pub fn to_charset(&self) -> Option<CharSet> {
        match self {
            RegexNode::Char(c) => Some(CharSet::single(*c)),
            RegexNode::AnyChar => Some(CharSet::full()),
            RegexNode::Class(class) => Some(class.to_charset()),
            _ => None,
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, ctx: u8) -> fmt::Result {
        match self {
            RegexNode::Char(c) => write!(f, "{}", Escape(*c)),
            RegexNode::AnyChar => f.write_str("."),
            RegexNode::Class(class) => write!(f, "{class}"),
            RegexNode::Concat(nodes) => {
                parenthesized(f, ctx > CONCAT, |f| {
                    nodes.iter().try_for_each(|n| n.fmt_prec(f, REPEAT))
                })
            }
            RegexNode::Alternation(nodes) => {
                parenthesized(f, ctx > ALTERNATION, |f| {
                    for (i, n) in nodes.iter().enumerate() {
                        if i > 0 {
                            f.write_str("|")?;
                        }
                        n.fmt_prec(f, CONCAT)?;
                    }
                    Ok(())
                })
            }
            RegexNode::Star(node) => postfix(f, node, ctx, '*'),
            RegexNode::Plus(node) => postfix(f, node, ctx, '+'),
            RegexNode::Optional(node) => postfix(f, node, ctx, '?'),
            RegexNode::Group(node) => {
                f.write_str("(")?;
                node.fmt_prec(f, ALTERNATION)?;
                f.write_str(")")
            }
        }
    }
}

fn parenthesized(
    f: &mut fmt::Formatter<'_>,
    parens: bool,
    body: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    if parens {
        f.write_str("(")?;
    }
    body(f)?;
    if parens {
        f.write_str(")")?;
    }
    Ok(())
}

fn postfix(f: &mut fmt::Formatter<'_>, node: &RegexNode, ctx: u8, op: char) -> fmt::Result {
    parenthesized(f, ctx > REPEAT, |f| {
        node.fmt_prec(f, ATOM)?;
        write!(f, "{op}")
    })
}

impl fmt::Display for RegexNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, ALTERNATION)
    }
}

struct Escape(char);

impl fmt::Display for Escape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            c @ ('\\' | '.' | '|' | '*' | '+' | '?' | '(' | ')' | '[' | ']') => write!(f, "\\{c}"),
            c => write!(f, "{}", EscapeControl(c)),
        }
    }
}

struct EscapeInClass(char);

impl fmt::Display for EscapeInClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            c @ ('\\' | ']' | '-' | '^') => write!(f, "\\{c}"),
            c => write!(f, "{}", EscapeControl(c)),
        }
    }
}

struct EscapeControl(char);

impl fmt::Display for EscapeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            '\t' => f.write_str("\\t"),
            '\n' => f.write_str("\\n"),
            '\r' => f.write_str("\\r"),
            c if c.is_control() => write!(f, "\\u{:04X}", c as u32),
            c => write!(f, "{c}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ranges_are_sorted_and_merged() {
        let class = CharClass::ranges(
            [
                CharRange::new('x', 'z'),
                CharRange::new('a', 'f'),
                CharRange::new('c', 'h'),
                CharRange::single('_'),
            ],
            false,
        );
        assert_eq!(
            class,
            CharClass::Ranges {
                ranges: vec![
                    CharRange::single('_'),
                    CharRange::new('a', 'h'),
                    CharRange::new('x', 'z'),
                ],
                negated: false,
            }
        );
        assert_eq!(class.to_string(), "[_a-hx-z]");
    }

    #[test]
    fn print_minimal_parentheses() {
        let ab = RegexNode::Concat(vec![RegexNode::Char('a'), RegexNode::Char('b')]);
        let alt = RegexNode::Alternation(vec![ab.clone(), RegexNode::Char('c')]);
        assert_eq!(alt.to_string(), "ab|c");

        let concat = RegexNode::Concat(vec![RegexNode::Char('x'), alt.clone()]);
        assert_eq!(concat.to_string(), "x(ab|c)");

        assert_eq!(RegexNode::Star(ab.clone().into()).to_string(), "(ab)*");
        assert_eq!(
            RegexNode::Plus(RegexNode::Star(RegexNode::Char('a').into()).into()).to_string(),
            "(a*)+"
        );
        assert_eq!(RegexNode::Group(alt.into()).to_string(), "(ab|c)");
    }

    #[test]
    fn print_escapes() {
        assert_eq!(RegexNode::Char('*').to_string(), "\\*");
        assert_eq!(RegexNode::Char('\n').to_string(), "\\n");
        let class = CharClass::ranges([CharRange::single(']'), CharRange::single('-')], true);
        assert_eq!(class.to_string(), "[^\\-\\]]");
    }

    #[test]
    fn union_print_and_match() {
        let class = CharClass::Union {
            classes: vec![
                CharClass::Letter { negated: false },
                CharClass::ranges([CharRange::single('_')], false),
            ],
            negated: false,
        };
        assert_eq!(class.to_string(), "[\\l_]");
        assert!(class.matches('_'));
        assert!(class.matches('я'));
        assert!(!class.matches('1'));

        let charset = class.to_charset();
        assert!(charset.contains('_'));
        assert!(!charset.contains('1'));
    }
}
