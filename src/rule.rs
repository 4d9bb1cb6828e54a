use std::{fmt, sync::Arc};

use crate::{
    tdopp::{CompiledGrammar, GrammarError},
    terminal::Terminal,
    tree::Kind,
};

/// How a [`Rule::SeparatedList`] treats a separator after its last element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndBehavior {
    /// `a, b` and `a, b,` both parse.
    #[default]
    Optional,
    /// Every element is followed by a separator.
    Required,
    /// `a, b,` is an error.
    Forbidden,
}

/// A production. Rules are plain values; a grammar maps rule names to ordered alternatives.
#[derive(Debug, Clone)]
pub enum Rule {
    Terminal(Arc<Terminal>),
    /// Another rule, parsed with no precedence bound.
    Ref(String),
    /// Operand of an operator. `precedence` is the operator's binding power.
    ReqRef {
        name: String,
        precedence: u32,
        right: bool,
    },
    Seq {
        kind: Kind,
        elements: Vec<Rule>,
    },
    ZeroOrMany {
        kind: Kind,
        element: Box<Rule>,
    },
    OneOrMany {
        kind: Kind,
        element: Box<Rule>,
    },
    Optional {
        kind: Kind,
        element: Box<Rule>,
    },
    SeparatedList {
        kind: Kind,
        element: Box<Rule>,
        separator: Box<Rule>,
        end: EndBehavior,
        can_be_empty: bool,
    },
    /// An element people tend to forget, e.g. a closing bracket. During recovery a
    /// missing one is replaced by an empty node.
    OftenMissed {
        kind: Kind,
        element: Box<Rule>,
    },
    /// Always-empty terminal. An alternative containing one is only tried during recovery.
    Recovery(Kind),
    /// Succeeds when the element matches; consumes nothing.
    And(Box<Rule>),
    /// Succeeds when the element does not match; consumes nothing.
    Not(Box<Rule>),
}

impl Rule {
    pub fn terminal(terminal: &Arc<Terminal>) -> Self {
        Rule::Terminal(Arc::clone(terminal))
    }

    pub fn literal(text: &str) -> Self {
        Rule::Terminal(Arc::new(Terminal::literal(text)))
    }

    pub fn reference(name: &str) -> Self {
        Rule::Ref(name.to_string())
    }

    /// Left-associative operand.
    pub fn req(name: &str, precedence: u32) -> Self {
        Rule::ReqRef {
            name: name.to_string(),
            precedence,
            right: false,
        }
    }

    pub fn req_right(name: &str, precedence: u32) -> Self {
        Rule::ReqRef {
            name: name.to_string(),
            precedence,
            right: true,
        }
    }

    pub fn seq(kind: &str, elements: impl IntoIterator<Item = Rule>) -> Self {
        Rule::Seq {
            kind: kind.into(),
            elements: elements.into_iter().collect(),
        }
    }

    pub fn zero_or_many(kind: &str, element: Rule) -> Self {
        Rule::ZeroOrMany {
            kind: kind.into(),
            element: Box::new(element),
        }
    }

    pub fn one_or_many(kind: &str, element: Rule) -> Self {
        Rule::OneOrMany {
            kind: kind.into(),
            element: Box::new(element),
        }
    }

    pub fn optional(kind: &str, element: Rule) -> Self {
        Rule::Optional {
            kind: kind.into(),
            element: Box::new(element),
        }
    }

    pub fn separated_list(
        kind: &str,
        element: Rule,
        separator: Rule,
        end: EndBehavior,
        can_be_empty: bool,
    ) -> Self {
        Rule::SeparatedList {
            kind: kind.into(),
            element: Box::new(element),
            separator: Box::new(separator),
            end,
            can_be_empty,
        }
    }

    pub fn often_missed(kind: &str, element: Rule) -> Self {
        Rule::OftenMissed {
            kind: kind.into(),
            element: Box::new(element),
        }
    }

    pub fn recovery(kind: &str) -> Self {
        Rule::Recovery(kind.into())
    }

    pub fn and(element: Rule) -> Self {
        Rule::And(Box::new(element))
    }

    pub fn not(element: Rule) -> Self {
        Rule::Not(Box::new(element))
    }

    /// Direct sub-rules.
    pub fn children(&self) -> Vec<&Rule> {
        match self {
            Rule::Terminal(_) | Rule::Ref(_) | Rule::ReqRef { .. } | Rule::Recovery(_) => {
                Vec::new()
            }
            Rule::Seq { elements, .. } => elements.iter().collect(),
            Rule::ZeroOrMany { element, .. }
            | Rule::OneOrMany { element, .. }
            | Rule::Optional { element, .. }
            | Rule::OftenMissed { element, .. }
            | Rule::And(element)
            | Rule::Not(element) => vec![&**element],
            Rule::SeparatedList {
                element, separator, ..
            } => vec![&**element, &**separator],
        }
    }

    /// Whether a [`Rule::Recovery`] occurs anywhere inside.
    pub fn contains_recovery(&self) -> bool {
        matches!(self, Rule::Recovery(_)) || self.children().iter().any(|r| r.contains_recovery())
    }

    /// Names of all rules referenced from inside, in order of appearance.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut stack = vec![self];
        while let Some(rule) = stack.pop() {
            match rule {
                Rule::Ref(name) | Rule::ReqRef { name, .. } => names.push(name.as_str()),
                _ => stack.extend(rule.children().into_iter().rev()),
            }
        }
        names
    }

    /// The rule name if this is a plain or precedence reference.
    pub fn referenced_name(&self) -> Option<&str> {
        match self {
            Rule::Ref(name) | Rule::ReqRef { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl From<Terminal> for Rule {
    fn from(terminal: Terminal) -> Self {
        Rule::Terminal(Arc::new(terminal))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Terminal(t) => write!(f, "{t}"),
            Rule::Ref(name) => f.write_str(name),
            Rule::ReqRef {
                name,
                precedence,
                right: false,
            } => write!(f, "{name}@{precedence}"),
            Rule::ReqRef {
                name, precedence, ..
            } => write!(f, "{name}@{precedence}(right)"),
            Rule::Seq { elements, .. } => {
                f.write_str("(")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_str(")")
            }
            Rule::ZeroOrMany { element, .. } => write!(f, "{element}*"),
            Rule::OneOrMany { element, .. } => write!(f, "{element}+"),
            Rule::Optional { element, .. } => write!(f, "{element}?"),
            Rule::SeparatedList {
                element,
                separator,
                end,
                can_be_empty,
                ..
            } => write!(
                f,
                "({element}; {separator} {end:?}){}",
                if *can_be_empty { "*" } else { "+" }
            ),
            Rule::OftenMissed { element, .. } => write!(f, "[{element}]"),
            Rule::Recovery(kind) => write!(f, "<{kind}>"),
            Rule::And(element) => write!(f, "&{element}"),
            Rule::Not(element) => write!(f, "!{element}"),
        }
    }
}

/// Rule definitions before compilation.
///
/// ```
/// use extparse::{Grammar, Rule, Terminal};
///
/// let number = Terminal::regex("Number", r"\d+").unwrap();
/// let grammar = Grammar::new(Terminal::regex("Trivia", r"\s*").unwrap())
///     .rule("Expr", [
///         Rule::from(number),
///         Rule::seq("Add", [Rule::reference("Expr"), Rule::literal("+"), Rule::req("Expr", 10)]),
///     ])
///     .build("Expr")
///     .unwrap();
/// # let _ = grammar;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    pub(crate) trivia: Option<Arc<Terminal>>,
    pub(crate) rules: Vec<(String, Vec<Rule>)>,
}

impl Grammar {
    /// `trivia` is skipped before every terminal.
    pub fn new(trivia: Terminal) -> Self {
        Self {
            trivia: Some(Arc::new(trivia)),
            rules: Vec::new(),
        }
    }

    pub fn without_trivia() -> Self {
        Self::default()
    }

    /// Define `name`, replacing an earlier definition. Alternatives are tried in order.
    pub fn rule(mut self, name: &str, alternatives: impl IntoIterator<Item = Rule>) -> Self {
        let alternatives: Vec<Rule> = alternatives.into_iter().collect();
        match self.rules.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = alternatives,
            None => self.rules.push((name.to_string(), alternatives)),
        }
        self
    }

    /// Split every rule into prefix and operator alternatives and check all references.
    pub fn build(self, start: &str) -> Result<CompiledGrammar, GrammarError> {
        CompiledGrammar::compile(self, start)
    }
}
