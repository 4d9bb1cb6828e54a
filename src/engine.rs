//! Memoized recursive evaluator.
//!
//! Every rule invocation is cached by `(offset, rule, minimum precedence)` for
//! the duration of one pass. Left-recursive alternatives run as postfix
//! extensions of a parsed prefix (see [`crate::tdopp`]).
//!
//! When a pass cannot consume the whole input, the furthest failure is kept as
//! a [`SyntaxError`] and the input is parsed again with that offset added to
//! the recovery points. Recovery-only alternatives and missing
//! [`Rule::OftenMissed`] elements are accepted at recovery points only.

use std::{
    collections::{BTreeSet, HashMap},
    fmt::Write,
};

use log::{debug, trace};

use crate::{
    error::SyntaxError,
    options::ParserOptions,
    rule::{EndBehavior, Rule},
    tdopp::{CompiledGrammar, TdoppRule},
    terminal::Terminal,
    tree::{Kind, ListNode, NoneNode, SeqNode, SomeNode, SyntaxNode, TerminalNode},
};

pub use crate::tdopp::GrammarError;

/// Kind of the node a forbidden trailing separator is recovered with.
const ERROR_KIND: &str = "Error";
/// Reported when the start rule stops short of the end of the input.
const END_OF_INPUT: &str = "end of input";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// `errors` lists what the recovery passes had to work around; empty for clean input.
    Success {
        node: SyntaxNode,
        end_pos: usize,
        errors: Vec<SyntaxError>,
    },
    Failure {
        error: SyntaxError,
    },
}

impl ParseResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ParseResult::Success { .. })
    }

    pub fn node(&self) -> Option<&SyntaxNode> {
        match self {
            ParseResult::Success { node, .. } => Some(node),
            ParseResult::Failure { .. } => None,
        }
    }

    /// Recorded errors, including the final one of a failure.
    pub fn errors(&self) -> &[SyntaxError] {
        match self {
            ParseResult::Success { errors, .. } => errors,
            ParseResult::Failure { error } => std::slice::from_ref(error),
        }
    }
}

type Parsed = Option<(SyntaxNode, usize)>;

/// An element result. The inner `None` is a successful lookahead, which adds no node.
type Element = Option<(Option<SyntaxNode>, usize)>;

type MemoKey = (usize, usize, u32);

/// Parses input against one compiled grammar. Cheap to create; holds the memo table of
/// the last parse and must not be shared between threads.
#[derive(Debug)]
pub struct Parser<'g> {
    grammar: &'g CompiledGrammar,
    options: ParserOptions,
    memo: HashMap<MemoKey, Parsed>,
    /// Furthest offset at which a terminal failed in the current pass.
    error_pos: usize,
    expected: Vec<Kind>,
    /// Failure offsets of earlier passes.
    recovery_points: BTreeSet<usize>,
    depth: usize,
    /// Set when an attempt was cut off by `max_depth` at `error_pos`.
    depth_exceeded: bool,
    /// Attempts cut off by `max_depth` so far in the current pass.
    cutoffs: usize,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g CompiledGrammar) -> Self {
        Self::with_options(grammar, ParserOptions::default())
    }

    pub fn with_options(grammar: &'g CompiledGrammar, options: ParserOptions) -> Self {
        Self {
            grammar,
            options,
            memo: HashMap::new(),
            error_pos: 0,
            expected: Vec::new(),
            recovery_points: BTreeSet::new(),
            depth: 0,
            depth_exceeded: false,
            cutoffs: 0,
        }
    }

    /// Parse all of `input` as `start`. Also returns how far the parse got: the end of the
    /// tree (trailing trivia included) on success, the failure offset otherwise.
    pub fn parse(&mut self, input: &str, start: &str) -> (ParseResult, usize) {
        self.recovery_points.clear();
        self.reset_pass();

        let Some(start_index) = self.grammar.index_of(start) else {
            let error = SyntaxError::new(input, 0, []).with_note(format!("unknown rule `{start}`"));
            return (ParseResult::Failure { error }, 0);
        };

        let mut errors: Vec<SyntaxError> = Vec::new();
        let mut pass = 0;

        loop {
            self.reset_pass();
            let parsed = self.rule(start_index, 0, 0, input).map(|(node, end)| {
                let end = self.skip_trivia(input, end);
                if end < input.len() {
                    self.expect(end, &END_OF_INPUT.into());
                }
                (node, end)
            });

            if let Some((node, end_pos)) = &parsed {
                if *end_pos == input.len() {
                    debug!("parsed `{start}` after {} recovery passes", pass);
                    let result = ParseResult::Success {
                        node: node.clone(),
                        end_pos: *end_pos,
                        errors,
                    };
                    return (result, *end_pos);
                }
            }

            let error = self.current_error(input);
            let stalled = errors.last().is_some_and(|e| error.offset <= e.offset);

            if !self.options.recovery || stalled || pass >= self.options.max_recovery_passes {
                debug!("giving up on `{start}` at {}: {error}", error.offset);
                return match parsed {
                    Some((node, end_pos)) => {
                        if errors.last().map(|e| e.offset) != Some(error.offset) {
                            errors.push(error);
                        }
                        let result = ParseResult::Success {
                            node,
                            end_pos,
                            errors,
                        };
                        (result, end_pos)
                    }
                    None => {
                        let offset = error.offset;
                        (ParseResult::Failure { error }, offset)
                    }
                };
            }

            pass += 1;
            debug!("recovery pass {pass} at offset {}", error.offset);
            self.recovery_points.insert(error.offset);
            errors.push(error);
        }
    }

    /// The memo table of the last pass, one entry per line, ordered by offset.
    pub fn memo_dump(&self, input: &str) -> String {
        let mut entries: Vec<_> = self.memo.iter().collect();
        entries.sort_by_key(|&(&(pos, rule, precedence), _)| {
            (pos, self.grammar.rule(rule).name.clone(), precedence)
        });

        let mut out = String::new();
        for (&(pos, rule, precedence), parsed) in entries {
            let name = &self.grammar.rule(rule).name;
            let _ = write!(out, "{pos} {name}");
            if precedence > 0 {
                let _ = write!(out, "@{precedence}");
            }
            let _ = match parsed {
                Some((node, end)) => writeln!(
                    out,
                    ": [{}..{end}) {} {:?}",
                    node.start(),
                    node.kind(),
                    node.text(input)
                ),
                None => writeln!(out, ": failed"),
            };
        }
        out
    }

    fn reset_pass(&mut self) {
        self.memo.clear();
        self.error_pos = 0;
        self.expected.clear();
        self.depth = 0;
        self.depth_exceeded = false;
        self.cutoffs = 0;
    }

    fn current_error(&self, input: &str) -> SyntaxError {
        let expected = self.expected.iter().map(|k| k.to_string());
        let error = SyntaxError::new(input, self.error_pos, expected);
        if self.depth_exceeded {
            error.with_note(format!("nesting deeper than {} rules", self.options.max_depth))
        } else {
            error
        }
    }

    fn skip_trivia(&self, input: &str, pos: usize) -> usize {
        self.grammar
            .trivia()
            .and_then(|trivia| trivia.try_match(input, pos))
            .unwrap_or(pos)
    }

    fn in_recovery(&self, input: &str, pos: usize) -> bool {
        !self.recovery_points.is_empty()
            && self.recovery_points.contains(&self.skip_trivia(input, pos))
    }

    /// Note that `kind` was expected at `pos`, keeping only the furthest offset.
    fn expect(&mut self, pos: usize, kind: &Kind) {
        if pos > self.error_pos {
            self.error_pos = pos;
            self.expected.clear();
            self.depth_exceeded = false;
        }
        if pos == self.error_pos {
            self.expected.push(kind.clone());
        }
    }

    fn rule(&mut self, index: usize, min_precedence: u32, pos: usize, input: &str) -> Parsed {
        let key = (pos, index, min_precedence);
        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }

        let grammar = self.grammar;
        let rule = grammar.rule(index);

        if self.depth >= self.options.max_depth {
            let at = self.skip_trivia(input, pos);
            trace!("rule {} at {pos}: nesting limit reached", rule.name);
            self.cutoffs += 1;
            if at >= self.error_pos {
                if at > self.error_pos {
                    self.error_pos = at;
                    self.expected.clear();
                }
                self.depth_exceeded = true;
            }
            return None;
        }

        let recovering = self.in_recovery(input, pos);
        trace!(
            "rule {}@{min_precedence} at {pos}{}",
            rule.name,
            if recovering { " (recovering)" } else { "" }
        );

        let cutoffs = self.cutoffs;
        self.depth += 1;
        let mut result = None;
        for alt in &rule.prefix {
            if alt.recovery_only && !recovering {
                continue;
            }
            if let Some((node, end)) = self.node(&rule.name, &alt.rule, pos, input) {
                result = Some(self.postfix(rule, node, min_precedence, end, input));
                break;
            }
        }
        self.depth -= 1;

        // A result shaped by the nesting limit may differ at a shallower depth.
        if self.cutoffs == cutoffs {
            self.memo.insert(key, result.clone());
        }
        result
    }

    /// Apply the first admissible operator that advances, as long as there is one.
    fn postfix(
        &mut self,
        rule: &TdoppRule,
        mut left: SyntaxNode,
        min_precedence: u32,
        mut pos: usize,
        input: &str,
    ) -> (SyntaxNode, usize) {
        'extend: loop {
            let recovering = self.in_recovery(input, pos);

            for op in &rule.postfix {
                if op.precedence < min_precedence || (op.recovery_only && !recovering) {
                    continue;
                }
                let Some((elements, end)) = self.elements(&op.elements, pos, input) else {
                    continue;
                };
                if end <= pos {
                    continue;
                }

                trace!("{} extends [{}..{pos}) to {end}", op.kind, left.start());
                let start = left.start();
                let mut children = Vec::with_capacity(elements.len() + 1);
                children.push(left);
                children.extend(elements);
                left = SyntaxNode::Seq(SeqNode {
                    kind: op.kind.clone(),
                    start,
                    end,
                    elements: children,
                });
                pos = end;
                continue 'extend;
            }

            return (left, pos);
        }
    }

    /// Parse `rule` where a node is required; a bare lookahead becomes an empty `kind` node.
    fn node(&mut self, kind: &Kind, rule: &Rule, pos: usize, input: &str) -> Parsed {
        let (node, end) = self.element(rule, pos, input)?;
        let node = node.unwrap_or_else(|| {
            SyntaxNode::Seq(SeqNode {
                kind: kind.clone(),
                start: pos,
                end: pos,
                elements: Vec::new(),
            })
        });
        Some((node, end))
    }

    fn elements(
        &mut self,
        rules: &[Rule],
        pos: usize,
        input: &str,
    ) -> Option<(Vec<SyntaxNode>, usize)> {
        let mut nodes = Vec::with_capacity(rules.len());
        let mut cur = pos;
        for rule in rules {
            let (node, end) = self.element(rule, cur, input)?;
            nodes.extend(node);
            cur = end;
        }
        Some((nodes, cur))
    }

    fn element(&mut self, rule: &Rule, pos: usize, input: &str) -> Element {
        match rule {
            Rule::Terminal(terminal) => self.terminal(terminal, pos, input).map(wrap),
            Rule::Ref(name) => {
                let index = self.grammar.index_of(name)?;
                self.rule(index, 0, pos, input).map(wrap)
            }
            Rule::ReqRef {
                name,
                precedence,
                right,
            } => {
                let index = self.grammar.index_of(name)?;
                let min = if *right {
                    *precedence
                } else {
                    precedence.saturating_add(1)
                };
                self.rule(index, min, pos, input).map(wrap)
            }
            Rule::Seq { kind, elements } => {
                let (nodes, end) = self.elements(elements, pos, input)?;
                let start = nodes.first().map_or(pos, SyntaxNode::start);
                Some((
                    Some(SyntaxNode::Seq(SeqNode {
                        kind: kind.clone(),
                        start,
                        end,
                        elements: nodes,
                    })),
                    end,
                ))
            }
            Rule::ZeroOrMany { kind, element } => {
                self.repeat(kind, element, 0, pos, input).map(wrap)
            }
            Rule::OneOrMany { kind, element } => {
                self.repeat(kind, element, 1, pos, input).map(wrap)
            }
            Rule::Optional { kind, element } => {
                let node = match self.element(element, pos, input) {
                    Some((Some(value), end)) => SyntaxNode::Some(SomeNode {
                        kind: kind.clone(),
                        start: value.start(),
                        end,
                        value: Box::new(value),
                    }),
                    _ => SyntaxNode::None(NoneNode {
                        kind: kind.clone(),
                        pos,
                    }),
                };
                let end = node.end().max(pos);
                Some((Some(node), end))
            }
            Rule::SeparatedList {
                kind,
                element,
                separator,
                end,
                can_be_empty,
            } => self
                .separated_list(kind, element, separator, *end, *can_be_empty, pos, input)
                .map(wrap),
            Rule::OftenMissed { kind, element } => match self.element(element, pos, input) {
                Some(parsed) => Some(parsed),
                None if self.in_recovery(input, pos) => {
                    let at = self.skip_trivia(input, pos);
                    trace!("recovered missing {element} at {at}");
                    Some((Some(recovery_node(kind.clone(), at)), at))
                }
                None => None,
            },
            Rule::Recovery(kind) => {
                let at = self.skip_trivia(input, pos);
                Some((Some(recovery_node(kind.clone(), at)), at))
            }
            Rule::And(element) => {
                let matched = self.lookahead(element, pos, input);
                matched.then_some((None, pos))
            }
            Rule::Not(element) => {
                let matched = self.lookahead(element, pos, input);
                (!matched).then_some((None, pos))
            }
        }
    }

    fn terminal(&mut self, terminal: &Terminal, pos: usize, input: &str) -> Parsed {
        let start = self.skip_trivia(input, pos);
        match terminal.try_match(input, start) {
            Some(end) => {
                trace!("matched {terminal} at [{start}..{end})");
                Some((
                    SyntaxNode::Terminal(TerminalNode {
                        kind: terminal.kind().clone(),
                        start,
                        end,
                        is_recovery: false,
                    }),
                    end,
                ))
            }
            None => {
                self.expect(start, terminal.kind());
                None
            }
        }
    }

    /// Greedy repetition, stopping at the first failure or at an iteration that consumed nothing.
    fn repeat(
        &mut self,
        kind: &Kind,
        element: &Rule,
        min: usize,
        pos: usize,
        input: &str,
    ) -> Parsed {
        let mut elements = Vec::new();
        let mut cur = pos;
        let mut count = 0;

        while let Some((node, end)) = self.element(element, cur, input) {
            count += 1;
            elements.extend(node);
            if end == cur {
                break;
            }
            cur = end;
        }

        if count < min {
            return None;
        }

        let start = elements.first().map_or(pos, SyntaxNode::start);
        Some((
            SyntaxNode::List(ListNode {
                kind: kind.clone(),
                start,
                end: cur,
                elements,
                delimiters: Vec::new(),
            }),
            cur,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn separated_list(
        &mut self,
        kind: &Kind,
        element: &Rule,
        separator: &Rule,
        end_behavior: EndBehavior,
        can_be_empty: bool,
        pos: usize,
        input: &str,
    ) -> Parsed {
        let mut elements = Vec::new();
        let mut delimiters = Vec::new();

        let Some((first, mut cur)) = self.node(kind, element, pos, input) else {
            return can_be_empty.then(|| {
                let list = SyntaxNode::List(ListNode {
                    kind: kind.clone(),
                    start: pos,
                    end: pos,
                    elements: Vec::new(),
                    delimiters: Vec::new(),
                });
                (list, pos)
            });
        };
        elements.push(first);

        loop {
            let Some((sep, after_sep)) = self.node(kind, separator, cur, input) else {
                if end_behavior == EndBehavior::Required {
                    trace!("{kind}: missing separator at {cur}");
                    return None;
                }
                break;
            };

            match self.node(kind, element, after_sep, input) {
                Some((node, end)) if end > cur => {
                    delimiters.push(sep);
                    elements.push(node);
                    cur = end;
                }
                Some(_) => break,
                None if end_behavior == EndBehavior::Forbidden => {
                    if !self.in_recovery(input, after_sep) {
                        trace!("{kind}: trailing separator at {}", sep.start());
                        return None;
                    }
                    let at = self.skip_trivia(input, after_sep);
                    delimiters.push(sep);
                    elements.push(recovery_node(ERROR_KIND.into(), at));
                    cur = at;
                    break;
                }
                None => {
                    delimiters.push(sep);
                    cur = after_sep;
                    break;
                }
            }
        }

        if end_behavior == EndBehavior::Forbidden && self.lookahead(separator, cur, input) {
            trace!("{kind}: trailing separator at {cur}");
            return None;
        }

        let start = elements.first().map_or(pos, SyntaxNode::start);
        Some((
            SyntaxNode::List(ListNode {
                kind: kind.clone(),
                start,
                end: cur,
                elements,
                delimiters,
            }),
            cur,
        ))
    }

    /// Try `rule` without consuming input or disturbing the failure bookkeeping.
    fn lookahead(&mut self, rule: &Rule, pos: usize, input: &str) -> bool {
        let error_pos = self.error_pos;
        let expected = self.expected.clone();
        let depth_exceeded = self.depth_exceeded;

        let matched = self.element(rule, pos, input).is_some();

        self.error_pos = error_pos;
        self.expected = expected;
        self.depth_exceeded = depth_exceeded;
        matched
    }
}

fn wrap((node, end): (SyntaxNode, usize)) -> (Option<SyntaxNode>, usize) {
    (Some(node), end)
}

fn recovery_node(kind: Kind, at: usize) -> SyntaxNode {
    SyntaxNode::Terminal(TerminalNode {
        kind,
        start: at,
        end: at,
        is_recovery: true,
    })
}
