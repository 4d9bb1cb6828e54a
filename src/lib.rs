//! Regex-backed terminals and a memoizing parser for grammars with operator
//! precedence and error recovery.
//!
//! Terminals are compiled from a small regex dialect into a DFA
//! (`pattern -> RegexNode -> Nfa -> Dfa -> Machine`) and always take the longest
//! match. Rules are plain values collected into a [`Grammar`], compiled once
//! and then run by a [`Parser`] into a generic [`SyntaxNode`] tree.

pub mod ast;
pub mod charset;
pub mod dfa;
pub mod engine;
pub mod error;
pub mod machine;
pub mod nfa;
pub mod options;
pub mod parser;
pub mod rule;
pub mod tdopp;
pub mod terminal;
pub mod tree;

use log::debug;
use thiserror::Error;

pub use crate::{
    ast::RegexNode,
    engine::{GrammarError, ParseResult, Parser},
    error::SyntaxError,
    machine::Machine,
    nfa::BuildError,
    options::ParserOptions,
    parser::ParseError,
    rule::{EndBehavior, Grammar, Rule},
    tdopp::CompiledGrammar,
    terminal::Terminal,
    tree::{Kind, ListNode, NoneNode, SeqNode, SomeNode, SyntaxNode, TerminalNode, Visitor},
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid pattern: {0}")]
    Parse(#[from] ParseError),
    #[error("failed to build automaton: {0}")]
    Build(#[from] BuildError),
}

/// A compiled pattern.
///
/// ```
/// use extparse::Regex;
///
/// let ident = Regex::new(r"[\l_]\w*").unwrap();
/// assert_eq!(ident.try_match("_if0 + 1", 0), Some(4));
/// assert_eq!(ident.find("1 + x2"), Some((4, 6)));
/// ```
#[derive(Debug, Clone)]
pub struct Regex {
    ast: RegexNode,
    machine: Machine,
}

impl Regex {
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let ast = parser::parse(pattern)?;
        let nfa = nfa::Nfa::build(&ast)?;
        let dfa = dfa::Dfa::build(&nfa);
        debug!(
            "compiled {pattern:?}: {} NFA states, {} DFA states",
            nfa.states().len(),
            dfa.states().len()
        );

        Ok(Self {
            ast,
            machine: Machine::new(dfa),
        })
    }

    pub fn ast(&self) -> &RegexNode {
        &self.ast
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// End of the longest match starting exactly at byte offset `start`.
    pub fn try_match(&self, input: &str, start: usize) -> Option<usize> {
        self.machine.try_match(input, start)
    }

    /// Whether a prefix of `input` matches.
    pub fn is_match(&self, input: &str) -> bool {
        self.machine.is_match(input)
    }

    /// Leftmost-longest match anywhere in `input`.
    pub fn find(&self, input: &str) -> Option<(usize, usize)> {
        self.machine.find_at(input, 0)
    }
}
