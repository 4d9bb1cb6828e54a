//! Precedence tables.
//!
//! An alternative whose first element refers back to its own rule is left
//! recursive (`Expr = Expr "+" Expr@10`). Such alternatives cannot be run by
//! plain recursive descent, so every rule is split into prefix alternatives,
//! which start an expression, and postfix alternatives, which extend an
//! already parsed left operand. The engine then climbs precedences: parse one
//! prefix, then keep applying admissible postfixes.

use std::{collections::HashMap, sync::Arc};

use log::debug;
use thiserror::Error;

use crate::{
    rule::{Grammar, Rule},
    terminal::Terminal,
    tree::Kind,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("rule `{rule}` references unknown rule `{name}`")]
    UnknownRule { rule: String, name: String },
    #[error("unknown start rule `{0}`")]
    UnknownStartRule(String),
    #[error("rule `{0}` has no alternatives")]
    EmptyAlternatives(String),
    #[error("rule `{0}` has an alternative that is only a reference to itself")]
    DegenerateLeftRecursion(String),
}

#[derive(Debug, Clone)]
pub struct Alternative {
    pub rule: Rule,
    /// Contains a recovery terminal; tried only at the recovery offset.
    pub recovery_only: bool,
}

/// The tail of a left-recursive alternative, applied to an already parsed left operand.
#[derive(Debug, Clone)]
pub struct Postfix {
    pub kind: Kind,
    pub elements: Vec<Rule>,
    pub precedence: u32,
    pub right: bool,
    pub recovery_only: bool,
}

#[derive(Debug, Clone)]
pub struct TdoppRule {
    pub name: Kind,
    pub prefix: Vec<Alternative>,
    pub postfix: Vec<Postfix>,
}

/// A grammar ready for parsing. Immutable, so one instance can serve parsers on many threads.
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    rules: Vec<TdoppRule>,
    index: HashMap<String, usize>,
    start: usize,
    trivia: Option<Arc<Terminal>>,
}

impl CompiledGrammar {
    pub(crate) fn compile(grammar: Grammar, start: &str) -> Result<Self, GrammarError> {
        let index: HashMap<String, usize> = grammar
            .rules
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();

        let start = *index
            .get(start)
            .ok_or_else(|| GrammarError::UnknownStartRule(start.to_string()))?;

        let mut rules = Vec::with_capacity(grammar.rules.len());
        for (name, alternatives) in grammar.rules {
            if alternatives.is_empty() {
                return Err(GrammarError::EmptyAlternatives(name));
            }
            for alt in &alternatives {
                let mut references = alt.references().into_iter();
                if let Some(unknown) = references.find(|r| !index.contains_key(*r)) {
                    return Err(GrammarError::UnknownRule {
                        rule: name.clone(),
                        name: unknown.to_string(),
                    });
                }
            }
            rules.push(split(name, alternatives)?);
        }

        for rule in &rules {
            debug!(
                "rule {}: {} prefix, {} postfix alternatives",
                rule.name,
                rule.prefix.len(),
                rule.postfix.len()
            );
        }

        Ok(Self {
            rules,
            index,
            start,
            trivia: grammar.trivia,
        })
    }

    pub fn rule(&self, index: usize) -> &TdoppRule {
        &self.rules[index]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn start(&self) -> &str {
        &self.rules[self.start].name
    }

    pub fn trivia(&self) -> Option<&Terminal> {
        self.trivia.as_deref()
    }
}

fn split(name: String, alternatives: Vec<Rule>) -> Result<TdoppRule, GrammarError> {
    let mut prefix = Vec::new();
    let mut postfix = Vec::new();

    for alt in alternatives {
        let recovery_only = alt.contains_recovery();

        if alt.referenced_name() == Some(name.as_str()) {
            return Err(GrammarError::DegenerateLeftRecursion(name));
        }

        match alt {
            Rule::Seq { kind, mut elements }
                if elements.first().and_then(Rule::referenced_name) == Some(name.as_str()) =>
            {
                if elements.len() == 1 {
                    return Err(GrammarError::DegenerateLeftRecursion(name));
                }
                let head = elements.remove(0);

                // The operator's binding power is carried by its right operand;
                // a pure postfix operator (`Expr "!"`) may put it on the left one.
                let (precedence, right) = elements
                    .iter()
                    .find_map(|e| match e {
                        Rule::ReqRef {
                            precedence, right, ..
                        } => Some((*precedence, *right)),
                        _ => None,
                    })
                    .or(match head {
                        Rule::ReqRef { precedence, .. } => Some((precedence, false)),
                        _ => None,
                    })
                    .unwrap_or((0, false));

                postfix.push(Postfix {
                    kind,
                    elements,
                    precedence,
                    right,
                    recovery_only,
                });
            }
            rule => prefix.push(Alternative {
                rule,
                recovery_only,
            }),
        }
    }

    Ok(TdoppRule {
        name: name.as_str().into(),
        prefix,
        postfix,
    })
}
