use std::{
    collections::{BTreeSet, HashSet},
    fmt,
};

use log::trace;
use thiserror::Error;

use crate::ast::RegexNode;

/// Index of a state in the automaton arena.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub usize);

impl StateId {
    /// Hand out the current id and advance the counter.
    fn inc(&mut self) -> Result<Self, BuildError> {
        let current = *self;
        if let Some(new) = self.0.checked_add(1) {
            self.0 = new;
            Ok(current)
        } else {
            Err(BuildError::StateOverflow)
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State {}", self.0)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BuildError {
    #[error("state id overflow occured")]
    StateOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfaTransition {
    pub target: StateId,
    /// `None` is an epsilon transition.
    pub condition: Option<RegexNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfaState {
    pub id: StateId,
    pub transitions: Vec<NfaTransition>,
    pub is_final: bool,
}

/// Nondeterministic automaton. States live in an arena and refer to each other by id,
/// so the loops of `*` and `+` are plain back edges.
#[derive(Debug, Clone)]
pub struct Nfa {
    states: Vec<NfaState>,
    start: StateId,
    end: StateId,
}

impl Nfa {
    /// Thompson construction. State ids start at 0 for every build.
    pub fn build(node: &RegexNode) -> Result<Self, BuildError> {
        let mut builder = Builder::default();
        let (start, end) = builder.node(node)?;
        builder.states[end.0].is_final = true;

        trace!(
            "built NFA for `{node}`: {} states, start {}, end {}",
            builder.states.len(),
            start.0,
            end.0
        );

        Ok(Self {
            states: builder.states,
            start,
            end,
        })
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn end(&self) -> StateId {
        self.end
    }

    pub fn state(&self, id: StateId) -> &NfaState {
        &self.states[id.0]
    }

    pub fn states(&self) -> &[NfaState] {
        &self.states
    }

    /// All states reachable from `seeds` through epsilon transitions, seeds included.
    pub fn epsilon_closure(&self, seeds: impl IntoIterator<Item = StateId>) -> BTreeSet<StateId> {
        let mut closure = BTreeSet::new();
        let mut stack: Vec<StateId> = seeds.into_iter().collect();

        while let Some(id) = stack.pop() {
            if !closure.insert(id) {
                continue;
            }
            for t in &self.state(id).transitions {
                if t.condition.is_none() {
                    stack.push(t.target);
                }
            }
        }

        closure
    }
}

/// Depth-first from the start state, each state printed once, children in transition order.
impl fmt::Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut visited = HashSet::new();
        let mut stack = vec![self.start];
        let mut first = true;

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let state = self.state(id);

            if !first {
                writeln!(f)?;
            }
            first = false;

            write!(f, "{id}{}:", if state.is_final { " (final)" } else { "" })?;
            for t in &state.transitions {
                match &t.condition {
                    Some(condition) => write!(f, "\n  {condition} -> {}", t.target)?,
                    None => write!(f, "\n  ε -> {}", t.target)?,
                }
            }

            stack.extend(state.transitions.iter().rev().map(|t| t.target));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct Builder {
    next: StateId,
    states: Vec<NfaState>,
}

impl Builder {
    fn create_state(&mut self) -> Result<StateId, BuildError> {
        let id = self.next.inc()?;
        self.states.push(NfaState {
            id,
            transitions: Vec::new(),
            is_final: false,
        });
        debug_assert_eq!(self.states.len(), self.next.0);
        Ok(id)
    }

    fn link(&mut self, from: StateId, to: StateId, condition: Option<RegexNode>) {
        self.states[from.0].transitions.push(NfaTransition {
            target: to,
            condition,
        });
    }

    fn node(&mut self, node: &RegexNode) -> Result<(StateId, StateId), BuildError> {
        match node {
            RegexNode::Char(_) | RegexNode::AnyChar | RegexNode::Class(_) => self.single(node),
            RegexNode::Concat(nodes) => self.concat(nodes),
            RegexNode::Alternation(nodes) => self.alternation(nodes),
            RegexNode::Star(e) => self.star(e),
            RegexNode::Plus(e) => self.plus(e),
            RegexNode::Optional(e) => self.optional(e),
            RegexNode::Group(e) => self.node(e),
        }
    }

    /// ```txt
    /// S --c--> E
    /// ```
    fn single(&mut self, node: &RegexNode) -> Result<(StateId, StateId), BuildError> {
        let start = self.create_state()?;
        let end = self.create_state()?;
        self.link(start, end, Some(node.clone()));
        Ok((start, end))
    }

    /// ```txt
    /// e1 --ε--> e2 --ε--> ... --ε--> en
    /// ```
    fn concat(&mut self, nodes: &[RegexNode]) -> Result<(StateId, StateId), BuildError> {
        let Some((first, rest)) = nodes.split_first() else {
            return Ok((self.create_state()?, self.create_state()?));
        };

        let (start, mut end) = self.node(first)?;
        for node in rest {
            let (next_start, next_end) = self.node(node)?;
            self.link(end, next_start, None);
            end = next_end;
        }
        Ok((start, end))
    }

    /// ```txt
    ///   ┌─ε─> e1 ─ε─┐
    /// S ┼─ε─> e2 ─ε─┼> E
    ///   └─ε─> en ─ε─┘
    /// ```
    fn alternation(&mut self, nodes: &[RegexNode]) -> Result<(StateId, StateId), BuildError> {
        let start = self.create_state()?;
        let end = self.create_state()?;
        for node in nodes {
            let (sub_start, sub_end) = self.node(node)?;
            self.link(start, sub_start, None);
            self.link(sub_end, end, None);
        }
        Ok((start, end))
    }

    /// e*
    /// ```txt
    /// S --ε--> e.start, E
    /// e.end --ε--> e.start, E
    /// ```
    fn star(&mut self, e: &RegexNode) -> Result<(StateId, StateId), BuildError> {
        let (sub_start, sub_end) = self.node(e)?;
        let start = self.create_state()?;
        let end = self.create_state()?;
        self.link(start, sub_start, None);
        self.link(start, end, None);
        self.link(sub_end, sub_start, None);
        self.link(sub_end, end, None);
        Ok((start, end))
    }

    /// e+, entered directly at e.start
    /// ```txt
    /// e.end --ε--> e.start, E
    /// ```
    fn plus(&mut self, e: &RegexNode) -> Result<(StateId, StateId), BuildError> {
        let (sub_start, sub_end) = self.node(e)?;
        let end = self.create_state()?;
        self.link(sub_end, sub_start, None);
        self.link(sub_end, end, None);
        Ok((sub_start, end))
    }

    /// e?
    /// ```txt
    /// S --ε--> e.start, e.end
    /// ```
    fn optional(&mut self, e: &RegexNode) -> Result<(StateId, StateId), BuildError> {
        let (sub_start, sub_end) = self.node(e)?;
        let start = self.create_state()?;
        self.link(start, sub_start, None);
        self.link(start, sub_end, None);
        Ok((start, sub_end))
    }
}
