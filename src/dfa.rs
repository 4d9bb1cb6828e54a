//! Subset construction.
//!
//! A DFA state stands for the epsilon closure of a set of NFA states. The
//! character conditions leaving such a set may overlap (`\d` and `[0-9a-f]`),
//! so before computing successors the alphabet is cut into disjoint cells:
//! every character in a cell satisfies exactly the same conditions. Each cell
//! becomes one transition, which keeps the result deterministic.

use std::{
    collections::{BTreeSet, HashMap, HashSet, VecDeque},
    fmt,
};

use log::{debug, trace};

use crate::{
    charset::CharSet,
    nfa::{Nfa, StateId},
};

/// A disjoint set of characters together with the text it is printed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub label: String,
    pub set: CharSet,
}

impl Predicate {
    pub fn matches(&self, c: char) -> bool {
        self.set.contains(c)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaTransition {
    pub predicate: Predicate,
    pub target: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaState {
    pub id: usize,
    pub nfa_states: BTreeSet<StateId>,
    pub is_final: bool,
    pub transitions: Vec<DfaTransition>,
}

impl DfaState {
    /// The transition whose predicate accepts `c`. At most one does.
    pub fn next(&self, c: char) -> Option<usize> {
        self.transitions
            .iter()
            .find(|t| t.predicate.matches(c))
            .map(|t| t.target)
    }
}

/// Deterministic automaton. State 0 is the start state.
#[derive(Debug, Clone)]
pub struct Dfa {
    states: Vec<DfaState>,
}

// One outgoing condition of a state set, grouped by its printed form.
struct Condition {
    label: String,
    set: CharSet,
    targets: BTreeSet<StateId>,
}

impl Dfa {
    pub fn build(nfa: &Nfa) -> Self {
        let initial = nfa.epsilon_closure([nfa.start()]);
        let mut states = vec![new_state(nfa, 0, initial.clone())];
        let mut mapping = HashMap::from([(initial.clone(), 0)]);
        let mut queue = VecDeque::from([initial]);

        while let Some(set) = queue.pop_front() {
            let id = mapping[&set];
            let conditions = conditions(nfa, &set);
            trace!(
                "DFA state {id} {:?}: {} conditions",
                set.iter().map(|s| s.0).collect::<Vec<_>>(),
                conditions.len()
            );

            for (cell, members) in partition(&conditions) {
                let label = cell_label(&conditions, &members, &cell);
                let closure = nfa.epsilon_closure(
                    members
                        .iter()
                        .flat_map(|&i| conditions[i].targets.iter().copied()),
                );

                let target = match mapping.get(&closure) {
                    Some(&target) => target,
                    None => {
                        let target = states.len();
                        states.push(new_state(nfa, target, closure.clone()));
                        mapping.insert(closure.clone(), target);
                        queue.push_back(closure);
                        target
                    }
                };

                trace!("  {label} -> State {target}");
                states[id].transitions.push(DfaTransition {
                    predicate: Predicate { label, set: cell },
                    target,
                });
            }
        }

        debug!(
            "built DFA: {} states from {} NFA states",
            states.len(),
            nfa.states().len()
        );
        Self { states }
    }

    pub fn start(&self) -> &DfaState {
        &self.states[0]
    }

    pub fn state(&self, id: usize) -> &DfaState {
        &self.states[id]
    }

    pub fn states(&self) -> &[DfaState] {
        &self.states
    }
}

fn new_state(nfa: &Nfa, id: usize, nfa_states: BTreeSet<StateId>) -> DfaState {
    let is_final = nfa_states.iter().any(|&s| nfa.state(s).is_final);
    DfaState {
        id,
        nfa_states,
        is_final,
        transitions: Vec::new(),
    }
}

/// Labelled transitions leaving `set`, in state id then transition order.
fn conditions(nfa: &Nfa, set: &BTreeSet<StateId>) -> Vec<Condition> {
    let mut conditions: Vec<Condition> = Vec::new();

    for &id in set {
        for t in &nfa.state(id).transitions {
            let Some(node) = &t.condition else { continue };
            let Some(chars) = node.to_charset() else { continue };

            let label = node.to_string();
            match conditions.iter_mut().find(|c| c.label == label) {
                Some(existing) => {
                    existing.targets.insert(t.target);
                }
                None => conditions.push(Condition {
                    label,
                    set: chars,
                    targets: BTreeSet::from([t.target]),
                }),
            }
        }
    }

    conditions
}

/// Split the alphabet covered by `conditions` into cells of equal membership.
/// Returns each cell with the indices of the conditions containing it,
/// ordered by the smallest character of the cell.
fn partition(conditions: &[Condition]) -> Vec<(CharSet, Vec<usize>)> {
    let mut bounds: Vec<u32> = conditions
        .iter()
        .flat_map(|c| c.set.ranges().iter().flat_map(|&(from, to)| [from, to + 1]))
        .collect();
    bounds.sort_unstable();
    bounds.dedup();

    let mut cells: Vec<(Vec<(u32, u32)>, Vec<usize>)> = Vec::new();
    let mut index: HashMap<Vec<usize>, usize> = HashMap::new();

    for window in bounds.windows(2) {
        let (from, to) = (window[0], window[1] - 1);
        // Membership is constant over [from, to], so checking `from` is enough.
        let Some(sample) = char::from_u32(from).or_else(|| char::from_u32(to)) else {
            continue;
        };
        let members: Vec<usize> = conditions
            .iter()
            .enumerate()
            .filter(|(_, c)| c.set.contains(sample))
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }

        match index.get(&members) {
            Some(&i) => cells[i].0.push((from, to)),
            None => {
                index.insert(members.clone(), cells.len());
                cells.push((vec![(from, to)], members));
            }
        }
    }

    cells
        .into_iter()
        .map(|(ranges, members)| (CharSet::from_ranges(ranges), members))
        .collect()
}

/// `a` when the cell is a whole condition; otherwise the conditions it belongs to
/// joined with `&`, followed by `&!x` for each overlapping condition it excludes.
fn cell_label(conditions: &[Condition], members: &[usize], cell: &CharSet) -> String {
    let common = members
        .iter()
        .map(|&i| conditions[i].set.clone())
        .reduce(|acc, set| acc.intersect(&set))
        .unwrap_or_default();

    let mut label = members
        .iter()
        .map(|&i| conditions[i].label.as_str())
        .collect::<Vec<_>>()
        .join("&");

    if &common != cell {
        for (i, c) in conditions.iter().enumerate() {
            if !members.contains(&i) && !c.set.intersect(&common).is_empty() {
                label.push_str("&!");
                label.push_str(&c.label);
            }
        }
    }

    label
}

/// Same layout as the NFA dump: depth-first from state 0, each state once.
impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut visited = HashSet::new();
        let mut stack = vec![0];
        let mut first = true;

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let state = &self.states[id];

            if !first {
                writeln!(f)?;
            }
            first = false;

            write!(f, "State {id}{}:", if state.is_final { " (final)" } else { "" })?;
            for t in &state.transitions {
                write!(f, "\n  {} -> State {}", t.predicate.label, t.target)?;
            }

            stack.extend(state.transitions.iter().rev().map(|t| t.target));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::parse;

    fn dfa(pattern: &str) -> Dfa {
        Dfa::build(&Nfa::build(&parse(pattern).unwrap()).unwrap())
    }

    #[test]
    fn alternation() {
        assert_eq!(
            dfa("a|b").to_string(),
            "State 0:\n  a -> State 1\n  b -> State 2\nState 1 (final):\nState 2 (final):"
        );
    }

    #[test]
    fn star_loops_back() {
        let dfa = dfa("a*");
        assert!(dfa.start().is_final);
        assert_eq!(
            dfa.to_string(),
            "State 0 (final):\n  a -> State 1\nState 1 (final):\n  a -> State 1"
        );
    }

    #[test]
    fn same_condition_is_merged() {
        // Both branches start with `a`, so one transition reaches both.
        let dfa = dfa("ab|ac");
        assert_eq!(dfa.start().transitions.len(), 1);
        assert_eq!(
            dfa.to_string(),
            [
                "State 0:",
                "  a -> State 1",
                "State 1:",
                "  b -> State 2",
                "  c -> State 3",
                "State 2 (final):",
                "State 3 (final):",
            ]
            .join("\n")
        );
    }

    #[test]
    fn overlapping_conditions_are_split() {
        let dfa = dfa(r"\d|[0-9a-f]x");
        let labels: Vec<&str> = dfa
            .start()
            .transitions
            .iter()
            .map(|t| t.predicate.label.as_str())
            .collect();
        assert_eq!(labels, [r"\d&[0-9a-f]", r"[0-9a-f]&!\d", r"\d&![0-9a-f]"]);

        let start = dfa.start();
        for c in ['0', '5', 'a', 'f', '٣'] {
            let matching = start.transitions.iter().filter(|t| t.predicate.matches(c));
            assert_eq!(matching.count(), 1, "{c:?}");
        }
        assert_eq!(start.next('g'), None);
    }

    #[test]
    fn state_count_is_stable() {
        let pattern = r"[\l_]\w*";
        let first = dfa(pattern);
        let second = dfa(pattern);
        assert_eq!(first.states().len(), second.states().len());
        assert_eq!(first.to_string(), second.to_string());
    }
}
