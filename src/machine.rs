use log::trace;

use crate::dfa::Dfa;

/// Longest-match interpreter over a compiled DFA.
#[derive(Debug, Clone)]
pub struct Machine {
    dfa: Dfa,
}

impl Machine {
    pub fn new(dfa: Dfa) -> Self {
        Self { dfa }
    }

    pub fn dfa(&self) -> &Dfa {
        &self.dfa
    }

    /// Run the automaton from byte offset `start` and return the end offset of the
    /// longest accepted prefix. An accepting start state gives an empty match at `start`.
    ///
    /// Returns `None` when nothing is accepted, including when `start` is not a char
    /// boundary of `input`.
    pub fn try_match(&self, input: &str, start: usize) -> Option<usize> {
        let text = input.get(start..)?;
        let mut state = self.dfa.start();
        let mut last = state.is_final.then_some(start);

        for (i, c) in text.char_indices() {
            let Some(next) = state.next(c) else {
                trace!("no transition from state {} on {c:?} at {}", state.id, start + i);
                break;
            };
            state = self.dfa.state(next);
            if state.is_final {
                last = Some(start + i + c.len_utf8());
            }
        }

        last
    }

    /// Whether some prefix of `input` is accepted.
    pub fn is_match(&self, input: &str) -> bool {
        self.try_match(input, 0).is_some()
    }

    /// Leftmost-longest match at or after `start`, as a `(start, end)` byte range.
    pub fn find_at(&self, input: &str, start: usize) -> Option<(usize, usize)> {
        let text = input.get(start..)?;
        text.char_indices()
            .map(|(i, _)| start + i)
            .chain(std::iter::once(input.len()))
            .find_map(|from| self.try_match(input, from).map(|end| (from, end)))
    }
}
