//! Sets of Unicode scalar values stored as sorted, disjoint, inclusive ranges.
//!
//! Every character condition of the automata (a literal char, `.`, a named
//! class, a bracket expression) lowers to a [`CharSet`]. Subset construction
//! splits overlapping sets into disjoint cells, and the interpreter tests
//! membership with a binary search.

use std::sync::OnceLock;

/// Largest Unicode scalar value.
pub const MAX_CHAR: u32 = char::MAX as u32;

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct CharSet {
    // Sorted by start, non-overlapping and non-adjacent.
    ranges: Vec<(u32, u32)>,
}

impl CharSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn full() -> Self {
        Self {
            ranges: vec![(0, MAX_CHAR)],
        }
    }

    pub fn single(c: char) -> Self {
        Self {
            ranges: vec![(c as u32, c as u32)],
        }
    }

    /// Build a set from arbitrary (possibly overlapping, unsorted) ranges.
    pub fn from_ranges(ranges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut ranges: Vec<(u32, u32)> = ranges.into_iter().filter(|(a, b)| a <= b).collect();
        ranges.sort_unstable();

        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (from, to) in ranges {
            match merged.last_mut() {
                Some(last) if from <= last.1.saturating_add(1) => last.1 = last.1.max(to),
                _ => merged.push((from, to)),
            }
        }

        Self { ranges: merged }
    }

    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Smallest member, used to order partition cells deterministically.
    pub fn min(&self) -> Option<u32> {
        self.ranges.first().map(|&(from, _)| from)
    }

    pub fn contains(&self, c: char) -> bool {
        let c = c as u32;
        self.ranges
            .binary_search_by(|&(from, to)| {
                if to < c {
                    std::cmp::Ordering::Less
                } else if from > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn complement(&self) -> Self {
        let mut ranges = Vec::with_capacity(self.ranges.len() + 1);
        let mut next = 0u32;
        for &(from, to) in &self.ranges {
            if from > next {
                ranges.push((next, from - 1));
            }
            next = to.saturating_add(1);
        }
        if next <= MAX_CHAR {
            ranges.push((next, MAX_CHAR));
        }
        Self { ranges }
    }

    pub fn union(&self, other: &CharSet) -> Self {
        Self::from_ranges(self.ranges.iter().chain(other.ranges.iter()).copied())
    }

    pub fn intersect(&self, other: &CharSet) -> Self {
        let mut ranges = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a_from, a_to) = self.ranges[i];
            let (b_from, b_to) = other.ranges[j];
            let from = a_from.max(b_from);
            let to = a_to.min(b_to);
            if from <= to {
                ranges.push((from, to));
            }
            if a_to < b_to {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { ranges }
    }

    pub fn negate_if(self, negated: bool) -> Self {
        if negated {
            self.complement()
        } else {
            self
        }
    }
}

fn table(pred: fn(char) -> bool) -> CharSet {
    let mut ranges = Vec::new();
    let mut run: Option<(u32, u32)> = None;

    // `char::from_u32` skips the surrogate gap, which then splits runs.
    for c in (0..=MAX_CHAR).filter_map(char::from_u32) {
        let code = c as u32;
        if pred(c) {
            run = match run {
                Some((from, to)) if to + 1 == code => Some((from, code)),
                Some(done) => {
                    ranges.push(done);
                    Some((code, code))
                }
                None => Some((code, code)),
            };
        }
    }
    ranges.extend(run);

    CharSet { ranges }
}

pub fn letters() -> &'static CharSet {
    static TABLE: OnceLock<CharSet> = OnceLock::new();
    TABLE.get_or_init(|| table(char::is_alphabetic))
}

pub fn digits() -> &'static CharSet {
    static TABLE: OnceLock<CharSet> = OnceLock::new();
    TABLE.get_or_init(|| table(char::is_numeric))
}

pub fn word() -> &'static CharSet {
    static TABLE: OnceLock<CharSet> = OnceLock::new();
    TABLE.get_or_init(|| table(|c| c.is_alphanumeric() || c == '_'))
}

pub fn whitespace() -> &'static CharSet {
    static TABLE: OnceLock<CharSet> = OnceLock::new();
    TABLE.get_or_init(|| table(char::is_whitespace))
}
