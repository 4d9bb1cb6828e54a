/// Knobs for a single [`Parser`](crate::engine::Parser).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Deepest rule nesting before an attempt is abandoned.
    pub max_depth: usize,
    /// Re-parse from the furthest failure with recovery rules enabled.
    pub recovery: bool,
    pub max_recovery_passes: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_depth: 512,
            recovery: true,
            max_recovery_passes: 16,
        }
    }
}

impl ParserOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_recovery(mut self, recovery: bool) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_max_recovery_passes(mut self, passes: usize) -> Self {
        self.max_recovery_passes = passes;
        self
    }
}
