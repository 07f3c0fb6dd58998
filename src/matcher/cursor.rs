//! Replay consumption state

/// Tracks which interactions have been replayed in the current session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchCursor {
    consumed: Vec<bool>,
    position: usize,
}

impl MatchCursor {
    /// Cursor over `len` unconsumed interactions
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            consumed: vec![false; len],
            position: 0,
        }
    }

    /// Track a newly appended interaction that is already used up
    pub fn push_consumed(&mut self) {
        self.consumed.push(true);
        self.advance();
    }

    /// Mark the interaction at `index` as consumed
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds; consuming twice is a debug assertion
    pub fn consume(&mut self, index: usize) {
        debug_assert!(!self.consumed[index], "interaction {index} consumed twice");
        self.consumed[index] = true;
        self.advance();
    }

    /// Check if the interaction at `index` was consumed
    #[must_use]
    pub fn is_consumed(&self, index: usize) -> bool {
        self.consumed.get(index).copied().unwrap_or(false)
    }

    /// First unconsumed interaction in recorded order
    #[must_use]
    pub fn next_unconsumed(&self) -> Option<usize> {
        (self.position < self.consumed.len()).then_some(self.position)
    }

    /// All unconsumed interactions in recorded order
    pub fn unconsumed(&self) -> impl Iterator<Item = usize> + '_ {
        self.consumed
            .iter()
            .enumerate()
            .skip(self.position)
            .filter(|(_, consumed)| !**consumed)
            .map(|(index, _)| index)
    }

    /// Number of tracked interactions
    #[must_use]
    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    /// Check if no interactions are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }

    /// Number of interactions not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.consumed.iter().filter(|consumed| !**consumed).count()
    }

    fn advance(&mut self) {
        while self.position < self.consumed.len() && self.consumed[self.position] {
            self.position += 1;
        }
    }
}
