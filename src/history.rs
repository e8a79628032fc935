//! Execution histories. A history stores the executed (wildcard-resolved) rules of a machine
//! like a stack so that steps can be undone, and counts the steps taken since the last reset.

use crate::types::{Rule, TuringMachineError};
use std::collections::VecDeque;

/// Common contract of all histories.
///
/// The step counter does not have to match the number of stored rules: a bounded history
/// discards old rules but keeps counting.
pub trait History {
    /// Adds a rule on top and increments the step counter.
    fn push(&mut self, rule: Rule);

    /// Removes and returns the topmost rule, decrementing the step counter.
    /// An empty history returns `None` and leaves the counter untouched.
    fn pop(&mut self) -> Option<Rule>;

    /// Returns the most recent stored rule.
    fn last(&self) -> Option<&Rule>;

    /// Number of steps taken since the last reset.
    fn steps(&self) -> u64;

    /// Number of rules currently stored.
    fn len(&self) -> usize;

    /// Removes all rules and resets the step counter.
    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether undo could rewind all the way back to step 0.
    fn is_complete(&self) -> bool {
        self.steps() <= self.len() as u64
    }
}

/// A history that only remembers the last step. Enough for a single level of undo.
#[derive(Debug, Clone, Default)]
pub struct SingleHistory {
    steps: u64,
    last: Option<Rule>,
}

impl SingleHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl History for SingleHistory {
    fn push(&mut self, rule: Rule) {
        self.steps += 1;
        self.last = Some(rule);
    }

    fn pop(&mut self) -> Option<Rule> {
        let rule = self.last.take()?;
        self.steps -= 1;
        Some(rule)
    }

    fn last(&self) -> Option<&Rule> {
        self.last.as_ref()
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn len(&self) -> usize {
        usize::from(self.last.is_some())
    }

    fn clear(&mut self) {
        self.steps = 0;
        self.last = None;
    }
}

/// A bounded history keeping the most recent rules in a ring buffer.
///
/// Index 0 is the oldest stored rule. Once the capacity is reached every push evicts the
/// oldest entry. The capacity can be changed while in use.
#[derive(Debug, Clone)]
pub struct RingHistory {
    entries: VecDeque<Rule>,
    capacity: usize,
    steps: u64,
}

impl RingHistory {
    /// Creates a history holding at most `capacity` rules (must be at least 1).
    pub fn new(capacity: usize) -> Result<Self, TuringMachineError> {
        if capacity < 1 {
            return Err(TuringMachineError::InvalidCapacity(capacity));
        }

        Ok(Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            steps: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity. Shrinking below the current size discards the oldest entries.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), TuringMachineError> {
        if capacity < 1 {
            return Err(TuringMachineError::InvalidCapacity(capacity));
        }

        if self.entries.len() > capacity {
            let excess = self.entries.len() - capacity;
            self.entries.drain(..excess);
        }
        self.entries.shrink_to(capacity);
        self.capacity = capacity;
        Ok(())
    }

    /// Returns the rule at index `i` (0 is the oldest stored entry).
    pub fn get(&self, i: usize) -> Option<&Rule> {
        self.entries.get(i)
    }

    /// Returns the 1-based step number of the entry at index `i`.
    pub fn step_at(&self, i: usize) -> u64 {
        self.steps - self.entries.len() as u64 + i as u64 + 1
    }

    /// Iterates over the stored rules, oldest first, together with their step numbers.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Rule)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, rule)| (self.step_at(i), rule))
    }
}

impl History for RingHistory {
    fn push(&mut self, rule: Rule) {
        self.steps += 1;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(rule);
    }

    fn pop(&mut self) -> Option<Rule> {
        let rule = self.entries.pop_back()?;
        self.steps -= 1;
        Some(rule)
    }

    fn last(&self) -> Option<&Rule> {
        self.entries.back()
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.steps = 0;
        self.entries.clear();
    }
}
