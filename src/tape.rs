//! This module provides the `Tape` of a Turing Machine: an infinite, two-sided array of
//! symbols with a movable head.
//!
//! The tape is backed by two growable buffers, one for the non-negative cells and one for
//! the negative cells (cell `c < 0` lives at index `-1 - c`). Cells that were never written
//! hold the value of a repeating fill pattern which continues seamlessly through cell 0, e.g.
//! `abc[a]bcabc` for the pattern `abc` with `[a]` being cell 0.

use crate::types::{Symbol, TuringMachineError};
use tracing::trace;

/// Storage parameters of a [`Tape`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapeConfig {
    /// Initial length of the buffer for negative cells.
    pub left_len: usize,
    /// Initial length of the buffer for non-negative cells. Must be at least 1.
    pub right_len: usize,
    /// Factor applied to a buffer's length when it has to grow. Values `<= 1` make the
    /// buffer grow only up to the requested cell.
    pub growth_factor: f64,
}

impl Default for TapeConfig {
    fn default() -> Self {
        Self {
            left_len: 50,
            right_len: 100,
            growth_factor: 1.5,
        }
    }
}

/// Which of the two buffers a cell lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Maps a cell number to its buffer and index.
fn locate(cell: i64) -> (Side, usize) {
    if cell < 0 {
        (Side::Left, (-1 - cell) as usize)
    } else {
        (Side::Right, cell as usize)
    }
}

/// Returns the fill of buffer slot `index`.
///
/// For the right buffer this is `pattern[index % len]`. The left buffer runs backwards from
/// cell -1, so slot `index` takes the pattern element counted back from the next multiple of
/// the pattern length above `index`.
pub fn fill_at(pattern: &[Symbol], index: usize, mirrored: bool) -> Symbol {
    let len = pattern.len();
    if mirrored {
        let next_multiple = len * (index / len + 1);
        pattern[next_multiple - index - 1]
    } else {
        pattern[index % len]
    }
}

fn overflow(cell: i64, len: usize) -> TuringMachineError {
    TuringMachineError::TapeOverflow(format!("cannot write {len} symbols next to cell {cell}"))
}

/// An infinite tape with a read/write head. The head starts at cell 0.
#[derive(Debug, Clone)]
pub struct Tape {
    pos: i64,
    /// Minimal and maximal head position ever set. Random access does not touch these.
    leftmost: i64,
    rightmost: i64,
    left: Vec<Symbol>,
    right: Vec<Symbol>,
    pattern: Vec<Symbol>,
    growth_factor: f64,
    changed: bool,
}

impl Tape {
    /// Creates a tape filled with `pattern`, using the default [`TapeConfig`].
    pub fn new(pattern: &str) -> Result<Self, TuringMachineError> {
        Self::with_config(TapeConfig::default(), pattern)
    }

    /// Creates a tape filled with `pattern` and the given storage parameters.
    pub fn with_config(config: TapeConfig, pattern: &str) -> Result<Self, TuringMachineError> {
        if config.right_len < 1 {
            return Err(TuringMachineError::InvalidTape(
                "right storage must hold at least one cell".to_string(),
            ));
        }
        if pattern.is_empty() {
            return Err(TuringMachineError::InvalidTape(
                "fill pattern must not be empty".to_string(),
            ));
        }

        let pattern: Vec<Symbol> = pattern.chars().collect();
        let left = (0..config.left_len)
            .map(|i| fill_at(&pattern, i, true))
            .collect();
        let right = (0..config.right_len)
            .map(|i| fill_at(&pattern, i, false))
            .collect();

        Ok(Self {
            pos: 0,
            leftmost: 0,
            rightmost: 0,
            left,
            right,
            pattern,
            growth_factor: config.growth_factor,
            changed: false,
        })
    }

    /// Returns the fill pattern as a string.
    pub fn pattern(&self) -> String {
        self.pattern.iter().collect()
    }

    /// Returns the current head position.
    pub fn pos(&self) -> i64 {
        self.pos
    }

    /// Returns the minimal head position ever set.
    pub fn leftmost(&self) -> i64 {
        self.leftmost
    }

    /// Returns the maximal head position ever set.
    pub fn rightmost(&self) -> i64 {
        self.rightmost
    }

    /// Number of realized cells on the negative and the non-negative side.
    pub fn realized(&self) -> (usize, usize) {
        (self.left.len(), self.right.len())
    }

    /// Moves the head by `cells` (negative values move left). Returns whether it moved.
    ///
    /// Fails without moving if the target cell lies outside the `i64` range.
    pub fn move_by(&mut self, cells: i64) -> Result<bool, TuringMachineError> {
        let cell = self.pos.checked_add(cells).ok_or_else(|| {
            let message = format!("cannot move from cell {} by {cells}", self.pos);
            TuringMachineError::TapeOverflow(message)
        })?;
        Ok(self.set_pos(cell))
    }

    /// Moves the head to an absolute cell. Returns whether the position changed.
    pub fn set_pos(&mut self, cell: i64) -> bool {
        if self.pos == cell {
            return false;
        }

        self.pos = cell;
        self.leftmost = self.leftmost.min(cell);
        self.rightmost = self.rightmost.max(cell);
        self.changed = true;
        true
    }

    /// Reads the cell under the head.
    pub fn read_head(&self) -> Symbol {
        self.read(self.pos)
    }

    /// Reads a single cell. Cells beyond the realized storage report their fill.
    pub fn read(&self, cell: i64) -> Symbol {
        let (side, index) = locate(cell);
        let (buffer, mirrored) = match side {
            Side::Left => (&self.left, true),
            Side::Right => (&self.right, false),
        };
        buffer
            .get(index)
            .copied()
            .unwrap_or_else(|| fill_at(&self.pattern, index, mirrored))
    }

    /// Reads `count` consecutive cells starting at `start`. A `count < 1` yields an empty vector.
    /// The range ends at cell `i64::MAX`.
    pub fn read_range(&self, start: i64, count: i64) -> Vec<Symbol> {
        if count < 1 {
            return Vec::new();
        }

        let last = start.saturating_add(count - 1);
        let mut part = Vec::with_capacity((last - start) as usize + 1);
        if start < 0 {
            // Negative cells run backwards through the left buffer.
            part.extend((start..=last.min(-1)).map(|cell| self.read(cell)));
        }
        if last >= 0 {
            let (lo, hi) = (start.max(0) as usize, last as usize + 1);
            let realized = hi.min(self.right.len());
            if lo < realized {
                part.extend_from_slice(&self.right[lo..realized]);
            }
            part.extend((lo.max(realized)..hi).map(|i| fill_at(&self.pattern, i, false)));
        }
        part
    }

    /// Writes to the cell under the head. Returns whether the content changed.
    pub fn write_head(&mut self, value: Symbol) -> bool {
        self.write(self.pos, value)
    }

    /// Writes a single cell. Returns whether the content changed.
    pub fn write(&mut self, cell: i64, value: Symbol) -> bool {
        let changed = self.write_quiet(cell, value);
        self.changed |= changed;
        changed
    }

    /// Writes `values` to consecutive cells, the first symbol landing on `start`.
    ///
    /// All writes are reported as a single change. Returns whether any cell changed, or an
    /// error without writing anything if the word would run past cell `i64::MAX`.
    pub fn write_str(&mut self, start: i64, values: &str) -> Result<bool, TuringMachineError> {
        let symbols: Vec<Symbol> = values.chars().collect();
        if symbols.is_empty() {
            return Ok(false);
        }

        let last = i64::try_from(symbols.len() - 1)
            .ok()
            .and_then(|offset| start.checked_add(offset))
            .ok_or_else(|| overflow(start, symbols.len()))?;
        self.ensure(start);
        self.ensure(last);
        let mut changed = false;
        for (cell, &symbol) in (start..=last).zip(&symbols) {
            changed |= self.write_quiet(cell, symbol);
        }
        self.changed |= changed;
        Ok(changed)
    }

    /// Writes `values` so that its last symbol lands on `end`.
    pub fn write_towards(&mut self, end: i64, values: &str) -> Result<bool, TuringMachineError> {
        let len = values.chars().count();
        if len == 0 {
            return Ok(false);
        }

        let start = i64::try_from(len - 1)
            .ok()
            .and_then(|offset| end.checked_sub(offset))
            .ok_or_else(|| overflow(end, len))?;
        self.write_str(start, values)
    }

    /// Returns whether the tape changed since the last call and resets the signal.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    fn write_quiet(&mut self, cell: i64, value: Symbol) -> bool {
        self.ensure(cell);
        let (side, index) = locate(cell);
        let slot = match side {
            Side::Left => &mut self.left[index],
            Side::Right => &mut self.right[index],
        };
        let old = std::mem::replace(slot, value);
        old != value
    }

    /// Makes sure the storage realizes `cell`.
    fn ensure(&mut self, cell: i64) {
        let (side, index) = locate(cell);
        let (buffer, mirrored) = match side {
            Side::Left => (&mut self.left, true),
            Side::Right => (&mut self.right, false),
        };
        if index < buffer.len() {
            return;
        }

        let grown = (buffer.len() as f64 * self.growth_factor) as usize;
        let new_len = grown.max(index + 1);
        trace!(?side, from = buffer.len(), to = new_len, "growing tape storage");
        let start = buffer.len();
        buffer.extend((start..new_len).map(|i| fill_at(&self.pattern, i, mirrored)));
    }
}
