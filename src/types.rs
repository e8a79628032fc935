//! This module defines the core data structures and types used throughout the Turing Machine
//! simulator: the rule model (triggers, actions, rules), parser diagnostics and error types.

use crate::analyzer;
use crate::history::History;
use crate::machine::Machine;
use crate::tape::{Tape, TapeConfig};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// A single tape symbol.
pub type Symbol = char;

/// Fill pattern used when a program does not specify one.
pub const DEFAULT_FILL_PATTERN: &str = "*";
/// Placeholder start state for programs without rules and without a `start` command.
pub const UNKNOWN_START_STATE: &str = "n/a";
/// File extension of program files.
pub const PROGRAM_EXTENSION: &str = "tm";

/// Lookup table of a program, keyed by trigger. Holds at most one rule per trigger.
pub type RuleTable = HashMap<Trigger, Rule>;

/// First part of a rule: the machine is in `state` and reads `read`.
///
/// Triggers are the keys of the [`RuleTable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trigger {
    /// Current state of the machine.
    pub state: String,
    /// Symbol under the head.
    pub read: Symbol,
}

impl Trigger {
    pub fn new(state: impl Into<String>, read: Symbol) -> Self {
        Self {
            state: state.into(),
            read,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.state, self.read)
    }
}

/// Second part of a rule: what to do once its trigger fired.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawAction")]
pub struct Action {
    /// Symbol written at the head.
    pub write: Symbol,
    /// Signed number of cells the head moves after writing.
    pub movement: i64,
    /// State of the machine after this action. Never empty.
    pub next_state: String,
}

impl Action {
    /// Creates a new action, rejecting an empty next state.
    pub fn new(
        write: Symbol,
        movement: i64,
        next_state: impl Into<String>,
    ) -> Result<Self, TuringMachineError> {
        let next_state = next_state.into();
        if next_state.is_empty() {
            return Err(TuringMachineError::InvalidState(
                "next state must not be empty".to_string(),
            ));
        }

        Ok(Self {
            write,
            movement,
            next_state,
        })
    }
}

/// Unchecked form of an [`Action`] as it appears in serialized data.
#[derive(Deserialize)]
struct RawAction {
    write: Symbol,
    movement: i64,
    next_state: String,
}

impl TryFrom<RawAction> for Action {
    type Error = TuringMachineError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        Action::new(raw.write, raw.movement, raw.next_state)
    }
}

/// A line of the transition table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub trigger: Trigger,
    pub action: Action,
}

impl Rule {
    /// Builds a rule from its five fields.
    pub fn new(
        state: impl Into<String>,
        read: Symbol,
        write: Symbol,
        movement: i64,
        next_state: impl Into<String>,
    ) -> Result<Self, TuringMachineError> {
        Ok(Self {
            trigger: Trigger::new(state, read),
            action: Action::new(write, movement, next_state)?,
        })
    }

    /// Substitutes the wildcard in `read` and `write` with the symbol that was actually read.
    ///
    /// The rule itself is never modified. Without any wildcard usage the rule is borrowed
    /// back unchanged, otherwise a resolved copy is returned. A disabled wildcard (`None`)
    /// never matches.
    pub fn resolve_wildcard(&self, wildcard: Option<Symbol>, actual: Symbol) -> Cow<'_, Rule> {
        let Some(wildcard) = wildcard else {
            return Cow::Borrowed(self);
        };

        let read_is_wild = self.trigger.read == wildcard;
        let write_is_wild = self.action.write == wildcard;
        if !read_is_wild && !write_is_wild {
            return Cow::Borrowed(self);
        }

        let mut resolved = self.clone();
        if read_is_wild {
            resolved.trigger.read = actual;
        }
        if write_is_wild {
            resolved.action.write = actual;
        }
        Cow::Owned(resolved)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.trigger.state,
            self.trigger.read,
            self.action.write,
            self.action.movement,
            self.action.next_state
        )
    }
}

/// A `write` command of a program: initial tape contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteCommand {
    /// Cell of the first symbol, or of the last one if `towards` is set.
    pub cell: i64,
    pub values: String,
    /// The word ends at `cell` instead of starting there.
    pub towards: bool,
}

impl WriteCommand {
    /// Writes the word to `tape`. Returns whether any cell changed.
    pub fn apply(&self, tape: &mut Tape) -> Result<bool, TuringMachineError> {
        if self.towards {
            tape.write_towards(self.cell, &self.values)
        } else {
            tape.write_str(self.cell, &self.values)
        }
    }
}

/// Represents a parsed Turing Machine program.
///
/// Holds the rules in file order together with a lookup table, the settings of all commands
/// and the warnings the parser produced. Missing start and end states have already been
/// inferred.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub rules: Vec<Rule>,
    #[serde(skip)]
    pub table: RuleTable,
    /// `None` only for a program without rules and without a `start` command.
    pub start_state: Option<String>,
    pub break_states: HashSet<String>,
    pub end_states: HashSet<String>,
    pub wildcard: Option<Symbol>,
    /// Pattern repeated over unwritten cells. Never empty.
    pub fill: String,
    pub writes: Vec<WriteCommand>,
    pub warnings: Vec<Diagnostic>,
}

impl Program {
    pub fn start_state_or_default(&self) -> &str {
        self.start_state.as_deref().unwrap_or(UNKNOWN_START_STATE)
    }

    /// States rules are triggered in.
    pub fn from_states(&self) -> HashSet<&str> {
        analyzer::from_states(&self.rules)
    }

    /// States rules lead to.
    pub fn next_states(&self) -> HashSet<&str> {
        analyzer::next_states(&self.rules)
    }

    /// Every state mentioned by the program, sorted.
    pub fn states(&self) -> BTreeSet<&str> {
        let mut states: BTreeSet<&str> = self.from_states().into_iter().collect();
        states.extend(self.next_states());
        states.extend(self.start_state.as_deref());
        states.extend(self.break_states.iter().map(String::as_str));
        states.extend(self.end_states.iter().map(String::as_str));
        states
    }

    /// Creates the initial tape: the fill pattern with all `write` commands applied.
    pub fn create_tape(&self) -> Result<Tape, TuringMachineError> {
        self.create_tape_with(TapeConfig::default())
    }

    pub fn create_tape_with(&self, config: TapeConfig) -> Result<Tape, TuringMachineError> {
        let mut tape = Tape::with_config(config, &self.fill)?;
        for write in &self.writes {
            write.apply(&mut tape)?;
        }
        tape.take_changed();
        Ok(tape)
    }

    /// Builds a machine on a fresh tape, using `history` to record its steps.
    pub fn build_machine<H: History>(&self, history: H) -> Result<Machine<H>, TuringMachineError> {
        Ok(Machine::new(
            self.create_tape()?,
            self.table.clone(),
            self.start_state_or_default(),
            self.break_states.clone(),
            self.end_states.clone(),
            self.wildcard,
            history,
        ))
    }
}

/// A parser message, tagged with its 1-based line number when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}: {}", line, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Represents various errors that can occur during Turing Machine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuringMachineError {
    /// A program could not be parsed. Warnings collected up to the failure are kept.
    #[error("Program parsing error: {error}")]
    ParseError {
        error: Diagnostic,
        warnings: Vec<Diagnostic>,
    },
    /// Indicates an attempt to use an empty or otherwise invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// Indicates that there's no rule defined for the current state and symbol.
    #[error("No rule defined for state '{}' and symbol '{}'", .0.state, .0.read)]
    UndefinedTransition(Trigger),
    /// A tape was constructed with invalid parameters.
    #[error("Invalid tape: {0}")]
    InvalidTape(String),
    /// A move or write would address a cell outside the `i64` range.
    #[error("Tape overflow: {0}")]
    TapeOverflow(String),
    /// A history was given a capacity below one.
    #[error("Invalid history capacity: {0}")]
    InvalidCapacity(usize),
    /// An exporter was called with invalid parameters.
    #[error("Export error: {0}")]
    ExportError(String),
    /// Indicates an error related to file system operations.
    #[error("File error: {0}")]
    FileError(String),
}
