//! This crate provides the core logic of a single-tape Turing Machine simulator.
//! It includes modules for parsing programs written in a line-oriented rule language,
//! executing them step by step with undo, analyzing their state graph, and exporting
//! tapes, histories and rule graphs.

pub mod analyzer;
pub mod export;
pub mod history;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod tape;
pub mod types;

/// Re-exports the history implementations and their common trait.
pub use history::{History, RingHistory, SingleHistory};
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the `Machine` struct and its step outcomes from the machine module.
pub use machine::{Halt, Machine, Status, Step, Undo};
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports the `Tape` struct and its storage parameters.
pub use tape::{Tape, TapeConfig};
/// Re-exports the rule model, programs and error types from the types module.
pub use types::{
    Action, Diagnostic, Program, Rule, RuleTable, Symbol, Trigger, TuringMachineError,
    WriteCommand,
};
