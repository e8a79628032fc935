//! This module provides the parser for Turing Machine programs, utilizing the `pest` crate.
//!
//! Programs are processed line by line. A line may contain a rule, commands and a comment:
//!
//! ```text
//! state read write move nextState  #! command arg ...  #! command ...  # comment
//! ```
//!
//! A rule has five whitespace separated fields. A command starts with `#!`, followed by its
//! name and arguments. A `#` not followed by `!` starts a comment, `##` is a literal `#`.
//!
//! Supported commands:
//!
//! ```text
//! start    <state>
//! break    <state> ...
//! end      <state> ...
//! fill     <pattern>
//! wildcard <symbol>
//! write    <word>
//! write    <pos>[<] <word> [<pos>[<] <word> ...]
//! ```
//!
//! Minor problems are collected as warnings. Malformed lines abort parsing with an error.

use crate::analyzer::{find_end_states, guess_start_state};
use crate::types::{
    Diagnostic, Program, Rule, RuleTable, TuringMachineError, WriteCommand, DEFAULT_FILL_PATTERN,
};
use lazy_static::lazy_static;
use pest::{iterators::Pair, Parser as _};
use std::collections::{HashMap, HashSet};
use tracing::debug;

mod grammar {
    use pest_derive::Parser;

    /// Derives a pest parser for the line grammar defined in `grammar.pest`.
    #[derive(Parser)]
    #[grammar = "grammar.pest"]
    pub struct ProgramGrammar;
}

use grammar::{ProgramGrammar, Rule as Syntax};

/// A command handler. `args[0]` is the command's name.
type Command = fn(&mut ProgramBuilder, &[&str]) -> Result<(), String>;

lazy_static! {
    static ref COMMANDS: HashMap<&'static str, Command> = {
        let mut commands: HashMap<&'static str, Command> = HashMap::new();
        commands.insert("start", command_start);
        commands.insert("break", command_break);
        commands.insert("end", command_end);
        commands.insert("fill", command_fill);
        commands.insert("wildcard", command_wildcard);
        commands.insert("write", command_write);
        commands
    };
}

/// Parses the given input string into a `Program`.
///
/// This is the main entry point for parsing program files. After the whole input has been
/// read, a missing start state, missing end states and a missing fill pattern are inferred,
/// each with a warning.
///
/// # Returns
///
/// * `Ok(Program)` with all collected warnings.
/// * `Err(TuringMachineError::ParseError)` carrying the error, its line and the warnings
///   collected so far.
pub fn parse(input: &str) -> Result<Program, TuringMachineError> {
    let mut builder = ProgramBuilder::default();

    let file = match ProgramGrammar::parse(Syntax::file, input) {
        Ok(mut pairs) => pairs.next(),
        Err(e) => return Err(builder.fail(e.to_string())),
    };

    let lines = file
        .into_iter()
        .flat_map(Pair::into_inner)
        .filter(|pair| pair.as_rule() == Syntax::line);

    for (index, line) in lines.enumerate() {
        builder.line = Some(index + 1);
        if let Err(message) = builder.parse_line(line) {
            return Err(builder.fail(message));
        }
    }

    builder.line = None;
    builder.finish()
}

/// Splits a raw segment's text into its final form: trimmed, with `##` unescaped.
fn unescape(segment: &str) -> String {
    segment.trim().replace("##", "#")
}

/// Validates the five fields of a rule and builds it.
fn parse_rule(
    state: &str,
    read: &str,
    write: &str,
    movement: &str,
    next_state: &str,
) -> Result<Rule, String> {
    let read = single_symbol(read).ok_or("Rule's field 'read' (2) must be one char.")?;
    let write = single_symbol(write).ok_or("Rule's field 'write' (3) must be one char.")?;
    if state.is_empty() {
        return Err("Rule's field 'state' (1) is empty.".to_string());
    }
    if next_state.is_empty() {
        return Err("Rule's field 'nextState' (5) is empty.".to_string());
    }
    let movement = parse_movement(movement)?;

    Rule::new(state, read, write, movement, next_state).map_err(|e| e.to_string())
}

/// Parses a move field: a signed number, or an alias for -1 (`l L <`), 0 (`n N = s S`)
/// or 1 (`r R >`).
/// Moves are 32-bit numbers; larger ones are rejected like any other malformed field.
fn parse_movement(field: &str) -> Result<i64, String> {
    if let Ok(cells) = field.parse::<i32>() {
        return Ok(i64::from(cells));
    }

    match field {
        "l" | "L" | "<" => Ok(-1),
        "n" | "N" | "=" | "s" | "S" => Ok(0),
        "r" | "R" | ">" => Ok(1),
        _ => Err(format!(
            "Rule's field 'move' (4) must be a number or alias, but was '{field}'."
        )),
    }
}

/// Returns the only char of `field`, if it has exactly one.
fn single_symbol(field: &str) -> Option<char> {
    let mut chars = field.chars();
    match (chars.next(), chars.next()) {
        (Some(symbol), None) => Some(symbol),
        _ => None,
    }
}

/// Accumulates everything read from a program file.
#[derive(Debug, Default)]
struct ProgramBuilder {
    /// Line currently parsed, attached to new warnings.
    line: Option<usize>,
    warnings: Vec<Diagnostic>,
    rules: Vec<Rule>,
    table: RuleTable,
    start_state: Option<String>,
    break_states: HashSet<String>,
    end_states: HashSet<String>,
    /// The `end` command was used, so end states must not be inferred.
    end_specified: bool,
    wildcard: Option<char>,
    fill: Option<String>,
    writes: Vec<WriteCommand>,
}

impl ProgramBuilder {
    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(Diagnostic::new(message, self.line));
    }

    fn fail(self, message: impl Into<String>) -> TuringMachineError {
        TuringMachineError::ParseError {
            error: Diagnostic::new(message, self.line),
            warnings: self.warnings,
        }
    }

    fn parse_line(&mut self, line: Pair<Syntax>) -> Result<(), String> {
        let mut parts = line.into_inner().map(|segment| unescape(segment.as_str()));

        let rule = parts.next().unwrap_or_default();
        if !rule.is_empty() {
            let fields: Vec<&str> = rule.split_whitespace().collect();
            let &[state, read, write, movement, next_state] = fields.as_slice() else {
                return Err(format!(
                    "Expected rule to have 5 fields, but found {}.",
                    fields.len()
                ));
            };
            self.add_rule(parse_rule(state, read, write, movement, next_state)?)?;
        }

        for part in parts {
            let args: Vec<&str> = part.split_whitespace().collect();
            let Some(&name) = args.first() else {
                self.warn("Ignored empty command.");
                continue;
            };
            let command = COMMANDS
                .get(name)
                .ok_or_else(|| format!("Unknown command '{name}'."))?;
            command(self, &args)?;
        }

        Ok(())
    }

    fn add_rule(&mut self, rule: Rule) -> Result<(), String> {
        if self.table.contains_key(&rule.trigger) {
            return Err(format!(
                "Rule for state '{}' and symbol '{}' was already defined.",
                rule.trigger.state, rule.trigger.read
            ));
        }

        self.table.insert(rule.trigger.clone(), rule.clone());
        self.rules.push(rule);
        Ok(())
    }

    /// Fills in everything the file left open and produces the program.
    fn finish(mut self) -> Result<Program, TuringMachineError> {
        if self.rules.is_empty() {
            self.warn("File had no rules.");
        }

        if self.start_state.is_none() {
            self.start_state = guess_start_state(&self.rules);
            let message = match &self.start_state {
                Some(state) => format!(
                    "No start state specified. Guessed '{state}'. \
                     Use command 'start' to specify another start state."
                ),
                None => "No start state specified. Couldn't guess start state. \
                         Use command 'start' to specify one."
                    .to_string(),
            };
            self.warn(message);
        }

        if !self.end_specified {
            self.end_states = find_end_states(&self.rules);
            let mut found: Vec<&String> = self.end_states.iter().collect();
            found.sort();
            let message = if found.is_empty() {
                "No end states specified. Couldn't guess end state. \
                 Use command 'end' to specify one."
                    .to_string()
            } else {
                let list = found
                    .iter()
                    .map(|s| format!("'{s}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "No end states specified. Found {list}. \
                     Use command 'end' to specify other or no end states."
                )
            };
            self.warn(message);
        }

        let fill = match self.fill.take() {
            Some(fill) => fill,
            None => {
                self.warn(format!(
                    "Default fill pattern '{DEFAULT_FILL_PATTERN}' used. \
                     Use command 'fill' to specify one."
                ));
                DEFAULT_FILL_PATTERN.to_string()
            }
        };
        if fill.is_empty() {
            return Err(self.fail(
                "No default value for tape specified. Use command 'fill' to specify one.",
            ));
        }

        debug!(
            rules = self.rules.len(),
            warnings = self.warnings.len(),
            start = ?self.start_state,
            "parsed program"
        );

        Ok(Program {
            rules: self.rules,
            table: self.table,
            start_state: self.start_state,
            break_states: self.break_states,
            end_states: self.end_states,
            wildcard: self.wildcard,
            fill,
            writes: self.writes,
            warnings: self.warnings,
        })
    }
}

fn command_start(p: &mut ProgramBuilder, args: &[&str]) -> Result<(), String> {
    let &[_, state] = args else {
        return Err(format!(
            "Command 'start' expected 1 argument, but found {}.",
            args.len() - 1
        ));
    };

    if let Some(old) = p.start_state.replace(state.to_string()) {
        p.warn(format!(
            "Start state '{old}' was overwritten with '{state}'."
        ));
    }
    Ok(())
}

fn command_break(p: &mut ProgramBuilder, args: &[&str]) -> Result<(), String> {
    if args.len() < 2 {
        p.warn("Useless call of command 'break'.");
    }

    for state in &args[1..] {
        if !p.break_states.insert(state.to_string()) {
            p.warn(format!("State '{state}' was already defined as a break point."));
        }
    }
    Ok(())
}

fn command_end(p: &mut ProgramBuilder, args: &[&str]) -> Result<(), String> {
    if p.end_specified && args.len() < 2 {
        p.warn("Useless call of command 'end'.");
    }
    p.end_specified = true;

    for state in &args[1..] {
        if !p.end_states.insert(state.to_string()) {
            p.warn(format!("State '{state}' was already defined as an end state."));
        }
    }
    Ok(())
}

fn command_fill(p: &mut ProgramBuilder, args: &[&str]) -> Result<(), String> {
    let &[_, pattern] = args else {
        return Err(format!(
            "Command 'fill' expected 1 argument, but found {}.",
            args.len() - 1
        ));
    };

    if let Some(old) = p.fill.replace(pattern.to_string()) {
        p.warn(format!(
            "Fill pattern '{old}' was overwritten with '{pattern}'."
        ));
    }
    Ok(())
}

fn command_wildcard(p: &mut ProgramBuilder, args: &[&str]) -> Result<(), String> {
    let &[_, symbol] = args else {
        return Err(format!(
            "Command 'wildcard' expected 1 argument, but found {}.",
            args.len() - 1
        ));
    };
    let symbol = single_symbol(symbol).ok_or("Wildcard must be a single symbol.")?;

    if let Some(old) = p.wildcard.replace(symbol) {
        p.warn(format!(
            "Wildcard '{old}' was overwritten with '{symbol}'."
        ));
    }
    Ok(())
}

fn command_write(p: &mut ProgramBuilder, args: &[&str]) -> Result<(), String> {
    if args.len() < 2 {
        return Err("Command 'write' expected at least 1 argument.".to_string());
    }

    // A single word is written from cell 0; otherwise positions and words alternate.
    let mut expect_position = args.len() > 2;
    let mut cell = 0;
    let mut towards = false;
    for (i, arg) in args.iter().enumerate().skip(1) {
        if expect_position {
            let (number, ends_here) = match arg.strip_suffix('<') {
                Some(number) => (number, true),
                None => (*arg, false),
            };
            cell = number.parse::<i32>().map(i64::from).map_err(|_| {
                let found = if number.is_empty() {
                    "nothing.".to_string()
                } else {
                    format!("'{number}'.")
                };
                format!("Command 'write' expected a number as argument {i}, but found {found}")
            })?;
            towards = ends_here;
            expect_position = false;
        } else {
            p.writes.push(WriteCommand {
                cell,
                values: arg.to_string(),
                towards,
            });
            expect_position = true;
        }
    }

    if !expect_position {
        p.warn(
            "Last argument of command 'write' is a position. \
             Add another argument, to write to it.",
        );
    }
    Ok(())
}
