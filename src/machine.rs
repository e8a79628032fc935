//! This module defines the `Machine` struct, which simulates a single-tape Turing Machine.
//! It executes one transition at a time, resolves wildcard rules and records every step in a
//! [`History`] so that it can be undone.

use crate::history::{History, RingHistory};
use crate::tape::Tape;
use crate::types::{Rule, RuleTable, Symbol, Trigger};
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Represents the outcome of a single execution step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A rule was applied.
    Continue {
        /// The rule changed the machine's state.
        state_changed: bool,
    },
    /// Neither an exact nor a wildcard rule matched. Carries the trigger that was looked up;
    /// the machine and its tape are left untouched.
    NoRule(Trigger),
    /// The resolved rule would move the head past the outermost cell. The machine and its
    /// tape are left untouched.
    OutOfTape(Rule),
}

/// Represents the outcome of an undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Undo {
    /// The most recent step was reverted.
    Reverted {
        /// Undoing changed the machine's state.
        state_changed: bool,
    },
    /// The history holds no step to revert.
    Empty,
}

/// Why [`Machine::run`] stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// The machine is in an end state.
    End,
    /// The machine entered a break state.
    Break,
    /// No rule matched.
    NoRule(Trigger),
    /// A rule would have moved the head off the tape.
    OutOfTape(Rule),
    /// The step limit was reached.
    StepLimit,
}

/// Execution status derived from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted,
}

/// A single-tape Turing Machine with reversible execution.
///
/// The machine owns its tape, rule table and history. Rules stored in the history are fully
/// wildcard-resolved, so undoing a step never has to look at the wildcard again.
#[derive(Debug, Clone)]
pub struct Machine<H: History = RingHistory> {
    tape: Tape,
    table: RuleTable,
    state: String,
    start_state: String,
    break_states: HashSet<String>,
    end_states: HashSet<String>,
    wildcard: Option<Symbol>,
    history: H,
}

impl<H: History> Machine<H> {
    /// Creates a new machine that starts in `start_state`.
    ///
    /// # Arguments
    ///
    /// * `tape` - The tape to operate on.
    /// * `table` - Rules keyed by their trigger.
    /// * `start_state` - Initial state, also used by [`Machine::reset`].
    /// * `break_states` - States in which a run pauses.
    /// * `end_states` - States in which the machine counts as halted.
    /// * `wildcard` - Wildcard symbol for `read` and `write`, `None` to disable it.
    /// * `history` - Storage for executed steps.
    pub fn new(
        tape: Tape,
        table: RuleTable,
        start_state: impl Into<String>,
        break_states: HashSet<String>,
        end_states: HashSet<String>,
        wildcard: Option<Symbol>,
        history: H,
    ) -> Self {
        let start_state = start_state.into();
        Self {
            tape,
            table,
            state: start_state.clone(),
            start_state,
            break_states,
            end_states,
            wildcard,
            history,
        }
    }

    /// Executes a single transition.
    ///
    /// Looks up the rule for the current state and the symbol under the head, falling back
    /// to the wildcard rule. The resolved rule is written, the head moved, the state changed
    /// and the rule pushed onto the history.
    pub fn step(&mut self) -> Step {
        let read = self.tape.read_head();
        let rule = match self.resolve(read) {
            Ok(rule) => rule.into_owned(),
            Err(trigger) => {
                debug!(state = %trigger.state, read = %trigger.read, "no rule found");
                return Step::NoRule(trigger);
            }
        };

        trace!(%rule, "step");
        let cell = self.tape.pos();
        if let Err(error) = self.tape.move_by(rule.action.movement) {
            debug!(%rule, %error, "head cannot move");
            return Step::OutOfTape(rule);
        }
        self.tape.write(cell, rule.action.write);
        let state_changed = self.state != rule.action.next_state;
        if state_changed {
            self.state.clone_from(&rule.action.next_state);
        }
        self.history.push(rule);

        Step::Continue { state_changed }
    }

    /// Reverts the most recent step stored in the history.
    ///
    /// The head moves back, the symbol read by that step is restored and the machine returns
    /// to the step's source state.
    pub fn undo(&mut self) -> Undo {
        let Some(rule) = self.history.pop() else {
            return Undo::Empty;
        };

        trace!(%rule, "undo");
        // Exact for every applied step, saturates only after outside tape edits.
        let cell = self.tape.pos().saturating_sub(rule.action.movement);
        self.tape.set_pos(cell);
        self.tape.write_head(rule.trigger.read);
        let state_changed = self.state != rule.trigger.state;
        if state_changed {
            self.state = rule.trigger.state;
        }

        Undo::Reverted { state_changed }
    }

    /// Steps until the machine reaches an end state, enters a break state, finds no rule, the
    /// head would leave the tape or `limit` steps were taken.
    ///
    /// This runs a machine to its halt without output between steps. Hosts that report every
    /// step drive [`Machine::step`] themselves.
    ///
    /// A machine that already sits in a break state is not stopped before its first step,
    /// so a paused run can be resumed.
    pub fn run(&mut self, limit: u64) -> Halt {
        for _ in 0..limit {
            if self.in_end_state() {
                return Halt::End;
            }
            match self.step() {
                Step::Continue { .. } => {}
                Step::NoRule(trigger) => return Halt::NoRule(trigger),
                Step::OutOfTape(rule) => return Halt::OutOfTape(rule),
            }
            if self.in_break_state() && !self.in_end_state() {
                return Halt::Break;
            }
        }

        if self.in_end_state() {
            Halt::End
        } else {
            Halt::StepLimit
        }
    }

    /// Returns the wildcard-resolved rule the next step would apply.
    pub fn next_rule(&self) -> Option<Rule> {
        self.resolve(self.tape.read_head())
            .ok()
            .map(Cow::into_owned)
    }

    fn resolve(&self, read: Symbol) -> Result<Cow<'_, Rule>, Trigger> {
        let trigger = Trigger::new(self.state.clone(), read);
        let rule = self.table.get(&trigger).or_else(|| {
            self.wildcard
                .and_then(|wildcard| self.table.get(&Trigger::new(self.state.clone(), wildcard)))
        });

        match rule {
            Some(rule) => Ok(rule.resolve_wildcard(self.wildcard, read)),
            None => Err(trigger),
        }
    }

    /// Returns the current state of the machine.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Returns the start state of the machine.
    pub fn start_state(&self) -> &str {
        &self.start_state
    }

    /// Sets the current state. Clears the history if the state actually changes, since the
    /// stored steps would no longer lead back from the current state.
    pub fn set_state(&mut self, state: impl Into<String>) {
        let state = state.into();
        if self.state != state {
            self.history.clear();
            self.state = state;
        }
    }

    /// Returns to the start state and clears the history. The tape is left as it is.
    pub fn reset(&mut self) {
        let start = self.start_state.clone();
        self.set_state(start);
        self.history.clear();
    }

    pub fn status(&self) -> Status {
        if self.in_end_state() {
            Status::Halted
        } else {
            Status::Running
        }
    }

    pub fn is_halted(&self) -> bool {
        self.status() == Status::Halted
    }

    pub fn in_end_state(&self) -> bool {
        self.end_states.contains(&self.state)
    }

    /// Break states only matter to callers deciding when to pause; they never block a step.
    pub fn in_break_state(&self) -> bool {
        self.break_states.contains(&self.state)
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Mutable access to the tape, e.g. for manual edits between steps.
    pub fn tape_mut(&mut self) -> &mut Tape {
        &mut self.tape
    }

    /// Replaces the tape and clears the history, whose steps refer to the old contents.
    /// Returns the previous tape.
    pub fn set_tape(&mut self, tape: Tape) -> Tape {
        self.history.clear();
        std::mem::replace(&mut self.tape, tape)
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn wildcard(&self) -> Option<Symbol> {
        self.wildcard
    }

    pub fn break_states(&self) -> &HashSet<String> {
        &self.break_states
    }

    pub fn end_states(&self) -> &HashSet<String> {
        &self.end_states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SingleHistory;

    fn table(rules: &[Rule]) -> RuleTable {
        rules
            .iter()
            .map(|rule| (rule.trigger.clone(), rule.clone()))
            .collect()
    }

    fn states(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn machine(rules: &[Rule], fill: &str, ends: &[&str], wildcard: Option<char>) -> Machine {
        Machine::new(
            Tape::new(fill).unwrap(),
            table(rules),
            "A",
            HashSet::new(),
            states(ends),
            wildcard,
            RingHistory::new(100).unwrap(),
        )
    }

    #[test]
    fn test_machine_creation() {
        let m = machine(&[], "0", &["H"], None);

        assert_eq!(m.state(), "A");
        assert_eq!(m.start_state(), "A");
        assert_eq!(m.tape().pos(), 0);
        assert_eq!(m.history().steps(), 0);
        assert_eq!(m.status(), Status::Running);
    }

    #[test]
    fn test_single_step() {
        let rules = [Rule::new("A", '0', '1', 1, "B").unwrap()];
        let mut m = machine(&rules, "0", &["B"], None);

        assert_eq!(m.step(), Step::Continue { state_changed: true });
        assert_eq!(m.state(), "B");
        assert_eq!(m.tape().read(0), '1');
        assert_eq!(m.tape().pos(), 1);
        assert_eq!(m.history().steps(), 1);
        assert!(m.is_halted());
    }

    #[test]
    fn test_missing_rule_leaves_machine_untouched() {
        let mut m = machine(&[], "q", &[], None);

        assert_eq!(m.step(), Step::NoRule(Trigger::new("A", 'q')));
        assert_eq!(m.state(), "A");
        assert_eq!(m.tape().pos(), 0);
        assert_eq!(m.tape().read(0), 'q');
        assert_eq!(m.history().steps(), 0);
    }

    #[test]
    fn test_move_off_the_tape_leaves_machine_untouched() {
        let rule = Rule::new("A", '0', '1', 2, "B").unwrap();
        let mut m = machine(std::slice::from_ref(&rule), "0", &["B"], None);
        m.tape_mut().set_pos(i64::MAX - 1);

        assert_eq!(m.step(), Step::OutOfTape(rule.clone()));
        assert_eq!(m.state(), "A");
        assert_eq!(m.tape().pos(), i64::MAX - 1);
        assert_eq!(m.tape().read(i64::MAX - 1), '0');
        assert_eq!(m.history().steps(), 0);
        assert_eq!(m.run(10), Halt::OutOfTape(rule));
    }

    #[test]
    fn test_wildcard_fallback_is_resolved_before_push() {
        let rules = [Rule::new("A", '*', 'x', 1, "B").unwrap()];
        let mut m = machine(&rules, "q", &["B"], Some('*'));

        assert_eq!(m.step(), Step::Continue { state_changed: true });
        assert_eq!(m.tape().read(0), 'x');
        assert_eq!(m.history().last().unwrap().trigger.read, 'q');

        assert_eq!(m.undo(), Undo::Reverted { state_changed: true });
        assert_eq!(m.tape().read(0), 'q');
        assert_eq!(m.tape().pos(), 0);
        assert_eq!(m.state(), "A");
    }

    #[test]
    fn test_exact_rule_wins_over_wildcard() {
        let rules = [
            Rule::new("A", '*', 'x', 1, "B").unwrap(),
            Rule::new("A", 'q', 'y', -1, "C").unwrap(),
        ];
        let mut m = machine(&rules, "q", &[], Some('*'));

        m.step();
        assert_eq!(m.state(), "C");
        assert_eq!(m.tape().read(0), 'y');
    }

    #[test]
    fn test_wildcard_write_keeps_symbol() {
        let rules = [Rule::new("A", '*', '*', 1, "A").unwrap()];
        let mut m = machine(&rules, "abc", &[], Some('*'));

        for _ in 0..3 {
            assert_eq!(m.step(), Step::Continue { state_changed: false });
        }
        let tape: String = m.tape().read_range(0, 3).into_iter().collect();
        assert_eq!(tape, "abc");
    }

    #[test]
    fn test_undo_restores_previous_configuration() {
        let rules = [
            Rule::new("A", '0', '1', 3, "B").unwrap(),
            Rule::new("B", '0', '2', -5, "A").unwrap(),
        ];
        let mut m = machine(&rules, "0", &[], None);

        m.step();
        m.step();
        assert_eq!(m.tape().pos(), -2);

        m.undo();
        assert_eq!(m.state(), "B");
        assert_eq!(m.tape().pos(), 3);
        assert_eq!(m.tape().read(3), '0');

        m.undo();
        assert_eq!(m.state(), "A");
        assert_eq!(m.tape().pos(), 0);
        assert_eq!(m.tape().read(0), '0');

        assert_eq!(m.undo(), Undo::Empty);
        assert_eq!(m.history().steps(), 0);
    }

    #[test]
    fn test_set_state_and_reset_clear_history() {
        let rules = [Rule::new("A", '0', '1', 1, "B").unwrap()];
        let mut m = machine(&rules, "0", &[], None);

        m.step();
        m.set_state("B");
        assert_eq!(m.history().steps(), 1);

        m.set_state("X");
        assert_eq!(m.history().steps(), 0);

        assert_eq!(m.step(), Step::NoRule(Trigger::new("X", '1')));
        m.reset();
        assert_eq!(m.state(), "A");
        assert!(m.history().is_empty());
        // The tape keeps its contents.
        assert_eq!(m.tape().read(0), '1');
    }

    #[test]
    fn test_set_tape_clears_history() {
        let rules = [Rule::new("A", '0', '1', 1, "A").unwrap()];
        let mut m = machine(&rules, "0", &[], None);

        m.step();
        let old = m.set_tape(Tape::new("0").unwrap());
        assert_eq!(old.read(0), '1');
        assert_eq!(m.history().steps(), 0);
        assert_eq!(m.undo(), Undo::Empty);
    }

    #[test]
    fn test_run_until_end() {
        let rules = [
            Rule::new("A", '0', '1', 1, "A").unwrap(),
            Rule::new("A", '1', '1', 0, "H").unwrap(),
        ];
        let mut m = machine(&rules, "0001", &["H"], None);

        assert_eq!(m.run(100), Halt::End);
        assert_eq!(m.history().steps(), 4);
        assert_eq!(m.run(100), Halt::End);
        assert_eq!(m.history().steps(), 4);
    }

    #[test]
    fn test_run_stops_at_break_and_resumes() {
        let rules = [
            Rule::new("A", '0', '0', 1, "P").unwrap(),
            Rule::new("P", '0', '0', 1, "H").unwrap(),
        ];
        let mut m = Machine::new(
            Tape::new("0").unwrap(),
            table(&rules),
            "A",
            states(&["P"]),
            states(&["H"]),
            None,
            SingleHistory::new(),
        );

        assert_eq!(m.run(10), Halt::Break);
        assert!(m.in_break_state());
        assert_eq!(m.run(10), Halt::End);
    }

    #[test]
    fn test_run_limits() {
        let rules = [Rule::new("A", '0', '0', 1, "A").unwrap()];
        let mut m = machine(&rules, "0", &[], None);
        assert_eq!(m.run(25), Halt::StepLimit);
        assert_eq!(m.history().steps(), 25);

        let mut m = machine(&rules, "1", &[], None);
        assert_eq!(m.run(25), Halt::NoRule(Trigger::new("A", '1')));
    }

    #[test]
    fn test_next_rule_preview() {
        let rules = [Rule::new("A", '*', '*', 1, "A").unwrap()];
        let m = machine(&rules, "z", &[], Some('*'));

        let preview = m.next_rule().unwrap();
        assert_eq!(preview.trigger.read, 'z');
        assert_eq!(preview.action.write, 'z');
        assert_eq!(m.history().steps(), 0);
    }
}
