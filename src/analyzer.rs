//! This module analyzes the state graph spanned by a program's rules. Every rule is an edge
//! from its trigger state to its next state. The parser uses these views to infer a start
//! state (a source of the graph) and end states (the sinks) when a program does not name them.

use crate::types::Rule;
use std::collections::HashSet;

/// Collects the states rules are triggered in.
pub fn from_states(rules: &[Rule]) -> HashSet<&str> {
    rules.iter().map(|r| r.trigger.state.as_str()).collect()
}

/// Collects the states rules lead to.
pub fn next_states(rules: &[Rule]) -> HashSet<&str> {
    rules.iter().map(|r| r.action.next_state.as_str()).collect()
}

/// Returns the sources of the state graph (states no rule leads to), in file order.
pub fn source_states(rules: &[Rule]) -> Vec<&str> {
    let next = next_states(rules);
    let mut seen = HashSet::new();

    rules
        .iter()
        .map(|r| r.trigger.state.as_str())
        .filter(|state| !next.contains(state) && seen.insert(*state))
        .collect()
}

/// Guesses the start state of a program.
///
/// A single source of the graph is taken as the start state. With several sources or none,
/// the state of the first rule is used. Returns `None` only if there are no rules.
pub fn guess_start_state(rules: &[Rule]) -> Option<String> {
    let first = rules.first()?;

    match source_states(rules).as_slice() {
        [source] => Some(source.to_string()),
        _ => Some(first.trigger.state.clone()),
    }
}

/// Finds the end states of a program: every sink of the graph (a state rules lead to, but
/// no rule is triggered in).
pub fn find_end_states(rules: &[Rule]) -> HashSet<String> {
    let from = from_states(rules);

    next_states(rules)
        .into_iter()
        .filter(|state| !from.contains(state))
        .map(str::to_string)
        .collect()
}
