//! This module provides exporters that render a machine's tape, history and rules as text:
//! a plain text tape section, tab separated history rows and a GML graph of the rules.

use crate::history::RingHistory;
use crate::tape::Tape;
use crate::types::{Rule, TuringMachineError};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

/// How rule moves are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveStyle {
    /// Signed number of cells, e.g. `-1`.
    #[default]
    Number,
    /// `L`, `N` and `R` for -1, 0 and 1. Other moves stay numbers.
    Letter,
}

impl MoveStyle {
    pub fn format(self, movement: i64) -> String {
        match (self, movement) {
            (MoveStyle::Letter, -1) => "L".to_string(),
            (MoveStyle::Letter, 0) => "N".to_string(),
            (MoveStyle::Letter, 1) => "R".to_string(),
            _ => movement.to_string(),
        }
    }
}

/// Header lines of [`tape_section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOptions {
    /// Print the range of the section.
    pub range: bool,
    /// Print the head position.
    pub head: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            range: true,
            head: true,
        }
    }
}

/// Options of [`rules_gml`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmlOptions {
    /// Add a `Tursi` section naming the start, break and end nodes.
    pub graph_attributes: bool,
    /// Add a `Tursi` section with read, write and move to every edge.
    pub edge_attributes: bool,
    /// Separates read, write and move in edge labels.
    pub delimiter: String,
    pub move_style: MoveStyle,
}

impl Default for GmlOptions {
    fn default() -> Self {
        Self {
            graph_attributes: true,
            edge_attributes: true,
            delimiter: " | ".to_string(),
            move_style: MoveStyle::Letter,
        }
    }
}

/// Renders `length` cells of `tape` starting at `start`.
///
/// The optional header is followed by two lines: the negative cells of the section and the
/// non-negative ones. Either line may be empty.
///
/// # Returns
///
/// * `Err(TuringMachineError::ExportError)` if `length < 1`.
pub fn tape_section(
    tape: &Tape,
    start: i64,
    length: i64,
    options: TextOptions,
) -> Result<String, TuringMachineError> {
    if length < 1 {
        return Err(TuringMachineError::ExportError(format!(
            "tape section length = {length}"
        )));
    }

    let mut header = Vec::new();
    if options.range {
        header.push(format!(
            "tape ({}, {}, {})",
            start,
            length,
            start + length - 1
        ));
    }
    if options.head {
        header.push(format!("head {}", tape.pos()));
    }

    let (negative, non_negative) = if start < 0 {
        let negative_len = length.min(-start);
        (
            tape.read_range(start, negative_len),
            tape.read_range(0, length - negative_len),
        )
    } else {
        (Vec::new(), tape.read_range(start, length))
    };

    let mut out = String::new();
    if !header.is_empty() {
        out.push_str(&header.join(", "));
        out.push('\n');
    }
    out.extend(negative);
    out.push('\n');
    out.extend(non_negative);
    out.push('\n');
    Ok(out)
}

/// Renders the retained entries of `history` as tab separated rows, oldest first.
pub fn history_tsv(history: &RingHistory, header: bool, moves: MoveStyle) -> String {
    let mut out = String::new();
    if header {
        out.push_str("step\tlast state\tread\twrite\tmove\tstate\n");
    }

    for (step, rule) in history.iter() {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            step,
            rule.trigger.state,
            rule.trigger.read,
            rule.action.write,
            moves.format(rule.action.movement),
            rule.action.next_state
        );
    }
    out
}

/// Renders the state graph of `rules` in GML.
///
/// Every state becomes a node, numbered in order of first appearance, and every rule an
/// edge labelled `read<delim>write<delim>move`.
pub fn rules_gml(
    rules: &[Rule],
    start: &str,
    breaks: &HashSet<String>,
    ends: &HashSet<String>,
    options: &GmlOptions,
) -> String {
    let nodes = node_ids(rules);
    let ids = |states: &HashSet<String>| {
        let mut ids: Vec<usize> = states
            .iter()
            .filter_map(|s| nodes.get(s.as_str()).copied())
            .collect();
        ids.sort_unstable();
        ids
    };

    let mut gml = Gml::default();
    gml.text("Creator", "Tursi");
    gml.open("graph");
    gml.number("directed", 1);

    let mut ordered: Vec<(&str, usize)> = nodes.iter().map(|(s, id)| (*s, *id)).collect();
    ordered.sort_unstable_by_key(|&(_, id)| id);
    for (state, id) in ordered {
        gml.open("node");
        gml.number("id", id as i64);
        gml.text("label", state);
        gml.close();
    }

    if options.graph_attributes {
        gml.open("Tursi");
        if let Some(&id) = nodes.get(start) {
            gml.number("start", id as i64);
        }
        gml.open("break");
        for id in ids(breaks) {
            gml.number("id", id as i64);
        }
        gml.close();
        gml.open("end");
        for id in ids(ends) {
            gml.number("id", id as i64);
        }
        gml.close();
        gml.close();
    }

    for rule in rules {
        let read = rule.trigger.read.to_string();
        let write = rule.action.write.to_string();
        let delim = &options.delimiter;

        gml.open("edge");
        gml.number("source", nodes[rule.trigger.state.as_str()] as i64);
        gml.number("target", nodes[rule.action.next_state.as_str()] as i64);
        gml.text(
            "label",
            &format!(
                "{read}{delim}{write}{delim}{}",
                options.move_style.format(rule.action.movement)
            ),
        );
        if options.edge_attributes {
            gml.open("Tursi");
            gml.text("read", &read);
            gml.text("write", &write);
            gml.number("move", rule.action.movement);
            gml.close();
        }
        gml.close();
    }

    gml.close();
    gml.out
}

/// Numbers all states in order of first appearance.
fn node_ids(rules: &[Rule]) -> HashMap<&str, usize> {
    let mut nodes = HashMap::new();
    for rule in rules {
        for state in [&rule.trigger.state, &rule.action.next_state] {
            let next = nodes.len();
            nodes.entry(state.as_str()).or_insert(next);
        }
    }
    nodes
}

/// Minimal GML writer with tab indentation.
#[derive(Default)]
struct Gml {
    out: String,
    depth: usize,
}

impl Gml {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push('\t');
        }
    }

    fn open(&mut self, name: &str) {
        self.indent();
        let _ = writeln!(self.out, "{name} [");
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str("]\n");
    }

    fn text(&mut self, name: &str, value: &str) {
        self.indent();
        let _ = writeln!(self.out, "{name} \"{}\"", escape(value));
    }

    fn number(&mut self, name: &str, value: i64) {
        self.indent();
        let _ = writeln!(self.out, "{name} {value}");
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
