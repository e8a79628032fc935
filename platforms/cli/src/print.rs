//! Print selection of the console runner.
//!
//! A print argument has the form `<GROUPS>=<OPTIONS>`. Groups are `e` (end states), `b`
//! (break states), `o` (other states) and `<n>` (every n-th step). Options are `s` (step
//! count and state), `t` (tape) and `r` (rule taken by the step).

use std::collections::BTreeMap;

/// What to print for a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrintOptions {
    pub state: bool,
    pub tape: bool,
    pub rule: bool,
}

impl PrintOptions {
    pub fn or(self, other: PrintOptions) -> PrintOptions {
        PrintOptions {
            state: self.state || other.state,
            tape: self.tape || other.tape,
            rule: self.rule || other.rule,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    End,
    Break,
    Other,
    Every(u64),
}

/// A parsed `<GROUPS>=<OPTIONS>` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintSpec {
    pub groups: Vec<Group>,
    pub options: PrintOptions,
}

impl PrintSpec {
    pub fn parse(arg: &str) -> Result<Self, String> {
        let illegal = || format!("Illegal print option: {arg}");
        let (groups, options) = arg.split_once('=').ok_or_else(illegal)?;

        let mut parsed = Vec::new();
        let mut digits = String::new();
        let flush = |digits: &mut String, parsed: &mut Vec<Group>| -> Result<(), String> {
            if !digits.is_empty() {
                parsed.push(Group::Every(digits.parse().map_err(|_| illegal())?));
                digits.clear();
            }
            Ok(())
        };
        for c in groups.chars() {
            if c.is_ascii_digit() {
                if digits.is_empty() && c == '0' {
                    return Err(illegal());
                }
                digits.push(c);
                continue;
            }
            flush(&mut digits, &mut parsed)?;
            match c {
                'e' => parsed.push(Group::End),
                'b' => parsed.push(Group::Break),
                'o' => parsed.push(Group::Other),
                _ => return Err(illegal()),
            }
        }
        flush(&mut digits, &mut parsed)?;
        if parsed.is_empty() {
            return Err(illegal());
        }

        let mut opts = PrintOptions::default();
        for c in options.chars() {
            match c {
                's' => opts.state = true,
                't' => opts.tape = true,
                'r' => opts.rule = true,
                _ => return Err(illegal()),
            }
        }

        Ok(Self {
            groups: parsed,
            options: opts,
        })
    }
}

/// Print options per group. Later arguments override earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintPlan {
    end: PrintOptions,
    brk: PrintOptions,
    other: PrintOptions,
    intervals: BTreeMap<u64, PrintOptions>,
}

impl Default for PrintPlan {
    fn default() -> Self {
        Self {
            end: PrintOptions {
                state: true,
                tape: true,
                rule: false,
            },
            brk: PrintOptions {
                state: true,
                ..PrintOptions::default()
            },
            other: PrintOptions::default(),
            intervals: BTreeMap::new(),
        }
    }
}

impl PrintPlan {
    pub fn new(specs: &[PrintSpec]) -> Self {
        let mut plan = Self::default();
        for spec in specs {
            for group in &spec.groups {
                match *group {
                    Group::End => plan.end = spec.options,
                    Group::Break => plan.brk = spec.options,
                    Group::Other => plan.other = spec.options,
                    Group::Every(n) => {
                        plan.intervals.insert(n, spec.options);
                    }
                }
            }
        }
        plan
    }

    /// Options for a step: end beats break beats other, OR-ed with every matching interval.
    pub fn select(&self, end_state: bool, break_state: bool, step: u64) -> PrintOptions {
        let base = if end_state {
            self.end
        } else if break_state {
            self.brk
        } else {
            self.other
        };

        self.intervals
            .iter()
            .filter(|(n, _)| step % **n == 0)
            .fold(base, |acc, (_, opts)| acc.or(*opts))
    }
}
