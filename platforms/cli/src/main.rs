mod print;

use clap::Parser;
use print::{PrintPlan, PrintSpec};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tursi::export::{self, GmlOptions, MoveStyle, TextOptions};
use tursi::history::{History, RingHistory, SingleHistory};
use tursi::machine::{Machine, Step};
use tursi::types::{Diagnostic, Program, Rule, Trigger, TuringMachineError};
use tursi::{ProgramLoader, Tape};

/// Capacity of the ring history when only `--export-history` asks for one.
const DEFAULT_HISTORY: usize = 1000;

/// Runs a Turing machine program in the console.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "PRINT GROUPS:
  e    end states          s    step count and state
  b    break states        t    tape
  o    other states        r    rule taken by the step
  <n>  every n-th step

EXAMPLES:
  tursi-cli increment.tm -p o=s -p 10=t
  cat increment.tm | tursi-cli --max-steps 5000")]
struct Cli {
    /// Path to a Turing machine program file (.tm).
    /// Can also pipe program content via stdin.
    program_file: Option<PathBuf>,

    /// What to print for which steps, as <GROUPS>=<OPTIONS>. Can be repeated.
    #[clap(short, long = "print", value_name = "GROUPS=OPTIONS", value_parser = PrintSpec::parse)]
    print: Vec<PrintSpec>,

    /// Stop after this many steps.
    #[clap(long, value_name = "N")]
    max_steps: Option<u64>,

    /// Keep the last N steps instead of only the most recent one.
    #[clap(long, value_name = "N")]
    history: Option<usize>,

    /// Write the visited part of the tape to a file after the run.
    #[clap(long, value_name = "PATH")]
    export_tape: Option<PathBuf>,

    /// Write the kept steps as tab separated values after the run.
    #[clap(long, value_name = "PATH")]
    export_history: Option<PathBuf>,

    /// Write the state graph of the rules as GML.
    #[clap(long, value_name = "PATH")]
    export_graph: Option<PathBuf>,

    /// Print the parsed program as JSON and exit.
    #[clap(long)]
    inspect: bool,
}

#[derive(Debug, Error)]
enum Failure {
    #[error("{0}")]
    Arguments(String),
    #[error("{0}")]
    Io(String),
    #[error("Couldn't parse file: {}", .error.message)]
    Parse {
        error: Diagnostic,
        warnings: Vec<Diagnostic>,
    },
    #[error("Couldn't find rule for state '{}', read '{}'.", .0.state, .0.read)]
    NoRule(Trigger),
    #[error("Stopped after {0} steps without reaching an end state.")]
    StepLimit(u64),
    #[error("Rule '{0}' moves the head off the tape.")]
    OutOfTape(Rule),
}

impl Failure {
    fn exit_code(&self) -> i32 {
        match self {
            Failure::Arguments(_) => 2,
            Failure::Io(_) => 3,
            Failure::Parse { .. } => 4,
            Failure::NoRule(_) => 5,
            Failure::StepLimit(_) => 6,
            Failure::OutOfTape(_) => 7,
        }
    }
}

impl From<io::Error> for Failure {
    fn from(e: io::Error) -> Self {
        Failure::Io(e.to_string())
    }
}

impl From<TuringMachineError> for Failure {
    fn from(e: TuringMachineError) -> Self {
        match e {
            TuringMachineError::ParseError { error, warnings } => Failure::Parse { error, warnings },
            TuringMachineError::FileError(message) => Failure::Io(message),
            other => Failure::Arguments(other.to_string()),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(failure) = execute(&cli) {
        match &failure {
            Failure::Parse { error, warnings } => print_diagnostics(Some(error), warnings),
            other => eprintln!("{}", other),
        }
        std::process::exit(failure.exit_code());
    }
}

fn execute(cli: &Cli) -> Result<(), Failure> {
    let program = load_program(cli)?;
    print_diagnostics(None, &program.warnings);

    if cli.inspect {
        let json = serde_json::to_string_pretty(&program)
            .map_err(|e| Failure::Io(format!("Failed to serialize program: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    if let Some(path) = &cli.export_graph {
        let gml = export::rules_gml(
            &program.rules,
            program.start_state_or_default(),
            &program.break_states,
            &program.end_states,
            &GmlOptions::default(),
        );
        write_file(path, &gml)?;
    }

    let plan = PrintPlan::new(&cli.print);
    let capacity = cli
        .history
        .or(cli.export_history.as_ref().map(|_| DEFAULT_HISTORY));

    match capacity {
        Some(capacity) => {
            let history = RingHistory::new(capacity)?;
            let mut machine = program.build_machine(history)?;
            let outcome = Console::new(&plan, cli.max_steps).run(&mut machine);
            if let Some(path) = &cli.export_history {
                let tsv = export::history_tsv(machine.history(), true, MoveStyle::Letter);
                write_file(path, &tsv)?;
            }
            export_tape(cli, machine.tape())?;
            outcome
        }
        None => {
            let mut machine = program.build_machine(SingleHistory::new())?;
            let outcome = Console::new(&plan, cli.max_steps).run(&mut machine);
            export_tape(cli, machine.tape())?;
            outcome
        }
    }
}

/// Loads the program from the given file, or from stdin if it is piped.
fn load_program(cli: &Cli) -> Result<Program, Failure> {
    if let Some(path) = &cli.program_file {
        Ok(ProgramLoader::load_program(path)?)
    } else if atty::isnt(atty::Stream::Stdin) {
        Ok(ProgramLoader::load_program_from_reader(io::stdin().lock())?)
    } else {
        Err(Failure::Arguments(
            "No program file specified. Use '--help' for help.".to_string(),
        ))
    }
}

fn export_tape(cli: &Cli, tape: &Tape) -> Result<(), Failure> {
    let Some(path) = &cli.export_tape else {
        return Ok(());
    };

    let length = tape.rightmost() - tape.leftmost() + 1;
    let text = export::tape_section(tape, tape.leftmost(), length, TextOptions::default())?;
    write_file(path, &text)
}

fn write_file(path: &Path, content: &str) -> Result<(), Failure> {
    debug!(path = %path.display(), "exporting");
    fs::write(path, content)
        .map_err(|e| Failure::Io(format!("Failed to write file {}: {}", path.display(), e)))
}

/// Prints a summary line and one row per diagnostic to stderr.
fn print_diagnostics(error: Option<&Diagnostic>, warnings: &[Diagnostic]) {
    if error.is_none() && warnings.is_empty() {
        return;
    }

    let plural = if warnings.len() == 1 { "" } else { "s" };
    match error {
        Some(_) => eprintln!(
            "Couldn't parse file due to 1 error and {} warning{}.",
            warnings.len(),
            plural
        ),
        None => eprintln!("File parsed with {} warning{}.", warnings.len(), plural),
    }

    if let Some(error) = error {
        eprintln!("{}", diagnostic_row("error   ", error));
    }
    for warning in warnings {
        eprintln!("{}", diagnostic_row("warning ", warning));
    }
}

fn diagnostic_row(kind: &str, diagnostic: &Diagnostic) -> String {
    match diagnostic.line {
        Some(line) => format!("{}(line {:4}): {}", kind, line, diagnostic.message),
        None => format!("{}           : {}", kind, diagnostic.message),
    }
}

/// Steps a machine until it reaches an end state and prints what the plan selects.
struct Console<'a> {
    plan: &'a PrintPlan,
    max_steps: Option<u64>,
    out: BufWriter<io::Stdout>,
}

impl<'a> Console<'a> {
    fn new(plan: &'a PrintPlan, max_steps: Option<u64>) -> Self {
        Self {
            plan,
            max_steps,
            out: BufWriter::new(io::stdout()),
        }
    }

    fn run<H: History>(&mut self, machine: &mut Machine<H>) -> Result<(), Failure> {
        while !machine.in_end_state() {
            let steps = machine.history().steps();
            if self.max_steps.is_some_and(|limit| steps >= limit) {
                self.out.flush()?;
                return Err(Failure::StepLimit(steps));
            }

            let options = self.plan.select(false, machine.in_break_state(), steps);
            if options.state {
                self.print_state(machine)?;
            }
            if options.tape {
                self.print_tape(machine.tape())?;
            }

            match machine.step() {
                Step::Continue { .. } => {}
                Step::NoRule(trigger) => {
                    self.out.flush()?;
                    return Err(Failure::NoRule(trigger));
                }
                Step::OutOfTape(rule) => {
                    self.out.flush()?;
                    return Err(Failure::OutOfTape(rule));
                }
            }

            if options.rule {
                if let Some(rule) = machine.history().last() {
                    self.print_rule(rule)?;
                }
            }
            self.out.flush()?;
        }

        let steps = machine.history().steps();
        info!(steps, state = machine.state(), "machine halted");
        let options = self.plan.select(true, false, steps);
        if options.state {
            self.print_state(machine)?;
        }
        if options.tape {
            self.print_tape(machine.tape())?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn print_state<H: History>(&mut self, machine: &Machine<H>) -> io::Result<()> {
        writeln!(self.out, "{}\t{}", machine.history().steps(), machine.state())
    }

    fn print_tape(&mut self, tape: &Tape) -> io::Result<()> {
        let (left, right) = (tape.leftmost(), tape.rightmost());
        writeln!(
            self.out,
            "\ttape ({}, {}, {}), head {}",
            left,
            right - left + 1,
            right,
            tape.pos()
        )?;
        let negative: String = tape.read_range(left, -left).into_iter().collect();
        let non_negative: String = tape.read_range(0, right + 1).into_iter().collect();
        writeln!(self.out, "\t{}", negative)?;
        writeln!(self.out, "\t{}", non_negative)
    }

    fn print_rule(&mut self, rule: &Rule) -> io::Result<()> {
        writeln!(
            self.out,
            "\t{}\t{}\t{}\t{}\t{}",
            rule.trigger.state,
            rule.trigger.read,
            rule.action.write,
            MoveStyle::Letter.format(rule.action.movement),
            rule.action.next_state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from([
            "tursi-cli",
            "increment.tm",
            "-p",
            "o=s",
            "--print",
            "10=t",
            "--max-steps",
            "50",
            "--history",
            "8",
        ])
        .unwrap();

        assert_eq!(cli.program_file, Some(PathBuf::from("increment.tm")));
        assert_eq!(cli.print.len(), 2);
        assert_eq!(cli.max_steps, Some(50));
        assert_eq!(cli.history, Some(8));
        assert!(!cli.inspect);
    }

    #[test]
    fn test_cli_rejects_illegal_print_option() {
        assert!(Cli::try_parse_from(["tursi-cli", "a.tm", "-p", "x=s"]).is_err());
    }

    #[test]
    fn test_diagnostic_rows() {
        assert_eq!(
            diagnostic_row("warning ", &Diagnostic::new("Oops.", Some(12))),
            "warning (line   12): Oops."
        );
        assert_eq!(
            diagnostic_row("error   ", &Diagnostic::new("Oops.", None)),
            "error              : Oops."
        );
    }

    #[test]
    fn test_failure_exit_codes() {
        let parse = TuringMachineError::ParseError {
            error: Diagnostic::new("bad", Some(1)),
            warnings: Vec::new(),
        };
        assert_eq!(Failure::from(parse).exit_code(), 4);
        assert_eq!(
            Failure::from(TuringMachineError::FileError("gone".to_string())).exit_code(),
            3
        );
        assert_eq!(Failure::NoRule(Trigger::new("A", '0')).exit_code(), 5);
        assert_eq!(Failure::StepLimit(10).exit_code(), 6);
        let rule = Rule::new("A", '0', '1', 1, "B").unwrap();
        assert_eq!(Failure::OutOfTape(rule).exit_code(), 7);
    }
}
