//! This module provides the `ProgramLoader` struct, responsible for loading Turing Machine
//! programs from various sources, including files and strings.

use crate::parser::parse;
use crate::types::{Program, TuringMachineError, PROGRAM_EXTENSION};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `ProgramLoader` is a utility struct for loading Turing Machine programs.
/// It provides methods to load programs from individual files, from string content or
/// readers, and to discover and load all `.tm` files within a specified directory.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a single Turing Machine program from the specified file path.
    ///
    /// # Arguments
    ///
    /// * `path` - A reference to the `Path` of the program file to load.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the file is successfully read and parsed into a `Program`.
    /// * `Err(TuringMachineError::FileError)` if the file cannot be read.
    /// * `Err(TuringMachineError::ParseError)` if the file content is not a valid program.
    pub fn load_program(path: &Path) -> Result<Program, TuringMachineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            TuringMachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "loading program");
        parse(&content)
    }

    /// Loads a single Turing Machine program from the provided string content.
    ///
    /// This is useful for parsing programs that are not stored in files, e.g., from user input.
    ///
    /// # Arguments
    ///
    /// * `content` - A string slice containing the Turing Machine program definition.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the content is successfully parsed into a `Program`.
    /// * `Err(TuringMachineError::ParseError)` if the content is not a valid program.
    pub fn load_program_from_string(content: &str) -> Result<Program, TuringMachineError> {
        parse(content)
    }

    /// Reads a program from `reader` until EOF, e.g. from standard input.
    pub fn load_program_from_reader(mut reader: impl Read) -> Result<Program, TuringMachineError> {
        let mut content = String::new();
        reader.read_to_string(&mut content).map_err(|e| {
            TuringMachineError::FileError(format!("Failed to read program: {}", e))
        })?;

        parse(&content)
    }

    /// Loads all valid Turing Machine program files (`.tm` extension) from a given directory.
    ///
    /// It iterates through the directory, attempts to load each `.tm` file, and collects
    /// the results. Directories and files with another extension are skipped.
    ///
    /// # Arguments
    ///
    /// * `directory` - A reference to the `Path` of the directory to scan for programs.
    ///
    /// # Returns
    ///
    /// * `Vec<Result<(PathBuf, Program), TuringMachineError>>` - A vector where each element
    ///   is a `Result` indicating whether a program was successfully loaded (containing its
    ///   path and the `Program` itself) or if an error occurred during loading (containing
    ///   a `TuringMachineError`).
    pub fn load_programs(directory: &Path) -> Vec<Result<(PathBuf, Program), TuringMachineError>> {
        if !directory.exists() {
            return vec![Err(TuringMachineError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(TuringMachineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(TuringMachineError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();

                if path.is_dir() || path.extension().is_none_or(|ext| ext != PROGRAM_EXTENSION) {
                    return None;
                }

                match Self::load_program(&path) {
                    Ok(program) => Some(Ok((path, program))),
                    Err(e) => Some(Err(TuringMachineError::FileError(format!(
                        "Failed to load program from {}: {}",
                        path.display(),
                        e
                    )))),
                }
            })
            .collect()
    }
}
