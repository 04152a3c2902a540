//! Script parsing
//!
//! A script is a line-oriented text file:
//!
//! ```text
//! // comment lines start with // or #
//! op   addr      data
//! wi   00000010  000000FF
//! ri   00000010
//! s    50
//! g    P0        1
//! ```
//!
//! Any run of non-word characters separates tokens, so `wi, 10 : FF` and
//! `wi 10 FF` are the same row. The first surviving line names the columns;
//! every later line is matched against those names by position.
//!
//! Problems in individual rows never stop parsing. They are collected as
//! [`Diagnostic`]s and the row becomes [`Command::Unknown`] (or, for extra
//! tokens, is converted from the known columns only).

use std::path::Path;
use std::slice;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::command::{Command, Record};
use crate::error::{Error, Result};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Non-fatal problem found while parsing a script
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// A data row has more tokens than the header has columns
    #[error(
        "line {line}: '{text}': {found} fields given, but {expected} expected (columns: {})",
        .columns.join(", ")
    )]
    ExtraColumns {
        /// 1-based line number
        line: usize,
        /// The offending line after normalization
        text: String,
        /// Number of tokens on the line
        found: usize,
        /// Number of header columns
        expected: usize,
        /// Header column names
        columns: Vec<String>,
    },

    /// The operation code is not one of `s`, `g`, `wi` or `ri`
    #[error("line {line}: unknown operation '{op}'")]
    UnknownOp {
        /// 1-based line number
        line: usize,
        /// The unrecognized code
        op: String,
    },

    /// A field the operation needs is absent from the row
    #[error("line {line}: operation '{op}' is missing field '{field}'")]
    MissingField {
        /// 1-based line number
        line: usize,
        /// Operation code (empty if the op field itself is missing)
        op: String,
        /// Missing column name
        field: &'static str,
    },

    /// A numeric operand could not be decoded
    #[error("line {line}: invalid {field} value '{value}' (expected {expected})")]
    InvalidOperand {
        /// 1-based line number
        line: usize,
        /// Column name
        field: &'static str,
        /// Raw token
        value: String,
        /// Expected format
        expected: &'static str,
    },
}

impl Diagnostic {
    /// Line the diagnostic refers to
    pub fn line(&self) -> usize {
        match self {
            Self::ExtraColumns { line, .. }
            | Self::UnknownOp { line, .. }
            | Self::MissingField { line, .. }
            | Self::InvalidOperand { line, .. } => *line,
        }
    }
}

/// Parsed script: commands in file order plus the diagnostics raised on the way
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    commands: Vec<Command>,
    diagnostics: Vec<Diagnostic>,
}

impl Script {
    /// Parse script text
    pub fn parse(text: &str) -> Self {
        let mut script = Script::default();
        let mut columns: Option<Vec<&str>> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.starts_with("//") || line.starts_with('#') {
                continue;
            }

            let normalized = NON_WORD.replace_all(line, " ");
            let tokens: Vec<&str> = normalized.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }

            let Some(cols) = columns.as_ref() else {
                log::debug!("Script columns: {}", tokens.join(", "));
                columns = Some(split_header(line));
                continue;
            };

            if tokens.len() > cols.len() {
                script.report(Diagnostic::ExtraColumns {
                    line: line_no,
                    text: tokens.join(" "),
                    found: tokens.len(),
                    expected: cols.len(),
                    columns: cols.iter().map(|c| c.to_string()).collect(),
                });
            }

            let record: Record<'_> = cols.iter().copied().zip(tokens.iter().copied()).collect();
            let command = match Command::from_record(&record, line_no) {
                Ok(cmd) => cmd,
                Err(diag) => {
                    script.report(diag);
                    Command::Unknown
                }
            };
            log::trace!("line {}: {}", line_no, command);
            script.commands.push(command);
        }

        script
    }

    /// Read and parse a script file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Script {
            path: path.to_path_buf(),
            source,
        })?;
        let script = Self::parse(&text);
        log::info!(
            "Loaded {} commands from {}",
            script.commands.len(),
            path.display()
        );
        Ok(script)
    }

    /// Commands in execution order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Diagnostics in line order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Iterate over the commands
    pub fn iter(&self) -> slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Number of commands (including unknown ones)
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if the script has no data rows
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn report(&mut self, diag: Diagnostic) {
        log::warn!("{}", diag);
        self.diagnostics.push(diag);
    }
}

impl<'a> IntoIterator for &'a Script {
    type Item = &'a Command;
    type IntoIter = slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Split the header line on non-word runs, borrowing from the input
fn split_header(line: &str) -> Vec<&str> {
    NON_WORD.split(line).filter(|s| !s.is_empty()).collect()
}
