//! Error types for script loading and parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or parsing a replay script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Failed to read the script file
    #[error("failed to read script '{path}': {source}")]
    ReadFile {
        /// Path of the script that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read the script from stdin
    #[error("failed to read script from stdin: {0}")]
    ReadStdin(#[source] std::io::Error),

    /// First word of a line is not a known command
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand {
        /// 1-based line number.
        line: usize,
        /// The unrecognized word.
        command: String,
    },

    /// A required argument is absent
    #[error("line {line}: '{command}' is missing its {argument} argument")]
    MissingArgument {
        /// 1-based line number.
        line: usize,
        /// Command being parsed.
        command: &'static str,
        /// Name of the absent argument.
        argument: &'static str,
    },

    /// An argument could not be parsed
    #[error("line {line}: invalid {argument} '{value}'")]
    InvalidArgument {
        /// 1-based line number.
        line: usize,
        /// Name of the argument.
        argument: &'static str,
        /// Text that failed to parse.
        value: String,
    },

    /// More arguments than the command takes
    #[error("line {line}: unexpected argument '{value}' after '{command}'")]
    UnexpectedArgument {
        /// 1-based line number.
        line: usize,
        /// Command being parsed.
        command: &'static str,
        /// First surplus word.
        value: String,
    },
}

impl ScriptError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScriptError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Line the error refers to, if it came from parsing.
    pub fn line(&self) -> Option<usize> {
        match self {
            ScriptError::ReadFile { .. } | ScriptError::ReadStdin(_) => None,
            ScriptError::UnknownCommand { line, .. }
            | ScriptError::MissingArgument { line, .. }
            | ScriptError::InvalidArgument { line, .. }
            | ScriptError::UnexpectedArgument { line, .. } => Some(*line),
        }
    }
}
