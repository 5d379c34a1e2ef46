//! Feature description input
//!
//! The task comes from the command line when given, otherwise the operator
//! is prompted for a single line on stdin.

use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Prompt shown when no task was given on the command line
pub const TASK_PROMPT: &str = "Give description to the new feature: ";

/// Errors while obtaining the task text
#[derive(Error, Debug)]
pub enum TaskInputError {
    #[error("Feature description is empty")]
    Empty,

    #[error("Failed to read feature description: {0}")]
    Io(#[from] io::Error),
}

/// Obtains the operator's feature description
pub struct TaskPrompt;

impl TaskPrompt {
    /// Use `arg` if present, otherwise prompt on the process's stdin/stdout.
    pub fn resolve(arg: Option<String>) -> Result<String, TaskInputError> {
        match arg {
            Some(task) => Self::validate(task),
            None => {
                let stdin = io::stdin();
                let mut stdout = io::stdout();
                Self::read(&mut stdin.lock(), &mut stdout)
            }
        }
    }

    /// Write the prompt to `output` and read one line from `input`.
    pub fn read<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String, TaskInputError> {
        write!(output, "{}", TASK_PROMPT)?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        Self::validate(line)
    }

    fn validate(task: String) -> Result<String, TaskInputError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(TaskInputError::Empty);
        }
        Ok(task.to_string())
    }
}
