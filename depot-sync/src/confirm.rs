//! Confirmation gate between diff and download.

use std::io::{BufRead, Write};

use crate::error::SyncError;
use crate::reconcile::ChangeSet;

/// Asks whether a change set may be applied.
pub trait Confirm {
    /// `Ok(false)` cancels the sync with nothing mutated.
    fn confirm(&mut self, changes: &ChangeSet) -> Result<bool, SyncError>;
}

/// Always proceeds. Used for `--force`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _changes: &ChangeSet) -> Result<bool, SyncError> {
        Ok(true)
    }
}

/// Line-oriented `[y/n]` prompt.
///
/// Accepts exactly `y`/`Y` or `n`/`N`; anything else re-prompts. End of input
/// is treated as `n`.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for LinePrompt<R, W> {
    fn confirm(&mut self, changes: &ChangeSet) -> Result<bool, SyncError> {
        loop {
            write!(
                self.output,
                "Apply {} download(s) and {} deletion(s)? [y/n] ",
                changes.download_set().len(),
                changes.delete_set().len()
            )
            .map_err(SyncError::Prompt)?;
            self.output.flush().map_err(SyncError::Prompt)?;

            let mut line = String::new();
            if self.input.read_line(&mut line).map_err(SyncError::Prompt)? == 0 {
                writeln!(self.output).map_err(SyncError::Prompt)?;
                return Ok(false);
            }
            match line.trim_end_matches(['\r', '\n']) {
                "y" | "Y" => return Ok(true),
                "n" | "N" => return Ok(false),
                _ => {}
            }
        }
    }
}
