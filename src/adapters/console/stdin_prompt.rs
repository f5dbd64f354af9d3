//! Line Prompt - `Prompt` over any reader/writer pair.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use anyhow::Context;

use crate::ports::prompt::Prompt;

/// Prints questions to `out` and reads answers line by line from `input`.
pub struct LinePrompt<R: BufRead, W: Write> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.out)
    }
}

impl LinePrompt<BufReader<Stdin>, Stdout> {
    /// Prompt bound to the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn ask(&mut self, question: &str) -> anyhow::Result<Option<String>> {
        write!(self.out, "{question}")?;
        self.out.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read from input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn notify(&mut self, message: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{message}")?;
        Ok(())
    }
}
