// Interactive questions, for the values not given on the command line.

use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::report::*;

pub struct Prompter {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl Prompter {
    pub fn new(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Prompter {
        Prompter { input, output }
    }

    pub fn stdio() -> Prompter {
        Prompter::new(Box::new(BufReader::new(io::stdin())), Box::new(io::stdout()))
    }

    /// Asks until a non-blank line is given. The answer is trimmed.
    pub fn ask(&mut self, question: &str) -> ReportResult<String> {
        loop {
            write!(self.output, "{}", question).context(PromptSnafu {})?;
            self.output.flush().context(PromptSnafu {})?;
            let mut line = String::new();
            let n = self.input.read_line(&mut line).context(PromptSnafu {})?;
            ensure!(n > 0, PromptClosedSnafu {});
            let answer = line.trim();
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }
        }
    }

    /// Asks for a file name until it names an existing file.
    pub fn ask_existing_file(
        &mut self,
        question: &str,
        to_path: impl Fn(&str) -> PathBuf,
    ) -> ReportResult<PathBuf> {
        loop {
            let answer = self.ask(question)?;
            let p = to_path(&answer);
            if p.is_file() {
                return Ok(p);
            }
            debug!("ask_existing_file: {:?} does not exist", p);
            writeln!(self.output, "Arquivo não encontrado: {}", p.display())
                .context(PromptSnafu {})?;
        }
    }
}
