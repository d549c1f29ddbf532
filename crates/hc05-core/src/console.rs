//! Operator console
//!
//! Prompts go through [`Console`] so the flow can be driven by a terminal or
//! by a script of canned answers.

use std::collections::VecDeque;
use std::io;

/// Line-oriented conversation with the operator
pub trait Console {
    /// Show a message
    fn say(&mut self, message: &str);

    /// Show `prompt` and read one line of input, without the line ending.
    ///
    /// End of input is an `UnexpectedEof` error.
    fn ask(&mut self, prompt: &str) -> io::Result<String>;
}

/// Ask a yes/no question. Empty input means yes.
pub fn confirm(console: &mut dyn Console, question: &str) -> io::Result<bool> {
    let answer = console.ask(&format!("{} (Y/n): ", question))?;
    Ok(is_yes(&answer))
}

/// Interpret a yes/no answer, defaulting to yes
pub fn is_yes(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer.is_empty() || answer == "y" || answer == "yes"
}

/// Ask for a value, returning `default` on empty input
pub fn ask_with_default(
    console: &mut dyn Console,
    label: &str,
    default: &str,
) -> io::Result<String> {
    let answer = console.ask(&format!("{} [{}]: ", label, default))?;
    let answer = answer.trim();
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer.to_string())
    }
}

/// Console fed from a fixed list of answers, recording what was shown
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    output: Vec<String>,
    prompts: Vec<String>,
}

impl ScriptedConsole {
    /// Create a console that answers prompts in order
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            output: Vec::new(),
            prompts: Vec::new(),
        }
    }

    /// Messages shown so far
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Prompts asked so far
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Answers not yet consumed
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Console for ScriptedConsole {
    fn say(&mut self, message: &str) {
        self.output.push(message.to_string());
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more answers"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_default() {
        assert!(is_yes(""));
        assert!(is_yes("  "));
        assert!(is_yes("Y"));
        assert!(is_yes("yes"));
        assert!(!is_yes("n"));
        assert!(!is_yes("no"));
        assert!(!is_yes("maybe"));
    }

    #[test]
    fn test_confirm_prompt_text() {
        let mut console = ScriptedConsole::new(["n"]);
        assert!(!confirm(&mut console, "Retry module?").unwrap());
        assert_eq!(console.prompts(), ["Retry module? (Y/n): "]);
    }

    #[test]
    fn test_ask_with_default() {
        let mut console = ScriptedConsole::new(["", "  Beacon  "]);
        assert_eq!(
            ask_with_default(&mut console, "New module name", "HC-05").unwrap(),
            "HC-05"
        );
        assert_eq!(
            ask_with_default(&mut console, "New module name", "HC-05").unwrap(),
            "Beacon"
        );
        assert_eq!(console.prompts()[0], "New module name [HC-05]: ");
    }

    #[test]
    fn test_exhausted_script_is_eof() {
        let mut console = ScriptedConsole::new(Vec::<String>::new());
        let err = console.ask("Select port number: ").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
