//! Terminal console

use std::io::{self, BufRead, Write};

use hc05_core::wizard::Console;

/// Console on the process's stdin and stdout
pub struct StdConsole {
    stdin: io::Stdin,
    stdout: io::Stdout,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn say(&mut self, message: &str) {
        let mut out = self.stdout.lock();
        // Nothing useful to do if the terminal is gone
        let _ = writeln!(out, "{}", message);
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        {
            let mut out = self.stdout.lock();
            write!(out, "{}", prompt)?;
            out.flush()?;
        }

        let mut line = String::new();
        if self.stdin.lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
