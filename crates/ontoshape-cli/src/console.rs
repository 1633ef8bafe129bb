//! Terminal operator for `generate --interactive`.
//!
//! By default we use `rustyline` for line editing and history.
//! A minimal stdin-based fallback exists behind `--no-default-features`.

use colored::Colorize;
use ontoshape_core::Operator;
use std::io;

#[cfg(not(feature = "repl-rustyline"))]
use ontoshape_core::LineOperator;

pub struct ConsoleOperator {
    #[cfg(feature = "repl-rustyline")]
    editor: rustyline::DefaultEditor,
    #[cfg(not(feature = "repl-rustyline"))]
    lines: LineOperator<io::StdinLock<'static>, io::Stderr>,
}

impl ConsoleOperator {
    #[cfg(feature = "repl-rustyline")]
    pub fn new() -> io::Result<Self> {
        let editor = rustyline::DefaultEditor::with_config(editor_config())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("failed to init rustyline: {e}")))?;
        Ok(Self { editor })
    }

    #[cfg(not(feature = "repl-rustyline"))]
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            lines: LineOperator::new(io::stdin().lock(), io::stderr()),
        })
    }

    pub fn banner(&mut self) {
        eprintln!("{}", "ontoshape refinement".green().bold());
        eprintln!("Answer y or n. Type `exit` to stop refining.\n");
    }
}

/// Prompts are written to the terminal device, not stdout.
#[cfg(feature = "repl-rustyline")]
fn editor_config() -> rustyline::Config {
    rustyline::Config::builder()
        .behavior(rustyline::config::Behavior::PreferTerm)
        .build()
}

impl Operator for ConsoleOperator {
    #[cfg(feature = "repl-rustyline")]
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        use rustyline::error::ReadlineError;

        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor
                        .add_history_entry(line.as_str())
                        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => Ok(None),
            Err(ReadlineError::Io(err)) => Err(err),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, format!("readline error: {e}"))),
        }
    }

    #[cfg(not(feature = "repl-rustyline"))]
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.lines.read_line(&prompt.cyan().bold().to_string())
    }

    fn notify(&mut self, message: &str) -> io::Result<()> {
        eprintln!("{}", message.yellow());
        Ok(())
    }
}
