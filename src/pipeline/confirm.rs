use console::Term;
use indicatif::ProgressBar;
use std::io::{self, BufRead};

/// Yes/no decision from the operator.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Whether an operator reply counts as yes.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Asks on the terminal and reads one line from stdin.
///
/// End of input or a read error counts as "no".
#[derive(Default)]
pub struct ConsoleConfirm {
    spinner: Option<ProgressBar>,
}

impl ConsoleConfirm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide `spinner` while waiting for the answer.
    pub fn with_spinner(mut self, spinner: ProgressBar) -> Self {
        self.spinner = Some(spinner);
        self
    }

    fn ask(prompt: &str) -> bool {
        let term = Term::stderr();
        if term.write_str(prompt).and_then(|_| term.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => is_affirmative(&answer),
        }
    }
}

impl Confirm for ConsoleConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(|| Self::ask(prompt)),
            None => Self::ask(prompt),
        }
    }
}
