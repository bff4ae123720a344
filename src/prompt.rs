//! Operator confirmation before replacing existing output.

use std::io::{self, BufRead, Write};

/// Decision provider for "replace existing file?" questions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Asks on stderr and reads one line from stdin. Defaults to no.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        if io::stderr().flush().is_err() {
            return false;
        }

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input).is_err() {
            return false;
        }
        is_yes(&input)
    }
}

/// Always answers yes (`--yes`).
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Always answers no.
#[cfg(test)]
pub struct AssumeNo;

#[cfg(test)]
impl Confirm for AssumeNo {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// Pick the prompt implementation for a `--yes` flag.
pub fn confirmer(assume_yes: bool) -> Box<dyn Confirm> {
    if assume_yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    }
}

/// Only an explicit `y` or `yes` counts; empty input is no.
fn is_yes(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    input == "y" || input == "yes"
}
