use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Context, Result};

use super::schema::{OptionKind, OptionSchema, Rule};
use super::{OptionValue, ParsedOptions};

/// Interactive source of missing option values
pub trait Prompter {
    /// Ask the user to pick one of `choices`, returning its index
    fn choose(&mut self, message: &str, choices: &[&str]) -> Result<usize>;

    /// Ask the user for a free-form value
    fn input(&mut self, message: &str) -> Result<String>;
}

/// Prompter reading answers from stdin and writing questions to stderr
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn read_line(&self) -> Result<String> {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read answer from stdin")?;
        Ok(line.trim().to_string())
    }
}

impl Prompter for TerminalPrompter {
    fn choose(&mut self, message: &str, choices: &[&str]) -> Result<usize> {
        let mut stderr = io::stderr();
        writeln!(stderr, "{}", message)?;
        for (i, choice) in choices.iter().enumerate() {
            writeln!(stderr, "  {}) {}", i + 1, choice)?;
        }
        write!(stderr, "> ")?;
        stderr.flush()?;

        let answer = self.read_line()?;
        answer
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=choices.len()).contains(n))
            .map(|n| n - 1)
            .ok_or_else(|| anyhow!("'{}' is not a valid choice", answer))
    }

    fn input(&mut self, message: &str) -> Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{}: ", message)?;
        stderr.flush()?;
        self.read_line()
    }
}

/// Ask for the missing member of every "exactly one of" group.
///
/// Groups that already have at least one member are left to the validator.
pub fn fill_missing(
    schema: &OptionSchema,
    options: &mut ParsedOptions,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    for rule in schema.rules {
        let Rule::ExactlyOneOf(names) = rule else {
            continue;
        };
        if names.iter().any(|n| options.contains(n)) {
            continue;
        }

        let index = prompter.choose(
            &format!("Please specify one of the following options for {}", schema.name()),
            names,
        )?;
        let name = *names
            .get(index)
            .ok_or_else(|| anyhow!("Choice {} is out of range", index + 1))?;
        let value = match schema.option(name).map(|spec| spec.kind) {
            Some(OptionKind::Flag) => OptionValue::Bool(true),
            Some(OptionKind::Number { .. }) => {
                let raw = prompter.input(&format!("Value for {}", name))?;
                match raw.parse::<i64>() {
                    Ok(n) => OptionValue::from(n),
                    Err(_) => OptionValue::String(raw),
                }
            }
            _ => OptionValue::String(prompter.input(&format!("Value for {}", name))?),
        };
        tracing::debug!(option = name, "value supplied interactively");
        options.insert(name, value);
    }
    Ok(())
}
