use clap::ValueEnum;

use super::schema::{OptionKind, OptionSchema};
use super::{OptionValue, ParsedOptions};
use crate::cli::OutputFormat;
use crate::error::{CommandError, CommandResult};

/// Global options that may appear anywhere among a command's arguments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    pub output: Option<OutputFormat>,
    pub debug: bool,
    pub verbose: bool,
}

impl GlobalArgs {
    /// Combine with flags clap already parsed before the command path
    pub fn merge(self, other: GlobalArgs) -> GlobalArgs {
        GlobalArgs {
            output: self.output.or(other.output),
            debug: self.debug || other.debug,
            verbose: self.verbose || other.verbose,
        }
    }

    /// Look for `--debug`/`--verbose` anywhere on the command line, before
    /// the command's own arguments are parsed. Used to set up logging.
    pub fn scan<S: AsRef<str>>(args: &[S]) -> GlobalArgs {
        let mut globals = GlobalArgs::default();
        let mut tokens = args.iter().map(AsRef::<str>::as_ref).peekable();
        while let Some(token) = tokens.next() {
            let (name, inline) = match token.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (token, None),
            };
            if name != "--debug" && name != "--verbose" {
                continue;
            }
            let enabled = match inline {
                Some(raw) => parse_bool(raw).unwrap_or(true),
                None => tokens.peek().and_then(|next| parse_bool(next)).unwrap_or(true),
            };
            if name == "--debug" {
                globals.debug = enabled;
            } else {
                globals.verbose = enabled;
            }
        }
        globals
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse raw `--name value` tokens into an option bag guided by `schema`.
///
/// Global options are split off and never end up in the bag.
pub fn parse_args(
    schema: &OptionSchema,
    args: &[String],
) -> CommandResult<(ParsedOptions, GlobalArgs)> {
    let mut options = ParsedOptions::new();
    let mut globals = GlobalArgs::default();
    let mut tokens = args.iter().peekable();

    while let Some(token) = tokens.next() {
        let Some(stripped) = token.strip_prefix("--") else {
            return Err(CommandError::validation(format!(
                "Unexpected argument '{}'. Options must be passed as --name value",
                token
            )));
        };
        let (name, inline) = match stripped.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (stripped, None),
        };
        if name.is_empty() {
            return Err(CommandError::validation(format!(
                "Unexpected argument '{}'",
                token
            )));
        }

        // Takes the next token as the value unless it is another option
        let mut take_value = |required: bool| -> CommandResult<Option<String>> {
            if inline.is_some() {
                return Ok(inline.clone());
            }
            match tokens.peek() {
                Some(next) if !next.starts_with("--") => Ok(tokens.next().cloned()),
                _ if required => Err(CommandError::validation(format!(
                    "Option --{} requires a value",
                    name
                ))),
                _ => Ok(None),
            }
        };

        match name {
            "output" => {
                let raw = take_value(true)?.unwrap_or_default();
                let format = OutputFormat::from_str(&raw, true).map_err(|_| {
                    CommandError::validation(format!(
                        "{} is not a valid value for option output. Allowed values are json, text",
                        raw
                    ))
                })?;
                globals.output = Some(format);
                continue;
            }
            "debug" | "verbose" => {
                let enabled = match inline.as_deref() {
                    Some(raw) => parse_bool(raw).unwrap_or(true),
                    None => match tokens.peek().and_then(|next| parse_bool(next)) {
                        Some(value) => {
                            tokens.next();
                            value
                        }
                        None => true,
                    },
                };
                if name == "debug" {
                    globals.debug = enabled;
                } else {
                    globals.verbose = enabled;
                }
                continue;
            }
            _ => {}
        }

        if options.contains(name) {
            return Err(CommandError::validation(format!(
                "Option --{} was specified more than once",
                name
            )));
        }

        let value = match schema.option(name).map(|spec| spec.kind) {
            Some(OptionKind::Flag) => match inline.as_deref() {
                Some(raw) => parse_bool(raw)
                    .map(OptionValue::Bool)
                    .unwrap_or_else(|| OptionValue::String(raw.to_string())),
                None => match tokens.peek().and_then(|next| parse_bool(next)) {
                    Some(value) => {
                        tokens.next();
                        OptionValue::Bool(value)
                    }
                    None => OptionValue::Bool(true),
                },
            },
            Some(OptionKind::Number { .. }) => {
                let raw = take_value(true)?.unwrap_or_default();
                match raw.parse::<i64>() {
                    Ok(n) => OptionValue::from(n),
                    Err(_) => OptionValue::String(raw),
                }
            }
            Some(OptionKind::String | OptionKind::Choice(_)) => {
                OptionValue::String(take_value(true)?.unwrap_or_default())
            }
            None => match take_value(false)? {
                Some(raw) => OptionValue::infer(&raw),
                None => OptionValue::Bool(true),
            },
        };
        options.insert(name, value);
    }

    Ok((options, globals))
}
