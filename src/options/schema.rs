use std::fmt::Write as _;
use std::ops::Deref;

use super::format::{is_guid, is_https_url, is_iso_date_time, is_upn};
use super::{OptionValue, ParsedOptions};
use crate::error::{CommandError, CommandResult};

/// Value type accepted by an option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    /// Boolean switch; `--name`, `--name true` or `--name false`
    Flag,
    /// Whole number within an inclusive range
    Number { min: i64, max: i64 },
    /// Enumerated string, matched case-insensitively
    Choice(&'static [&'static str]),
}

/// Shape check applied to string values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Guid,
    HttpsUrl,
    Upn,
    IsoDateTime,
}

impl Format {
    fn check(self, value: &str) -> bool {
        match self {
            Self::Guid => is_guid(value),
            Self::HttpsUrl => is_https_url(value),
            Self::Upn => is_upn(value),
            Self::IsoDateTime => is_iso_date_time(value),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Guid => "a valid GUID",
            Self::HttpsUrl => "a valid absolute https URL",
            Self::Upn => "a valid user principal name",
            Self::IsoDateTime => "a valid ISO 8601 date or date-time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    pub required: bool,
    pub format: Option<Format>,
    pub help: &'static str,
}

impl OptionSpec {
    pub const fn string(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            kind: OptionKind::String,
            required: false,
            format: None,
            help,
        }
    }

    pub const fn flag(name: &'static str, help: &'static str) -> Self {
        Self {
            kind: OptionKind::Flag,
            ..Self::string(name, help)
        }
    }

    pub const fn number(name: &'static str, min: i64, max: i64, help: &'static str) -> Self {
        Self {
            kind: OptionKind::Number { min, max },
            ..Self::string(name, help)
        }
    }

    pub const fn choice(
        name: &'static str,
        choices: &'static [&'static str],
        help: &'static str,
    ) -> Self {
        Self {
            kind: OptionKind::Choice(choices),
            ..Self::string(name, help)
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn format(self, format: Format) -> Self {
        Self {
            format: Some(format),
            ..self
        }
    }

    /// Canonical spelling of a choice value, if the value is allowed
    pub fn canonical_choice(&self, value: &str) -> Option<&'static str> {
        match self.kind {
            OptionKind::Choice(choices) => choices
                .iter()
                .copied()
                .find(|c| c.eq_ignore_ascii_case(value)),
            _ => None,
        }
    }

    fn check(&self, value: &OptionValue) -> Result<(), String> {
        let name = self.name;
        match (self.kind, value) {
            (OptionKind::Flag, OptionValue::Bool(_)) => Ok(()),
            (OptionKind::Flag, other) => Err(format!(
                "{} is not a valid value for option {}. Allowed values are true, false",
                other, name
            )),
            (OptionKind::Number { min, max }, OptionValue::Number(n)) => match n.as_i64() {
                Some(v) if (min..=max).contains(&v) => Ok(()),
                _ => Err(format!(
                    "{} is not a valid value for option {}. Allowed values are {} through {}",
                    n, name, min, max
                )),
            },
            (OptionKind::Number { .. }, other) => {
                Err(format!("{} in option {} is not a number", other, name))
            }
            (OptionKind::Choice(choices), OptionValue::String(s)) => {
                if self.canonical_choice(s).is_some() {
                    Ok(())
                } else {
                    Err(format!(
                        "{} is not a valid value for option {}. Allowed values are {}",
                        s,
                        name,
                        choices.join(", ")
                    ))
                }
            }
            (OptionKind::Choice(choices), other) => Err(format!(
                "{} is not a valid value for option {}. Allowed values are {}",
                other,
                name,
                choices.join(", ")
            )),
            (OptionKind::String, OptionValue::String(s)) => match self.format {
                Some(format) if !format.check(s) => Err(format!(
                    "{} in option {} is not {}",
                    s,
                    name,
                    format.describe()
                )),
                _ => Ok(()),
            },
            (OptionKind::String, other) => {
                Err(format!("{} in option {} must be a string", other, name))
            }
        }
    }
}

/// Cross-field rule evaluated after per-option checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    ExactlyOneOf(&'static [&'static str]),
    AtMostOneOf(&'static [&'static str]),
    AtLeastOneOf(&'static [&'static str]),
    /// `option` is only valid when `other` equals `value` (case-insensitive)
    RequiresValue {
        option: &'static str,
        other: &'static str,
        value: &'static str,
    },
}

impl Rule {
    fn check(&self, options: &ParsedOptions) -> Result<(), String> {
        let present = |names: &[&str]| names.iter().filter(|n| options.contains(n)).count();
        match *self {
            Self::ExactlyOneOf(names) if present(names) != 1 => Err(format!(
                "Specify exactly one of the following options: {}",
                names.join(", ")
            )),
            Self::AtMostOneOf(names) if present(names) > 1 => Err(format!(
                "Specify at most one of the following options: {}",
                names.join(", ")
            )),
            Self::AtLeastOneOf(names) if present(names) == 0 => Err(format!(
                "Specify at least one of the following options: {}",
                names.join(", ")
            )),
            Self::RequiresValue {
                option,
                other,
                value,
            } if options.contains(option)
                && !options
                    .get_str(other)
                    .is_some_and(|v| v.eq_ignore_ascii_case(value)) =>
            {
                Err(format!(
                    "The {} option can only be used when the {} option is set to '{}'",
                    option, other, value
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Declared options of one command
#[derive(Debug)]
pub struct OptionSchema {
    /// Command path below the binary, e.g. `["spo", "web", "set"]`
    pub path: &'static [&'static str],
    pub description: &'static str,
    pub options: &'static [OptionSpec],
    pub rules: &'static [Rule],
    /// Pass undeclared options through to the request body
    pub allow_unknown: bool,
}

impl OptionSchema {
    pub fn name(&self) -> String {
        self.path.join(" ")
    }

    pub fn option(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Help text listing the declared options and rules
    pub fn help(&self) -> String {
        let width = self.options.iter().map(|o| o.name.len()).max().unwrap_or(0) + 2;
        let mut help = String::from("Options:\n");
        for spec in self.options {
            let mut line = spec.help.to_string();
            if let OptionKind::Choice(choices) = spec.kind {
                let _ = write!(line, " [{}]", choices.join(", "));
            }
            if let OptionKind::Number { min, max } = spec.kind {
                let _ = write!(line, " [{}..{}]", min, max);
            }
            if spec.required {
                line.push_str(" (required)");
            }
            let _ = writeln!(help, "  --{:<width$}{}", spec.name, line, width = width);
        }
        for rule in self.rules {
            match rule {
                Rule::ExactlyOneOf(names) => {
                    let _ = writeln!(help, "\nSpecify exactly one of: {}", names.join(", "));
                }
                Rule::AtMostOneOf(names) => {
                    let _ = writeln!(help, "\nSpecify at most one of: {}", names.join(", "));
                }
                Rule::AtLeastOneOf(names) => {
                    let _ = writeln!(help, "\nSpecify at least one of: {}", names.join(", "));
                }
                Rule::RequiresValue { .. } => {}
            }
        }
        if self.allow_unknown {
            help.push_str("\nAdditional options are sent as-is to the API.\n");
        }
        help
    }
}

/// Options that passed validation against a schema
#[derive(Debug, Clone)]
pub struct ValidOptions {
    schema: &'static OptionSchema,
    options: ParsedOptions,
}

impl ValidOptions {
    pub fn schema(&self) -> &'static OptionSchema {
        self.schema
    }

    /// Canonical spelling of a choice option's value
    pub fn choice(&self, name: &str) -> Option<&'static str> {
        let value = self.options.get_str(name)?;
        self.schema.option(name)?.canonical_choice(value)
    }

    /// Undeclared options, as wire fields
    pub fn extras(&self) -> serde_json::Map<String, serde_json::Value> {
        self.options.extras(self.schema)
    }
}

impl Deref for ValidOptions {
    type Target = ParsedOptions;

    fn deref(&self) -> &Self::Target {
        &self.options
    }
}

/// Validate an option bag, returning the first failing rule's message
pub fn validate(
    schema: &'static OptionSchema,
    options: ParsedOptions,
) -> CommandResult<ValidOptions> {
    if !schema.allow_unknown {
        if let Some(unknown) = options.names().find(|n| schema.option(n).is_none()) {
            return Err(CommandError::validation(format!(
                "Option {} is not supported by {}",
                unknown,
                schema.name()
            )));
        }
    }

    for spec in schema.options {
        match options.get(spec.name) {
            Some(value) => spec.check(value).map_err(CommandError::Validation)?,
            None if spec.required => {
                return Err(CommandError::validation(format!(
                    "Required option {} not specified",
                    spec.name
                )))
            }
            None => {}
        }
    }

    for rule in schema.rules {
        rule.check(&options).map_err(CommandError::Validation)?;
    }

    Ok(ValidOptions { schema, options })
}
