//! Commands that talk to Microsoft 365.
//!
//! Each command declares its option schema once, converts validated options
//! into a typed struct, and drives the [`M365Client`] dispatcher.

pub mod list_view_set;
pub mod task_add;
pub mod user_app_list;
pub mod web_set;

use serde_json::{Map, Value};

use crate::api::M365Client;
use crate::error::CommandResult;
use crate::options::{
    fill_missing, parse_args, validate, GlobalArgs, OptionSchema, Prompter, ValidOptions,
};

/// Result of a successful command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// Nothing is printed
    Nothing,
    /// The same value is rendered for every output format
    Value(Value),
    /// Full response for `json`, reduced fields for `text`
    Views { json: Value, text: Value },
}

#[allow(async_fn_in_trait)]
pub trait Command {
    type Options;

    fn schema() -> &'static OptionSchema;

    /// Build the typed options from validated input
    fn options(valid: &ValidOptions) -> CommandResult<Self::Options>;

    async fn execute(client: &M365Client, options: Self::Options) -> CommandResult<CommandOutput>;
}

/// Schemas of every command, used for help text
pub const SCHEMAS: &[&OptionSchema] = &[
    &web_set::SCHEMA,
    &list_view_set::SCHEMA,
    &task_add::SCHEMA,
    &user_app_list::SCHEMA,
];

/// Parse, optionally prompt for, and validate a command's raw arguments
pub fn prepare<C: Command>(
    args: &[String],
    prompter: Option<&mut dyn Prompter>,
) -> CommandResult<(ValidOptions, GlobalArgs)> {
    let schema = C::schema();
    let (mut parsed, globals) = parse_args(schema, args)?;
    if let Some(prompter) = prompter {
        fill_missing(schema, &mut parsed, prompter)?;
    }
    Ok((validate(schema, parsed)?, globals))
}

/// Body made of typed wire fields plus passthrough extras.
///
/// Typed fields win when an extra uses the same wire name.
pub fn merge_extras(typed: Value, extras: Map<String, Value>) -> Value {
    let mut body = extras;
    if let Value::Object(fields) = typed {
        body.extend(fields);
    }
    Value::Object(body)
}
