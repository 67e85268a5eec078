use clap::{Args, Subcommand};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{CommandError, CommandResult};

use super::output::{print_success, print_value};
use super::Context;

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Show the value of a setting
    Get {
        /// Setting key, e.g. settings.output
        key: String,
    },

    /// Change a setting
    Set {
        /// Setting key, e.g. settings.prompt
        key: String,
        /// New value
        value: String,
    },

    /// Show all settings
    List,

    /// Restore default settings
    Reset,
}

fn to_json(value: toml::Value) -> CommandResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| CommandError::Other(anyhow::anyhow!("Failed to convert setting: {}", e)))
}

pub fn execute(cmd: ConfigCommand, ctx: &mut Context<'_>) -> CommandResult<()> {
    // The file on disk, without environment overrides
    let mut config = Config::load_file()?;

    match cmd.command {
        ConfigSubcommand::Get { key } => {
            ctx.report.command = "config get".to_string();
            let value = to_json(config.get(&key)?)?;
            print_value(&value, ctx.format());
        }
        ConfigSubcommand::Set { key, value } => {
            ctx.report.command = "config set".to_string();
            config.set(&key, &value)?;
            config.save()?;
            print_success(&format!("{} set to {}", key, value));
        }
        ConfigSubcommand::List => {
            ctx.report.command = "config list".to_string();
            let mut entries = Map::new();
            for (key, value) in config.entries()? {
                entries.insert(key, to_json(value)?);
            }
            print_value(&Value::Object(entries), ctx.format());
        }
        ConfigSubcommand::Reset => {
            ctx.report.command = "config reset".to_string();
            Config::default().save()?;
            print_success("Settings restored to defaults");
        }
    }
    Ok(())
}
