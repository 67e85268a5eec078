use clap::Args;
use clap_complete::{generate, Shell};
use std::io;

use super::Context;
use crate::error::CommandResult;

#[derive(Args, Debug)]
pub struct CompletionsCommand {
    /// The shell to generate completions for
    pub shell: Shell,
}

pub fn execute(cmd: CompletionsCommand, ctx: &mut Context<'_>) -> CommandResult<()> {
    ctx.report.command = "completions".to_string();
    let mut app = super::command();
    generate(cmd.shell, &mut app, "m365", &mut io::stdout());
    Ok(())
}
