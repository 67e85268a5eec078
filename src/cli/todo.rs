use clap::{Args, Subcommand};

use super::{run, Context, RawArgs};
use crate::commands::task_add::TaskAdd;
use crate::error::CommandResult;

#[derive(Args, Debug)]
pub struct TodoCommand {
    #[command(subcommand)]
    pub command: TodoSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TodoSubcommand {
    /// Task operations
    Task(TaskCommand),
}

#[derive(Args, Debug)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub command: TaskSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TaskSubcommand {
    /// Add a task to a list
    Add(RawArgs),
}

pub async fn execute(cmd: TodoCommand, ctx: &mut Context<'_>) -> CommandResult<()> {
    match cmd.command {
        TodoSubcommand::Task(task) => match task.command {
            TaskSubcommand::Add(raw) => run::<TaskAdd>(&raw, ctx).await,
        },
    }
}
