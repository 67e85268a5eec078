use clap::{Args, Subcommand};

use super::{run, Context, RawArgs};
use crate::commands::user_app_list::UserAppList;
use crate::error::CommandResult;

#[derive(Args, Debug)]
pub struct TeamsCommand {
    #[command(subcommand)]
    pub command: TeamsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TeamsSubcommand {
    /// Operations on a user's Teams setup
    User(UserCommand),
}

#[derive(Args, Debug)]
pub struct UserCommand {
    #[command(subcommand)]
    pub command: UserSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum UserSubcommand {
    /// Apps installed for a user
    App(AppCommand),
}

#[derive(Args, Debug)]
pub struct AppCommand {
    #[command(subcommand)]
    pub command: AppSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AppSubcommand {
    /// List apps installed in the personal scope of a user
    List(RawArgs),
}

pub async fn execute(cmd: TeamsCommand, ctx: &mut Context<'_>) -> CommandResult<()> {
    match cmd.command {
        TeamsSubcommand::User(user) => match user.command {
            UserSubcommand::App(app) => match app.command {
                AppSubcommand::List(raw) => run::<UserAppList>(&raw, ctx).await,
            },
        },
    }
}
