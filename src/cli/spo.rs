use clap::{Args, Subcommand};

use super::{run, Context, RawArgs};
use crate::commands::list_view_set::ListViewSet;
use crate::commands::web_set::WebSet;
use crate::error::CommandResult;

#[derive(Args, Debug)]
pub struct SpoCommand {
    #[command(subcommand)]
    pub command: SpoSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum SpoSubcommand {
    /// Site and subsite operations
    Web(WebCommand),

    /// List operations
    List(ListCommand),
}

#[derive(Args, Debug)]
pub struct WebCommand {
    #[command(subcommand)]
    pub command: WebSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum WebSubcommand {
    /// Update subsite properties
    Set(RawArgs),
}

#[derive(Args, Debug)]
pub struct ListCommand {
    #[command(subcommand)]
    pub command: ListSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ListSubcommand {
    /// List view operations
    View(ViewCommand),
}

#[derive(Args, Debug)]
pub struct ViewCommand {
    #[command(subcommand)]
    pub command: ViewSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ViewSubcommand {
    /// Update an existing list view
    Set(RawArgs),
}

pub async fn execute(cmd: SpoCommand, ctx: &mut Context<'_>) -> CommandResult<()> {
    match cmd.command {
        SpoSubcommand::Web(web) => match web.command {
            WebSubcommand::Set(raw) => run::<WebSet>(&raw, ctx).await,
        },
        SpoSubcommand::List(list) => match list.command {
            ListSubcommand::View(view) => match view.command {
                ViewSubcommand::Set(raw) => run::<ListViewSet>(&raw, ctx).await,
            },
        },
    }
}
