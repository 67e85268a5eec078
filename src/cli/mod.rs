pub mod auth;
pub mod completions;
pub mod config;
pub mod output;
pub mod spo;
pub mod teams;
pub mod todo;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};

use crate::api::M365Client;
use crate::commands::{self, Command};
use crate::config::Config;
use crate::error::CommandResult;
use crate::options::{GlobalArgs, OptionSchema, Prompter, TerminalPrompter};
use crate::session::Session;

/// Manage Microsoft 365 (SharePoint Online, Teams, To Do) from the terminal
#[derive(Parser, Debug)]
#[command(name = "m365")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (defaults to the `settings.output` setting)
    #[arg(long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Log requests and responses
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log progress information
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in to and out of Microsoft 365
    Auth(auth::AuthCommand),

    /// Read and change settings
    Config(config::ConfigCommand),

    /// SharePoint Online commands
    Spo(spo::SpoCommand),

    /// Microsoft Teams commands
    Teams(teams::TeamsCommand),

    /// Microsoft To Do commands
    Todo(todo::TodoCommand),

    /// Generate shell completions
    Completions(completions::CompletionsCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON output (best for scripts)
    Json,
    /// Tables and key/value lines (best for humans)
    Text,
}

impl OutputFormat {
    /// `--output` when given, otherwise the configured default
    pub fn resolve(globals: GlobalArgs, config: &Config) -> Self {
        globals
            .output
            .or_else(|| OutputFormat::from_str(&config.settings.output, true).ok())
            .unwrap_or(OutputFormat::Json)
    }
}

/// Options of a schema-driven command, parsed by the command itself
#[derive(Args, Debug, Default)]
pub struct RawArgs {
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 0..,
        value_name = "OPTIONS"
    )]
    pub args: Vec<String>,
}

impl RawArgs {
    fn wants_help(&self) -> bool {
        self.args.iter().any(|a| a == "--help" || a == "-h")
    }
}

/// What ran, reported to telemetry once the command finishes
#[derive(Debug, Default)]
pub struct Report {
    pub command: String,
    pub options: Vec<String>,
    pub session_id: String,
}

/// Invocation-wide state handed to every command
pub struct Context<'a> {
    pub config: &'a Config,
    pub globals: GlobalArgs,
    pub report: &'a mut Report,
}

impl Context<'_> {
    pub fn format(&self) -> OutputFormat {
        OutputFormat::resolve(self.globals, self.config)
    }
}

/// Clap command with per-command option help attached
pub fn command() -> clap::Command {
    commands::SCHEMAS
        .iter()
        .fold(Cli::command(), |cmd, schema| decorate(cmd, schema.path, schema))
}

fn decorate(cmd: clap::Command, path: &[&str], schema: &'static OptionSchema) -> clap::Command {
    match path.split_first() {
        None => cmd.about(schema.description).after_help(schema.help()),
        Some((head, rest)) => cmd.mut_subcommand(*head, |sub| decorate(sub, rest, schema)),
    }
}

pub async fn execute(cli: Cli, config: &Config, report: &mut Report) -> CommandResult<()> {
    let mut ctx = Context {
        config,
        globals: GlobalArgs {
            output: cli.output,
            debug: cli.debug,
            verbose: cli.verbose,
        },
        report,
    };

    match cli.command {
        Commands::Auth(cmd) => auth::execute(cmd, &mut ctx).await,
        Commands::Config(cmd) => config::execute(cmd, &mut ctx),
        Commands::Spo(cmd) => spo::execute(cmd, &mut ctx).await,
        Commands::Teams(cmd) => teams::execute(cmd, &mut ctx).await,
        Commands::Todo(cmd) => todo::execute(cmd, &mut ctx).await,
        Commands::Completions(cmd) => completions::execute(cmd, &mut ctx),
    }
}

/// Parse, validate and execute a schema-driven command, then print its output
pub async fn run<C: Command>(raw: &RawArgs, ctx: &mut Context<'_>) -> CommandResult<()> {
    let schema = C::schema();
    ctx.report.command = schema.name();

    if raw.wants_help() {
        println!("{}\n\nUsage: m365 {} [OPTIONS]\n", schema.description, schema.name());
        print!("{}", schema.help());
        return Ok(());
    }

    let mut terminal = TerminalPrompter;
    let prompter: Option<&mut dyn Prompter> = if ctx.config.settings.prompt {
        Some(&mut terminal)
    } else {
        None
    };
    let (valid, globals) = commands::prepare::<C>(&raw.args, prompter)?;
    ctx.globals = globals.merge(ctx.globals);
    ctx.report.options = valid.names().map(str::to_string).collect();

    let options = C::options(&valid)?;
    let session = Session::restore()?;
    ctx.report.session_id = session.id();
    let client = M365Client::new(ctx.config, session)?;

    let output = C::execute(&client, options).await?;
    output::print_command_output(&output, ctx.format());
    Ok(())
}
