use std::process::ExitCode;

use clap::FromArgMatches;
use m365_cli::cli::{self, output::print_error, Cli, Report};
use m365_cli::config::Config;
use m365_cli::options::GlobalArgs;
use m365_cli::telemetry::{timestamp_now_ms, TelemetryEmitter, TelemetryEvent};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(globals: GlobalArgs) {
    let default = if globals.debug {
        "m365_cli=debug"
    } else if globals.verbose {
        "m365_cli=info"
    } else {
        "m365_cli=warn"
    };

    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    init_logging(GlobalArgs::scan(&args));

    let matches = cli::command().get_matches_from(&args);
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            print_error(&format!("{:#}", e));
            return ExitCode::FAILURE;
        }
    };
    let telemetry = TelemetryEmitter::from_env(&config);

    let mut report = Report::default();
    let result = cli::execute(cli, &config, &mut report).await;

    let exit_code = match &result {
        Ok(()) => 0,
        Err(err) => {
            debug!(kind = err.kind(), "Command failed");
            print_error(&err.to_string());
            err.exit_code()
        }
    };

    if let Some(telemetry) = telemetry {
        telemetry
            .emit(&TelemetryEvent {
                command: &report.command,
                options: report.options.iter().map(String::as_str).collect(),
                outcome: if result.is_ok() { "success" } else { "failure" },
                exit_code,
                session_id: &report.session_id,
                timestamp_ms: timestamp_now_ms(),
            })
            .await;
    }

    ExitCode::from(u8::try_from(exit_code).unwrap_or(1))
}
