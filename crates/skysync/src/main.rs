mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skysync_config::LogLevel;

use crate::cli::{Cli, Command, JobArgs, JobCommand};
use crate::config::Session;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let outcome = tokio::select! {
        res = run(cli) => res,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("interrupted");
            Err(CliError::Interrupted)
        }
    };

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = outcome {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level`. Logs go to
/// stderr so stdout carries only command output.
fn init_tracing(level: LogLevel, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;

    match command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "skysync", &mut std::io::stdout());
            Ok(())
        }

        // Local commands don't need server connections
        Command::Init(args) => {
            init_tracing(quiet_level(&global), global.json_logs);
            commands::init::handle(&args, &global)
        }
        Command::Version => {
            init_tracing(quiet_level(&global), global.json_logs);
            commands::version::handle(&global)
        }
        Command::Job(JobArgs {
            command: JobCommand::Template { format },
        }) => commands::job::template(format),

        // Everything else talks to FlightDeck and SkySpark
        cmd => {
            let config = config::load(&global)?;
            let level = global.log_level.map_or(config.app.log_level, LogLevel::from);
            init_tracing(level, global.json_logs || config.app.log_json);
            info!(config = %config.masked(), "configuration loaded");

            let session = Session::connect(config)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &session, &global).await
        }
    }
}

fn quiet_level(global: &cli::GlobalOpts) -> LogLevel {
    global.log_level.map_or(LogLevel::Warning, LogLevel::from)
}
