//! Command dispatch: bridges CLI args -> sync coordinator -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod measure;
pub mod station;
pub mod util;
pub mod watch;

use crate::cli::{Cli, Command, CompletionsArgs, GlobalOpts};
use crate::error::CliError;

/// Dispatch a parsed command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(args, global).await,
        Command::Logout => auth::logout(global).await,
        Command::Station(args) => station::handle(args, global).await,
        Command::Measure(args) => measure::handle(args, global).await,
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(args) => {
            completions(&args);
            Ok(())
        }
    }
}

fn completions(args: &CompletionsArgs) {
    use clap::CommandFactory;
    use clap_complete::generate;

    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "weatherdash", &mut std::io::stdout());
}
