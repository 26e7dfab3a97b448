mod clipper;
mod common;
mod ui;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::io::IsTerminal;

use crate::clipper::{ClipperCommands, handle_clipper_command};
use crate::ui::prelude::{Level, OutputFormat, emit};

/// Cut long videos into vertical clips with burned-in subtitles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for messages
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL", exclusive = true)]
    completions: Option<Shell>,

    #[command(subcommand)]
    command: Option<ClipperCommands>,
}

fn main() {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    let color = !cli.no_color && std::io::stdout().is_terminal();
    ui::init(cli.output, color);

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        let name = command.get_name().to_string();
        clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
        return;
    }

    let Some(command) = cli.command else {
        emit(
            Level::Info,
            "cli.usage",
            &format!("{}: run with --help for usage", env!("CARGO_BIN_NAME")),
            None,
        );
        return;
    };

    if let Err(err) = handle_clipper_command(command, cli.debug) {
        emit(
            Level::Error,
            "cli.error",
            &format!("Error: {err:#}"),
            Some(serde_json::json!({
                "chain": err.chain().map(|cause| cause.to_string()).collect::<Vec<_>>(),
            })),
        );
        std::process::exit(1);
    }
}
