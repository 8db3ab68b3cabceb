use clap::Parser;
use color_eyre::Result;

mod cli;
mod dispatch;
mod outcome;
mod output;

pub use cli::*;

use output::OutputOptions;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = DatalibCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let opts = OutputOptions {
        quiet: cli.quiet,
        json: cli.json,
    };
    let outcome = dispatch::dispatch_command(cli.root.as_deref(), &cli.command);
    let code = output::emit_output(&opts, command_name(&cli.command), &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn command_name(group: &CommandGroupCli) -> &'static str {
    match group {
        CommandGroupCli::Put(_) => "put",
        CommandGroupCli::Get(_) => "get",
        CommandGroupCli::Delete(_) => "delete",
        CommandGroupCli::Info(_) => "info",
        CommandGroupCli::Refs(_) => "refs",
        CommandGroupCli::List(_) => "list",
        CommandGroupCli::Stats => "stats",
        CommandGroupCli::Verify(_) => "verify",
        CommandGroupCli::Doctor => "doctor",
        CommandGroupCli::Gc(_) => "gc",
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("datalib={level},datalib_core={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
