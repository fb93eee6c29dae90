use anyhow::Result;
use clap::Parser;

use ged_cli::commands::Commands;
use ged_cli::config::{GlobalArgs, Settings};

#[derive(Parser)]
#[command(name = "gedtool", author, version)]
#[command(about = "Decode, compact and disassemble GPU instructions")]
struct Cli {
    #[command(flatten)]
    args: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::resolve(&cli.args)?;
    ged_cli::init_tracing(settings.log.as_deref());
    cli.command.run(&settings)
}
