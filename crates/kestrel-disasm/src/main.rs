use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;
mod config;

use commands::info::InfoCommand;
use commands::list::ListCommand;

#[derive(Parser)]
#[command(name = "kestrel-disasm", version, about = "Kestrel bytecode disassembler")]
struct Cli {
    /// Config file (defaults to kestrel.toml in this or a parent directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log decoder activity to stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Disassemble a bytecode buffer
    List(ListCommand),
    /// Describe one bytecode
    Info(InfoCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::List(cmd) => cmd.run(&config)?,
        Commands::Info(cmd) => cmd.run()?,
    }

    Ok(())
}
