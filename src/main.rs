use anyhow::Result;
use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

mod cli;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(bin_name = "sizetrack")]
#[command(version = VERSION)]
#[command(about = concat!("sizetrack v", env!("CARGO_PKG_VERSION"), " - object store size history"))]
#[command(long_about = concat!(
    "sizetrack v", env!("CARGO_PKG_VERSION"), " - object store size history\n\n",
    "Consumes object-change notifications, maintains each bucket's running\n",
    "aggregate size in an append-only history store, and renders the series\n",
    "as charts on demand over HTTP."
))]
#[command(propagate_version = true)]
struct Cli {
    /// History directory (overrides SIZETRACK_HISTORY_DIR)
    #[arg(short = 'C', long = "dir", global = true, value_hint = ValueHint::DirPath)]
    dir: Option<PathBuf>,

    /// Suppress progress output
    #[arg(long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve(cli::cmd_serve::ServeCommand),
    Apply(cli::cmd_apply::ApplyCommand),
    Plot(cli::cmd_plot::PlotCommand),
    Exercise(cli::cmd_exercise::ExerciseCommand),
    Status(cli::cmd_status::StatusCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    cli::logger::init_logger(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Serve(cmd) => cli::cmd_serve::run(cmd, cli.dir)?,
        Commands::Apply(cmd) => cli::cmd_apply::run(cmd, cli.dir, cli.quiet)?,
        Commands::Plot(cmd) => cli::cmd_plot::run(cmd, cli.dir)?,
        Commands::Exercise(cmd) => cli::cmd_exercise::run(cmd)?,
        Commands::Status(cmd) => cli::cmd_status::run(cmd, cli.dir)?,
    }

    Ok(())
}
