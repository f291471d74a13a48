use crate::offline::{run_analytics, run_export, run_import, AnalyticsCommand, ExportArgs, ImportArgs};
use crate::server;
use admissions::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Admissions Tracker",
    about = "Serve the admissions API or reconcile registrar files from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Match a registrar CSV against an applications file and mark enrollments
    Import(ImportArgs),
    /// Print enrollment analytics computed from an applications file
    Analytics {
        #[command(subcommand)]
        command: AnalyticsCommand,
    },
    /// Write an applications file out as CSV
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Import(args) => run_import(args).await,
        Command::Analytics { command } => run_analytics(command),
        Command::Export(args) => run_export(args),
    }
}
