use crate::commands::{run_import, run_renewals, run_report, ImportArgs, RenewalArgs, ReportArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use licenseguard::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "LicenseGuard",
    about = "Track producer licenses, renewals and continuing education for an agency",
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
    /// Bulk import credentials from a spreadsheet export
    Import(ImportArgs),
    /// Print the compliance dashboard and credential list for a viewer
    Report(ReportArgs),
    /// List today's renewal reminders, or send them with --dispatch
    Renewals(RenewalArgs),
    /// Walk through every view over the sample agency
    Demo(DemoArgs),
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
        Command::Import(args) => run_import(args),
        Command::Report(args) => run_report(args),
        Command::Renewals(args) => run_renewals(args),
        Command::Demo(args) => run_demo(args),
    }
}
