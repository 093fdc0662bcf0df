use crate::demo::{run_demo, run_postcode_lookup, DemoArgs, PostcodeArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use tradesos::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "TradeSOS",
    about = "Run and demonstrate the TradeSOS job matching engine from the command line",
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
    /// Normalize a UK postcode and show its coverage keys
    Postcode(PostcodeArgs),
    /// Post a job against a sample trade directory and walk through dispatch and acceptance
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
        Command::Postcode(args) => run_postcode_lookup(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
