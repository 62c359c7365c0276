use crate::demo::{run_demo, run_risk, DemoArgs, RiskArgs};
use crate::reconcile::{run_reconcile, ReconcileArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use ongkir_engine::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Ongkir Engine",
    about = "Shipping decisions and COD risk scoring for checkout",
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
    /// Walk a sample cart through planning, packaging, rates and recommendation
    Demo(DemoArgs),
    /// Score a single order for COD risk
    Risk(RiskArgs),
    /// Compare a courier invoice with checkout estimates and report variance
    Reconcile(ReconcileArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Warehouse CSV export; requires --origins-csv
    #[arg(long, requires = "origins_csv")]
    pub(crate) warehouses_csv: Option<PathBuf>,
    /// Product origin CSV export; requires --warehouses-csv
    #[arg(long, requires = "warehouses_csv")]
    pub(crate) origins_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Risk(args) => run_risk(args),
        Command::Reconcile(args) => run_reconcile(args),
    }
}
