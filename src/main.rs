use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;

use fireplan::api::{
    AfterTaxArgs, CompareArgs, FireArgs, MixedArgs, ProjectionArgs, SustainabilityArgs,
    WithdrawalArgs, run_http_server,
};
use fireplan::core::{
    ValidationError, analyze_sustainability, apply_after_tax_adjustment, compare_projections,
    plan_fire, simulate_compound_growth, simulate_mixed_allocation, simulate_withdrawal,
};
use fireplan::logging::{LogConfig, LogError, LogFormat, init_logging};
use fireplan::store::{CalculationStore, StoreError};

#[derive(Parser, Debug)]
#[command(
    name = "fireplan",
    version,
    about = "Investment growth, FIRE and retirement drawdown projections"
)]
struct Cli {
    #[command(flatten)]
    log: LogArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct LogArgs {
    #[arg(
        long,
        global = true,
        env = "FIREPLAN_LOG",
        default_value = "info",
        help = "Log filter, e.g. info or fireplan=debug"
    )]
    log_level: String,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Compound growth of a single investment.
    Project(ProjectionArgs),
    /// Compound growth split across asset classes.
    Mixed(MixedArgs),
    /// Compound growth with yearly tax on gains.
    AfterTax(AfterTaxArgs),
    /// The same projection at several return rates.
    Compare(CompareArgs),
    /// FIRE number, time to reach it and the drawdown that follows.
    Fire(FireArgs),
    /// Year-by-year retirement withdrawals.
    Withdraw(WithdrawalArgs),
    /// Probability-weighted withdrawal sustainability.
    Sustain(SustainabilityArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "FIREPLAN_PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,
    #[arg(long, env = "FIREPLAN_DATA_FILE", default_value = "fireplan-data.json")]
    data_file: PathBuf,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error("failed to encode result: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    init_logging(&LogConfig {
        level: cli.log.log_level,
        format: cli.log.log_format,
    })?;

    match cli.command {
        Command::Serve(args) => {
            let store = CalculationStore::open(&args.data_file)?;
            run_http_server(SocketAddr::new(args.bind, args.port), store).await?;
        }
        Command::Project(args) => print_json(&simulate_compound_growth(&args.to_input())?)?,
        Command::Mixed(args) => print_json(&simulate_mixed_allocation(&args.to_input())?)?,
        Command::AfterTax(args) => {
            let projection = simulate_compound_growth(&args.projection.to_input())?;
            print_json(&apply_after_tax_adjustment(&projection, args.tax_rate)?)?;
        }
        Command::Compare(args) => print_json(&compare_projections(&args.to_scenarios())?)?,
        Command::Fire(args) => print_json(&plan_fire(&args.to_input())?)?,
        Command::Withdraw(args) => print_json(&simulate_withdrawal(&args.to_input()?)?)?,
        Command::Sustain(args) => print_json(&analyze_sustainability(&args.to_input())?)?,
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
