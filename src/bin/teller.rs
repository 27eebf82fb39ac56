use std::{fs::File, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use teller::{
    bin_utils::{Console, Enrollment, SessionEnd},
    config::Config,
    journal::TransactionLog,
    store::SqliteAccountStore,
    teller::Teller,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_STORE_FAILURE: u8 = 1;
const EXIT_AUTH_FAILURE: u8 = 2;

#[derive(Debug, Parser)]
#[command(version, about = "Console bank account records")]
struct Cli {
    /// TOML configuration file (default `Teller.toml`)
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the accounts listed in a CSV file, without logging in
    Enroll { file: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            return ExitCode::from(EXIT_STORE_FAILURE);
        }
    };

    // logs go to stderr, the dialogue stays on stdout
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.loglevel));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %config.database_url,
        log_path = %config.log_path.display(),
        store_timeout_secs = config.store_timeout_secs
    );

    let store =
        match SqliteAccountStore::connect(&config.database_url, config.store_options()).await {
            Ok(store) => store,
            Err(err) => {
                error!(error = %err, "account store connection failed");
                eprintln!("Account store connection error: {err}");
                return ExitCode::from(EXIT_STORE_FAILURE);
            }
        };
    let mut teller = Teller::new(Arc::new(store), TransactionLog::new(&config.log_path));

    let outcome = match cli.command {
        Some(Command::Enroll { file }) => enroll(&teller, file).await,
        None => session(&mut teller).await,
    };
    outcome.unwrap_or_else(|err| {
        error!(error = %format!("{err:#}"), "teller stopped");
        eprintln!("{err:#}");
        ExitCode::from(EXIT_STORE_FAILURE)
    })
}

async fn session(teller: &mut Teller<SqliteAccountStore>) -> Result<ExitCode> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let console = Console {
        input: stdin.lock(),
        output: &mut stdout,
    };
    let code = match console.run(teller).await? {
        SessionEnd::Quit => ExitCode::SUCCESS,
        SessionEnd::Denied => ExitCode::from(EXIT_AUTH_FAILURE),
        SessionEnd::StoreUnavailable => ExitCode::from(EXIT_STORE_FAILURE),
    };
    Ok(code)
}

async fn enroll(teller: &Teller<SqliteAccountStore>, path: PathBuf) -> Result<ExitCode> {
    let file =
        File::open(&path).with_context(|| format!("Failed to open `{}`", path.display()))?;
    let enrollment = Enrollment {
        input: file,
        error_printer: Box::new(|line, err| eprintln!("Error at line {line}: {err}")),
    };
    let summary = enrollment.run(teller).await?;
    println!(
        "Enrolled {} account(s), skipped {}",
        summary.enrolled, summary.skipped
    );
    Ok(ExitCode::SUCCESS)
}
