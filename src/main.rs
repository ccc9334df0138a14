use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use sql_value_search::console::{Console, DEFAULT_DISPLAY_LIMIT};
use sql_value_search::prelude::*;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Report which table columns in a SQL Server database contain a value"
)]
struct Args {
    /// JSON file with the database location and table list.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Table to search instead of the configured list (repeatable).
    #[arg(long = "table")]
    tables: Vec<String>,
    /// Tables searched at once, each on its own connection.
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
    /// Deadline for searching a single table, e.g. `30s` or `2m`.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    table_timeout: Duration,
    /// Matches printed per search before the rest are summarised.
    #[arg(long, default_value_t = DEFAULT_DISPLAY_LIMIT)]
    display_limit: usize,
    #[arg(short, long)]
    verbose: bool,
    /// Values to search for. Without any, values are read interactively.
    terms: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), SearchError> {
    let mut config = SearchConfig::load(&args.config)?;
    if !args.tables.is_empty() {
        config = config.with_tables(args.tables)?;
    }

    let mut console = Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .with_display_limit(args.display_limit);
    let password = console.prompt_password().await?;

    let db = &config.database;
    let concurrency = args.concurrency.max(1);
    let pool = MssqlOptionsBuilder::new(db.server.clone(), db.name.clone(), db.id.clone(), password)
        .port(db.port)
        .instance_name(db.instance.clone())
        .trust_cert(db.trust_cert)
        .build(u32::try_from(concurrency).unwrap_or(u32::MAX))
        .await?;
    pool.check_connectivity().await?;

    let options = SearchOptions {
        concurrency,
        table_timeout: Some(args.table_timeout),
    };
    let searcher = Searcher::new(pool, config.tables, options);

    if args.terms.is_empty() {
        let summary = console.run(&searcher).await?;
        tracing::info!(
            searches = summary.searches,
            matches = summary.matches,
            "session finished"
        );
    } else {
        for term in &args.terms {
            let report = searcher.search(term).await;
            console.print_report(term, &report).await?;
        }
    }
    Ok(())
}
