//! `neo-loader` command line front end
//!
//! Every subcommand is sent to the background service and its response printed.
//! Logging goes to stderr and is configured with `RUST_LOG` (default `neo_loader=info`).
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use neo_loader::alerts::{AlertFilter, HighAlertPoll, NewAlert};
use neo_loader::catalog::MissingElements;
use neo_loader::config::LoaderConfig;
use neo_loader::constants::COMMIT_EVERY;
use neo_loader::csv_source::HeaderPolicy;
use neo_loader::ingest::mpcorb::MpcorbOptions;
use neo_loader::ingest::ImportOptions;
use neo_loader::loader_errors::LoaderError;
use neo_loader::service::{spawn_service, Command, Outcome, Response, ServiceHandle};

#[derive(Debug, Parser)]
#[command(name = "neo-loader", version, about = "Near-Earth-object catalogue tools")]
struct Cli {
    /// JSON configuration file (default: loader_config.json or a legacy file in the
    /// current directory)
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// SQLite catalogue, overrides the configuration
    #[arg(long, global = true)]
    db: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Open the catalogue and report its size
    TestConnection,
    /// Import a merged NEO + MPCORB CSV file
    ImportNeo(ImportNeoArgs),
    /// Import an MPCORB extract, linking orbits by principal designation
    ImportMpcorb(ImportMpcorbArgs),
    /// Build a T-SQL insert script from a merged CSV file
    GenerateSql {
        #[arg(long)]
        csv: Utf8PathBuf,
        #[arg(long)]
        template: Utf8PathBuf,
        #[arg(long)]
        output: Utf8PathBuf,
    },
    /// Print the monitoring snapshot
    Monitor,
    /// Search asteroids by name, designation or identifier
    Search { term: String },
    /// Manage alerts
    #[command(subcommand)]
    Alerts(AlertCommand),
    /// Print the resolved configuration
    ShowConfig,
}

#[derive(Debug, Args)]
struct ImportNeoArgs {
    csv: Utf8PathBuf,
    /// Apply the built-in merged layout when the header is not recognized
    #[arg(long)]
    assume_default_header: bool,
    /// Store absent orbital elements as 0.0 instead of NULL
    #[arg(long)]
    zero_fill: bool,
    /// Log row failures to the Load_Error table (created if needed)
    #[arg(long)]
    error_log: bool,
    #[arg(long, default_value_t = COMMIT_EVERY)]
    commit_every: usize,
}

#[derive(Debug, Args)]
struct ImportMpcorbArgs {
    csv: Utf8PathBuf,
    /// Accept the designation-based link between MPCORB orbits and asteroids
    #[arg(long)]
    allow_link: bool,
    #[arg(long, default_value_t = 20_000)]
    commit_every: u64,
}

#[derive(Debug, Subcommand)]
enum AlertCommand {
    /// List alerts, newest first
    List {
        #[arg(long)]
        priority: Option<i64>,
        #[arg(long)]
        level: Option<i64>,
    },
    /// Raise an alert on an asteroid
    Create {
        #[arg(long)]
        asteroid: i64,
        #[arg(long)]
        criteria: String,
        #[arg(long)]
        priority: i64,
        #[arg(long)]
        level: i64,
        /// Generation time, `YYYY-MM-DD[ HH:MM:SS]` (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Report new high-priority alerts until interrupted
    Watch {
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },
}

fn resolve_config(cli: &Cli) -> Result<LoaderConfig, LoaderError> {
    let mut config = match &cli.config {
        Some(path) => LoaderConfig::load(path)?,
        None => match LoaderConfig::discover(Utf8Path::new(".")) {
            Ok((config, path)) => {
                info!(file = %path, "using configuration");
                config
            }
            Err(err) if cli.db.is_some() => {
                warn!(error = %err, "no configuration file, using --db only");
                LoaderConfig::default()
            }
            Err(err) => return Err(err),
        },
    };
    if let Some(db) = &cli.db {
        config.sqlite_path = Some(db.clone());
    }
    Ok(config)
}

fn to_command(command: CliCommand) -> Option<Command> {
    Some(match command {
        CliCommand::TestConnection => Command::TestConnection,
        CliCommand::ImportNeo(args) => Command::ImportNeo {
            path: args.csv,
            options: ImportOptions {
                header_policy: if args.assume_default_header {
                    HeaderPolicy::AssumeDefault
                } else {
                    HeaderPolicy::Require
                },
                missing_elements: if args.zero_fill {
                    MissingElements::ZeroFill
                } else {
                    MissingElements::KeepNull
                },
                commit_every: args.commit_every,
            },
            error_log: args.error_log,
        },
        CliCommand::ImportMpcorb(args) => Command::ImportMpcorb {
            path: args.csv,
            options: MpcorbOptions {
                allow_link: args.allow_link,
                commit_every: args.commit_every,
                ..Default::default()
            },
        },
        CliCommand::GenerateSql {
            csv,
            template,
            output,
        } => Command::GenerateSql {
            csv,
            template,
            output,
        },
        CliCommand::Monitor => Command::Monitor,
        CliCommand::Search { term } => Command::Search(term),
        CliCommand::Alerts(AlertCommand::List { priority, level }) => {
            Command::ListAlerts(AlertFilter { priority, level })
        }
        CliCommand::Alerts(AlertCommand::Create {
            asteroid,
            criteria,
            priority,
            level,
            at,
        }) => Command::CreateAlert(NewAlert {
            id_internal: asteroid,
            criteria,
            priority,
            level,
            generated_at: at,
        }),
        CliCommand::Alerts(AlertCommand::Watch { .. }) | CliCommand::ShowConfig => return None,
    })
}

fn print_outcome(outcome: Outcome) {
    match outcome {
        Outcome::Connected {
            location,
            asteroids,
        } => println!("connected to {location}: {asteroids} asteroids"),
        Outcome::NeoImported(report) => print!("{report}"),
        Outcome::MpcorbImported(report) => print!("{report}"),
        Outcome::SqlWritten {
            output,
            classes,
            asteroids,
            orbits,
        } => println!(
            "{output} written: {classes} classes, {asteroids} asteroids, {orbits} orbits"
        ),
        Outcome::Snapshot(snapshot) => print!("{snapshot}"),
        Outcome::SearchResults(rows) => {
            for row in &rows {
                println!(
                    "{:>8} {:>10} {:<12} {}",
                    row.id_internal,
                    row.spkid.map(|s| s.to_string()).unwrap_or_default(),
                    row.pdes.as_deref().unwrap_or("-"),
                    row.full_name.as_deref().unwrap_or("-"),
                );
            }
            println!("{} asteroids", rows.len());
        }
        Outcome::AlertCreated(id) => println!("alert {id} created"),
        Outcome::Alerts(rows) | Outcome::HighAlerts(HighAlertPoll::NewAlerts(rows)) => {
            for row in rows {
                println!(
                    "{:>6} {} [{} / {}] {}: {}",
                    row.id_alert, row.generated_at, row.priority, row.level, row.asteroid, row.criteria
                );
            }
        }
        Outcome::HighAlerts(HighAlertPoll::Baseline(id)) => {
            println!("watching high-priority alerts after id {id}")
        }
        Outcome::HighAlerts(HighAlertPoll::Quiet) => {}
    }
}

async fn expect_response(
    responses: &mut mpsc::UnboundedReceiver<Response>,
) -> Result<Outcome, LoaderError> {
    responses.recv().await.ok_or(LoaderError::ServiceClosed)?.outcome
}

async fn watch_high_alerts(
    service: &ServiceHandle,
    responses: &mut mpsc::UnboundedReceiver<Response>,
    interval: Duration,
) -> Result<(), LoaderError> {
    loop {
        service.send(Command::PollHighAlerts)?;
        print_outcome(expect_response(responses).await?);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), LoaderError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "neo_loader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    if matches!(cli.command, CliCommand::ShowConfig) {
        println!("{}", serde_json::to_string_pretty(&config)?);
        println!("ODBC: {}", config.odbc_connection_string());
        println!("SQLite: {}", config.database_path()?);
        return Ok(());
    }

    let (service, mut responses) = spawn_service(config);

    if let CliCommand::Alerts(AlertCommand::Watch { interval }) = cli.command {
        return watch_high_alerts(&service, &mut responses, Duration::from_secs(interval)).await;
    }

    if let Some(command) = to_command(cli.command) {
        service.send(command)?;
        print_outcome(expect_response(&mut responses).await?);
    }
    Ok(())
}
