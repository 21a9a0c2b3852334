//! # Background service
//!
//! Runs the catalogue operations off the caller's thread and reports back through a
//! channel, so that an interactive front end only sends [`Command`]s and consumes
//! [`Response`]s.
//!
//! ## Overview
//! -----------------
//! [`spawn_service`] starts a dispatcher task on the current tokio runtime. Every command
//! received gets its own task, which opens a fresh database connection and runs the
//! blocking work on [`tokio::task::spawn_blocking`]. The outcome is posted on the response
//! channel tagged with the request id returned by [`ServiceHandle::send`].
//!
//! The dispatcher stops once every [`ServiceHandle`] is dropped; responses of jobs still
//! running are delivered as long as the receiver is alive.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::alerts::{
    create_alert, list_alerts, search_asteroids, AlertFilter, AlertRow, AsteroidSummary,
    HighAlertPoll, HighAlertWatch, NewAlert,
};
use crate::catalog::CatalogTable;
use crate::config::LoaderConfig;
use crate::ingest::catalog_builder::build_data_from_csv;
use crate::ingest::mpcorb::{load_mpcorb, MpcorbOptions, MpcorbReport};
use crate::ingest::neo_csv::load_neo_mpcorb_csv;
use crate::ingest::sql_script::{build_insert_blocks, write_sql};
use crate::ingest::{ImportOptions, ImportReport};
use crate::loader_errors::LoaderError;
use crate::monitoring::{monitor_snapshot, MonitorSnapshot};

/// Work the service can run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the database and count its asteroids
    TestConnection,
    ImportNeo {
        path: Utf8PathBuf,
        options: ImportOptions,
        /// Create the `Load_Error` table before importing
        error_log: bool,
    },
    ImportMpcorb {
        path: Utf8PathBuf,
        options: MpcorbOptions,
    },
    GenerateSql {
        csv: Utf8PathBuf,
        template: Utf8PathBuf,
        output: Utf8PathBuf,
    },
    Monitor,
    Search(String),
    CreateAlert(NewAlert),
    ListAlerts(AlertFilter),
    /// Poll for new high-priority alerts (the first poll sets the baseline)
    PollHighAlerts,
}

/// Successful result of a [`Command`]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Connected { location: String, asteroids: i64 },
    NeoImported(ImportReport),
    MpcorbImported(MpcorbReport),
    SqlWritten {
        output: Utf8PathBuf,
        classes: usize,
        asteroids: usize,
        orbits: usize,
    },
    Snapshot(Box<MonitorSnapshot>),
    SearchResults(Vec<AsteroidSummary>),
    AlertCreated(i64),
    Alerts(Vec<AlertRow>),
    HighAlerts(HighAlertPoll),
}

#[derive(Debug)]
pub struct Response {
    /// Id returned by the [`ServiceHandle::send`] call that queued the command
    pub request: u64,
    pub outcome: Result<Outcome, LoaderError>,
}

/// Sending side of the service
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    commands: mpsc::UnboundedSender<(u64, Command)>,
    next_request: Arc<AtomicU64>,
}

impl ServiceHandle {
    /// Queue a command.
    ///
    /// Return
    /// ----------
    /// * The request id echoed in the matching [`Response`], or
    ///   [`LoaderError::ServiceClosed`] when the dispatcher is gone.
    pub fn send(&self, command: Command) -> Result<u64, LoaderError> {
        let request = self.next_request.fetch_add(1, Ordering::Relaxed) + 1;
        self.commands
            .send((request, command))
            .map_err(|_| LoaderError::ServiceClosed)?;
        Ok(request)
    }
}

/// Start the service on the current tokio runtime.
///
/// Arguments
/// -----------------
/// * `config`: connection settings, used by every job to open its own connection
///
/// Return
/// ----------
/// * The command handle and the response receiver.
pub fn spawn_service(config: LoaderConfig) -> (ServiceHandle, mpsc::UnboundedReceiver<Response>) {
    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<(u64, Command)>();
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let config = Arc::new(config);
    let watch = Arc::new(Mutex::new(HighAlertWatch::new()));

    tokio::spawn(async move {
        while let Some((request, command)) = command_rx.recv().await {
            debug!(request, ?command, "command received");
            let config = Arc::clone(&config);
            let watch = Arc::clone(&watch);
            let responses = response_tx.clone();

            tokio::spawn(async move {
                let outcome = tokio::task::spawn_blocking(move || run(&config, &watch, command))
                    .await
                    .unwrap_or_else(|e| Err(LoaderError::WorkerFailed(e.to_string())));
                if let Err(err) = &outcome {
                    error!(request, error = %err, "command failed");
                }
                // the receiver may be gone, nothing left to report to
                let _ = responses.send(Response { request, outcome });
            });
        }
        debug!("service stopped");
    });

    (
        ServiceHandle {
            commands: command_tx,
            next_request: Arc::new(AtomicU64::new(0)),
        },
        response_rx,
    )
}

fn run(
    config: &LoaderConfig,
    watch: &Mutex<HighAlertWatch>,
    command: Command,
) -> Result<Outcome, LoaderError> {
    let open = || config.open_database();
    match command {
        Command::TestConnection => {
            let db = open()?;
            Ok(Outcome::Connected {
                location: db.location().to_string(),
                asteroids: db.count_rows(CatalogTable::Asteroid)?,
            })
        }
        Command::ImportNeo {
            path,
            options,
            error_log,
        } => {
            let db = open()?;
            if error_log {
                db.enable_error_log()?;
            }
            load_neo_mpcorb_csv(&db, &path, &options).map(Outcome::NeoImported)
        }
        Command::ImportMpcorb { path, options } => {
            load_mpcorb(&open()?, &path, &options).map(Outcome::MpcorbImported)
        }
        Command::GenerateSql {
            csv,
            template,
            output,
        } => {
            let catalog = build_data_from_csv(&csv)?;
            let blocks = build_insert_blocks(&catalog);
            write_sql(&template, &output, &blocks)?;
            Ok(Outcome::SqlWritten {
                output,
                classes: blocks.classes.len(),
                asteroids: blocks.asteroids.len(),
                orbits: blocks.orbits.len(),
            })
        }
        Command::Monitor => monitor_snapshot(&open()?).map(|s| Outcome::Snapshot(Box::new(s))),
        Command::Search(term) => search_asteroids(&open()?, &term).map(Outcome::SearchResults),
        Command::CreateAlert(alert) => create_alert(&open()?, &alert).map(Outcome::AlertCreated),
        Command::ListAlerts(filter) => list_alerts(&open()?, &filter).map(Outcome::Alerts),
        Command::PollHighAlerts => {
            let db = open()?;
            let mut watch = watch.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            watch.poll(&db).map(Outcome::HighAlerts)
        }
    }
}

#[cfg(test)]
mod service_test {
    use super::*;
    use camino::Utf8Path;

    fn config(dir: &Utf8Path) -> LoaderConfig {
        LoaderConfig {
            database: "NEOs".into(),
            sqlite_path: Some(dir.join("neos.db")),
            ..Default::default()
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Response>) -> Response {
        rx.recv().await.expect("service response")
    }

    #[tokio::test]
    async fn test_commands_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        let (service, mut responses) = spawn_service(config(dir));

        let request = service.send(Command::TestConnection).unwrap();
        let response = next(&mut responses).await;
        assert_eq!(response.request, request);
        assert!(matches!(
            response.outcome,
            Ok(Outcome::Connected { asteroids: 0, .. })
        ));

        service.send(Command::PollHighAlerts).unwrap();
        assert!(matches!(
            next(&mut responses).await.outcome,
            Ok(Outcome::HighAlerts(HighAlertPoll::Baseline(0)))
        ));

        service
            .send(Command::CreateAlert(NewAlert {
                id_internal: 42,
                criteria: "close approach".into(),
                priority: 1,
                level: 4,
                generated_at: None,
            }))
            .unwrap();
        assert!(matches!(
            next(&mut responses).await.outcome,
            Err(LoaderError::InvalidAlert(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        let (service, mut responses) = spawn_service(config(dir));

        service
            .send(Command::ImportNeo {
                path: dir.join("missing.csv"),
                options: ImportOptions::default(),
                error_log: false,
            })
            .unwrap();
        assert!(matches!(
            next(&mut responses).await.outcome,
            Err(LoaderError::IoError(_))
        ));
    }
}
