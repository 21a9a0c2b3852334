mod common;

use common::{Workspace, EROS_TWO_ROWS};
use neo_loader::alerts::{AlertFilter, HighAlertPoll, NewAlert};
use neo_loader::config::LoaderConfig;
use neo_loader::ingest::ImportOptions;
use neo_loader::service::{spawn_service, Command, Outcome, Response};
use tokio::sync::mpsc::UnboundedReceiver;

async fn outcome(responses: &mut UnboundedReceiver<Response>) -> Outcome {
    responses.recv().await.unwrap().outcome.unwrap()
}

#[test]
fn legacy_configuration_is_discovered() {
    let ws = Workspace::new();
    ws.write(
        "ultima_configuracao.cfg",
        "Servidor=db.local\nPorta=1433\nUtilizador=sa\nPassword=secret\nBase de Dados=NEOs\n",
    );

    let (config, path) = LoaderConfig::discover(ws.root()).unwrap();
    assert_eq!(path.file_name(), Some("ultima_configuracao.cfg"));
    assert_eq!(config.server, "db.local");
    assert_eq!(config.database, "NEOs");

    let saved = ws.path("loader_config.json");
    config.save(&saved).unwrap();
    let (reloaded, path) = LoaderConfig::discover(ws.root()).unwrap();
    assert_eq!(path, saved);
    assert_eq!(reloaded, config);
}

#[tokio::test]
async fn import_then_alert_and_monitor() {
    let ws = Workspace::new();
    let csv = ws.write("eros.csv", EROS_TWO_ROWS);
    let config = LoaderConfig {
        database: "NEOs".into(),
        sqlite_path: Some(ws.path("neos.db")),
        notify_high: true,
        ..Default::default()
    };
    let (service, mut responses) = spawn_service(config);

    service
        .send(Command::ImportNeo {
            path: csv,
            options: ImportOptions::default(),
            error_log: true,
        })
        .unwrap();
    let Outcome::NeoImported(report) = outcome(&mut responses).await else {
        panic!("unexpected outcome");
    };
    assert_eq!(report.asteroids_inserted, 1);

    service.send(Command::Search("eros".into())).unwrap();
    let Outcome::SearchResults(found) = outcome(&mut responses).await else {
        panic!("unexpected outcome");
    };
    assert_eq!(found.len(), 1);
    let eros = found[0].id_internal;

    service.send(Command::PollHighAlerts).unwrap();
    assert_eq!(
        outcome(&mut responses).await,
        Outcome::HighAlerts(HighAlertPoll::Baseline(0))
    );

    service
        .send(Command::CreateAlert(NewAlert {
            id_internal: eros,
            criteria: "MOID below 0.05 au".into(),
            priority: 1,
            level: 4,
            generated_at: Some("2025-01-02 03:04:05".into()),
        }))
        .unwrap();
    let Outcome::AlertCreated(alert) = outcome(&mut responses).await else {
        panic!("unexpected outcome");
    };

    service.send(Command::PollHighAlerts).unwrap();
    let Outcome::HighAlerts(HighAlertPoll::NewAlerts(new)) = outcome(&mut responses).await else {
        panic!("unexpected outcome");
    };
    assert_eq!(new.len(), 1);
    assert_eq!(new[0].id_alert, alert);

    service
        .send(Command::ListAlerts(AlertFilter {
            priority: Some(2),
            level: None,
        }))
        .unwrap();
    assert_eq!(outcome(&mut responses).await, Outcome::Alerts(vec![]));

    service.send(Command::Monitor).unwrap();
    let Outcome::Snapshot(snapshot) = outcome(&mut responses).await else {
        panic!("unexpected outcome");
    };
    assert_eq!(snapshot.asteroids, 1);
    assert_eq!(snapshot.orbits, 1);
    assert_eq!(snapshot.high_priority_alerts, 1);
    assert_eq!(snapshot.red_alerts, 1);
}
