mod common;

use common::{context, FixtureFetcher};
use footstats::error::{ScrapeError, ValidationError};
use footstats::infrastructure::FileSystemStore;
use footstats::services::jobs::{JobsFile, FOTMOB_OPERATIONS};
use footstats::services::scraping::ScrapingService;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn standings_fetcher() -> Arc<FixtureFetcher> {
    Arc::new(
        FixtureFetcher::new()
            .with(
                "leagues?id=112",
                json!({"table": [{"data": {"table": {"all": [
                    {"name": "Vélez Sarsfield", "pts": 50},
                    {"name": "Talleres", "pts": 48}
                ]}}}]}),
            )
            .with(
                "matchId=4393680",
                json!({
                    "general": {"teamColors": {
                        "darkMode": {"home": "#ffffff", "away": "#1a3c8f"},
                        "lightMode": {"home": "#8a1538", "away": "#0f2a70"}
                    }},
                    "content": {"matchFacts": {"momentum": {"main": {"data": [
                        {"minute": 1, "value": 35},
                        {"minute": 2, "value": 0},
                        {"minute": 3, "value": -60}
                    ]}}}}
                }),
            ),
    )
}

fn service(fetcher: Arc<FixtureFetcher>, dir: &TempDir) -> ScrapingService {
    ScrapingService::new(
        context(fetcher, Duration::ZERO),
        FileSystemStore::new(dir.path()),
    )
}

#[tokio::test]
async fn runner_saves_each_table() {
    let dir = TempDir::new().unwrap();
    let fetcher = standings_fetcher();
    let jobs = JobsFile::from_json(
        &json!({"jobs": [
            {"page": "Fotmob", "operation": "season_tables", "label": "arg",
             "params": {"league": "Liga Profesional", "season": "2024"}},
            {"page": "Fotmob", "operation": "match_momentum", "format": "json",
             "params": {"match_id": 4393680}}
        ]})
        .to_string(),
    )
    .unwrap();

    let results = service(fetcher.clone(), &dir).run_all(&jobs.jobs).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(fetcher.requests().len(), 2);

    let standings = &results[0];
    assert_eq!(standings.name, "Fotmob-season_tables-arg");
    let path = standings.saved.as_ref().unwrap();
    assert!(path.starts_with(dir.path()));
    assert_eq!(path.extension().unwrap(), "csv");
    let csv = std::fs::read_to_string(path).unwrap();
    assert!(csv.starts_with("name,pts"));
    assert!(csv.contains("Talleres"));

    let momentum = &results[1];
    assert_eq!(momentum.table.len(), 3);
    let path = momentum.saved.as_ref().unwrap();
    assert_eq!(path.extension().unwrap(), "json");
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(saved[2]["value"], json!(-60));
}

#[tokio::test]
async fn unsaved_jobs_write_nothing() {
    let dir = TempDir::new().unwrap();
    let jobs = JobsFile::from_json(
        r#"{"jobs": [{"page": "Sofascore", "operation": "momentum_bars", "save": false,
                      "params": {"match_url":
                        "https://www.sofascore.com/lanus-boca/abc#id:11352380"}}]}"#,
    )
    .unwrap();
    let fetcher = Arc::new(FixtureFetcher::new().with(
        "/event/11352380/graph",
        json!({"graphPoints": [
            {"minute": 1, "value": 20},
            {"minute": 2, "value": 0},
            {"minute": 3, "value": -5}
        ]}),
    ));

    let results = service(fetcher, &dir).run_all(&jobs.jobs).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].saved.is_none());
    assert_eq!(results[0].table.columns(), &["minute", "value", "side", "color"]);
    assert_eq!(results[0].table.len(), 2);
    assert_eq!(results[0].table.get(0, "color"), Some(&serde_json::Value::Null));
    assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
}

#[tokio::test]
async fn fotmob_momentum_bars_carry_team_colours() {
    let dir = TempDir::new().unwrap();
    let fetcher = standings_fetcher();
    let jobs = JobsFile::from_json(
        r#"{"jobs": [{"page": "Fotmob", "operation": "momentum_bars", "save": false,
                      "params": {"match_id": "4393680"}}]}"#,
    )
    .unwrap();

    let results = service(fetcher.clone(), &dir).run_all(&jobs.jobs).await.unwrap();

    assert_eq!(fetcher.requests().len(), 1);
    let table = &results[0].table;
    assert_eq!(table.columns(), &["minute", "value", "side", "color"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(0, "side"), Some(&json!("home")));
    assert_eq!(table.get(0, "color"), Some(&json!("#8a1538")));
    assert_eq!(table.get(1, "color"), Some(&json!("#1a3c8f")));
}

#[tokio::test]
async fn wrong_param_type_sends_no_request() {
    let dir = TempDir::new().unwrap();
    let fetcher = standings_fetcher();
    let jobs = JobsFile::from_json(
        r#"{"jobs": [{"page": "Fotmob", "operation": "season_tables",
                      "params": {"league": 112, "season": "2024"}}]}"#,
    )
    .unwrap();

    let err = service(fetcher.clone(), &dir).run_all(&jobs.jobs).await.unwrap_err();

    assert!(matches!(
        err,
        ScrapeError::Validation(ValidationError::InvalidType { ref param })
            if param.starts_with("league")
    ));
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn runner_stops_at_the_first_failure() {
    let dir = TempDir::new().unwrap();
    let fetcher = standings_fetcher();
    let jobs = JobsFile::from_json(
        r#"{"jobs": [
            {"page": "Fotmob", "operation": "season_tables",
             "params": {"league": "Primera Nacional", "season": "2024"}},
            {"page": "Fotmob", "operation": "season_tables",
             "params": {"league": "Liga Profesional", "season": "2024"}}
        ]}"#,
    )
    .unwrap();

    let err = service(fetcher.clone(), &dir).run_all(&jobs.jobs).await.unwrap_err();

    assert!(matches!(
        err,
        ScrapeError::Validation(ValidationError::InvalidLeague { .. })
    ));
    assert!(fetcher.requests().is_empty());
    assert!(!dir.path().exists() || std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn unknown_page_and_operation_are_rejected() {
    let dir = TempDir::new().unwrap();
    let service = service(Arc::new(FixtureFetcher::new()), &dir);

    let jobs =
        JobsFile::from_json(r#"{"jobs": [{"page": "Opta", "operation": "events"}]}"#).unwrap();
    let err = service.run_all(&jobs.jobs).await.unwrap_err();
    assert!(matches!(
        err,
        ScrapeError::Validation(ValidationError::UnknownPage { .. })
    ));

    let jobs =
        JobsFile::from_json(r#"{"jobs": [{"page": "Fotmob", "operation": "lineups"}]}"#).unwrap();
    match service.run_all(&jobs.jobs).await.unwrap_err() {
        ScrapeError::Validation(ValidationError::InvalidStat { param, value, allowed }) => {
            assert_eq!(param, "operation");
            assert_eq!(value, "lineups");
            assert_eq!(allowed.len(), FOTMOB_OPERATIONS.len());
        }
        other => panic!("unexpected {other:?}"),
    }
}
