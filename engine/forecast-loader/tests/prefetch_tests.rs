//! Load-phase tests against the sample league snapshot

use std::path::PathBuf;
use std::sync::Arc;

use forecast_core::{
    forecast_season, simulate_championship, ForecastError, RunControl, SimulationConfig,
    TrialPlan, WeekInput,
};
use forecast_loader::{ForecastDataSource, InMemorySource, LeagueSnapshot, LoaderError, Prefetcher};
use projection_merge::{stats, ScoringRules};

const LEAGUE: &str = "demo-league";

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/sample_league.json")
}

fn snapshot() -> LeagueSnapshot {
    let bytes = std::fs::read(fixture_path()).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn prefetcher(snapshot: LeagueSnapshot) -> Prefetcher {
    let source: Arc<dyn ForecastDataSource> = Arc::new(InMemorySource::from_snapshot(snapshot));
    Prefetcher::new(source, SimulationConfig::seeded(7, 400))
}

#[tokio::test]
async fn test_from_json_file() {
    let source = InMemorySource::from_json_file(fixture_path()).await.unwrap();
    let league = source.league_config(LEAGUE).await.unwrap();
    assert_eq!(league.teams, vec![1, 2, 3, 4]);
    assert_eq!(source.players(2024).await.unwrap().len(), 16);
}

#[tokio::test]
async fn test_missing_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = InMemorySource::from_json_file(dir.path().join("absent.json")).await;
    assert!(matches!(result, Err(LoaderError::Io(_))));
}

#[tokio::test]
async fn test_snapshot_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("league.json");
    tokio::fs::write(&path, serde_json::to_vec(&snapshot()).unwrap()).await.unwrap();

    let source = InMemorySource::from_json_file(&path).await.unwrap();
    let rosters = source.rosters(LEAGUE, 2).await.unwrap();
    assert_eq!(rosters[&1].starters, vec![101, 102, 103]);
}

#[tokio::test]
async fn test_load_week_locks_final_games() {
    let ctx = prefetcher(snapshot()).load_week(LEAGUE, 2).await.unwrap();

    // KC and BUF played in the final game
    let locked = ctx.locked_scores();
    assert_eq!(locked.len(), 5);
    assert!((locked[&101] - 23.6).abs() < 1e-9);
    assert!((locked[&102] - 12.6).abs() < 1e-9);
    assert!((locked[&201] - 13.24).abs() < 1e-9);

    // DAL is mid-game: not locked, but no longer swappable
    assert!(!ctx.is_locked(103));
    assert!(ctx.has_started(103));
    assert_eq!(ctx.projection(103), Some(14.2));
    assert_eq!(ctx.matchups().len(), 2);
}

#[tokio::test]
async fn test_load_week_applies_market_lines() {
    let ctx = prefetcher(snapshot()).load_week(LEAGUE, 2).await.unwrap();

    // 5 receptions at half a point, 90.5 market yards, 0.55 expected touchdowns
    let merged = ctx.projection(302).unwrap();
    assert!((merged - 14.85).abs() < 1e-9);

    let passer = ctx.projection(401).unwrap();
    assert!((passer - 18.62).abs() < 1e-9);

    // Traditional-only projection untouched
    let wr = ctx.projection(304).unwrap();
    assert!((wr - (3.5 + 8.8 + 3.6)).abs() < 1e-9);
}

#[tokio::test]
async fn test_correlations_respect_lookback() {
    let ctx = prefetcher(snapshot()).load_week(LEAGUE, 3).await.unwrap();
    // The 2019 record falls outside the one-year lookback
    assert_eq!(ctx.correlations().len(), 3);
    assert!(ctx.locked_scores().is_empty());
}

#[tokio::test]
async fn test_unknown_league() {
    let result = prefetcher(snapshot()).load_week("nope", 2).await;
    assert!(matches!(result, Err(LoaderError::LeagueNotFound { league_id }) if league_id == "nope"));
}

#[tokio::test]
async fn test_unknown_scoring_format() {
    let mut snapshot = snapshot();
    snapshot.league.scoring_format = "six_point_passing".to_string();
    let result = prefetcher(snapshot).load_week(LEAGUE, 2).await;
    assert!(matches!(
        result,
        Err(LoaderError::ScoringFormatNotFound { format_id, .. }) if format_id == "six_point_passing"
    ));
}

#[tokio::test]
async fn test_custom_scoring_format() {
    let mut snapshot = snapshot();
    let mut rules = ScoringRules::standard();
    rules.format_id = "six_point_passing".to_string();
    rules.points.insert(stats::PASSING_TDS.to_string(), 6.0);
    snapshot.league.scoring_format = rules.format_id.clone();
    snapshot.scoring_formats.push(rules);

    let ctx = prefetcher(snapshot).load_week(LEAGUE, 2).await.unwrap();
    assert!((ctx.locked_scores()[&101] - 29.6).abs() < 1e-9);
}

#[tokio::test]
async fn test_missing_week_schedule() {
    let result = prefetcher(snapshot()).load_week(LEAGUE, 9).await;
    assert!(matches!(result, Err(LoaderError::Source(_))));
}

#[tokio::test]
async fn test_load_season() {
    let loader = prefetcher(snapshot());
    let request = loader.load_season(LEAGUE, 2).await.unwrap();
    assert_eq!(request.remaining_weeks.len(), 2);
    assert_eq!(request.records.len(), 4);

    let mut request = request;
    request.trials.precompute_trials = 200;
    request.trials.season_trials = 500;
    let forecast =
        forecast_season(&request, &TrialPlan::new(500, 11), &RunControl::new()).unwrap();

    let playoff_total: f64 = forecast.teams.iter().map(|t| t.playoff_probability).sum();
    assert!((playoff_total - 2.0).abs() < 1e-9);
    let title_total: f64 = forecast.teams.iter().map(|t| t.championship_probability).sum();
    assert!((title_total - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_season_requires_settings() {
    let mut snapshot = snapshot();
    snapshot.league.season_settings = None;
    let result = prefetcher(snapshot).load_season(LEAGUE, 2).await;
    assert!(matches!(
        result,
        Err(LoaderError::Forecast(ForecastError::MissingSeasonConfig { .. }))
    ));
}

#[tokio::test]
async fn test_load_championship_mixes_actual_and_simulated() {
    let loader = prefetcher(snapshot());
    let request = loader.load_championship(LEAGUE, vec![1, 2], &[1, 2]).await.unwrap();

    match &request.weeks[0] {
        WeekInput::Actual { week, scores } => {
            assert_eq!(*week, 1);
            assert!((scores[&1] - 52.3).abs() < 1e-9);
            assert!((scores[&2] - 49.08).abs() < 1e-9);
        }
        other => panic!("week 1 should be final, got {other:?}"),
    }
    assert!(matches!(request.weeks[1], WeekInput::Simulated(_)));

    let result =
        simulate_championship(&request, &TrialPlan::new(400, 3), &RunControl::new()).unwrap();
    let total: f64 = result.teams.iter().map(|t| t.championship_probability).sum();
    assert!((total - 1.0).abs() < 1e-9);
}
