//! Unit tests for configuration, context assembly and matrix invariants

use std::collections::HashMap;

use crate::config::{CorrelationConfig, ShapeHint};
use crate::correlation::{CorrelationDefaults, CorrelationLookup, CorrelationMatrixBuilder};
use crate::types::{GameStatus, Player, PlayerId, Position};
use crate::{
    DistributionParams, ForecastError, PlayerState, SimulationConfig, SimulationContext,
    DEFAULT_CHUNK_SIZE, DEFAULT_PRECOMPUTE_TRIALS, DEFAULT_TRIALS,
};

fn player(id: PlayerId, position: Position, team: &str) -> Player {
    Player { id, name: format!("P{id}"), position, nfl_team: team.to_string(), archetype: None }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_simulation_config_default() {
        let config = SimulationConfig::default();
        assert_eq!(config.n_trials, DEFAULT_TRIALS);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.season.precompute_trials, DEFAULT_PRECOMPUTE_TRIALS);
        assert_eq!(config.seed, None);
        assert!(config.correlation.copula_adjustment);
        assert_eq!(config.distribution.default_cv, 0.45);
        assert_eq!(config.distribution.rookie_cv, 0.60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_position_shapes() {
        let config = SimulationConfig::default();
        let qb = config.distribution.shape_for(Position::QB);
        assert_eq!(qb.floor, -4.0);
        assert_eq!(qb.hint, ShapeHint::HighVolume);
        assert_eq!(config.distribution.shape_for(Position::DST).floor, -10.0);
        assert_eq!(config.distribution.shape_for(Position::WR).hint, ShapeHint::TouchdownDependent);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = SimulationConfig::default();
        config.n_trials = 0;
        assert!(matches!(config.validate(), Err(ForecastError::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.correlation.max_abs_correlation = 1.5;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.thread_pool_size = Some(0);
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.correlation.min_eigenvalue = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.toml");
        let mut config = SimulationConfig::seeded(99, 5000);
        config.timeout_ms = Some(30_000);
        config.to_file(&path).unwrap();

        let loaded = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.timeout().unwrap().as_secs(), 30);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "n_trials = 2500\n\n[correlation]\nlookback_years = 2\n").unwrap();

        let loaded = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(loaded.n_trials, 2500);
        assert_eq!(loaded.correlation.lookback_years, 2);
        assert_eq!(loaded.correlation.max_abs_correlation, 0.95);
        assert_eq!(loaded.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_invalid_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "n_trials = 0\n").unwrap();
        assert!(SimulationConfig::from_file(&path).is_err());
    }
}

#[cfg(test)]
mod context_tests {
    use super::*;

    fn context() -> SimulationContext {
        SimulationContext::builder("L", 2024, 7)
            .players(vec![
                player(1, Position::QB, "KC"),
                player(2, Position::WR, "BUF"),
                player(3, Position::RB, "NYJ"),
                player(4, Position::TE, "DAL"),
                player(5, Position::K, "KC"),
            ])
            .projection(1, 21.0)
            .projection(2, 14.0)
            .projection(3, 12.0)
            .projection(4, 8.0)
            .game(1, "KC", "BUF", GameStatus::InProgress)
            .game(2, "DAL", "PHI", GameStatus::Final)
            .locked_score(4, 6.4)
            .build()
            .unwrap()
    }

    #[test]
    fn test_player_states() {
        let ctx = context();
        assert!(matches!(ctx.player_state(1), PlayerState::Pending { game_id: 1, .. }));
        // NYJ has no game this week
        assert_eq!(ctx.player_state(3), PlayerState::Bye);
        assert_eq!(ctx.player_state(4), PlayerState::Locked { score: 6.4 });
        // pending game, no projection
        assert_eq!(ctx.player_state(5), PlayerState::Unprojected);
        assert_eq!(ctx.player_state(999), PlayerState::Unprojected);
    }

    #[test]
    fn test_lock_and_start_flags() {
        let ctx = context();
        assert!(ctx.has_started(1));
        assert!(!ctx.is_locked(1));
        assert!(ctx.is_locked(4));
        assert!(!ctx.has_started(3));
    }

    #[test]
    fn test_pending_params_follow_projection() {
        let ctx = context();
        match ctx.player_state(2) {
            PlayerState::Pending { params, .. } => {
                assert!((params.mean() - 14.0).abs() < 1e-9);
                assert!(!matches!(params, DistributionParams::Constant { .. }));
            }
            other => panic!("expected pending, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_locked_score_rejected() {
        let result = SimulationContext::builder("L", 2024, 1).locked_score(1, f64::NAN).build();
        assert!(matches!(result, Err(ForecastError::InvalidInput(_))));
    }

    #[test]
    fn test_seeded_plan_is_stable() {
        let ctx = SimulationContext::builder("L", 2024, 1)
            .config(SimulationConfig::seeded(5, 100))
            .build()
            .unwrap();
        assert_eq!(ctx.trial_plan().seed, 5);
        assert_eq!(ctx.trial_plan().n_trials, 100);
    }

    #[test]
    fn test_dedicated_pool() {
        let mut config = SimulationConfig::default();
        config.thread_pool_size = Some(2);
        let ctx = SimulationContext::builder("L", 2024, 1).config(config).build().unwrap();
        let threads = ctx.install(|| Ok(rayon::current_num_threads())).unwrap();
        assert_eq!(threads, 2);
    }
}

#[cfg(test)]
mod matrix_property_tests {
    use super::*;
    use proptest::prelude::*;

    const TEAMS: [&str; 4] = ["KC", "BUF", "DAL", "PHI"];

    fn schedule() -> HashMap<String, crate::ScheduleEntry> {
        let entry = |game_id, opponent: &str| crate::ScheduleEntry {
            game_id,
            opponent: opponent.to_string(),
            status: GameStatus::Scheduled,
            kickoff: None,
        };
        HashMap::from([
            ("KC".to_string(), entry(1, "BUF")),
            ("BUF".to_string(), entry(1, "KC")),
            ("DAL".to_string(), entry(2, "PHI")),
            ("PHI".to_string(), entry(2, "DAL")),
        ])
    }

    fn arb_players() -> impl Strategy<Value = Vec<Player>> {
        prop::collection::vec((0usize..6, 0usize..4), 1..12).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (pos, team))| player(i as PlayerId + 1, Position::ALL[pos], TEAMS[team]))
                .collect()
        })
    }

    fn arb_history() -> impl Strategy<Value = Vec<(u32, u32, f64)>> {
        prop::collection::vec((1u32..12, 1u32..12, -1.0f64..1.0), 0..30)
    }

    proptest! {
        #[test]
        fn prop_matrix_symmetric_unit_diagonal_bounded(
            players in arb_players(),
            history in arb_history(),
        ) {
            let schedule = schedule();
            let records: Vec<_> = history
                .into_iter()
                .filter_map(|(a, b, correlation)| {
                    let pa = players.iter().find(|p| p.id == a)?;
                    let pb = players.iter().find(|p| p.id == b)?;
                    let relationship_type = crate::correlation::classify(pa, pb, &schedule);
                    Some(crate::CorrelationPair {
                        player_a: a,
                        player_b: b,
                        correlation,
                        relationship_type,
                        games_together: 8,
                        data_year: 2024,
                    })
                })
                .collect();

            let lookup = CorrelationLookup::new(records);
            let defaults = CorrelationDefaults::standard();
            let config = CorrelationConfig::default();
            let builder = CorrelationMatrixBuilder::new(&lookup, &defaults, &config, 2024);
            let refs: Vec<&Player> = players.iter().collect();
            let matrix = builder.build(&refs, &schedule);

            prop_assert!(matrix.is_valid());
            prop_assert_eq!(matrix.dim(), players.len());
            prop_assert!(crate::linalg::min_eigenvalue(matrix.values(), matrix.dim()) > -1e-9);
        }

        #[test]
        fn prop_matrix_always_factorizes(players in arb_players()) {
            let lookup = CorrelationLookup::default();
            let defaults = CorrelationDefaults::standard();
            let config = CorrelationConfig::default();
            let builder = CorrelationMatrixBuilder::new(&lookup, &defaults, &config, 2024);
            let refs: Vec<&Player> = players.iter().collect();
            let matrix = builder.build(&refs, &schedule());
            let params = vec![DistributionParams::Constant { value: 0.0 }; matrix.dim()];
            prop_assert!(crate::sampler::CorrelatedSampler::new(&matrix, params, &config).is_ok());
        }
    }
}

#[cfg(test)]
mod serialization_tests {
    use super::*;

    #[test]
    fn test_position_accepts_def_alias() {
        let dst: Position = serde_json::from_str("\"DEF\"").unwrap();
        assert_eq!(dst, Position::DST);
        assert_eq!(serde_json::to_string(&Position::WR).unwrap(), "\"WR\"");
    }

    #[test]
    fn test_distribution_params_are_tagged() {
        let params = DistributionParams::FlooredNormal { mean: 7.0, std: 4.0, floor: -10.0 };
        let json = serde_json::to_value(params).unwrap();
        assert_eq!(json["type"], "floored_normal");
        let back: DistributionParams = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_worker_threads() {
        let mut config = SimulationConfig::default();
        assert!(config.worker_threads() >= 1);
        config.thread_pool_size = Some(3);
        assert_eq!(config.worker_threads(), 3);
    }
}
