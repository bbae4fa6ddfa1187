//! Immutable per-run simulation context
//!
//! Everything the compute phase reads is gathered here once, after the load
//! phase finishes. Nothing in the context changes during a run, so it is
//! shared by reference across rayon workers.

use rand::RngCore;
use std::collections::HashMap;

use crate::config::SimulationConfig;
use crate::correlation::{CorrelationDefaults, CorrelationLookup, CorrelationMatrixBuilder};
use crate::distribution::{DistributionFitter, DistributionParams};
use crate::error::{ForecastError, Result};
use crate::types::{
    CorrelationPair, GameId, GameStatus, Matchup, NflTeam, Player, PlayerId, Roster,
    ScheduleEntry, TeamId, VarianceProfile,
};

/// Resolved trial parameters for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialPlan {
    pub n_trials: usize,
    pub seed: u64,
    pub chunk_size: usize,
    pub keep_trial_vectors: bool,
}

impl TrialPlan {
    pub fn new(n_trials: usize, seed: u64) -> Self {
        Self {
            n_trials,
            seed,
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            keep_trial_vectors: false,
        }
    }

    /// Plan from a config, drawing a fresh seed when none is configured
    pub fn from_config(config: &SimulationConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| rand::rngs::OsRng.next_u64());
        Self {
            n_trials: config.n_trials,
            seed,
            chunk_size: config.chunk_size,
            keep_trial_vectors: config.keep_trial_vectors,
        }
    }

    pub fn with_trials(mut self, n_trials: usize) -> Self {
        self.n_trials = n_trials;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// How a player participates in a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerState {
    /// Game is over (or an actual score was supplied): constant score
    Locked { score: f64 },
    /// Game not final: sampled within its NFL game
    Pending { game_id: GameId, params: DistributionParams },
    /// Team has no game this week
    Bye,
    /// No actual score and no projection: contributes zero
    Unprojected,
}

/// Read-only inputs for one simulation run
#[derive(Debug, Clone)]
pub struct SimulationContext {
    league_id: String,
    season: i32,
    week: u32,
    players: HashMap<PlayerId, Player>,
    projections: HashMap<PlayerId, f64>,
    variance: HashMap<PlayerId, VarianceProfile>,
    correlations: CorrelationLookup,
    defaults: CorrelationDefaults,
    schedule: HashMap<NflTeam, ScheduleEntry>,
    rosters: HashMap<TeamId, Roster>,
    matchups: Vec<Matchup>,
    locked_scores: HashMap<PlayerId, f64>,
    config: SimulationConfig,
}

impl SimulationContext {
    pub fn builder(league_id: impl Into<String>, season: i32, week: u32) -> SimulationContextBuilder {
        SimulationContextBuilder::new(league_id.into(), season, week)
    }

    pub fn league_id(&self) -> &str {
        &self.league_id
    }

    pub fn season(&self) -> i32 {
        self.season
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.get(&player_id)
    }

    pub fn players(&self) -> &HashMap<PlayerId, Player> {
        &self.players
    }

    pub fn projection(&self, player_id: PlayerId) -> Option<f64> {
        self.projections.get(&player_id).copied()
    }

    pub fn variance(&self, player_id: PlayerId) -> Option<&VarianceProfile> {
        self.variance.get(&player_id)
    }

    pub fn schedule(&self) -> &HashMap<NflTeam, ScheduleEntry> {
        &self.schedule
    }

    pub fn rosters(&self) -> &HashMap<TeamId, Roster> {
        &self.rosters
    }

    pub fn matchups(&self) -> &[Matchup] {
        &self.matchups
    }

    pub fn locked_scores(&self) -> &HashMap<PlayerId, f64> {
        &self.locked_scores
    }

    pub fn correlations(&self) -> &CorrelationLookup {
        &self.correlations
    }

    pub fn correlation_defaults(&self) -> &CorrelationDefaults {
        &self.defaults
    }

    /// Roster for a team, required to exist
    pub fn roster(&self, team_id: TeamId) -> Result<&Roster> {
        self.rosters
            .get(&team_id)
            .ok_or(ForecastError::MissingRoster { team_id, week: self.week })
    }

    /// Schedule entry for a player's NFL team (`None` on bye or unknown player)
    pub fn game_for(&self, player_id: PlayerId) -> Option<&ScheduleEntry> {
        let player = self.players.get(&player_id)?;
        self.schedule.get(&player.nfl_team)
    }

    /// Real-world game status for a player
    pub fn game_status(&self, player_id: PlayerId) -> Option<GameStatus> {
        self.game_for(player_id).map(|entry| entry.status)
    }

    /// Player's game has kicked off (cannot be swapped)
    pub fn has_started(&self, player_id: PlayerId) -> bool {
        self.locked_scores.contains_key(&player_id)
            || self.game_status(player_id).map(|s| s.has_started()).unwrap_or(false)
    }

    /// Player's score is known
    pub fn is_locked(&self, player_id: PlayerId) -> bool {
        self.locked_scores.contains_key(&player_id)
            || self.game_status(player_id).map(|s| s.is_final()).unwrap_or(false)
    }

    /// Correlation builder bound to this context's tables
    pub fn correlation_builder(&self) -> CorrelationMatrixBuilder<'_> {
        CorrelationMatrixBuilder::new(
            &self.correlations,
            &self.defaults,
            &self.config.correlation,
            self.season,
        )
    }

    /// Decide how a player participates in this run
    pub fn player_state(&self, player_id: PlayerId) -> PlayerState {
        if let Some(score) = self.locked_scores.get(&player_id) {
            return PlayerState::Locked { score: *score };
        }

        let Some(player) = self.players.get(&player_id) else {
            return PlayerState::Unprojected;
        };
        let Some(entry) = self.schedule.get(&player.nfl_team) else {
            return PlayerState::Bye;
        };
        if entry.status.is_final() {
            // Final game with no recorded score
            return PlayerState::Unprojected;
        }

        match self.projections.get(&player_id) {
            Some(mean) if mean.is_finite() => {
                let fitter = DistributionFitter::new(&self.config.distribution);
                let params = fitter.fit(player.position, *mean, self.variance.get(&player_id));
                PlayerState::Pending { game_id: entry.game_id, params }
            }
            _ => PlayerState::Unprojected,
        }
    }

    /// Resolve the trial plan, drawing a fresh seed when none is configured
    pub fn trial_plan(&self) -> TrialPlan {
        TrialPlan::from_config(&self.config)
    }

    /// Run `f` on the configured thread pool
    pub fn install<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send,
        T: Send,
    {
        self.config.install(f)
    }
}

/// Builder for [`SimulationContext`]
#[derive(Debug, Clone)]
pub struct SimulationContextBuilder {
    league_id: String,
    season: i32,
    week: u32,
    players: HashMap<PlayerId, Player>,
    projections: HashMap<PlayerId, f64>,
    variance: HashMap<PlayerId, VarianceProfile>,
    correlations: Vec<CorrelationPair>,
    defaults: CorrelationDefaults,
    schedule: HashMap<NflTeam, ScheduleEntry>,
    rosters: HashMap<TeamId, Roster>,
    matchups: Vec<Matchup>,
    locked_scores: HashMap<PlayerId, f64>,
    config: SimulationConfig,
}

impl SimulationContextBuilder {
    fn new(league_id: String, season: i32, week: u32) -> Self {
        Self {
            league_id,
            season,
            week,
            players: HashMap::new(),
            projections: HashMap::new(),
            variance: HashMap::new(),
            correlations: Vec::new(),
            defaults: CorrelationDefaults::standard(),
            schedule: HashMap::new(),
            rosters: HashMap::new(),
            matchups: Vec::new(),
            locked_scores: HashMap::new(),
            config: SimulationConfig::default(),
        }
    }

    pub fn players(mut self, players: impl IntoIterator<Item = Player>) -> Self {
        self.players.extend(players.into_iter().map(|p| (p.id, p)));
        self
    }

    pub fn player(mut self, player: Player) -> Self {
        self.players.insert(player.id, player);
        self
    }

    pub fn projections(mut self, projections: HashMap<PlayerId, f64>) -> Self {
        self.projections.extend(projections);
        self
    }

    pub fn projection(mut self, player_id: PlayerId, points: f64) -> Self {
        self.projections.insert(player_id, points);
        self
    }

    pub fn variance(mut self, variance: HashMap<PlayerId, VarianceProfile>) -> Self {
        self.variance.extend(variance);
        self
    }

    pub fn correlations(mut self, pairs: impl IntoIterator<Item = CorrelationPair>) -> Self {
        self.correlations.extend(pairs);
        self
    }

    pub fn correlation_defaults(mut self, defaults: CorrelationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn schedule(mut self, schedule: HashMap<NflTeam, ScheduleEntry>) -> Self {
        self.schedule.extend(schedule);
        self
    }

    /// Add a game between two NFL teams
    pub fn game(mut self, game_id: GameId, home: &str, away: &str, status: GameStatus) -> Self {
        self.schedule.insert(
            home.to_string(),
            ScheduleEntry { game_id, opponent: away.to_string(), status, kickoff: None },
        );
        self.schedule.insert(
            away.to_string(),
            ScheduleEntry { game_id, opponent: home.to_string(), status, kickoff: None },
        );
        self
    }

    pub fn rosters(mut self, rosters: HashMap<TeamId, Roster>) -> Self {
        self.rosters.extend(rosters);
        self
    }

    pub fn roster(mut self, team_id: TeamId, roster: Roster) -> Self {
        self.rosters.insert(team_id, roster);
        self
    }

    pub fn matchups(mut self, matchups: impl IntoIterator<Item = Matchup>) -> Self {
        self.matchups.extend(matchups);
        self
    }

    pub fn locked_scores(mut self, scores: HashMap<PlayerId, f64>) -> Self {
        self.locked_scores.extend(scores);
        self
    }

    pub fn locked_score(mut self, player_id: PlayerId, score: f64) -> Self {
        self.locked_scores.insert(player_id, score);
        self
    }

    pub fn config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<SimulationContext> {
        self.config.validate()?;

        if let Some((player_id, _)) = self.locked_scores.iter().find(|(_, s)| !s.is_finite()) {
            return Err(ForecastError::InvalidInput(format!(
                "locked score for player {player_id} is not finite"
            )));
        }
        for matchup in &self.matchups {
            if matchup.teams.len() < 2 {
                return Err(ForecastError::InvalidTeamCount {
                    matchup_id: matchup.matchup_id,
                    count: matchup.teams.len(),
                });
            }
        }

        Ok(SimulationContext {
            league_id: self.league_id,
            season: self.season,
            week: self.week,
            players: self.players,
            projections: self.projections,
            variance: self.variance,
            correlations: CorrelationLookup::new(self.correlations),
            defaults: self.defaults,
            schedule: self.schedule,
            rosters: self.rosters,
            matchups: self.matchups,
            locked_scores: self.locked_scores,
            config: self.config,
        })
    }
}
