//! Correlation matrix assembly for a simulation scope
//!
//! Every pair of players is classified as a stack (same NFL team), a
//! bring-back (opponents in the same game) or independent, then resolved by
//! priority: historical pair → archetype default → position default →
//! game-outcome default → 0. Resolution never fails.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::CorrelationConfig;
use crate::error::{ForecastError, Result};
use crate::linalg;
use crate::types::{pair_key, CorrelationPair, NflTeam, Player, PlayerId, Position, RelationshipType, ScheduleEntry};

/// Historical correlations indexed by unordered pair, newest data year first
#[derive(Debug, Clone, Default)]
pub struct CorrelationLookup {
    pairs: HashMap<(PlayerId, PlayerId), Vec<CorrelationPair>>,
}

impl CorrelationLookup {
    pub fn new(records: impl IntoIterator<Item = CorrelationPair>) -> Self {
        let mut pairs: HashMap<(PlayerId, PlayerId), Vec<CorrelationPair>> = HashMap::new();
        for record in records {
            if record.player_a == record.player_b || !record.correlation.is_finite() {
                continue;
            }
            pairs.entry(record.key()).or_default().push(record);
        }
        for records in pairs.values_mut() {
            records.sort_by(|a, b| b.data_year.cmp(&a.data_year));
        }
        Self { pairs }
    }

    /// Number of distinct pairs with any history
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Most recent usable record for the pair: the season itself, else up to
    /// `lookback_years` earlier. Records for a different relationship are skipped.
    pub fn resolve(
        &self,
        a: PlayerId,
        b: PlayerId,
        relationship: RelationshipType,
        season: i32,
        lookback_years: i32,
    ) -> Option<&CorrelationPair> {
        self.pairs.get(&pair_key(a, b))?.iter().find(|record| {
            record.relationship_type == relationship
                && record.data_year <= season
                && record.data_year >= season - lookback_years
        })
    }
}

/// Position-level default for a relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionCorrelation {
    pub a: Position,
    pub b: Position,
    pub relationship: RelationshipType,
    pub correlation: f64,
}

/// Archetype-level default for a relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeCorrelation {
    pub a: String,
    pub b: String,
    pub relationship: RelationshipType,
    pub correlation: f64,
}

/// Generic game-script correlation when nothing more specific exists
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameOutcomeDefaults {
    pub same_team: f64,
    pub opponents: f64,
}

/// Default correlation tables used when a pair has no history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CorrelationDefaults {
    #[serde(default)]
    pub archetype: Vec<ArchetypeCorrelation>,
    #[serde(default)]
    pub position: Vec<PositionCorrelation>,
    #[serde(default)]
    pub game_outcome: Option<GameOutcomeDefaults>,
}

impl CorrelationDefaults {
    /// Stock tables for standard NFL fantasy stacks and bring-backs
    pub fn standard() -> Self {
        use Position::*;
        use RelationshipType::{CrossTeamSameGame as Opp, SameTeam as Team};

        let rows: [(Position, Position, RelationshipType, f64); 25] = [
            (QB, WR, Team, 0.35),
            (QB, TE, Team, 0.28),
            (QB, RB, Team, 0.10),
            (QB, K, Team, 0.12),
            (QB, DST, Team, 0.02),
            (RB, RB, Team, -0.15),
            (RB, WR, Team, -0.05),
            (RB, TE, Team, -0.04),
            (RB, K, Team, 0.10),
            (RB, DST, Team, 0.12),
            (WR, WR, Team, -0.05),
            (WR, TE, Team, -0.03),
            (K, DST, Team, 0.10),
            (QB, QB, Opp, 0.22),
            (QB, WR, Opp, 0.15),
            (QB, TE, Opp, 0.10),
            (QB, RB, Opp, 0.02),
            (WR, WR, Opp, 0.10),
            (WR, TE, Opp, 0.06),
            (RB, RB, Opp, -0.05),
            (QB, DST, Opp, -0.35),
            (RB, DST, Opp, -0.18),
            (WR, DST, Opp, -0.20),
            (TE, DST, Opp, -0.15),
            (K, DST, Opp, -0.15),
        ];

        Self {
            archetype: Vec::new(),
            position: rows
                .iter()
                .map(|&(a, b, relationship, correlation)| PositionCorrelation {
                    a,
                    b,
                    relationship,
                    correlation,
                })
                .collect(),
            game_outcome: Some(GameOutcomeDefaults { same_team: 0.05, opponents: 0.03 }),
        }
    }

    fn archetype_default(
        &self,
        a: &str,
        b: &str,
        relationship: RelationshipType,
    ) -> Option<f64> {
        self.archetype
            .iter()
            .find(|row| {
                row.relationship == relationship
                    && ((row.a == a && row.b == b) || (row.a == b && row.b == a))
            })
            .map(|row| row.correlation)
    }

    fn position_default(
        &self,
        a: Position,
        b: Position,
        relationship: RelationshipType,
    ) -> Option<f64> {
        self.position
            .iter()
            .find(|row| {
                row.relationship == relationship
                    && ((row.a == a && row.b == b) || (row.a == b && row.b == a))
            })
            .map(|row| row.correlation)
    }

    fn game_outcome_default(&self, relationship: RelationshipType) -> Option<f64> {
        let defaults = self.game_outcome?;
        match relationship {
            RelationshipType::SameTeam => Some(defaults.same_team),
            RelationshipType::CrossTeamSameGame => Some(defaults.opponents),
            RelationshipType::Independent => None,
        }
    }
}

/// Where a matrix cell's value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationSource {
    Historical,
    Archetype,
    Position,
    GameOutcome,
    /// Related pair with no data at all
    Unresolved,
    /// Players share no game
    Independent,
}

impl CorrelationSource {
    /// Cell came from a default (or nothing) instead of pair history
    pub fn is_fallback(&self) -> bool {
        !matches!(self, CorrelationSource::Historical | CorrelationSource::Independent)
    }
}

/// Classify a player pair against the week's schedule
pub fn classify(
    a: &Player,
    b: &Player,
    schedule: &HashMap<NflTeam, ScheduleEntry>,
) -> RelationshipType {
    if a.nfl_team == b.nfl_team {
        return RelationshipType::SameTeam;
    }
    match (schedule.get(&a.nfl_team), schedule.get(&b.nfl_team)) {
        (Some(game_a), Some(game_b))
            if game_a.game_id == game_b.game_id && game_a.opponent == b.nfl_team =>
        {
            RelationshipType::CrossTeamSameGame
        }
        _ => RelationshipType::Independent,
    }
}

/// Assembled, validated correlation matrix over an ordered player set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    player_ids: Vec<PlayerId>,
    values: Vec<f64>,
    used_fallback: bool,
    fallback_cells: usize,
    historical_cells: usize,
    regularized: bool,
}

impl CorrelationMatrix {
    /// Identity over a player set
    pub fn identity(player_ids: Vec<PlayerId>) -> Self {
        let n = player_ids.len();
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
        }
        Self {
            player_ids,
            values,
            used_fallback: false,
            fallback_cells: 0,
            historical_cells: 0,
            regularized: false,
        }
    }

    /// Build from explicit values; input is symmetrized, clamped and repaired
    pub fn from_values(
        player_ids: Vec<PlayerId>,
        mut values: Vec<f64>,
        min_eigenvalue: f64,
    ) -> Result<Self> {
        let n = player_ids.len();
        if values.len() != n * n {
            return Err(ForecastError::InvalidInput(format!(
                "correlation matrix has {} entries, expected {}",
                values.len(),
                n * n
            )));
        }
        for i in 0..n {
            values[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let v = (0.5 * (values[i * n + j] + values[j * n + i])).clamp(-1.0, 1.0);
                values[i * n + j] = v;
                values[j * n + i] = v;
            }
        }
        let regularized = linalg::clip_to_correlation(&mut values, n, min_eigenvalue);
        Ok(Self {
            player_ids,
            values,
            used_fallback: false,
            fallback_cells: 0,
            historical_cells: 0,
            regularized,
        })
    }

    pub fn dim(&self) -> usize {
        self.player_ids.len()
    }

    pub fn player_ids(&self) -> &[PlayerId] {
        &self.player_ids
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.dim() + j]
    }

    pub fn index_of(&self, player_id: PlayerId) -> Option<usize> {
        self.player_ids.iter().position(|id| *id == player_id)
    }

    /// Correlation between two players in the matrix
    pub fn between(&self, a: PlayerId, b: PlayerId) -> Option<f64> {
        Some(self.get(self.index_of(a)?, self.index_of(b)?))
    }

    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    pub fn fallback_cells(&self) -> usize {
        self.fallback_cells
    }

    pub fn historical_cells(&self) -> usize {
        self.historical_cells
    }

    pub fn regularized(&self) -> bool {
        self.regularized
    }

    /// Symmetric, unit diagonal, entries within [-1, 1]
    pub fn is_valid(&self) -> bool {
        let n = self.dim();
        (0..n).all(|i| {
            self.get(i, i) == 1.0
                && (0..n).all(|j| {
                    let v = self.get(i, j);
                    v == self.get(j, i) && (-1.0..=1.0).contains(&v)
                })
        })
    }
}

/// Builds correlation matrices from history and default tables
pub struct CorrelationMatrixBuilder<'a> {
    lookup: &'a CorrelationLookup,
    defaults: &'a CorrelationDefaults,
    config: &'a CorrelationConfig,
    season: i32,
}

impl<'a> CorrelationMatrixBuilder<'a> {
    pub fn new(
        lookup: &'a CorrelationLookup,
        defaults: &'a CorrelationDefaults,
        config: &'a CorrelationConfig,
        season: i32,
    ) -> Self {
        let season = config.season.unwrap_or(season);
        Self { lookup, defaults, config, season }
    }

    /// Resolve one pair's correlation and where it came from
    pub fn resolve(
        &self,
        a: &Player,
        b: &Player,
        relationship: RelationshipType,
    ) -> (f64, CorrelationSource) {
        if relationship == RelationshipType::Independent {
            return (0.0, CorrelationSource::Independent);
        }

        if let Some(record) =
            self.lookup.resolve(a.id, b.id, relationship, self.season, self.config.lookback_years)
        {
            return (record.correlation, CorrelationSource::Historical);
        }

        if let (Some(arch_a), Some(arch_b)) = (a.archetype.as_deref(), b.archetype.as_deref()) {
            if let Some(value) = self.defaults.archetype_default(arch_a, arch_b, relationship) {
                return (value, CorrelationSource::Archetype);
            }
        }

        if let Some(value) = self.defaults.position_default(a.position, b.position, relationship) {
            return (value, CorrelationSource::Position);
        }

        if let Some(value) = self.defaults.game_outcome_default(relationship) {
            return (value, CorrelationSource::GameOutcome);
        }

        (0.0, CorrelationSource::Unresolved)
    }

    /// Assemble the matrix for `players` in the given order
    pub fn build(
        &self,
        players: &[&Player],
        schedule: &HashMap<NflTeam, ScheduleEntry>,
    ) -> CorrelationMatrix {
        let n = players.len();
        let cap = self.config.max_abs_correlation;
        let mut values = vec![0.0; n * n];
        let mut fallback_cells = 0;
        let mut historical_cells = 0;

        for i in 0..n {
            values[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let relationship = classify(players[i], players[j], schedule);
                let (value, source) = self.resolve(players[i], players[j], relationship);
                if source.is_fallback() {
                    fallback_cells += 1;
                } else if source == CorrelationSource::Historical {
                    historical_cells += 1;
                }
                let value = if value.is_finite() { value.clamp(-cap, cap) } else { 0.0 };
                values[i * n + j] = value;
                values[j * n + i] = value;
            }
        }

        let regularized = linalg::clip_to_correlation(&mut values, n, self.config.min_eigenvalue);
        if regularized {
            tracing::debug!(
                dimension = n,
                "assembled correlation matrix was not PSD; eigenvalues clipped"
            );
        }

        CorrelationMatrix {
            player_ids: players.iter().map(|p| p.id).collect(),
            values,
            used_fallback: fallback_cells > 0,
            fallback_cells,
            historical_cells,
            regularized,
        }
    }
}
