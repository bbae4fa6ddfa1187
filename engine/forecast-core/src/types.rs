//! Domain types shared by every orchestration level

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Player identifier
pub type PlayerId = u32;

/// Fantasy team identifier
pub type TeamId = u32;

/// NFL game identifier
pub type GameId = u32;

/// Fantasy matchup identifier
pub type MatchupId = u32;

/// NFL team abbreviation (e.g. "BAL", "BUF")
pub type NflTeam = String;

/// Fantasy position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    #[serde(alias = "DEF")]
    DST,
}

impl Position {
    pub const ALL: [Position; 6] =
        [Position::QB, Position::RB, Position::WR, Position::TE, Position::K, Position::DST];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::K => "K",
            Position::DST => "DST",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Real-world game state for an NFL team in the simulated week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Scheduled,
    InProgress,
    Final,
}

impl GameStatus {
    /// Game has kicked off (players can no longer be swapped)
    pub fn has_started(&self) -> bool {
        !matches!(self, GameStatus::Scheduled)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, GameStatus::Final)
    }
}

/// One NFL team's game for the week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub game_id: GameId,
    pub opponent: NflTeam,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub kickoff: Option<DateTime<Utc>>,
}

/// Historical scoring variance for a player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceProfile {
    pub mean: f64,
    pub std: f64,
    #[serde(alias = "coefficient_of_variation")]
    pub cv: f64,
    pub games_played: u32,
}

/// A player as seen by one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    pub position: Position,
    pub nfl_team: NflTeam,
    #[serde(default)]
    pub archetype: Option<String>,
}

/// Fantasy roster for a week; only starters score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Roster {
    pub starters: Vec<PlayerId>,
    #[serde(default)]
    pub bench: Vec<PlayerId>,
}

impl Roster {
    pub fn new(starters: Vec<PlayerId>) -> Self {
        Self { starters, bench: Vec::new() }
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.starters.contains(&player_id) || self.bench.contains(&player_id)
    }
}

/// A fantasy matchup between two or more teams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub matchup_id: MatchupId,
    pub teams: Vec<TeamId>,
}

impl Matchup {
    pub fn head_to_head(matchup_id: MatchupId, home: TeamId, away: TeamId) -> Self {
        Self { matchup_id, teams: vec![home, away] }
    }
}

/// How two players relate for correlation purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Same NFL team ("stack")
    SameTeam,
    /// Opposing teams in the same NFL game ("bring-back")
    CrossTeamSameGame,
    /// No shared game
    Independent,
}

/// Historical pairwise correlation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub player_a: PlayerId,
    pub player_b: PlayerId,
    pub correlation: f64,
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub games_together: u32,
    pub data_year: i32,
}

impl CorrelationPair {
    /// Undirected key for the pair
    pub fn key(&self) -> (PlayerId, PlayerId) {
        pair_key(self.player_a, self.player_b)
    }
}

/// Normalize an unordered player pair
pub fn pair_key(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// League-level settings that must exist before any run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueConfig {
    pub league_id: String,
    pub season: i32,
    pub scoring_format: String,
    /// Fantasy teams in league order (used for deterministic tie-breaks)
    pub teams: Vec<TeamId>,
    #[serde(default)]
    pub divisions: BTreeMap<String, Vec<TeamId>>,
    #[serde(default)]
    pub season_settings: Option<SeasonSettings>,
}

impl LeagueConfig {
    pub fn contains_team(&self, team_id: TeamId) -> bool {
        self.teams.contains(&team_id)
    }

    /// League-order index of a team, used as the final tie-break
    pub fn team_rank(&self, team_id: TeamId) -> usize {
        self.teams.iter().position(|t| *t == team_id).unwrap_or(usize::MAX)
    }
}

/// Regular-season and playoff structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSettings {
    pub regular_season_weeks: u32,
    pub playoff_teams: usize,
    #[serde(default)]
    pub bye_teams: usize,
}

/// Win/loss record for one team
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TeamRecord {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: f64,
}

impl TeamRecord {
    pub fn games(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Win percentage with ties counted as half a win
    pub fn win_pct(&self) -> f64 {
        let games = self.games();
        if games == 0 {
            return 0.0;
        }
        (self.wins as f64 + 0.5 * self.ties as f64) / games as f64
    }
}
