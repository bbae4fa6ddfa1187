//! Command line interface

use clap::{Parser, Subcommand};
use forecast_core::{MatchupId, TeamId};
use std::path::PathBuf;

/// Fantasy football forecasts from a league snapshot
#[derive(Debug, Parser)]
#[command(name = "forecast-service")]
#[command(about = "Correlated Monte Carlo forecasts for fantasy football leagues")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// League snapshot (JSON); overrides the configured one
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// League id; overrides the configured one
    #[arg(short, long)]
    pub league: Option<String>,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Monte Carlo trials
    #[arg(long)]
    pub trials: Option<usize>,

    /// Include raw per-trial vectors in matchup output
    #[arg(long)]
    pub vectors: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Win probabilities for one matchup
    Matchup {
        #[arg(long)]
        week: u32,
        #[arg(long = "id")]
        matchup_id: MatchupId,
    },
    /// Every matchup of a league week from one shared simulation
    Week {
        #[arg(long)]
        week: u32,
    },
    /// Multi-week championship odds; teams listed in seed order
    Championship {
        #[arg(long, value_delimiter = ',', required = true)]
        weeks: Vec<u32>,
        #[arg(long, value_delimiter = ',', required = true)]
        teams: Vec<TeamId>,
        /// Required participant count
        #[arg(long)]
        expected_teams: Option<usize>,
    },
    /// Playoff, bye and title odds for the rest of the regular season
    Season {
        #[arg(long)]
        from_week: u32,
    },
    /// Rank bench-for-starter swaps by win-probability delta
    Swaps {
        #[arg(long)]
        week: u32,
        #[arg(long)]
        team: TeamId,
    },
    /// Compare the highest-projected lineup against the current one
    Lineup {
        #[arg(long)]
        week: u32,
        #[arg(long)]
        team: TeamId,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Matchup { .. } => "matchup",
            Command::Week { .. } => "week",
            Command::Championship { .. } => "championship",
            Command::Season { .. } => "season",
            Command::Swaps { .. } => "swaps",
            Command::Lineup { .. } => "lineup",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_championship() {
        let cli = Cli::try_parse_from([
            "forecast",
            "--league",
            "demo-league",
            "--seed",
            "9",
            "championship",
            "--weeks",
            "15,16",
            "--teams",
            "3,1",
        ])
        .unwrap();
        assert_eq!(cli.seed, Some(9));
        match cli.command {
            Command::Championship { weeks, teams, expected_teams } => {
                assert_eq!(weeks, vec![15, 16]);
                assert_eq!(teams, vec![3, 1]);
                assert_eq!(expected_teams, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_matchup_requires_week() {
        assert!(Cli::try_parse_from(["forecast", "matchup", "--id", "1"]).is_err());
    }
}
