//! Season-long playoff and championship forecast
//!
//! Two levels of Monte Carlo: each remaining regular-season week is simulated
//! once with a reduced trial count to get matchup outcome probabilities and
//! mean team scores. A cheap season-level loop then draws every remaining
//! matchup outcome, builds standings, seeds the playoffs and plays a
//! single-draw bracket.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::config::SeasonForecastConfig;
use crate::context::{SimulationContext, TrialPlan};
use crate::control::RunControl;
use crate::error::{ForecastError, Result};
use crate::sampler::{chunk_ranges, chunk_rng, derive_seed};
use crate::types::{LeagueConfig, SeasonSettings, TeamId, TeamRecord};
use crate::week::simulate_week;

const SEASON_SCOPE: u64 = u64::MAX;

/// Inputs for a season forecast
#[derive(Debug, Clone)]
pub struct SeasonRequest {
    pub league: LeagueConfig,
    /// Standings to date; teams without an entry start at 0-0
    pub records: HashMap<TeamId, TeamRecord>,
    /// One context per remaining regular-season week
    pub remaining_weeks: Vec<SimulationContext>,
    pub trials: SeasonForecastConfig,
}

/// Season outlook for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonTeamForecast {
    pub team_id: TeamId,
    pub playoff_probability: f64,
    pub bye_probability: f64,
    pub championship_probability: f64,
    pub expected_wins: f64,
    pub expected_points_for: f64,
    pub mean_seed: f64,
    /// `seed_histogram[k]` is the fraction of trials finishing in place `k + 1`
    pub seed_histogram: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonForecast {
    pub league_id: String,
    /// In league order
    pub teams: Vec<SeasonTeamForecast>,
    pub precomputed_weeks: Vec<u32>,
    pub precompute_trials: usize,
    pub season_trials: usize,
    pub seed: u64,
}

impl SeasonForecast {
    pub fn team(&self, team_id: TeamId) -> Option<&SeasonTeamForecast> {
        self.teams.iter().find(|t| t.team_id == team_id)
    }
}

/// Precomputed outcome distribution of one remaining matchup
#[derive(Debug, Clone, PartialEq)]
struct MatchupOdds {
    /// League indices of the teams
    teams: Vec<usize>,
    /// Cumulative probabilities of each team winning outright; the remainder is a tie
    cumulative: Vec<f64>,
}

impl MatchupOdds {
    fn draw(&self, u: f64) -> Option<usize> {
        self.cumulative.iter().position(|c| u < *c).map(|i| self.teams[i])
    }
}

/// Per-team accumulators over a batch of season trials
#[derive(Debug, Clone)]
struct SeasonTally {
    trials: usize,
    playoffs: Vec<u64>,
    byes: Vec<u64>,
    titles: Vec<u64>,
    wins: Vec<f64>,
    seeds: Vec<f64>,
    histogram: Vec<Vec<u64>>,
}

impl SeasonTally {
    fn new(teams: usize) -> Self {
        Self {
            trials: 0,
            playoffs: vec![0; teams],
            byes: vec![0; teams],
            titles: vec![0; teams],
            wins: vec![0.0; teams],
            seeds: vec![0.0; teams],
            histogram: vec![vec![0; teams]; teams],
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.trials += other.trials;
        for t in 0..self.playoffs.len() {
            self.playoffs[t] += other.playoffs[t];
            self.byes[t] += other.byes[t];
            self.titles[t] += other.titles[t];
            self.wins[t] += other.wins[t];
            self.seeds[t] += other.seeds[t];
            for (a, b) in self.histogram[t].iter_mut().zip(&other.histogram[t]) {
                *a += b;
            }
        }
        self
    }
}

/// Standings order: win percentage, then points-for, then league order
fn standings_cmp(records: &[TeamRecord], a: usize, b: usize) -> Ordering {
    records[b]
        .win_pct()
        .total_cmp(&records[a].win_pct())
        .then(records[b].points_for.total_cmp(&records[a].points_for))
        .then(a.cmp(&b))
}

/// Final standings as league indices, playoff seeds first.
///
/// With divisions, division leaders take the top seeds and the remaining
/// playoff spots go to the highest points-for among the rest.
pub fn seed_order(league: &LeagueConfig, records: &[TeamRecord], playoff_teams: usize) -> Vec<usize> {
    let mut by_record: Vec<usize> = (0..records.len()).collect();
    by_record.sort_by(|a, b| standings_cmp(records, *a, *b));

    if league.divisions.is_empty() {
        return by_record;
    }

    let mut leaders: Vec<usize> = league
        .divisions
        .values()
        .filter_map(|members| {
            members
                .iter()
                .filter_map(|id| league.teams.iter().position(|t| t == id))
                .min_by(|a, b| standings_cmp(records, *a, *b))
        })
        .collect();
    leaders.sort_by(|a, b| standings_cmp(records, *a, *b));
    leaders.dedup();

    let mut rest: Vec<usize> = by_record.iter().copied().filter(|t| !leaders.contains(t)).collect();
    rest.sort_by(|a, b| {
        records[*b].points_for.total_cmp(&records[*a].points_for).then(a.cmp(b))
    });
    let wildcards = playoff_teams.saturating_sub(leaders.len()).min(rest.len());
    let (wild, others) = rest.split_at(wildcards);

    let mut others = others.to_vec();
    others.sort_by(|a, b| standings_cmp(records, *a, *b));

    leaders.iter().chain(wild).chain(others.iter()).copied().collect()
}

/// Play a fixed single-elimination bracket; returns the champion.
///
/// The top `bye_teams` seeds skip round one. Remaining seeds meet
/// outside-in (best vs worst) and bracket positions are never reseeded.
fn play_bracket<R: Rng>(seeds: &[usize], bye_teams: usize, strength: &[f64], rng: &mut R) -> Option<usize> {
    let byes = bye_teams.min(seeds.len());
    let mut field: Vec<usize> = seeds[..byes].to_vec();
    field.extend(play_round(&seeds[byes..], strength, rng));

    while field.len() > 1 {
        field = play_round(&field, strength, rng);
    }
    field.first().copied()
}

fn play_round<R: Rng>(field: &[usize], strength: &[f64], rng: &mut R) -> Vec<usize> {
    let len = field.len();
    let mut advancing = Vec::with_capacity(len.div_ceil(2));
    for i in 0..len / 2 {
        let (a, b) = (field[i], field[len - 1 - i]);
        let (sa, sb) = (strength[a].max(0.0), strength[b].max(0.0));
        let p_a = if sa + sb > 0.0 { sa / (sa + sb) } else { 0.5 };
        advancing.push(if rng.gen::<f64>() < p_a { a } else { b });
    }
    if len % 2 == 1 {
        advancing.push(field[len / 2]);
    }
    advancing
}

fn validate_settings(league: &LeagueConfig) -> Result<SeasonSettings> {
    let settings = league
        .season_settings
        .clone()
        .ok_or_else(|| ForecastError::MissingSeasonConfig { league_id: league.league_id.clone() })?;

    if settings.playoff_teams == 0 || settings.playoff_teams > league.teams.len() {
        return Err(ForecastError::InvalidConfig(format!(
            "playoff_teams {} must be between 1 and the league size {}",
            settings.playoff_teams,
            league.teams.len()
        )));
    }
    if settings.bye_teams > settings.playoff_teams {
        return Err(ForecastError::InvalidConfig(format!(
            "bye_teams {} exceeds playoff_teams {}",
            settings.bye_teams, settings.playoff_teams
        )));
    }
    Ok(settings)
}

/// Forecast playoff, bye and championship odds for the rest of the season
#[instrument(skip_all, fields(league = %request.league.league_id, weeks = request.remaining_weeks.len()))]
pub fn forecast_season(
    request: &SeasonRequest,
    plan: &TrialPlan,
    control: &RunControl,
) -> Result<SeasonForecast> {
    let league = &request.league;
    let settings = validate_settings(league)?;
    let n_teams = league.teams.len();
    let index: HashMap<TeamId, usize> =
        league.teams.iter().enumerate().map(|(i, t)| (*t, i)).collect();

    let mut base = vec![TeamRecord::default(); n_teams];
    for (team_id, record) in &request.records {
        let idx = *index.get(team_id).ok_or_else(|| ForecastError::UnknownTeam {
            league_id: league.league_id.clone(),
            team_id: *team_id,
        })?;
        base[idx] = *record;
    }

    let SeasonForecastConfig { precompute_trials, season_trials } = request.trials.clone();

    // Level one: matchup odds and mean scores per remaining week
    let mut schedule: Vec<Vec<MatchupOdds>> = Vec::with_capacity(request.remaining_weeks.len());
    let mut precomputed_weeks = Vec::new();
    let mut weekly_means = vec![Vec::new(); n_teams];

    for ctx in &request.remaining_weeks {
        control.checkpoint()?;
        let week_plan = plan
            .with_trials(precompute_trials)
            .with_seed(derive_seed(plan.seed, "precompute", u64::from(ctx.week())));
        let week = ctx.install(|| simulate_week(ctx, &week_plan, control))?;

        let mut odds = Vec::with_capacity(week.matchups.len());
        for matchup in &week.matchups {
            let mut teams = Vec::with_capacity(matchup.teams.len());
            let mut cumulative = Vec::with_capacity(matchup.teams.len());
            let mut acc = 0.0;
            for team in &matchup.teams {
                let idx = *index.get(&team.team_id).ok_or_else(|| ForecastError::UnknownTeam {
                    league_id: league.league_id.clone(),
                    team_id: team.team_id,
                })?;
                acc += team.outright_win_fraction;
                teams.push(idx);
                cumulative.push(acc);
                weekly_means[idx].push(team.score_distribution.mean);
            }
            odds.push(MatchupOdds { teams, cumulative });
        }

        debug!(week = ctx.week(), matchups = odds.len(), "week odds precomputed");
        schedule.push(odds);
        precomputed_weeks.push(ctx.week());
    }

    let points_for: Vec<f64> = (0..n_teams)
        .map(|t| base[t].points_for + weekly_means[t].iter().sum::<f64>())
        .collect();
    let strength: Vec<f64> = (0..n_teams)
        .map(|t| match (weekly_means[t].len(), base[t].games()) {
            (0, 0) => 0.0,
            (0, games) => base[t].points_for / games as f64,
            (weeks, _) => weekly_means[t].iter().sum::<f64>() / weeks as f64,
        })
        .collect();

    // Level two: season trials
    let tally = chunk_ranges(season_trials, plan.chunk_size)
        .into_par_iter()
        .map(|(chunk, _, len)| {
            control.checkpoint()?;
            let mut rng = chunk_rng(plan.seed, SEASON_SCOPE, chunk);
            let mut tally = SeasonTally::new(n_teams);

            for _ in 0..len {
                let mut records = base.clone();
                for week in &schedule {
                    for matchup in week {
                        match matchup.draw(rng.gen::<f64>()) {
                            Some(winner) => {
                                for team in &matchup.teams {
                                    if *team == winner {
                                        records[*team].wins += 1;
                                    } else {
                                        records[*team].losses += 1;
                                    }
                                }
                            }
                            None => matchup.teams.iter().for_each(|t| records[*t].ties += 1),
                        }
                    }
                }
                for (record, pf) in records.iter_mut().zip(&points_for) {
                    record.points_for = *pf;
                }

                let order = seed_order(league, &records, settings.playoff_teams);
                let seeds = &order[..settings.playoff_teams];
                if let Some(champion) = play_bracket(seeds, settings.bye_teams, &strength, &mut rng) {
                    tally.titles[champion] += 1;
                }
                for (rank, team) in order.iter().enumerate() {
                    if rank < settings.playoff_teams {
                        tally.playoffs[*team] += 1;
                    }
                    if rank < settings.bye_teams {
                        tally.byes[*team] += 1;
                    }
                    tally.seeds[*team] += (rank + 1) as f64;
                    tally.histogram[*team][rank] += 1;
                }
                for (team, record) in records.iter().enumerate() {
                    tally.wins[team] += f64::from(record.wins);
                }
                tally.trials += 1;
            }
            Ok::<_, ForecastError>(tally)
        })
        .try_reduce(|| SeasonTally::new(n_teams), |a, b| Ok(a.merge(b)))?;

    let trials = tally.trials.max(1) as f64;
    let teams = league
        .teams
        .iter()
        .enumerate()
        .map(|(t, team_id)| SeasonTeamForecast {
            team_id: *team_id,
            playoff_probability: tally.playoffs[t] as f64 / trials,
            bye_probability: tally.byes[t] as f64 / trials,
            championship_probability: tally.titles[t] as f64 / trials,
            expected_wins: tally.wins[t] / trials,
            expected_points_for: points_for[t],
            mean_seed: tally.seeds[t] / trials,
            seed_histogram: tally.histogram[t].iter().map(|c| *c as f64 / trials).collect(),
        })
        .collect();

    info!(
        season_trials,
        precompute_trials,
        weeks = precomputed_weeks.len(),
        seed = plan.seed,
        "season forecast complete"
    );

    Ok(SeasonForecast {
        league_id: league.league_id.clone(),
        teams,
        precomputed_weeks,
        precompute_trials,
        season_trials,
        seed: plan.seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeMap;

    fn league(teams: Vec<TeamId>) -> LeagueConfig {
        LeagueConfig {
            league_id: "L".to_string(),
            season: 2024,
            scoring_format: "ppr".to_string(),
            teams,
            divisions: BTreeMap::new(),
            season_settings: Some(SeasonSettings {
                regular_season_weeks: 14,
                playoff_teams: 4,
                bye_teams: 0,
            }),
        }
    }

    fn record(wins: u32, losses: u32, points_for: f64) -> TeamRecord {
        TeamRecord { wins, losses, ties: 0, points_for }
    }

    #[test]
    fn test_seed_order_by_record_then_points() {
        let league = league(vec![1, 2, 3, 4]);
        let records = vec![record(5, 5, 1000.0), record(7, 3, 900.0), record(5, 5, 1100.0), record(2, 8, 1200.0)];
        assert_eq!(seed_order(&league, &records, 2), vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_league_order_breaks_full_ties() {
        let league = league(vec![1, 2, 3]);
        let records = vec![record(4, 4, 800.0); 3];
        assert_eq!(seed_order(&league, &records, 2), vec![0, 1, 2]);
    }

    #[test]
    fn test_division_leaders_then_points_wildcards() {
        let mut league = league(vec![1, 2, 3, 4, 5, 6]);
        league.divisions.insert("East".to_string(), vec![1, 2, 3]);
        league.divisions.insert("West".to_string(), vec![4, 5, 6]);
        let records = vec![
            record(9, 1, 1000.0), // East leader
            record(8, 2, 950.0),
            record(3, 7, 1300.0), // best points-for
            record(4, 6, 900.0), // West leader on points-for tiebreak
            record(4, 6, 850.0),
            record(2, 8, 800.0),
        ];
        let order = seed_order(&league, &records, 3);
        assert_eq!(&order[..3], &[0, 3, 2]);
        assert_eq!(order.len(), 6);
    }

    #[test]
    fn test_bracket_with_byes() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        // Seeds 3..6 have no strength, seeds 1 and 2 dominate
        let strength = vec![100.0, 100.0, 0.0, 0.0, 0.0, 0.0];
        for _ in 0..50 {
            let champion = play_bracket(&[0, 1, 2, 3, 4, 5], 2, &strength, &mut rng).unwrap();
            assert!(champion == 0 || champion == 1);
        }
    }

    #[test]
    fn test_single_team_bracket() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(play_bracket(&[3], 0, &[1.0, 1.0, 1.0, 1.0], &mut rng), Some(3));
    }

    #[test]
    fn test_matchup_draw() {
        let odds = MatchupOdds { teams: vec![4, 7], cumulative: vec![0.6, 0.9] };
        assert_eq!(odds.draw(0.1), Some(4));
        assert_eq!(odds.draw(0.7), Some(7));
        assert_eq!(odds.draw(0.95), None);
    }

    #[test]
    fn test_missing_season_settings() {
        let mut league = league(vec![1, 2]);
        league.season_settings = None;
        let request = SeasonRequest {
            league,
            records: HashMap::new(),
            remaining_weeks: vec![],
            trials: SeasonForecastConfig::default(),
        };
        let result = forecast_season(&request, &TrialPlan::new(100, 1), &RunControl::new());
        assert_eq!(result, Err(ForecastError::MissingSeasonConfig { league_id: "L".to_string() }));
    }

    #[test]
    fn test_completed_season_is_deterministic_standings() {
        let league = league(vec![1, 2, 3, 4, 5]);
        let records = HashMap::from([
            (1, record(10, 3, 1500.0)),
            (2, record(9, 4, 1400.0)),
            (3, record(8, 5, 1300.0)),
            (4, record(7, 6, 1200.0)),
            (5, record(1, 12, 900.0)),
        ]);
        let trials = SeasonForecastConfig { precompute_trials: 100, season_trials: 500 };
        let request = SeasonRequest { league, records, remaining_weeks: vec![], trials };
        let forecast = forecast_season(&request, &TrialPlan::new(500, 3), &RunControl::new()).unwrap();
        assert_eq!(forecast.team(1).unwrap().playoff_probability, 1.0);
        assert_eq!(forecast.team(5).unwrap().playoff_probability, 0.0);
        assert_eq!(forecast.team(5).unwrap().championship_probability, 0.0);
        assert_eq!(forecast.team(1).unwrap().mean_seed, 1.0);
        assert_eq!(forecast.team(2).unwrap().expected_wins, 9.0);
        let titles: f64 = forecast.teams.iter().map(|t| t.championship_probability).sum();
        assert!((titles - 1.0).abs() < 1e-9);
    }
}
