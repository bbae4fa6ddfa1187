//! Summary statistics over trial vectors

use serde::{Deserialize, Serialize};

/// Summary of a score vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoreDistribution {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl ScoreDistribution {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            mean,
            std: var.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p10: percentile(&sorted, 0.10),
            p25: percentile(&sorted, 0.25),
            p50: percentile(&sorted, 0.50),
            p75: percentile(&sorted, 0.75),
            p90: percentile(&sorted, 0.90),
        }
    }
}

/// Linear-interpolated percentile of an already sorted slice
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = q.clamp(0.0, 1.0) * (len - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Pearson correlation of two equally long vectors
pub fn sample_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Win credit per team over a set of trials
#[derive(Debug, Clone, PartialEq)]
pub struct WinTally {
    /// Wins with tied trials split equally among the tied teams
    pub credit: Vec<f64>,
    /// Trials where the team was strictly highest
    pub outright: Vec<u64>,
    /// Trials where the team shared the highest total
    pub tied: Vec<u64>,
    /// Trials where any tie for the top occurred
    pub tie_trials: u64,
    pub trials: usize,
}

impl WinTally {
    /// Tally per-trial winners. `totals[t][i]` is team `t`'s total in trial `i`.
    pub fn tally(totals: &[&[f64]]) -> Self {
        let teams = totals.len();
        let trials = totals.iter().map(|t| t.len()).min().unwrap_or(0);
        let mut credit = vec![0.0; teams];
        let mut outright = vec![0u64; teams];
        let mut tied = vec![0u64; teams];
        let mut tie_trials = 0;

        for i in 0..trials {
            let best = totals.iter().map(|t| t[i]).fold(f64::NEG_INFINITY, f64::max);
            let leaders = totals.iter().filter(|t| t[i] == best).count();
            if leaders == 1 {
                if let Some(idx) = totals.iter().position(|t| t[i] == best) {
                    credit[idx] += 1.0;
                    outright[idx] += 1;
                }
            } else {
                tie_trials += 1;
                let share = 1.0 / leaders as f64;
                for (idx, t) in totals.iter().enumerate() {
                    if t[i] == best {
                        credit[idx] += share;
                        tied[idx] += 1;
                    }
                }
            }
        }

        Self { credit, outright, tied, tie_trials, trials }
    }

    pub fn win_probability(&self, team_idx: usize) -> f64 {
        self.fraction(self.credit[team_idx])
    }

    pub fn outright_fraction(&self, team_idx: usize) -> f64 {
        self.fraction(self.outright[team_idx] as f64)
    }

    pub fn tie_fraction(&self, team_idx: usize) -> f64 {
        self.fraction(self.tied[team_idx] as f64)
    }

    /// Fraction of trials with any tie at the top
    pub fn any_tie_fraction(&self) -> f64 {
        self.fraction(self.tie_trials as f64)
    }

    fn fraction(&self, count: f64) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            count / self.trials as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_summary() {
        let samples: Vec<f64> = (1..=101).map(|x| x as f64).collect();
        let d = ScoreDistribution::from_samples(&samples);
        assert_eq!(d.mean, 51.0);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 101.0);
        assert_eq!(d.p50, 51.0);
        assert_eq!(d.p10, 11.0);
        assert_eq!(d.p90, 91.0);
    }

    #[test]
    fn test_constant_has_zero_std() {
        let d = ScoreDistribution::from_samples(&[24.3; 50]);
        assert_eq!(d.std, 0.0);
        assert_eq!(d.p25, 24.3);
    }

    #[test]
    fn test_tie_credit_split() {
        let a = [10.0, 5.0, 7.0, 7.0];
        let b = [8.0, 9.0, 7.0, 7.0];
        let c = [1.0, 1.0, 7.0, 2.0];
        let tally = WinTally::tally(&[&a, &b, &c]);
        // trial 3: three-way tie, trial 4: two-way tie
        assert!((tally.credit[0] - (1.0 + 1.0 / 3.0 + 0.5)).abs() < 1e-12);
        assert!((tally.credit[1] - (1.0 + 1.0 / 3.0 + 0.5)).abs() < 1e-12);
        assert!((tally.credit[2] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(tally.tie_trials, 2);
        let total: f64 = (0..3).map(|t| tally.win_probability(t)).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_head_to_head_fractions_sum_to_one() {
        let a = [3.0, 4.0, 5.0, 6.0, 6.0];
        let b = [4.0, 4.0, 1.0, 6.5, 2.0];
        let tally = WinTally::tally(&[&a, &b]);
        let sum = tally.outright_fraction(0) + tally.outright_fraction(1) + tally.any_tie_fraction();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_correlation() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        assert!((sample_correlation(&a, &b) - 1.0).abs() < 1e-12);
        let c = [8.0, 6.0, 4.0, 2.0];
        assert!((sample_correlation(&a, &c) + 1.0).abs() < 1e-12);
    }
}
