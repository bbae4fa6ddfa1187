//! Per-player score distributions
//!
//! A player's projected mean and standard deviation, together with the
//! position's floor and shape hint, fully determine the distribution. Every
//! family exposes an inverse CDF so correlated uniforms can be mapped to
//! scores without disturbing the marginal.

use serde::{Deserialize, Serialize};
use statrs::function::erf::{erfc, erfc_inv};

use crate::config::{DistributionConfig, ShapeHint};
use crate::types::{Position, VarianceProfile};

const UNIFORM_EPSILON: f64 = 1e-12;

/// Standard normal CDF
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// Standard normal quantile; `u` is clamped away from 0 and 1
pub fn standard_normal_quantile(u: f64) -> f64 {
    let u = u.clamp(UNIFORM_EPSILON, 1.0 - UNIFORM_EPSILON);
    -std::f64::consts::SQRT_2 * erfc_inv(2.0 * u)
}

/// Distribution family selected for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionType {
    Constant,
    ShiftedLogNormal,
    FlooredNormal,
}

/// Fitted parameters for one player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistributionParams {
    /// No uncertainty
    Constant { value: f64 },
    /// `shift + exp(mu + sigma * Z)`
    ShiftedLogNormal { shift: f64, mu: f64, sigma: f64 },
    /// `max(floor, mean + std * Z)`
    FlooredNormal { mean: f64, std: f64, floor: f64 },
}

impl DistributionParams {
    pub fn distribution_type(&self) -> DistributionType {
        match self {
            DistributionParams::Constant { .. } => DistributionType::Constant,
            DistributionParams::ShiftedLogNormal { .. } => DistributionType::ShiftedLogNormal,
            DistributionParams::FlooredNormal { .. } => DistributionType::FlooredNormal,
        }
    }

    /// Score at cumulative probability `u`
    pub fn inverse_cdf(&self, u: f64) -> f64 {
        match *self {
            DistributionParams::Constant { value } => value,
            DistributionParams::ShiftedLogNormal { shift, mu, sigma } => {
                shift + (mu + sigma * standard_normal_quantile(u)).exp()
            }
            DistributionParams::FlooredNormal { mean, std, floor } => {
                (mean + std * standard_normal_quantile(u)).max(floor)
            }
        }
    }

    /// Expected score of the family before flooring
    pub fn mean(&self) -> f64 {
        match *self {
            DistributionParams::Constant { value } => value,
            DistributionParams::ShiftedLogNormal { shift, mu, sigma } => {
                shift + (mu + 0.5 * sigma * sigma).exp()
            }
            DistributionParams::FlooredNormal { mean, .. } => mean,
        }
    }

    /// Standard deviation of the family before flooring
    pub fn std(&self) -> f64 {
        match *self {
            DistributionParams::Constant { .. } => 0.0,
            DistributionParams::ShiftedLogNormal { mu, sigma, .. } => {
                let s2 = sigma * sigma;
                ((s2.exp() - 1.0) * (2.0 * mu + s2).exp()).sqrt()
            }
            DistributionParams::FlooredNormal { std, .. } => std,
        }
    }
}

/// Where the standard deviation used for a fit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdSource {
    Historical,
    DefaultCv,
    RookieCv,
}

/// Converts projections and variance history into distributions
pub struct DistributionFitter<'a> {
    config: &'a DistributionConfig,
}

impl<'a> DistributionFitter<'a> {
    pub fn new(config: &'a DistributionConfig) -> Self {
        Self { config }
    }

    /// Standard deviation for a projection, with its provenance
    pub fn resolve_std(
        &self,
        projected_mean: f64,
        variance: Option<&VarianceProfile>,
    ) -> (f64, StdSource) {
        let scale = projected_mean.abs();
        let (std, source) = match variance {
            Some(profile)
                if profile.games_played >= self.config.min_games
                    && profile.std.is_finite()
                    && profile.std > 0.0 =>
            {
                (profile.std, StdSource::Historical)
            }
            Some(profile) if profile.games_played > 0 => {
                (self.config.default_cv * scale, StdSource::DefaultCv)
            }
            _ => (self.config.rookie_cv * scale, StdSource::RookieCv),
        };

        if projected_mean != 0.0 {
            (std.max(self.config.min_std), source)
        } else {
            (std, source)
        }
    }

    /// Fit a distribution for a player at `position`
    pub fn fit(
        &self,
        position: Position,
        projected_mean: f64,
        variance: Option<&VarianceProfile>,
    ) -> DistributionParams {
        let (std, _) = self.resolve_std(projected_mean, variance);
        self.fit_with_std(position, projected_mean, std)
    }

    /// Fit with an explicit standard deviation
    pub fn fit_with_std(&self, position: Position, mean: f64, std: f64) -> DistributionParams {
        if !mean.is_finite() {
            return DistributionParams::Constant { value: 0.0 };
        }
        if !(std.is_finite() && std > 0.0) {
            return DistributionParams::Constant { value: mean };
        }

        let shape = self.config.shape_for(position);
        let floor = shape.floor;

        let sigmas = match shape.hint.shift_sigmas() {
            Some(sigmas) if mean > floor => sigmas,
            _ => return DistributionParams::FlooredNormal { mean, std, floor },
        };

        let shift = (mean - sigmas * std).max(floor);
        let excess = mean - shift;
        let sigma2 = (1.0 + (std * std) / (excess * excess)).ln();
        let mu = excess.ln() - 0.5 * sigma2;
        DistributionParams::ShiftedLogNormal { shift, mu, sigma: sigma2.sqrt() }
    }
}

impl ShapeHint {
    /// Shape hint a position uses under the default configuration
    pub fn default_for(position: Position) -> ShapeHint {
        DistributionConfig::default().shape_for(position).hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitter_config() -> DistributionConfig {
        DistributionConfig::default()
    }

    #[test]
    fn test_normal_quantile_roundtrip() {
        for &u in &[0.01, 0.1, 0.25, 0.5, 0.75, 0.9, 0.99] {
            let z = standard_normal_quantile(u);
            assert!((standard_normal_cdf(z) - u).abs() < 1e-9, "u = {u}");
        }
        assert!(standard_normal_quantile(0.5).abs() < 1e-12);
        assert!(standard_normal_quantile(0.0).is_finite());
        assert!(standard_normal_quantile(1.0).is_finite());
    }

    #[test]
    fn test_lognormal_matches_mean_and_std() {
        let config = fitter_config();
        let fitter = DistributionFitter::new(&config);
        let params = fitter.fit_with_std(Position::WR, 14.0, 6.0);
        assert_eq!(params.distribution_type(), DistributionType::ShiftedLogNormal);
        assert!((params.mean() - 14.0).abs() < 1e-9);
        assert!((params.std() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_floor_respected() {
        let config = fitter_config();
        let fitter = DistributionFitter::new(&config);
        let params = fitter.fit_with_std(Position::TE, 6.0, 5.0);
        let low = params.inverse_cdf(0.0);
        assert!(low >= -2.0, "lowest score {low} below floor");
    }

    #[test]
    fn test_touchdown_positions_more_skewed() {
        let config = fitter_config();
        let fitter = DistributionFitter::new(&config);
        let qb = fitter.fit_with_std(Position::QB, 20.0, 6.0);
        let wr = fitter.fit_with_std(Position::WR, 20.0, 6.0);
        // Median sits further below the mean for the more right-skewed family
        let qb_gap = qb.mean() - qb.inverse_cdf(0.5);
        let wr_gap = wr.mean() - wr.inverse_cdf(0.5);
        assert!(wr_gap > qb_gap);
    }

    #[test]
    fn test_symmetric_position_uses_floored_normal() {
        let config = fitter_config();
        let fitter = DistributionFitter::new(&config);
        let dst = fitter.fit_with_std(Position::DST, 7.0, 5.0);
        assert_eq!(dst.distribution_type(), DistributionType::FlooredNormal);
        assert!((dst.inverse_cdf(0.5) - 7.0).abs() < 1e-9);
        assert_eq!(dst.inverse_cdf(0.0), -10.0);
    }

    #[test]
    fn test_std_resolution() {
        let config = fitter_config();
        let fitter = DistributionFitter::new(&config);

        let veteran = VarianceProfile { mean: 15.0, std: 7.5, cv: 0.5, games_played: 30 };
        assert_eq!(fitter.resolve_std(16.0, Some(&veteran)), (7.5, StdSource::Historical));

        let thin = VarianceProfile { mean: 10.0, std: 3.0, cv: 0.3, games_played: 2 };
        let (std, source) = fitter.resolve_std(10.0, Some(&thin));
        assert_eq!(source, StdSource::DefaultCv);
        assert!((std - 4.5).abs() < 1e-12);

        let (rookie_std, rookie_source) = fitter.resolve_std(10.0, None);
        assert_eq!(rookie_source, StdSource::RookieCv);
        assert!(rookie_std > std, "rookies carry more variance");
    }

    #[test]
    fn test_zero_projection_is_constant() {
        let config = fitter_config();
        let fitter = DistributionFitter::new(&config);
        let params = fitter.fit(Position::RB, 0.0, None);
        assert_eq!(params, DistributionParams::Constant { value: 0.0 });
    }

    #[test]
    fn test_default_shape_hints() {
        assert_eq!(ShapeHint::default_for(Position::QB), ShapeHint::HighVolume);
        assert_eq!(ShapeHint::default_for(Position::TE), ShapeHint::TouchdownDependent);
        assert_eq!(ShapeHint::default_for(Position::DST), ShapeHint::Symmetric);
    }
}
