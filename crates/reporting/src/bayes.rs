//! Bayesian A/B comparison of campaign conversion rates.
//!
//! Each campaign's true conversion rate is modelled as Beta(purchases + 1,
//! users - purchases + 1), the conjugate update of a uniform Beta(1, 1) prior.
//! The win probability is estimated by paired posterior draws.

use campaign_core::config::BayesConfig;
use campaign_core::{CampaignError, CampaignResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::conversion_rate;
use crate::stats::{beta_pdf, linspace};

/// Beta posterior over a conversion rate. Both parameters are always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaPosterior {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaPosterior {
    pub fn from_counts(purchases: u64, users: u64) -> Self {
        if purchases > users {
            warn!(purchases, users, "More purchases than users, clamping failures to zero");
        }
        Self {
            alpha: purchases as f64 + 1.0,
            beta: users.saturating_sub(purchases) as f64 + 1.0,
        }
    }

    pub fn density(&self, x: f64) -> f64 {
        beta_pdf(x, self.alpha, self.beta)
    }

    fn distribution(&self) -> CampaignResult<Beta<f64>> {
        Beta::new(self.alpha, self.beta).map_err(|e| {
            CampaignError::Validation(format!(
                "invalid posterior Beta({}, {}): {e}",
                self.alpha, self.beta
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    A,
    B,
}

/// Posterior densities of both campaigns evaluated on a shared grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityCurve {
    pub x: Vec<f64>,
    pub density_a: Vec<f64>,
    pub density_b: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Observed conversion rate of A, percent.
    pub conversion_a: f64,
    /// Observed conversion rate of B, percent.
    pub conversion_b: f64,
    /// `conversion_b - conversion_a`, percentage points.
    pub uplift: f64,
    /// Share of paired draws where B beat A, percent.
    pub prob_b_better: f64,
    /// Share of paired draws where A beat B, percent.
    pub prob_a_better: f64,
    pub posterior_a: BetaPosterior,
    pub posterior_b: BetaPosterior,
    pub winner: Variant,
    /// `max(p, 100 - p)` for `p = prob_b_better`.
    pub certainty: f64,
    pub sample_count: usize,
    pub density: DensityCurve,
}

pub struct BayesianComparator {
    sample_count: usize,
    seed: Option<u64>,
    density_points: usize,
    density_margin: f64,
}

impl BayesianComparator {
    pub fn new(config: &BayesConfig) -> Self {
        Self {
            sample_count: config.sample_count.max(1),
            seed: config.seed,
            density_points: config.density_points.max(2),
            density_margin: config.density_margin.max(1.0),
        }
    }

    /// Fix the sampling seed so repeated comparisons draw identical samples.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count.max(1);
        self
    }

    pub fn compare(
        &self,
        purchases_a: u64,
        users_a: u64,
        purchases_b: u64,
        users_b: u64,
    ) -> CampaignResult<ComparisonResult> {
        let posterior_a = BetaPosterior::from_counts(purchases_a, users_a);
        let posterior_b = BetaPosterior::from_counts(purchases_b, users_b);
        let dist_a = posterior_a.distribution()?;
        let dist_b = posterior_b.distribution()?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let samples_a: Vec<f64> = (0..self.sample_count).map(|_| dist_a.sample(&mut rng)).collect();
        let samples_b: Vec<f64> = (0..self.sample_count).map(|_| dist_b.sample(&mut rng)).collect();

        let (b_wins, a_wins) = samples_a
            .iter()
            .zip(&samples_b)
            .fold((0usize, 0usize), |(b, a), (sa, sb)| {
                (b + usize::from(sb > sa), a + usize::from(sa > sb))
            });
        let n = self.sample_count as f64;
        let prob_b_better = b_wins as f64 / n * 100.0;
        let prob_a_better = a_wins as f64 / n * 100.0;

        let conversion_a = conversion_rate(purchases_a, users_a);
        let conversion_b = conversion_rate(purchases_b, users_b);

        let max_draw = samples_a
            .iter()
            .chain(&samples_b)
            .copied()
            .fold(0.0_f64, f64::max);
        let density = self.density_curve(&posterior_a, &posterior_b, max_draw);

        let winner = if prob_b_better > 50.0 { Variant::B } else { Variant::A };

        debug!(
            purchases_a,
            users_a,
            purchases_b,
            users_b,
            prob_b_better,
            "Posterior comparison computed"
        );

        Ok(ComparisonResult {
            conversion_a,
            conversion_b,
            uplift: conversion_b - conversion_a,
            prob_b_better,
            prob_a_better,
            posterior_a,
            posterior_b,
            winner,
            certainty: prob_b_better.max(100.0 - prob_b_better),
            sample_count: self.sample_count,
            density,
        })
    }

    /// Densities over `[0, max_draw * margin]` so the display never clips
    /// the sampled range.
    fn density_curve(&self, a: &BetaPosterior, b: &BetaPosterior, max_draw: f64) -> DensityCurve {
        let upper = max_draw * self.density_margin;
        let x = linspace(0.0, upper, self.density_points);
        DensityCurve {
            density_a: x.iter().map(|&v| a.density(v)).collect(),
            density_b: x.iter().map(|&v| b.density(v)).collect(),
            x,
        }
    }
}

impl Default for BayesianComparator {
    fn default() -> Self {
        Self::new(&BayesConfig::default())
    }
}
