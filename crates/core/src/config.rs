use serde::Deserialize;

use crate::error::{CampaignError, CampaignResult};

/// Root application configuration. Loaded from environment variables
/// with the prefix `CAMPAIGN_INSIGHTS__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bayes: BayesConfig,
    #[serde(default)]
    pub attribution: AttributionConfig,
}

/// Posterior sampling used by the campaign comparison.
#[derive(Debug, Clone, Deserialize)]
pub struct BayesConfig {
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    /// Fixed seed for reproducible comparisons. `None` draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_density_points")]
    pub density_points: usize,
    /// Multiplier applied to the largest posterior draw to size the density domain.
    #[serde(default = "default_density_margin")]
    pub density_margin: f64,
}

/// Tree-ensemble feature ranking.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributionConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_attribution_seed")]
    pub seed: u64,
    /// Smallest number of complete rows a fit accepts.
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,
    #[serde(default = "default_detailed_top_n")]
    pub detailed_top_n: usize,
    #[serde(default)]
    pub max_depth: Option<usize>,
}

// Default functions
fn default_sample_count() -> usize {
    5000
}
fn default_density_points() -> usize {
    1000
}
fn default_density_margin() -> f64 {
    1.1
}
fn default_n_estimators() -> usize {
    100
}
fn default_attribution_seed() -> u64 {
    42
}
fn default_min_rows() -> usize {
    31
}
fn default_detailed_top_n() -> usize {
    10
}

impl Default for BayesConfig {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            seed: None,
            density_points: default_density_points(),
            density_margin: default_density_margin(),
        }
    }
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            seed: default_attribution_seed(),
            min_rows: default_min_rows(),
            detailed_top_n: default_detailed_top_n(),
            max_depth: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bayes: BayesConfig::default(),
            attribution: AttributionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("CAMPAIGN_INSIGHTS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn validate(&self) -> CampaignResult<()> {
        if self.bayes.sample_count == 0 {
            return Err(CampaignError::Config(
                "bayes.sample_count must be positive".into(),
            ));
        }
        if self.bayes.density_points < 2 {
            return Err(CampaignError::Config(
                "bayes.density_points must be at least 2".into(),
            ));
        }
        if !self.bayes.density_margin.is_finite() || self.bayes.density_margin < 1.0 {
            return Err(CampaignError::Config(
                "bayes.density_margin must be a finite value >= 1.0".into(),
            ));
        }
        if self.attribution.n_estimators == 0 {
            return Err(CampaignError::Config(
                "attribution.n_estimators must be positive".into(),
            ));
        }
        if self.attribution.min_rows == 0 {
            return Err(CampaignError::Config(
                "attribution.min_rows must be positive".into(),
            ));
        }
        if self.attribution.detailed_top_n == 0 {
            return Err(CampaignError::Config(
                "attribution.detailed_top_n must be positive".into(),
            ));
        }
        Ok(())
    }
}
