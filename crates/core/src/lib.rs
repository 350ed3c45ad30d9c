//! Core domain types for campaign insights: the normalized dataset, survey
//! question catalogue, per-campaign aggregates, configuration and errors.

pub mod config;
pub mod dataset;
pub mod error;
pub mod survey;
pub mod types;

pub use config::AppConfig;
pub use dataset::{Cell, Dataset, Table};
pub use error::{CampaignError, CampaignResult};
pub use survey::{SurveyOption, SurveyQuestion};
pub use types::{CampaignAggregate, UserRecord};
