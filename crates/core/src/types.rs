use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical column names of the normalized dataset.
pub mod columns {
    pub const CAMPAIGN_ID: &str = "campaign_id";
    pub const CAMPAIGN_NAME: &str = "campaign_name";
    pub const USER_ID: &str = "user_id";
    pub const PURCHASED: &str = "purchased";
    pub const QUIZ_SCORE: &str = "quiz_score";
    pub const TRANSACTION_STARTED: &str = "transaction_started";
    pub const REVENUE: &str = "revenue";
    pub const BREACH_FOUND: &str = "breach_found";

    /// Columns that must be present before any engine runs.
    pub const REQUIRED: [&str; 6] = [
        CAMPAIGN_ID,
        CAMPAIGN_NAME,
        USER_ID,
        PURCHASED,
        QUIZ_SCORE,
        REVENUE,
    ];
}

/// One user's exposure to one campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub campaign_id: i64,
    pub campaign_name: String,
    pub user_id: String,
    pub purchased: bool,
    pub quiz_score: Option<f64>,
    pub transaction_started: bool,
    pub revenue: f64,
    pub breach_found: Option<f64>,
    /// Survey flags keyed by column name: answered flags and per-option flags.
    /// `None` marks a missing cell.
    #[serde(default)]
    pub survey: BTreeMap<String, Option<f64>>,
}

impl UserRecord {
    pub fn quiz_finished(&self) -> bool {
        self.quiz_score.is_some_and(|score| score > 0.0)
    }

    /// Payer status is derived from revenue, independently of `purchased`.
    pub fn is_payer(&self) -> bool {
        self.revenue > 0.0
    }

    /// Value of a numeric feature column, `None` when the cell is missing.
    pub fn feature(&self, column: &str) -> Option<f64> {
        match column {
            columns::QUIZ_SCORE => self.quiz_score,
            columns::BREACH_FOUND => self.breach_found,
            other => self.survey.get(other).copied().flatten(),
        }
    }
}

/// Per-campaign counts, rebuilt from the full dataset on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignAggregate {
    pub campaign_id: i64,
    pub campaign_name: String,
    /// Distinct user ids.
    pub users: u64,
    /// Sum of the purchase indicator.
    pub purchases: u64,
    /// Distinct users with revenue > 0.
    pub payers: u64,
    /// Revenue summed over records with revenue > 0.
    pub revenue: f64,
    pub quiz_finished: u64,
    pub transactions_started: u64,
    /// Percentage in [0, 100]; 0 when `users == 0`.
    pub conversion_rate: f64,
    /// Revenue per payer; `None` when there are no payers.
    pub ltv: Option<f64>,
}
