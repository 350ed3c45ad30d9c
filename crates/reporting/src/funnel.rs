//! Journey funnel — how a campaign's users progress from visit to purchase.

use campaign_core::CampaignAggregate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelStage {
    pub name: String,
    pub users: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneySummary {
    pub campaign_id: i64,
    /// Visitors, finished quiz, started transaction, purchased.
    pub stages: Vec<FunnelStage>,
    pub quiz_completion_rate: f64,
    pub purchase_rate_after_transaction: f64,
    pub dropoff_before_quiz: f64,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn journey(aggregate: &CampaignAggregate) -> JourneySummary {
    let stage = |name: &str, users: u64| FunnelStage {
        name: name.to_string(),
        users,
    };

    let quiz_completion_rate = percent(aggregate.quiz_finished, aggregate.users);
    let dropoff_before_quiz = if aggregate.users == 0 {
        0.0
    } else {
        100.0 - quiz_completion_rate
    };

    JourneySummary {
        campaign_id: aggregate.campaign_id,
        stages: vec![
            stage("Visitors", aggregate.users),
            stage("Finished Quiz", aggregate.quiz_finished),
            stage("Started Transaction", aggregate.transactions_started),
            stage("Purchased", aggregate.purchases),
        ],
        quiz_completion_rate,
        purchase_rate_after_transaction: percent(
            aggregate.purchases,
            aggregate.transactions_started,
        ),
        dropoff_before_quiz,
    }
}
