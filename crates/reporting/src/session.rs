//! Analysis session — one in-memory dataset, its configuration, and the
//! user-supplied budgets. Every request rebuilds the campaign aggregates from
//! the full dataset.

use std::collections::BTreeMap;

use campaign_core::{AppConfig, CampaignAggregate, CampaignError, CampaignResult, Dataset};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::attribution::{AttributionEngine, AttributionMode, CampaignAttribution};
use crate::bayes::{BayesianComparator, ComparisonResult, Variant};
use crate::dashboard::{overview, rank_by_conversion, ConversionRanking, DatasetOverview};
use crate::economics::{compute_all, summarize_portfolio, BudgetBook, EconomicsRow, PortfolioSummary};
use crate::funnel::{journey, JourneySummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRef {
    pub campaign_id: i64,
    pub campaign_name: String,
}

impl From<&CampaignAggregate> for CampaignRef {
    fn from(aggregate: &CampaignAggregate) -> Self {
        Self {
            campaign_id: aggregate.campaign_id,
            campaign_name: aggregate.campaign_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignComparison {
    pub id: Uuid,
    pub campaign_a: CampaignRef,
    pub campaign_b: CampaignRef,
    pub winner_campaign_id: i64,
    pub certainty: f64,
    pub result: ComparisonResult,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignReport {
    pub aggregate: CampaignAggregate,
    pub journey: JourneySummary,
    pub ranking: ConversionRanking,
    pub grouped: CampaignAttribution,
    pub detailed: CampaignAttribution,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicsReport {
    pub rows: Vec<EconomicsRow>,
    /// `None` when no campaign has a positive budget.
    pub portfolio: Option<PortfolioSummary>,
}

pub struct AnalysisSession {
    config: AppConfig,
    dataset: Dataset,
    budgets: BudgetBook,
}

impl AnalysisSession {
    pub fn new(config: AppConfig, dataset: Dataset) -> CampaignResult<Self> {
        config.validate()?;
        info!(records = dataset.records().len(), "Analysis session started");
        Ok(Self {
            config,
            dataset,
            budgets: BudgetBook::new(),
        })
    }

    pub fn budgets(&self) -> &BudgetBook {
        &self.budgets
    }

    pub fn aggregates(&self) -> BTreeMap<i64, CampaignAggregate> {
        aggregate(self.dataset.records())
    }

    pub fn overview(&self) -> DatasetOverview {
        overview(&self.dataset)
    }

    pub fn compare_campaigns(&self, campaign_a: i64, campaign_b: i64) -> CampaignResult<CampaignComparison> {
        if campaign_a == campaign_b {
            return Err(CampaignError::Validation(format!(
                "cannot compare campaign {campaign_a} with itself"
            )));
        }
        let aggregates = self.aggregates();
        let a = lookup(&aggregates, campaign_a)?;
        let b = lookup(&aggregates, campaign_b)?;

        let result = BayesianComparator::new(&self.config.bayes).compare(
            a.purchases,
            a.users,
            b.purchases,
            b.users,
        )?;
        let winner_campaign_id = match result.winner {
            Variant::A => campaign_a,
            Variant::B => campaign_b,
        };

        info!(
            campaign_a,
            campaign_b,
            winner = winner_campaign_id,
            certainty = result.certainty,
            "Campaigns compared"
        );

        Ok(CampaignComparison {
            id: Uuid::new_v4(),
            campaign_a: a.into(),
            campaign_b: b.into(),
            winner_campaign_id,
            certainty: result.certainty,
            result,
            computed_at: Utc::now(),
        })
    }

    pub fn campaign_report(&self, campaign_id: i64) -> CampaignResult<CampaignReport> {
        let aggregates = self.aggregates();
        let aggregate = lookup(&aggregates, campaign_id)?.clone();
        let ranking = rank_by_conversion(&aggregates, campaign_id)?;

        let engine = AttributionEngine::new(&self.config.attribution);
        let grouped = engine.attribute_campaign(&self.dataset, campaign_id, AttributionMode::Grouped)?;
        let detailed = engine.attribute_campaign(&self.dataset, campaign_id, AttributionMode::Detailed)?;

        Ok(CampaignReport {
            journey: journey(&aggregate),
            aggregate,
            ranking,
            grouped,
            detailed,
            generated_at: Utc::now(),
        })
    }

    /// Apply budget updates, last write wins. A single invalid amount rejects
    /// the whole batch.
    pub fn recompute_budgets<I>(&mut self, updates: I) -> CampaignResult<()>
    where
        I: IntoIterator<Item = (i64, f64)>,
    {
        let updates: Vec<(i64, f64)> = updates.into_iter().collect();
        let aggregates = self.aggregates();
        for (campaign_id, _) in &updates {
            if !aggregates.contains_key(campaign_id) {
                warn!(campaign_id, "Budget set for a campaign absent from the dataset");
            }
        }
        self.budgets.apply(updates)
    }

    pub fn economics(&self) -> EconomicsReport {
        let aggregates = self.aggregates();
        let rows = compute_all(aggregates.values(), &self.budgets);
        let portfolio = summarize_portfolio(&rows);
        EconomicsReport { rows, portfolio }
    }
}

fn lookup(
    aggregates: &BTreeMap<i64, CampaignAggregate>,
    campaign_id: i64,
) -> CampaignResult<&CampaignAggregate> {
    aggregates
        .get(&campaign_id)
        .ok_or(CampaignError::UnknownCampaign(campaign_id))
}
