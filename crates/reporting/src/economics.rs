//! Unit economics — CAC, LTV, LTV/CAC ratio and ROI per budgeted campaign,
//! plus a blended portfolio roll-up.

use std::collections::BTreeMap;

use campaign_core::{CampaignAggregate, CampaignError, CampaignResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Health of a campaign's LTV/CAC ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EconomicsStatus {
    #[serde(rename = "No Payers")]
    NoPayers,
    #[serde(rename = "LTV unavailable")]
    LtvUnavailable,
    Excellent,
    Good,
    #[serde(rename = "Break-even")]
    BreakEven,
    #[serde(rename = "Losing Money")]
    LosingMoney,
}

/// Budget advice for a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    ReviewTargeting,
    ReduceBudget,
    Scale,
    IncreaseBudget,
    Optimize,
    MonitorClosely,
}

impl Recommendation {
    pub fn message(&self) -> &'static str {
        match self {
            Self::ReviewTargeting => "No paying users yet: review targeting and offer",
            Self::ReduceBudget => "Negative ROI: reduce budget or change strategy",
            Self::Scale => "Strong unit economics: scale this campaign",
            Self::IncreaseBudget => "Healthy returns: consider increasing budget",
            Self::Optimize => "Near break-even: optimize conversion before scaling",
            Self::MonitorClosely => "Weak returns: monitor closely",
        }
    }
}

/// Unit economics of one budgeted campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicsRow {
    pub campaign_id: i64,
    pub campaign_name: String,
    pub budget: f64,
    pub payers: u64,
    pub revenue: f64,
    /// Revenue per payer; `None` when there are no payers.
    pub ltv: Option<f64>,
    /// `budget / payers`; `+inf` when there are no payers.
    pub cac: f64,
    /// `(revenue - budget) / budget * 100`.
    pub roi: f64,
    /// `ltv / cac`; 0 when unavailable.
    pub ltv_cac_ratio: f64,
    pub status: EconomicsStatus,
    pub recommendation: Recommendation,
    /// Human-readable form of `recommendation`.
    pub advice: String,
}

impl EconomicsRow {
    pub fn ratio_available(&self) -> bool {
        self.ltv_cac_ratio > 0.0
    }

    /// Paying users whose value covers their acquisition cost.
    pub fn is_profitable(&self) -> bool {
        self.payers > 0 && self.ltv.is_some_and(|ltv| ltv > 0.0 && self.cac <= ltv)
    }
}

/// Blended metrics across all budgeted campaigns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub campaigns: usize,
    pub total_budget: f64,
    pub total_revenue: f64,
    pub total_payers: u64,
    pub blended_cac: f64,
    pub blended_ltv: Option<f64>,
    pub blended_ratio: f64,
    pub portfolio_roi: f64,
    pub profitable_count: usize,
}

// ---------------------------------------------------------------------------
// BudgetBook
// ---------------------------------------------------------------------------

/// Session-scoped budgets keyed by campaign id. Unset campaigns have a
/// budget of 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetBook {
    budgets: BTreeMap<i64, f64>,
}

impl BudgetBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn budget_for(&self, campaign_id: i64) -> f64 {
        self.budgets.get(&campaign_id).copied().unwrap_or(0.0)
    }

    pub fn set_budget(&mut self, campaign_id: i64, amount: f64) -> CampaignResult<()> {
        validate_budget(campaign_id, amount)?;
        self.budgets.insert(campaign_id, amount);
        Ok(())
    }

    /// Apply a batch of updates, last write wins. Nothing is applied if any
    /// amount is invalid.
    pub fn apply<I>(&mut self, updates: I) -> CampaignResult<()>
    where
        I: IntoIterator<Item = (i64, f64)>,
    {
        let updates: Vec<(i64, f64)> = updates.into_iter().collect();
        for &(campaign_id, amount) in &updates {
            validate_budget(campaign_id, amount)?;
        }
        for (campaign_id, amount) in updates {
            self.budgets.insert(campaign_id, amount);
        }
        info!(budgets = self.budgets.len(), "Budgets updated");
        Ok(())
    }
}

fn validate_budget(campaign_id: i64, amount: f64) -> CampaignResult<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(CampaignError::Validation(format!(
            "budget for campaign {campaign_id} must be a non-negative number, got {amount}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Calculations
// ---------------------------------------------------------------------------

/// LTV/CAC, or 0 when CAC is not a finite positive cost or LTV is not positive.
fn ltv_cac_ratio(ltv: Option<f64>, cac: f64) -> f64 {
    match ltv {
        Some(ltv) if ltv > 0.0 && cac.is_finite() && cac != 0.0 => ltv / cac,
        _ => 0.0,
    }
}

fn status(payers: u64, ltv: Option<f64>, cac: f64, ratio: f64) -> EconomicsStatus {
    if payers == 0 {
        EconomicsStatus::NoPayers
    } else if ltv.map_or(true, |v| v <= 0.0) || !cac.is_finite() || ratio <= 0.0 {
        EconomicsStatus::LtvUnavailable
    } else if ratio >= 3.0 {
        EconomicsStatus::Excellent
    } else if ratio >= 1.5 {
        EconomicsStatus::Good
    } else if ratio >= 1.0 {
        EconomicsStatus::BreakEven
    } else {
        EconomicsStatus::LosingMoney
    }
}

// ROI is checked before the ratio here but not in `status`.
fn recommendation(payers: u64, roi: f64, ratio: f64) -> Recommendation {
    if payers == 0 {
        Recommendation::ReviewTargeting
    } else if roi < 0.0 {
        Recommendation::ReduceBudget
    } else if ratio >= 3.0 {
        Recommendation::Scale
    } else if ratio >= 1.5 {
        Recommendation::IncreaseBudget
    } else if ratio >= 1.0 {
        Recommendation::Optimize
    } else {
        Recommendation::MonitorClosely
    }
}

/// Unit economics for one campaign, or `None` when it has no positive budget.
pub fn compute_economics(aggregate: &CampaignAggregate, budget: f64) -> Option<EconomicsRow> {
    if !(budget > 0.0) {
        return None;
    }

    let payers = aggregate.payers;
    let ltv = aggregate.ltv;
    let cac = if payers > 0 {
        budget / payers as f64
    } else {
        f64::INFINITY
    };
    let roi = (aggregate.revenue - budget) / budget * 100.0;
    let ratio = ltv_cac_ratio(ltv, cac);

    let advice = recommendation(payers, roi, ratio);
    Some(EconomicsRow {
        campaign_id: aggregate.campaign_id,
        campaign_name: aggregate.campaign_name.clone(),
        budget,
        payers,
        revenue: aggregate.revenue,
        ltv,
        cac,
        roi,
        ltv_cac_ratio: ratio,
        status: status(payers, ltv, cac, ratio),
        recommendation: advice,
        advice: advice.message().to_string(),
    })
}

/// Rows for every aggregate with a positive budget, in input order.
pub fn compute_all<'a, I>(aggregates: I, budgets: &BudgetBook) -> Vec<EconomicsRow>
where
    I: IntoIterator<Item = &'a CampaignAggregate>,
{
    let rows: Vec<EconomicsRow> = aggregates
        .into_iter()
        .filter_map(|agg| compute_economics(agg, budgets.budget_for(agg.campaign_id)))
        .collect();
    debug!(rows = rows.len(), "Unit economics computed");
    rows
}

/// Blended roll-up over budgeted rows; `None` when there are none.
pub fn summarize_portfolio(rows: &[EconomicsRow]) -> Option<PortfolioSummary> {
    if rows.is_empty() {
        return None;
    }

    let total_budget: f64 = rows.iter().map(|r| r.budget).sum();
    let total_revenue: f64 = rows.iter().map(|r| r.revenue).sum();
    let total_payers: u64 = rows.iter().map(|r| r.payers).sum();

    let (blended_cac, blended_ltv) = if total_payers > 0 {
        (
            total_budget / total_payers as f64,
            Some(total_revenue / total_payers as f64),
        )
    } else {
        (f64::INFINITY, None)
    };
    let portfolio_roi = if total_budget > 0.0 {
        (total_revenue - total_budget) / total_budget * 100.0
    } else {
        0.0
    };

    Some(PortfolioSummary {
        campaigns: rows.len(),
        total_budget,
        total_revenue,
        total_payers,
        blended_cac,
        blended_ltv,
        blended_ratio: ltv_cac_ratio(blended_ltv, blended_cac),
        portfolio_roi,
        profitable_count: rows.iter().filter(|r| r.is_profitable()).count(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
