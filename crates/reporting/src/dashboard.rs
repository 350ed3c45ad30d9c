//! Dataset overview and conversion ranking across campaigns.

use std::collections::{BTreeMap, HashSet};

use campaign_core::{CampaignAggregate, CampaignError, CampaignResult, Dataset};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, conversion_rate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub total_campaigns: usize,
    /// Distinct users across the whole dataset.
    pub total_users: usize,
    pub total_purchases: u64,
    /// `total_purchases / total_users` as a percentage, 0 with no users.
    pub conversion_rate: f64,
    /// Sorted by campaign id.
    pub campaigns: Vec<CampaignAggregate>,
    pub generated_at: DateTime<Utc>,
}

/// A campaign's place among all campaigns with at least one user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionRanking {
    pub campaign_id: i64,
    /// Conversion rate, percent.
    pub rate: f64,
    /// 1 is the highest conversion rate.
    pub rank: usize,
    pub total: usize,
}

pub fn overview(dataset: &Dataset) -> DatasetOverview {
    let records = dataset.records();
    let total_users = records
        .iter()
        .map(|r| r.user_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let total_purchases = records.iter().filter(|r| r.purchased).count() as u64;
    let campaigns: Vec<CampaignAggregate> = aggregate(records).into_values().collect();

    DatasetOverview {
        total_campaigns: campaigns.len(),
        total_users,
        total_purchases,
        conversion_rate: conversion_rate(total_purchases, total_users as u64),
        campaigns,
        generated_at: Utc::now(),
    }
}

/// Rank `campaign_id` by conversion rate. Ties are ordered by campaign id.
pub fn rank_by_conversion(
    aggregates: &BTreeMap<i64, CampaignAggregate>,
    campaign_id: i64,
) -> CampaignResult<ConversionRanking> {
    let mut exposed: Vec<&CampaignAggregate> =
        aggregates.values().filter(|a| a.users > 0).collect();
    exposed.sort_by(|a, b| {
        b.conversion_rate
            .total_cmp(&a.conversion_rate)
            .then(a.campaign_id.cmp(&b.campaign_id))
    });

    let position = exposed
        .iter()
        .position(|a| a.campaign_id == campaign_id)
        .ok_or(CampaignError::UnknownCampaign(campaign_id))?;

    Ok(ConversionRanking {
        campaign_id,
        rate: exposed[position].conversion_rate,
        rank: position + 1,
        total: exposed.len(),
    })
}
