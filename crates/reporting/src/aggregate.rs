//! Per-campaign aggregation of user records.

use std::collections::{BTreeMap, HashSet};

use campaign_core::{CampaignAggregate, UserRecord};
use tracing::debug;

#[derive(Default)]
struct Accumulator<'a> {
    campaign_name: Option<&'a str>,
    users: HashSet<&'a str>,
    payers: HashSet<&'a str>,
    purchases: u64,
    revenue: f64,
    quiz_finished: u64,
    transactions_started: u64,
}

/// Group records by campaign id and compute the campaign counts.
///
/// `payers` is derived from `revenue > 0` while `purchases` sums the purchase
/// indicator; the two are tracked independently and may disagree.
pub fn aggregate<'a, I>(records: I) -> BTreeMap<i64, CampaignAggregate>
where
    I: IntoIterator<Item = &'a UserRecord>,
{
    let mut groups: BTreeMap<i64, Accumulator<'a>> = BTreeMap::new();

    for record in records {
        let acc = groups.entry(record.campaign_id).or_default();
        if acc.campaign_name.is_none() {
            acc.campaign_name = Some(record.campaign_name.as_str());
        }
        acc.users.insert(record.user_id.as_str());
        if record.purchased {
            acc.purchases += 1;
        }
        if record.is_payer() {
            acc.payers.insert(record.user_id.as_str());
            acc.revenue += record.revenue;
        }
        if record.quiz_finished() {
            acc.quiz_finished += 1;
        }
        if record.transaction_started {
            acc.transactions_started += 1;
        }
    }

    let aggregates: BTreeMap<i64, CampaignAggregate> = groups
        .into_iter()
        .map(|(campaign_id, acc)| (campaign_id, finish(campaign_id, acc)))
        .collect();

    debug!(campaigns = aggregates.len(), "Campaign aggregates rebuilt");
    aggregates
}

fn finish(campaign_id: i64, acc: Accumulator<'_>) -> CampaignAggregate {
    let users = acc.users.len() as u64;
    let payers = acc.payers.len() as u64;

    CampaignAggregate {
        campaign_id,
        campaign_name: acc.campaign_name.unwrap_or_default().to_string(),
        users,
        purchases: acc.purchases,
        payers,
        revenue: acc.revenue,
        quiz_finished: acc.quiz_finished,
        transactions_started: acc.transactions_started,
        conversion_rate: conversion_rate(acc.purchases, users),
        ltv: if payers > 0 {
            Some(acc.revenue / payers as f64)
        } else {
            None
        },
    }
}

/// Purchases per exposed user as a percentage, 0 for an unexposed campaign.
pub fn conversion_rate(purchases: u64, users: u64) -> f64 {
    if users > 0 {
        purchases as f64 / users as f64 * 100.0
    } else {
        0.0
    }
}
