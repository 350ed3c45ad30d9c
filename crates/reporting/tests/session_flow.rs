//! End-to-end flow over a normalized table: load, overview, compare,
//! attribution, and budgets.

use campaign_core::types::columns;
use campaign_core::{AppConfig, CampaignError, Cell, Dataset, SurveyQuestion, Table};
use campaign_reporting::attribution::AttributionOutcome;
use campaign_reporting::economics::EconomicsStatus;
use campaign_reporting::AnalysisSession;

fn flag(on: bool) -> Cell {
    Cell::Number(if on { 1.0 } else { 0.0 })
}

/// Campaign 1: 60 users, buyers keep passwords in a manager and pay 30.
/// Campaign 2: 60 users, purchases recorded without revenue.
/// Campaign 3: 20 users, too few to rank.
fn build_table() -> Table {
    let mut columns: Vec<String> = [
        columns::CAMPAIGN_ID,
        columns::CAMPAIGN_NAME,
        columns::USER_ID,
        columns::PURCHASED,
        columns::QUIZ_SCORE,
        columns::TRANSACTION_STARTED,
        columns::REVENUE,
        columns::BREACH_FOUND,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    columns.extend(SurveyQuestion::ALL.iter().map(|q| q.answered_column().to_string()));
    columns.extend(SurveyQuestion::all_option_columns().map(String::from));

    let mut rows = Vec::new();
    let campaigns: [(i64, &str, usize, usize); 3] =
        [(1, "Spring Push", 60, 3), (2, "Summer Sale", 60, 6), (3, "Pilot", 20, 4)];
    for (campaign_id, name, users, every) in campaigns {
        for u in 0..users {
            let purchased = u % every == 0;
            let revenue = if purchased && campaign_id == 1 { 30.0 } else { 0.0 };
            let mut row = vec![
                Cell::Number(campaign_id as f64),
                Cell::Text(name.to_string()),
                Cell::Text(format!("c{campaign_id}-u{u}")),
                flag(purchased),
                Cell::Number((u % 5) as f64),
                flag(purchased || u % 2 == 0),
                Cell::Number(revenue),
                flag(u % 7 == 0),
            ];
            for (q, _) in SurveyQuestion::ALL.iter().enumerate() {
                row.push(flag((u + q) % 2 == 0));
            }
            for column in SurveyQuestion::all_option_columns() {
                let on = if column == "keep_your_passwords_3" {
                    purchased
                } else {
                    (u + column.len()) % 2 == 0
                };
                row.push(flag(on));
            }
            rows.push(row);
        }
    }

    Table { columns, rows }
}

fn make_session() -> AnalysisSession {
    let json = serde_json::to_string(&build_table()).unwrap();
    let table = Table::from_json(&json).unwrap();
    let dataset = Dataset::from_table(&table).unwrap();

    let mut config = AppConfig::default();
    config.bayes.seed = Some(5);
    config.attribution.n_estimators = 30;
    AnalysisSession::new(config, dataset).unwrap()
}

#[test]
fn overview_lists_campaigns_in_id_order() {
    let session = make_session();
    let overview = session.overview();

    assert_eq!(overview.total_campaigns, 3);
    assert_eq!(overview.total_users, 140);
    assert_eq!(overview.total_purchases, 20 + 10 + 5);
    assert!((overview.conversion_rate - 25.0).abs() < 1e-9);
    let names: Vec<&str> = overview.campaigns.iter().map(|c| c.campaign_name.as_str()).collect();
    assert_eq!(names, vec!["Spring Push", "Summer Sale", "Pilot"]);

    let summer = &overview.campaigns[1];
    assert_eq!(summer.purchases, 10);
    assert_eq!(summer.payers, 0);
    assert_eq!(summer.ltv, None);
}

#[test]
fn comparison_prefers_higher_conversion() {
    let session = make_session();
    let comparison = session.compare_campaigns(2, 1).unwrap();

    assert_eq!(comparison.campaign_a.campaign_name, "Summer Sale");
    assert_eq!(comparison.winner_campaign_id, 1);
    assert!(comparison.result.uplift > 16.0);
    assert!(comparison.certainty > 90.0);
}

#[test]
fn campaign_report_ranks_purchase_drivers() {
    let session = make_session();
    let report = session.campaign_report(1).unwrap();

    assert_eq!(report.ranking.rank, 1);
    assert_eq!(report.ranking.total, 3);
    assert_eq!(report.journey.stages[0].users, 60);

    let AttributionOutcome::Ranked(grouped) = &report.grouped.outcome else {
        panic!("expected a grouped ranking");
    };
    assert_eq!(grouped.features.len(), 8);
    let total: f64 = grouped.features.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-6);
    assert!(grouped.top().is_some());

    let AttributionOutcome::Ranked(detailed) = &report.detailed.outcome else {
        panic!("expected a detailed ranking");
    };
    assert_eq!(detailed.features.len(), 10);
    let top = &detailed.features[0];
    assert_eq!(top.feature, "keep_your_passwords_3");
    assert_eq!(top.label, "Password Manager");
    assert_eq!(top.question.as_deref(), Some("How do you keep your passwords?"));
}

#[test]
fn small_campaign_reports_not_enough_data() {
    let session = make_session();
    let report = session.campaign_report(3).unwrap();

    match report.grouped.outcome {
        AttributionOutcome::NotEnoughData { usable_rows, required } => {
            assert_eq!(usable_rows, 20);
            assert_eq!(required, 31);
        }
        AttributionOutcome::Ranked(_) => panic!("20 rows must not be ranked"),
    }
    assert!(matches!(
        session.campaign_report(42),
        Err(CampaignError::UnknownCampaign(42))
    ));
}

#[test]
fn budgets_feed_unit_economics() {
    let mut session = make_session();
    session.recompute_budgets([(1, 100.0), (2, 500.0)]).unwrap();

    let report = session.economics();
    assert_eq!(report.rows.len(), 2);

    let spring = &report.rows[0];
    assert!((spring.cac - 5.0).abs() < f64::EPSILON);
    assert!((spring.ltv_cac_ratio - 6.0).abs() < 1e-12);
    assert_eq!(spring.status, EconomicsStatus::Excellent);

    let summer = &report.rows[1];
    assert_eq!(summer.status, EconomicsStatus::NoPayers);
    assert!(!summer.ratio_available());

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["rows"][1]["cac"].is_null());
    assert_eq!(json["rows"][0]["status"], "Excellent");
    assert_eq!(json["rows"][1]["status"], "No Payers");
    assert!(json["rows"][1]["advice"].as_str().is_some_and(|a| !a.is_empty()));

    let portfolio = report.portfolio.unwrap();
    assert_eq!(portfolio.profitable_count, 1);
    assert_eq!(portfolio.total_payers, 20);
}
