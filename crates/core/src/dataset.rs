//! Normalized input table and its load-time validation.
//!
//! The table arrives already normalized (survey answers expanded to binary
//! flags). Loading checks that the required columns exist, maps survey
//! columns onto the question catalogue, and converts each row into a
//! [`UserRecord`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CampaignError, CampaignResult};
use crate::survey::SurveyQuestion;
use crate::types::{columns, UserRecord};

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Column-named rows as produced by the dataset normalizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn from_json(json: &str) -> CampaignResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Validated in-memory dataset for one analysis session.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    feature_columns: BTreeSet<String>,
    records: Vec<UserRecord>,
}

impl Dataset {
    /// Build a dataset from already-typed records. `feature_columns` lists the
    /// feature columns the records carry.
    pub fn new<I, S>(records: Vec<UserRecord>, feature_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            feature_columns: feature_columns.into_iter().map(Into::into).collect(),
            records,
        }
    }

    pub fn from_table(table: &Table) -> CampaignResult<Self> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(table.columns.len());
        for (i, name) in table.columns.iter().enumerate() {
            if index.insert(name.as_str(), i).is_some() {
                return Err(CampaignError::Validation(format!(
                    "duplicate column: {name}"
                )));
            }
        }

        for required in columns::REQUIRED {
            if !index.contains_key(required) {
                return Err(CampaignError::missing_column(required));
            }
        }

        let mut feature_columns = BTreeSet::new();
        feature_columns.insert(columns::QUIZ_SCORE.to_string());
        let mut survey_columns: Vec<(&str, usize)> = Vec::new();
        for (name, &i) in &index {
            if *name == columns::BREACH_FOUND {
                feature_columns.insert(name.to_string());
            } else if SurveyQuestion::for_answered(name).is_some()
                || SurveyQuestion::for_option(name).is_some()
            {
                feature_columns.insert(name.to_string());
                survey_columns.push((*name, i));
            } else if SurveyQuestion::shares_prefix(name) {
                debug!(column = %name, "Ignoring survey column outside the question catalogue");
            }
        }
        survey_columns.sort_unstable();

        let col = |name: &str| index.get(name).copied();
        let campaign_id_col = index[columns::CAMPAIGN_ID];
        let campaign_name_col = index[columns::CAMPAIGN_NAME];
        let user_id_col = index[columns::USER_ID];
        let purchased_col = index[columns::PURCHASED];
        let quiz_col = index[columns::QUIZ_SCORE];
        let revenue_col = index[columns::REVENUE];
        let transaction_col = col(columns::TRANSACTION_STARTED);
        let breach_col = col(columns::BREACH_FOUND);

        let mut records = Vec::with_capacity(table.rows.len());
        for (row_no, row) in table.rows.iter().enumerate() {
            if row.len() != table.columns.len() {
                return Err(CampaignError::invalid_value(
                    row_no,
                    "*",
                    format!("row has {} cells, expected {}", row.len(), table.columns.len()),
                ));
            }

            let revenue = optional_number(&row[revenue_col], row_no, columns::REVENUE)?
                .unwrap_or(0.0);
            if revenue < 0.0 {
                return Err(CampaignError::invalid_value(
                    row_no,
                    columns::REVENUE,
                    "revenue must be non-negative",
                ));
            }

            let transaction_started = match transaction_col {
                Some(i) => optional_flag(&row[i], row_no, columns::TRANSACTION_STARTED)?
                    .unwrap_or(false),
                None => false,
            };

            let breach_found = match breach_col {
                Some(i) => optional_number(&row[i], row_no, columns::BREACH_FOUND)?,
                None => None,
            };

            let mut survey = BTreeMap::new();
            for &(name, i) in &survey_columns {
                survey.insert(name.to_string(), optional_number(&row[i], row_no, name)?);
            }

            records.push(UserRecord {
                campaign_id: required_integer(&row[campaign_id_col], row_no, columns::CAMPAIGN_ID)?,
                campaign_name: required_text(&row[campaign_name_col], row_no, columns::CAMPAIGN_NAME)?,
                user_id: required_text(&row[user_id_col], row_no, columns::USER_ID)?,
                purchased: optional_flag(&row[purchased_col], row_no, columns::PURCHASED)?
                    .ok_or_else(|| {
                        CampaignError::invalid_value(row_no, columns::PURCHASED, "missing value")
                    })?,
                quiz_score: optional_number(&row[quiz_col], row_no, columns::QUIZ_SCORE)?,
                transaction_started,
                revenue,
                breach_found,
                survey,
            });
        }

        info!(
            rows = records.len(),
            feature_columns = feature_columns.len(),
            "Dataset loaded"
        );

        Ok(Self {
            feature_columns,
            records,
        })
    }

    pub fn records(&self) -> &[UserRecord] {
        &self.records
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.feature_columns.contains(column)
    }

    /// Fails with `MissingColumn` for the first absent column.
    pub fn require_columns<'a, I>(&self, wanted: I) -> CampaignResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        match wanted.into_iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(CampaignError::missing_column(missing)),
            None => Ok(()),
        }
    }

    /// Records belonging to one campaign, in table order.
    pub fn campaign_records(&self, campaign_id: i64) -> impl Iterator<Item = &UserRecord> {
        self.records
            .iter()
            .filter(move |r| r.campaign_id == campaign_id)
    }
}

fn optional_number(cell: &Cell, row: usize, column: &str) -> CampaignResult<Option<f64>> {
    match cell {
        Cell::Null => Ok(None),
        Cell::Number(v) if v.is_nan() => Ok(None),
        Cell::Number(v) if v.is_finite() => Ok(Some(*v)),
        Cell::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Cell::Text(s) if s.trim().is_empty() => Ok(None),
        Cell::Text(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| CampaignError::invalid_value(row, column, format!("not a number: {s}"))),
        Cell::Number(v) => Err(CampaignError::invalid_value(
            row,
            column,
            format!("non-finite number: {v}"),
        )),
    }
}

fn optional_flag(cell: &Cell, row: usize, column: &str) -> CampaignResult<Option<bool>> {
    match optional_number(cell, row, column)? {
        None => Ok(None),
        Some(v) if v == 0.0 => Ok(Some(false)),
        Some(v) if v == 1.0 => Ok(Some(true)),
        Some(v) => Err(CampaignError::invalid_value(
            row,
            column,
            format!("expected 0 or 1, got {v}"),
        )),
    }
}

fn required_integer(cell: &Cell, row: usize, column: &str) -> CampaignResult<i64> {
    match optional_number(cell, row, column)? {
        Some(v) if v.fract() == 0.0 => Ok(v as i64),
        Some(v) => Err(CampaignError::invalid_value(
            row,
            column,
            format!("expected an integer, got {v}"),
        )),
        None => Err(CampaignError::invalid_value(row, column, "missing value")),
    }
}

fn required_text(cell: &Cell, row: usize, column: &str) -> CampaignResult<String> {
    match cell {
        Cell::Text(s) if !s.trim().is_empty() => Ok(s.clone()),
        Cell::Number(v) if v.is_finite() && v.fract() == 0.0 => Ok(format!("{}", *v as i64)),
        Cell::Number(v) if v.is_finite() => Ok(v.to_string()),
        _ => Err(CampaignError::invalid_value(row, column, "missing value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "columns": ["campaign_id", "campaign_name", "user_id", "purchased",
                        "quiz_score", "revenue", "transaction_started", "breach_found",
                        "keep_your_passwords_answered", "keep_your_passwords_3",
                        "keep_your_passwords_9", "favourite_colour"],
            "rows": [
                [1, "Spring", "u1", 1, 7, 49.5, 1, 0, 1, 1, 0, "red"],
                ["2", "Summer", 1002, 0, null, null, null, 1, null, 0, 1, "blue"],
                [1, "Spring", "u3", true, 0, 0, false, 1, 1, 0, 0, "green"]
            ]
        }"#
    }

    #[test]
    fn test_load_valid_table() {
        let table = Table::from_json(sample_json()).unwrap();
        let dataset = Dataset::from_table(&table).unwrap();
        assert_eq!(dataset.records().len(), 3);

        let first = &dataset.records()[0];
        assert_eq!(first.campaign_id, 1);
        assert!(first.purchased);
        assert!(first.transaction_started);
        assert!(first.quiz_finished());
        assert!((first.revenue - 49.5).abs() < f64::EPSILON);
        assert_eq!(first.feature("keep_your_passwords_3"), Some(1.0));

        let second = &dataset.records()[1];
        assert_eq!(second.campaign_id, 2);
        assert_eq!(second.user_id, "1002");
        assert_eq!(second.quiz_score, None);
        assert_eq!(second.revenue, 0.0);
        assert!(!second.transaction_started);
        assert_eq!(second.feature("keep_your_passwords_answered"), None);
    }

    #[test]
    fn test_catalogue_columns_only() {
        let table = Table::from_json(sample_json()).unwrap();
        let dataset = Dataset::from_table(&table).unwrap();
        assert!(dataset.has_column("keep_your_passwords_3"));
        assert!(dataset.has_column(columns::QUIZ_SCORE));
        assert!(dataset.has_column(columns::BREACH_FOUND));
        assert!(!dataset.has_column("keep_your_passwords_9"));
        assert!(!dataset.has_column("favourite_colour"));
        assert!(!dataset.records()[0].survey.contains_key("keep_your_passwords_9"));
    }

    #[test]
    fn test_missing_required_column() {
        let table = Table {
            columns: vec![
                "campaign_id".into(),
                "campaign_name".into(),
                "user_id".into(),
                "purchased".into(),
                "revenue".into(),
            ],
            rows: vec![],
        };
        match Dataset::from_table(&table) {
            Err(CampaignError::MissingColumn { column }) => assert_eq!(column, "quiz_score"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_revenue_rejected() {
        let table = Table {
            columns: columns::REQUIRED.iter().map(|c| c.to_string()).collect(),
            rows: vec![vec![
                Cell::Number(1.0),
                Cell::Text("Spring".into()),
                Cell::Text("u1".into()),
                Cell::Number(0.0),
                Cell::Number(1.0),
                Cell::Number(-5.0),
            ]],
        };
        assert!(matches!(
            Dataset::from_table(&table),
            Err(CampaignError::InvalidValue { row: 0, .. })
        ));
    }

    #[test]
    fn test_non_binary_purchase_flag_rejected() {
        let table = Table {
            columns: columns::REQUIRED.iter().map(|c| c.to_string()).collect(),
            rows: vec![vec![
                Cell::Number(1.0),
                Cell::Text("Spring".into()),
                Cell::Text("u1".into()),
                Cell::Number(2.0),
                Cell::Number(1.0),
                Cell::Number(0.0),
            ]],
        };
        assert!(matches!(
            Dataset::from_table(&table),
            Err(CampaignError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_require_columns_reports_first_missing() {
        let dataset = Dataset::new(Vec::new(), ["quiz_score"]);
        assert!(dataset.require_columns(["quiz_score"]).is_ok());
        match dataset.require_columns(["quiz_score", "breach_found"]) {
            Err(CampaignError::MissingColumn { column }) => assert_eq!(column, "breach_found"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }
}
