//! Purchase attribution — ranks user attributes by how well they predict a
//! purchase within one campaign.
//!
//! Two granularities are supported: grouped (one "answered" flag per survey
//! question plus quiz score and breach indicator) and detailed (every
//! individual answer flag). Ranking is delegated to a [`FeatureRanker`].

use campaign_core::config::AttributionConfig;
use campaign_core::types::columns;
use campaign_core::{CampaignError, CampaignResult, Dataset, SurveyQuestion, UserRecord};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::forest::{ForestParams, RandomForest};

/// Capability that scores features against a binary outcome.
///
/// Implementations must be deterministic for a fixed configuration and
/// return one non-negative score per column, summing to 1.
pub trait FeatureRanker {
    fn importances(&self, features: ArrayView2<'_, f64>, outcome: &[bool]) -> CampaignResult<Vec<f64>>;
}

/// Impurity-based importances from a seeded random forest.
#[derive(Debug, Clone, Default)]
pub struct ForestRanker {
    params: ForestParams,
}

impl ForestRanker {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }
}

impl FeatureRanker for ForestRanker {
    fn importances(&self, features: ArrayView2<'_, f64>, outcome: &[bool]) -> CampaignResult<Vec<f64>> {
        let forest = RandomForest::fit(features, outcome, &self.params)?;
        Ok(forest.feature_importances().to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionMode {
    Grouped,
    Detailed,
}

/// Named feature columns with missing cells stored as NaN.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn from_records<'a, I>(records: I, names: &[&str]) -> CampaignResult<(Self, Vec<bool>)>
    where
        I: IntoIterator<Item = &'a UserRecord>,
    {
        let mut cells = Vec::new();
        let mut outcome = Vec::new();
        for record in records {
            cells.extend(names.iter().map(|n| record.feature(n).unwrap_or(f64::NAN)));
            outcome.push(record.purchased);
        }
        let values = Array2::from_shape_vec((outcome.len(), names.len()), cells)
            .map_err(|e| CampaignError::Validation(format!("feature matrix shape: {e}")))?;
        Ok((
            Self {
                names: names.iter().map(|n| n.to_string()).collect(),
                values,
            },
            outcome,
        ))
    }

    /// Rows without any missing feature, with their outcomes.
    fn complete_cases(&self, outcome: &[bool]) -> (Array2<f64>, Vec<bool>) {
        let keep: Vec<usize> = self
            .values
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|v| v.is_finite()))
            .map(|(i, _)| i)
            .collect();
        let complete = self.values.select(ndarray::Axis(0), &keep);
        let y = keep.iter().map(|&i| outcome[i]).collect();
        (complete, y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
    /// Display label: a grouped-feature name or an answer label, falling back
    /// to the raw column name.
    pub label: String,
    /// Survey prompt the feature belongs to, when it is an answer flag.
    pub question: Option<String>,
}

/// Features ordered by descending importance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceResult {
    pub usable_rows: usize,
    pub features: Vec<FeatureImportance>,
}

impl ImportanceResult {
    /// The strongest predictor.
    pub fn top(&self) -> Option<&FeatureImportance> {
        self.features.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttributionOutcome {
    Ranked(ImportanceResult),
    NotEnoughData { usable_rows: usize, required: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignAttribution {
    pub campaign_id: i64,
    pub mode: AttributionMode,
    pub outcome: AttributionOutcome,
}

pub struct AttributionEngine<R = ForestRanker> {
    ranker: R,
    min_rows: usize,
    detailed_top_n: usize,
}

impl AttributionEngine<ForestRanker> {
    pub fn new(config: &AttributionConfig) -> Self {
        let params = ForestParams {
            n_estimators: config.n_estimators,
            seed: config.seed,
            max_depth: config.max_depth,
            ..ForestParams::default()
        };
        Self::with_ranker(ForestRanker::new(params), config)
    }
}

impl<R: FeatureRanker> AttributionEngine<R> {
    pub fn with_ranker(ranker: R, config: &AttributionConfig) -> Self {
        Self {
            ranker,
            min_rows: config.min_rows.max(1),
            detailed_top_n: config.detailed_top_n.max(1),
        }
    }

    /// Rank every column of `matrix` against `outcome`.
    ///
    /// Rows with a missing feature are dropped first; fewer than `min_rows`
    /// remaining rows fails with `InsufficientData`. Equal scores keep the
    /// column order.
    pub fn rank_features(
        &self,
        matrix: &FeatureMatrix,
        outcome: &[bool],
    ) -> CampaignResult<ImportanceResult> {
        if matrix.values.nrows() != outcome.len() {
            return Err(CampaignError::Validation(format!(
                "feature matrix has {} rows but outcome has {}",
                matrix.values.nrows(),
                outcome.len()
            )));
        }

        let (x, y) = matrix.complete_cases(outcome);
        let usable_rows = y.len();
        if usable_rows < self.min_rows {
            return Err(CampaignError::InsufficientData {
                usable_rows,
                required: self.min_rows,
            });
        }

        let scores = self.ranker.importances(x.view(), &y)?;
        if scores.len() != matrix.names.len() {
            return Err(CampaignError::Validation(format!(
                "ranker returned {} scores for {} features",
                scores.len(),
                matrix.names.len()
            )));
        }

        let mut features: Vec<FeatureImportance> = matrix
            .names
            .iter()
            .zip(scores)
            .map(|(name, importance)| FeatureImportance {
                feature: name.clone(),
                importance,
                label: name.clone(),
                question: None,
            })
            .collect();
        // Stable: ties keep column order.
        features.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        debug!(usable_rows, features = features.len(), "Feature ranking fitted");
        Ok(ImportanceResult {
            usable_rows,
            features,
        })
    }

    /// Rank one campaign's features in the given mode. Too few usable rows is
    /// reported as `NotEnoughData` rather than an error.
    pub fn attribute_campaign(
        &self,
        dataset: &Dataset,
        campaign_id: i64,
        mode: AttributionMode,
    ) -> CampaignResult<CampaignAttribution> {
        let names = match mode {
            AttributionMode::Grouped => {
                let names = grouped_features();
                dataset.require_columns(names.iter().copied())?;
                names
            }
            AttributionMode::Detailed => {
                let names = detailed_features(dataset);
                if names.is_empty() {
                    let first = SurveyQuestion::all_option_columns().next().unwrap_or_default();
                    return Err(CampaignError::missing_column(first));
                }
                names
            }
        };

        let (matrix, outcome) =
            FeatureMatrix::from_records(dataset.campaign_records(campaign_id), &names)?;
        let outcome = match self.rank_features(&matrix, &outcome) {
            Ok(result) => AttributionOutcome::Ranked(match mode {
                AttributionMode::Grouped => label_grouped(result),
                AttributionMode::Detailed => label_detailed(result, self.detailed_top_n),
            }),
            Err(CampaignError::InsufficientData {
                usable_rows,
                required,
            }) => {
                info!(
                    campaign_id,
                    ?mode,
                    usable_rows,
                    required,
                    "Not enough data for attribution"
                );
                AttributionOutcome::NotEnoughData {
                    usable_rows,
                    required,
                }
            }
            Err(e) => return Err(e),
        };

        Ok(CampaignAttribution {
            campaign_id,
            mode,
            outcome,
        })
    }
}

/// Answered flags for every question, then quiz score and breach indicator.
pub fn grouped_features() -> Vec<&'static str> {
    SurveyQuestion::ALL
        .iter()
        .map(|q| q.answered_column())
        .chain([columns::QUIZ_SCORE, columns::BREACH_FOUND])
        .collect()
}

/// Every catalogue answer flag present in the dataset, in catalogue order.
pub fn detailed_features(dataset: &Dataset) -> Vec<&'static str> {
    SurveyQuestion::all_option_columns()
        .filter(|c| dataset.has_column(c))
        .collect()
}

fn grouped_label(feature: &str) -> Option<&'static str> {
    match feature {
        columns::QUIZ_SCORE => Some("Safety Quiz Score"),
        columns::BREACH_FOUND => Some("Security Breach"),
        other => SurveyQuestion::for_answered(other).map(|q| q.display_name()),
    }
}

fn label_grouped(mut result: ImportanceResult) -> ImportanceResult {
    for f in &mut result.features {
        if let Some(label) = grouped_label(&f.feature) {
            f.label = label.to_string();
        }
    }
    result
}

fn label_detailed(mut result: ImportanceResult, top_n: usize) -> ImportanceResult {
    result.features.truncate(top_n);
    for f in &mut result.features {
        if let Some((question, option)) = SurveyQuestion::for_option(&f.feature) {
            f.label = option.label.to_string();
            f.question = Some(question.prompt().to_string());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Scores columns by their index so ordering is easy to predict.
    struct IndexRanker;

    impl FeatureRanker for IndexRanker {
        fn importances(&self, features: ArrayView2<'_, f64>, _: &[bool]) -> CampaignResult<Vec<f64>> {
            let n = features.ncols();
            let total: f64 = (1..=n).map(|i| i as f64).sum();
            Ok((1..=n).map(|i| i as f64 / total).collect())
        }
    }

    /// Gives every column the same score.
    struct FlatRanker;

    impl FeatureRanker for FlatRanker {
        fn importances(&self, features: ArrayView2<'_, f64>, _: &[bool]) -> CampaignResult<Vec<f64>> {
            let n = features.ncols();
            Ok(vec![1.0 / n as f64; n])
        }
    }

    fn user(i: usize, campaign_id: i64) -> UserRecord {
        let password_manager = i % 3 == 0;
        let mut survey = BTreeMap::new();
        for question in SurveyQuestion::ALL {
            survey.insert(question.answered_column().to_string(), Some((i % 2) as f64));
            for option in question.options() {
                survey.insert(option.column.to_string(), Some(0.0));
            }
        }
        survey.insert(
            "keep_your_passwords_3".to_string(),
            Some(if password_manager { 1.0 } else { 0.0 }),
        );
        UserRecord {
            campaign_id,
            campaign_name: "Spring".into(),
            user_id: format!("u{i}"),
            purchased: password_manager,
            quiz_score: Some((i % 10) as f64),
            transaction_started: password_manager,
            revenue: if password_manager { 20.0 } else { 0.0 },
            breach_found: Some((i % 5 == 0) as u8 as f64),
            survey,
        }
    }

    fn dataset(rows: usize) -> Dataset {
        let records: Vec<_> = (0..rows).map(|i| user(i, 1)).collect();
        let mut columns: Vec<&str> = grouped_features();
        columns.extend(SurveyQuestion::all_option_columns());
        Dataset::new(records, columns)
    }

    fn matrix(rows: usize, cols: usize) -> (FeatureMatrix, Vec<bool>) {
        let values = Array2::from_shape_fn((rows, cols), |(i, j)| ((i + j) % 2) as f64);
        let names = (0..cols).map(|j| format!("f{j}")).collect();
        let outcome = (0..rows).map(|i| i % 2 == 0).collect();
        (FeatureMatrix { names, values }, outcome)
    }

    #[test]
    fn test_rank_descending() {
        let engine = AttributionEngine::with_ranker(IndexRanker, &AttributionConfig::default());
        let (m, y) = matrix(40, 4);
        let result = engine.rank_features(&m, &y).unwrap();
        let order: Vec<_> = result.features.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["f3", "f2", "f1", "f0"]);
        assert_eq!(result.top().unwrap().feature, "f3");
        assert_eq!(result.usable_rows, 40);
    }

    #[test]
    fn test_ties_keep_column_order() {
        let engine = AttributionEngine::with_ranker(FlatRanker, &AttributionConfig::default());
        let (m, y) = matrix(40, 5);
        let result = engine.rank_features(&m, &y).unwrap();
        let order: Vec<_> = result.features.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["f0", "f1", "f2", "f3", "f4"]);
    }

    #[test]
    fn test_minimum_row_floor() {
        let engine = AttributionEngine::with_ranker(FlatRanker, &AttributionConfig::default());

        let (m, y) = matrix(30, 3);
        match engine.rank_features(&m, &y) {
            Err(CampaignError::InsufficientData {
                usable_rows,
                required,
            }) => {
                assert_eq!(usable_rows, 30);
                assert_eq!(required, 31);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }

        let (m, y) = matrix(31, 3);
        assert!(engine.rank_features(&m, &y).is_ok());
    }

    #[test]
    fn test_missing_cells_drop_rows_before_floor() {
        let engine = AttributionEngine::with_ranker(FlatRanker, &AttributionConfig::default());
        let (mut m, y) = matrix(32, 3);
        m.values[[0, 1]] = f64::NAN;
        m.values[[5, 2]] = f64::NAN;
        assert!(matches!(
            engine.rank_features(&m, &y),
            Err(CampaignError::InsufficientData { usable_rows: 30, .. })
        ));
    }

    #[test]
    fn test_forest_importances_sum_to_one() {
        let engine = AttributionEngine::new(&AttributionConfig::default());
        let data = dataset(90);
        let attribution = engine
            .attribute_campaign(&data, 1, AttributionMode::Grouped)
            .unwrap();
        let AttributionOutcome::Ranked(result) = attribution.outcome else {
            panic!("expected a ranking");
        };
        let total: f64 = result.features.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert_eq!(result.features.len(), 8);
        assert!(result.features.iter().all(|f| f.importance >= 0.0));
        assert!(result.features.iter().any(|f| f.label == "Safety Quiz Score"));
    }

    #[test]
    fn test_grouped_ranking_is_reproducible() {
        let engine = AttributionEngine::new(&AttributionConfig::default());
        let data = dataset(60);
        let first = engine.attribute_campaign(&data, 1, AttributionMode::Grouped).unwrap();
        let second = engine.attribute_campaign(&data, 1, AttributionMode::Grouped).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_detailed_mode_labels_and_truncates() {
        let engine = AttributionEngine::new(&AttributionConfig::default());
        let data = dataset(90);
        let attribution = engine
            .attribute_campaign(&data, 1, AttributionMode::Detailed)
            .unwrap();
        let AttributionOutcome::Ranked(result) = attribution.outcome else {
            panic!("expected a ranking");
        };
        assert_eq!(result.features.len(), 10);
        let top = result.top().unwrap();
        assert_eq!(top.feature, "keep_your_passwords_3");
        assert_eq!(top.label, "Password Manager");
        assert_eq!(top.question.as_deref(), Some("How do you keep your passwords?"));
        assert!(result.features.iter().all(|f| f.question.is_some()));
    }

    #[test]
    fn test_sparse_campaign_reports_not_enough_data() {
        let engine = AttributionEngine::new(&AttributionConfig::default());
        let data = dataset(20);
        let attribution = engine
            .attribute_campaign(&data, 1, AttributionMode::Grouped)
            .unwrap();
        assert!(matches!(
            attribution.outcome,
            AttributionOutcome::NotEnoughData {
                usable_rows: 20,
                required: 31
            }
        ));
    }

    #[test]
    fn test_grouped_mode_requires_columns() {
        let engine = AttributionEngine::new(&AttributionConfig::default());
        let records: Vec<_> = (0..40).map(|i| user(i, 1)).collect();
        let data = Dataset::new(records, [columns::QUIZ_SCORE]);
        assert!(matches!(
            engine.attribute_campaign(&data, 1, AttributionMode::Grouped),
            Err(CampaignError::MissingColumn { .. })
        ));
        assert!(matches!(
            engine.attribute_campaign(&data, 1, AttributionMode::Detailed),
            Err(CampaignError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_unlabelled_feature_falls_back_to_name() {
        let result = ImportanceResult {
            usable_rows: 40,
            features: vec![FeatureImportance {
                feature: "custom_flag".into(),
                importance: 1.0,
                label: "custom_flag".into(),
                question: None,
            }],
        };
        let labelled = label_detailed(result, 10);
        assert_eq!(labelled.features[0].label, "custom_flag");
        assert_eq!(labelled.features[0].question, None);
    }
}
