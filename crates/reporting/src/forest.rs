//! Random forest fitted for its impurity-based feature importances.
//!
//! Trees are grown on bootstrap samples with Gini impurity, considering
//! `sqrt(n_features)` non-constant candidate features per split. All
//! randomness derives from a single seed, so identical inputs yield identical
//! forests.

use campaign_core::{CampaignError, CampaignResult};
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub seed: u64,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

pub struct RandomForest {
    importances: Vec<f64>,
}

impl RandomForest {
    pub fn fit(x: ArrayView2<'_, f64>, y: &[bool], params: &ForestParams) -> CampaignResult<Self> {
        let (n_rows, n_features) = x.dim();
        if n_rows == 0 || n_features == 0 {
            return Err(CampaignError::Validation(
                "cannot fit a forest on an empty matrix".into(),
            ));
        }
        if n_rows != y.len() {
            return Err(CampaignError::Validation(format!(
                "feature matrix has {n_rows} rows but outcome has {}",
                y.len()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(CampaignError::Validation(
                "feature matrix contains missing or non-finite values".into(),
            ));
        }

        let max_features = ((n_features as f64).sqrt() as usize).max(1);
        let mut master = StdRng::seed_from_u64(params.seed);
        let tree_decreases: Vec<Vec<f64>> = (0..params.n_estimators.max(1))
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(master.gen());
                let sample: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
                grow_tree(x, y, sample, max_features, params, &mut rng)
            })
            .collect();

        let importances = forest_importances(&tree_decreases, n_features);
        Ok(Self { importances })
    }

    /// Mean impurity decrease per feature, non-negative and summing to 1.
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

/// Grow one tree on `sample` and return its total weighted impurity decrease
/// per feature.
fn grow_tree(
    x: ArrayView2<'_, f64>,
    y: &[bool],
    sample: Vec<usize>,
    max_features: usize,
    params: &ForestParams,
    rng: &mut StdRng,
) -> Vec<f64> {
    let mut impurity_decrease = vec![0.0; x.ncols()];
    let mut pending = vec![(sample, 0usize)];

    while let Some((rows, depth)) = pending.pop() {
        let n = rows.len();
        let positives = rows.iter().filter(|&&i| y[i]).count();
        let impurity = gini(positives, n);

        let splittable = n >= params.min_samples_split
            && impurity > 0.0
            && params.max_depth.map_or(true, |max| depth < max);
        if !splittable {
            continue;
        }
        let Some(split) = best_split(x, y, &rows, positives, impurity, max_features, rng) else {
            continue;
        };

        impurity_decrease[split.feature] += split.decrease.max(0.0);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&i| x[[i, split.feature]] <= split.threshold);
        pending.push((right_rows, depth + 1));
        pending.push((left_rows, depth + 1));
    }

    impurity_decrease
}

/// Best Gini split among up to `max_features` randomly ordered non-constant
/// features. `decrease` is weighted by node size.
fn best_split(
    x: ArrayView2<'_, f64>,
    y: &[bool],
    rows: &[usize],
    positives: usize,
    impurity: f64,
    max_features: usize,
    rng: &mut StdRng,
) -> Option<SplitCandidate> {
    let n = rows.len();
    let mut features: Vec<usize> = (0..x.ncols()).collect();
    features.shuffle(rng);

    let mut best: Option<SplitCandidate> = None;
    let mut visited = 0;
    let mut column: Vec<(f64, bool)> = Vec::with_capacity(n);

    for feature in features {
        if visited >= max_features {
            break;
        }
        column.clear();
        column.extend(rows.iter().map(|&i| (x[[i, feature]], y[i])));
        column.sort_by(|a, b| a.0.total_cmp(&b.0));
        if column[0].0 == column[n - 1].0 {
            continue;
        }
        visited += 1;

        let mut left_positives = 0;
        for k in 1..n {
            if column[k - 1].1 {
                left_positives += 1;
            }
            if column[k].0 <= column[k - 1].0 {
                continue;
            }
            let (n_left, n_right) = (k, n - k);
            let decrease = n as f64 * impurity
                - n_left as f64 * gini(left_positives, n_left)
                - n_right as f64 * gini(positives - left_positives, n_right);
            if best.as_ref().map_or(true, |b| decrease > b.decrease) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (column[k - 1].0 + column[k].0) / 2.0,
                    decrease,
                });
            }
        }
    }

    best
}

/// Normalize each tree's decreases, average over informative trees, and
/// renormalize. With no informative tree the mass is spread uniformly.
fn forest_importances(trees: &[Vec<f64>], n_features: usize) -> Vec<f64> {
    let mut totals = vec![0.0; n_features];
    let mut informative = 0usize;
    for tree in trees {
        let sum: f64 = tree.iter().sum();
        if sum <= 0.0 {
            continue;
        }
        informative += 1;
        for (total, value) in totals.iter_mut().zip(tree) {
            *total += value / sum;
        }
    }

    let sum: f64 = totals.iter().sum();
    if informative == 0 || sum <= 0.0 {
        return vec![1.0 / n_features as f64; n_features];
    }
    totals.iter().map(|v| v / sum).collect()
}
