//! Campaign analytics — per-campaign aggregation, Bayesian conversion
//! comparison, purchase-driver attribution, unit economics, and the session
//! facade that ties them to one dataset.

pub mod aggregate;
pub mod attribution;
pub mod bayes;
pub mod dashboard;
pub mod economics;
pub mod forest;
pub mod funnel;
pub mod session;
pub mod stats;

pub use aggregate::aggregate;
pub use attribution::{AttributionEngine, AttributionMode, FeatureRanker, ForestRanker};
pub use bayes::{BayesianComparator, ComparisonResult};
pub use dashboard::{overview, rank_by_conversion};
pub use economics::{compute_economics, summarize_portfolio, BudgetBook, EconomicsRow};
pub use funnel::journey;
pub use session::AnalysisSession;
