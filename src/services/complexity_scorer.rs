use crate::domain::models::complexity::{
    ComplexityLevel, ComplexityMetrics, ComplexityScore, DelegationStrategy,
};
use crate::domain::models::request::{RequestContext, RiskLevel};

/// Score at or below which a request is handled by a single agent
pub const SINGLE_AGENT_THRESHOLD: f64 = 25.0;
/// Upper bound of the moderate level
pub const MODERATE_THRESHOLD: f64 = 50.0;
/// Upper bound of the complex level
pub const COMPLEX_THRESHOLD: f64 = 100.0;

const FILE_WEIGHT: f64 = 2.0;
const FILE_CAP: f64 = 30.0;
const VOLUME_DIVISOR: f64 = 50.0;
const VOLUME_CAP: f64 = 25.0;
const DEPENDENCY_WEIGHT: f64 = 3.0;
const DEPENDENCY_CAP: f64 = 20.0;

/// Operations that are structurally heavy regardless of context
const HEAVY_OPERATIONS: &[&str] = &["architecture", "refactor", "migration", "redesign"];

/// Pure complexity scoring for delegation requests.
///
/// Deterministic, no side effects, no I/O: the same operation and context
/// always produce the same metrics and score. Unrecognized context keys are
/// ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityScorer;

impl ComplexityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Break a request down into additive sub-scores
    pub fn analyze(&self, operation: &str, context: &RequestContext) -> ComplexityMetrics {
        let operation_factor = Self::operation_factor(operation);

        let file_factor = context
            .file_count
            .map_or(0.0, |n| (n as f64 * FILE_WEIGHT).min(FILE_CAP));

        let volume_factor = context
            .change_volume
            .map_or(0.0, |n| (n as f64 / VOLUME_DIVISOR).min(VOLUME_CAP));

        let dependency_factor = context
            .dependencies
            .map_or(0.0, |n| (n as f64 * DEPENDENCY_WEIGHT).min(DEPENDENCY_CAP));

        let risk_factor = match context.risk_level.unwrap_or_default() {
            RiskLevel::Low => 0.0,
            RiskLevel::Medium => 10.0,
            RiskLevel::High => 25.0,
            RiskLevel::Critical => 40.0,
        };

        let raw_total =
            operation_factor + file_factor + volume_factor + dependency_factor + risk_factor;

        // Explicit caller estimate wins; otherwise derive from the score
        let estimated_duration_mins = context
            .estimated_duration_mins
            .unwrap_or_else(|| ((raw_total * 1.2) as u64).max(5));

        ComplexityMetrics {
            operation_factor,
            file_factor,
            volume_factor,
            dependency_factor,
            risk_factor,
            estimated_duration_mins,
        }
    }

    /// Collapse metrics into a score, level, and strategy recommendation.
    ///
    /// The strategy is a pure function of the score with fixed thresholds:
    /// at or below 25 a single agent suffices, above that multiple agents
    /// participate. Complex and enterprise levels differentiate only the
    /// conflict policy chosen downstream, not the base strategy.
    pub fn score(&self, metrics: &ComplexityMetrics) -> ComplexityScore {
        self.score_with_hint(metrics, None)
    }

    /// Like [`score`](Self::score), honoring a caller agent-count hint for
    /// multi-agent strategies.
    pub fn score_with_hint(
        &self,
        metrics: &ComplexityMetrics,
        agent_count_hint: Option<usize>,
    ) -> ComplexityScore {
        let score = metrics.total();

        let level = if score <= SINGLE_AGENT_THRESHOLD {
            ComplexityLevel::Simple
        } else if score <= MODERATE_THRESHOLD {
            ComplexityLevel::Moderate
        } else if score <= COMPLEX_THRESHOLD {
            ComplexityLevel::Complex
        } else {
            ComplexityLevel::Enterprise
        };

        let recommended_strategy = if score <= SINGLE_AGENT_THRESHOLD {
            DelegationStrategy::SingleAgent
        } else {
            DelegationStrategy::MultiAgent
        };

        let estimated_agents = match recommended_strategy {
            DelegationStrategy::SingleAgent => 1,
            DelegationStrategy::MultiAgent => agent_count_hint.unwrap_or(2).max(2),
            DelegationStrategy::OrchestratorLed => agent_count_hint.unwrap_or(3).max(3),
        };

        ComplexityScore {
            score,
            level,
            recommended_strategy,
            estimated_agents,
        }
    }

    fn operation_factor(operation: &str) -> f64 {
        let op = operation.to_lowercase();
        if HEAVY_OPERATIONS.iter().any(|kw| op.contains(kw)) {
            10.0
        } else {
            5.0
        }
    }
}
