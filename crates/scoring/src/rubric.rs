//! The scoring rubric shared by the LLM system prompt and the deterministic
//! fallback heuristic (§4.3).

use serde::{Deserialize, Serialize};

/// Normalized company record passed to the scoring adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringInput {
    pub company_name: String,
    pub industry: String,
    pub employee_count: i64,
    pub revenue: f64,
    pub website: String,
}

/// The adapter's output, regardless of which path produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringOutput {
    pub score: f64,
    pub persona: String,
    pub reasoning: String,
    pub model_version: String,
    pub mock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    /// HIGH: >=500 employees or >= $10M revenue.
    /// MEDIUM: 100-499 employees or $1M-$10M revenue.
    /// LOW: everything else.
    pub fn classify(employee_count: i64, revenue: f64) -> Self {
        if employee_count >= 500 || revenue >= 10_000_000.0 {
            Tier::High
        } else if (100..=499).contains(&employee_count) || (1_000_000.0..10_000_000.0).contains(&revenue) {
            Tier::Medium
        } else {
            Tier::Low
        }
    }

    /// Inclusive score bounds for the tier, per the §4.3 rubric table.
    pub fn score_range(&self) -> (f64, f64) {
        match self {
            Tier::High => (0.80, 1.00),
            Tier::Medium => (0.50, 0.79),
            Tier::Low => (0.00, 0.49),
        }
    }

    pub fn midpoint(&self) -> f64 {
        let (lo, hi) = self.score_range();
        (lo + hi) / 2.0
    }
}

/// The system prompt sent alongside the scoring rubric to the LLM (§6).
pub fn system_prompt() -> String {
    "You are a lead-scoring engine. Score the company on a 0.0-1.0 scale using this rubric: \
     HIGH (0.80-1.00): >=500 employees or >=$10M revenue. \
     MEDIUM (0.50-0.79): 100-499 employees or $1M-$10M revenue. \
     LOW (0.00-0.49): otherwise. \
     Classify the company's persona as one of: enterprise, smb, startup, individual. \
     Respond with a JSON object: {\"score\": <float>, \"persona\": <string>, \"reasoning\": <string>}."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_high_by_employee_count() {
        assert_eq!(Tier::classify(600, 0.0), Tier::High);
    }

    #[test]
    fn classifies_high_by_revenue() {
        assert_eq!(Tier::classify(10, 15_000_000.0), Tier::High);
    }

    #[test]
    fn classifies_medium() {
        assert_eq!(Tier::classify(150, 0.0), Tier::Medium);
        assert_eq!(Tier::classify(5, 2_000_000.0), Tier::Medium);
    }

    #[test]
    fn classifies_low_otherwise() {
        assert_eq!(Tier::classify(5, 0.0), Tier::Low);
    }

    #[test]
    fn score_ranges_match_rubric_table() {
        assert_eq!(Tier::High.score_range(), (0.80, 1.00));
        assert_eq!(Tier::Medium.score_range(), (0.50, 0.79));
        assert_eq!(Tier::Low.score_range(), (0.00, 0.49));
    }
}
