//! Deterministic scoring used whenever the LLM path is unavailable,
//! unconfigured, or unparseable. Always succeeds.

use rand::Rng;

use crate::rubric::{ScoringInput, ScoringOutput, Tier};

const JITTER: f64 = 0.05;

pub fn fallback_score(input: &ScoringInput) -> ScoringOutput {
    let tier = Tier::classify(input.employee_count, input.revenue);
    let (lo, hi) = tier.score_range();

    let jitter = rand::thread_rng().gen_range(-JITTER..=JITTER);
    let score = (tier.midpoint() + jitter).clamp(lo, hi);

    let persona = match tier {
        Tier::High => "enterprise",
        Tier::Medium => "smb",
        Tier::Low => "startup",
    };

    ScoringOutput {
        score,
        persona: persona.to_string(),
        reasoning: format!(
            "fallback heuristic: {} employees, ${:.0} revenue classified as {:?}",
            input.employee_count, input.revenue, tier
        ),
        model_version: "fallback-heuristic-v1".to_string(),
        mock: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(employee_count: i64, revenue: f64) -> ScoringInput {
        ScoringInput {
            company_name: "Acme Corp".to_string(),
            industry: "software".to_string(),
            employee_count,
            revenue,
            website: "https://acme.example".to_string(),
        }
    }

    #[test]
    fn stays_within_tier_bounds_across_many_samples() {
        for _ in 0..500 {
            let out = fallback_score(&input(600, 20_000_000.0));
            assert!(out.score >= 0.80 && out.score <= 1.00, "score out of HIGH range: {}", out.score);
        }
        for _ in 0..500 {
            let out = fallback_score(&input(150, 0.0));
            assert!(out.score >= 0.50 && out.score <= 0.79, "score out of MEDIUM range: {}", out.score);
        }
        for _ in 0..500 {
            let out = fallback_score(&input(5, 0.0));
            assert!(out.score >= 0.00 && out.score <= 0.49, "score out of LOW range: {}", out.score);
        }
    }

    #[test]
    fn marks_output_as_mock() {
        let out = fallback_score(&input(5, 0.0));
        assert!(out.mock);
        assert_eq!(out.model_version, "fallback-heuristic-v1");
    }

    #[test]
    fn assigns_persona_by_tier() {
        assert_eq!(fallback_score(&input(600, 0.0)).persona, "enterprise");
        assert_eq!(fallback_score(&input(150, 0.0)).persona, "smb");
        assert_eq!(fallback_score(&input(5, 0.0)).persona, "startup");
    }
}
