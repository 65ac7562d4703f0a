//! Thompson Sampling arm selection (§4.6 step 3). Kept separate from the
//! orchestrator worker so the selection rule can be unit-tested without a
//! database or event log.

use pipeline_core::model::Experiment;
use rand::Rng;
use rand_distr::{Beta, Distribution};

/// Samples `theta_i ~ Beta(alpha_i, beta_i)` independently for each active
/// experiment and returns the one with the highest sample. Ties (equal
/// floating-point samples, vanishingly rare) are broken by iteration
/// order, i.e. the first experiment encountered wins — callers should pass
/// `experiments` in a stable order (the accessor orders by
/// `experiment_id`).
pub fn select_experiment<'a>(
    experiments: &'a [Experiment],
    rng: &mut impl Rng,
) -> Option<&'a Experiment> {
    experiments
        .iter()
        .map(|exp| {
            let dist = Beta::new(exp.alpha, exp.beta).expect("alpha/beta >= 1.0 is always a valid Beta prior");
            (exp, dist.sample(rng))
        })
        .fold(None, |best: Option<(&Experiment, f64)>, (exp, sample)| match best {
            Some((_, best_sample)) if best_sample >= sample => best,
            _ => Some((exp, sample)),
        })
        .map(|(exp, _)| exp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn experiment(id: &str, alpha: f64, beta: f64) -> Experiment {
        Experiment {
            experiment_id: id.to_string(),
            name: id.to_string(),
            variant: "a".to_string(),
            config: json!({}),
            alpha,
            beta,
            leads_assigned: 0,
            outreach_sent: 0,
            responses_received: 0,
            conversions: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn single_experiment_always_wins() {
        let experiments = vec![experiment("a", 1.0, 1.0)];
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let selected = select_experiment(&experiments, &mut rng).unwrap();
            assert_eq!(selected.experiment_id, "a");
        }
    }

    #[test]
    fn no_experiments_selects_none() {
        let experiments: Vec<Experiment> = vec![];
        let mut rng = rand::thread_rng();
        assert!(select_experiment(&experiments, &mut rng).is_none());
    }

    #[test]
    fn strongly_favored_arm_wins_most_of_the_time() {
        // alpha=101 beta=1 concentrates near 1.0; alpha=1 beta=101 near 0.0.
        let experiments = vec![experiment("winner", 101.0, 1.0), experiment("loser", 1.0, 101.0)];
        let mut rng = rand::thread_rng();
        let mut winner_count = 0;
        for _ in 0..200 {
            if select_experiment(&experiments, &mut rng).unwrap().experiment_id == "winner" {
                winner_count += 1;
            }
        }
        assert!(winner_count > 190, "expected winner to dominate selection, got {winner_count}/200");
    }

    #[test]
    fn identical_priors_split_roughly_evenly_over_many_trials() {
        let experiments = vec![experiment("a", 1.0, 1.0), experiment("b", 1.0, 1.0)];
        let mut rng = rand::thread_rng();
        let mut a_count = 0;
        for _ in 0..2000 {
            if select_experiment(&experiments, &mut rng).unwrap().experiment_id == "a" {
                a_count += 1;
            }
        }
        let ratio = a_count as f64 / 2000.0;
        assert!((0.4..0.6).contains(&ratio), "expected roughly uniform split, got {ratio}");
    }
}
