//! Top-1 selection over a model's score vector.

use uuid::Uuid;

use crate::classes::ClassSet;
use crate::error::{DetectorError, Result};
use crate::models::{ClassScore, PredictionResult};

/// Winning class of a score vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Top1 {
    pub index: usize,
    pub confidence_percent: f32,
    /// Every class as a percentage; sums to ~100.
    pub percentages: Vec<f32>,
}

/// Pick the highest-scoring class. The first index wins ties.
///
/// Non-negative scores are rescaled by their sum, so a softmax output keeps
/// its values. Any negative score marks the vector as logits and it goes
/// through softmax instead. Both rules raise the winner's confidence when
/// its score rises.
pub fn top1(scores: &[f32]) -> Result<Top1> {
    if scores.is_empty() {
        return Err(DetectorError::InvalidScores("empty score vector".into()));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(DetectorError::InvalidScores(format!(
            "non-finite score {bad}"
        )));
    }

    let probabilities = if scores.iter().all(|&s| s >= 0.0) {
        renormalize(scores)
    } else {
        softmax(scores)
    };

    // Argmax over the raw scores; softmax preserves order but can tie in f32.
    let index = scores
        .iter()
        .enumerate()
        .fold(0, |best, (i, &v)| if v > scores[best] { i } else { best });
    let best = probabilities[index];

    Ok(Top1 {
        index,
        confidence_percent: to_percent(best),
        percentages: probabilities.iter().map(|&p| to_percent(p)).collect(),
    })
}

fn renormalize(scores: &[f32]) -> Vec<f32> {
    let total: f32 = scores.iter().sum();
    if total <= 0.0 {
        // all zeros
        let uniform = 1.0 / scores.len() as f32;
        return vec![uniform; scores.len()];
    }
    scores.iter().map(|s| s / total).collect()
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn to_percent(probability: f32) -> f32 {
    round2((probability * 100.0).clamp(0.0, 100.0))
}

/// Round to two decimals, the precision results are displayed with.
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Local time in the format shown on result cards.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Map a model's raw output to a result.
pub fn from_scores(scores: &[f32], classes: &ClassSet) -> Result<PredictionResult> {
    if scores.len() != classes.len() {
        return Err(DetectorError::InvalidScores(format!(
            "expected {} scores, got {}",
            classes.len(),
            scores.len()
        )));
    }
    let top = top1(scores)?;
    let label = classes.label(top.index).ok_or_else(|| {
        DetectorError::InvalidScores(format!("no label for class index {}", top.index))
    })?;

    Ok(PredictionResult {
        request_id: Uuid::new_v4(),
        predicted_class_index: top.index,
        class_name: label.name().to_string(),
        confidence_percent: top.confidence_percent,
        is_simulated: false,
        timestamp: timestamp(),
        scores: classes
            .labels()
            .iter()
            .zip(&top.percentages)
            .map(|(label, &percent)| ClassScore {
                class_name: label.name().to_string(),
                percent,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn picks_argmax_of_probabilities() {
        let top = top1(&[0.1, 0.05, 0.7, 0.1, 0.05]).unwrap();
        assert_eq!(top.index, 2);
        assert_abs_diff_eq!(top.confidence_percent, 70.0, epsilon = 0.01);
    }

    #[test]
    fn first_index_wins_ties() {
        let top = top1(&[0.4, 0.4, 0.1, 0.05, 0.05]).unwrap();
        assert_eq!(top.index, 0);
    }

    #[test]
    fn raising_a_probability_winner_never_lowers_confidence() {
        let before = top1(&[0.9, 0.025, 0.025, 0.025, 0.025]).unwrap();
        let after = top1(&[0.95, 0.025, 0.025, 0.025, 0.025]).unwrap();
        assert_abs_diff_eq!(before.confidence_percent, 90.0, epsilon = 0.01);
        assert_eq!(after.index, before.index);
        assert!(after.confidence_percent >= before.confidence_percent);
    }

    #[test]
    fn unnormalized_non_negative_scores_are_rescaled() {
        let top = top1(&[2.0, 6.0, 0.0, 1.0, 1.0]).unwrap();
        assert_eq!(top.index, 1);
        assert_abs_diff_eq!(top.confidence_percent, 60.0, epsilon = 0.01);
    }

    #[test]
    fn all_zero_scores_are_uniform() {
        let top = top1(&[0.0; 5]).unwrap();
        assert_eq!(top.index, 0);
        assert_abs_diff_eq!(top.confidence_percent, 20.0, epsilon = 0.01);
    }

    #[test]
    fn logits_are_softmaxed() {
        let top = top1(&[2.0, 1.0, 0.5, -1.0, 3.5]).unwrap();
        assert_eq!(top.index, 4);
        let total: f32 = top.percentages.iter().sum();
        assert_abs_diff_eq!(total, 100.0, epsilon = 0.05);
    }

    #[test]
    fn rejects_empty_and_non_finite() {
        assert!(top1(&[]).is_err());
        assert!(top1(&[0.1, f32::NAN, 0.2, 0.3, 0.4]).is_err());
        assert!(top1(&[0.1, f32::INFINITY, 0.2, 0.3, 0.4]).is_err());
    }

    #[test]
    fn from_scores_maps_label_and_breakdown() {
        let classes = ClassSet::default();
        let result = from_scores(&[0.05, 0.05, 0.1, 0.75, 0.05], &classes).unwrap();
        assert_eq!(result.predicted_class_index, 3);
        assert_eq!(result.class_name, "Trichuris");
        assert!(!result.is_simulated);
        assert_eq!(result.scores.len(), 5);
        assert_eq!(result.scores[3].class_name, "Trichuris");
    }

    #[test]
    fn from_scores_rejects_wrong_length() {
        let err = from_scores(&[0.5, 0.5], &ClassSet::default()).unwrap_err();
        assert!(err.to_string().contains("expected 5 scores"));
    }

    #[test]
    fn round2_keeps_two_decimals() {
        assert_abs_diff_eq!(round2(72.34567), 72.35, epsilon = 1e-4);
    }

    /// Random non-negative weights divided by their sum.
    fn distribution_strategy() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(0.0f32..1.0, 5)
            .prop_filter("non-zero total", |v| v.iter().sum::<f32>() > 1e-3)
            .prop_map(|v| {
                let total: f32 = v.iter().sum();
                v.into_iter().map(|x| x / total).collect()
            })
    }

    fn argmax(scores: &[f32]) -> usize {
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        scores.iter().position(|&s| s == max).unwrap()
    }

    proptest! {
        #[test]
        fn index_is_arithmetic_argmax(scores in prop::collection::vec(-50.0f32..50.0, 5)) {
            prop_assert_eq!(top1(&scores).unwrap().index, argmax(&scores));
        }

        #[test]
        fn index_is_argmax_of_distribution(scores in distribution_strategy()) {
            prop_assert_eq!(top1(&scores).unwrap().index, argmax(&scores));
        }

        #[test]
        fn confidence_is_monotonic_in_winning_logit(
            scores in prop::collection::vec(-5.0f32..5.0, 5),
            bump in 0.0f32..5.0,
        ) {
            let before = top1(&scores).unwrap();
            let mut raised = scores.clone();
            raised[before.index] += bump;
            let after = top1(&raised).unwrap();
            prop_assert_eq!(after.index, before.index);
            prop_assert!(after.confidence_percent >= before.confidence_percent);
        }

        #[test]
        fn confidence_is_monotonic_in_winning_probability(
            scores in distribution_strategy(),
            bump in 0.0f32..1.0,
        ) {
            let before = top1(&scores).unwrap();
            let mut raised = scores.clone();
            raised[before.index] += bump;
            let after = top1(&raised).unwrap();
            prop_assert_eq!(after.index, before.index);
            prop_assert!(after.confidence_percent >= before.confidence_percent);
        }

        #[test]
        fn percentages_sum_to_hundred(scores in prop::collection::vec(-20.0f32..20.0, 5)) {
            let top = top1(&scores).unwrap();
            let total: f32 = top.percentages.iter().sum();
            prop_assert!((total - 100.0).abs() < 0.1);
            prop_assert!((0.0..=100.0).contains(&top.confidence_percent));
        }
    }
}
