use serde::{ Deserialize, Serialize };

use crate::constants::{ CONFIDENCE_THRESHOLD, OBSERVER_NOISE_LEVEL };
use crate::environments::Reward;
use crate::errors::{ BanditError, BanditResult };

/// Absorbs floating point error so that a confidence which is mathematically
/// equal to the threshold (e.g. 1 - 0.1 - 0.2 against 0.7) is not counted as
/// exceeding it.
const CONFIDENCE_TOLERANCE: f64 = 1e-12;

/// Parameters of the idealised outside observer. They are owned by an external
/// configuration provider and injected when the environment is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpistemicConfig {
    pub confidence_threshold: f64,
    pub noise_level: f64,
}

impl Default for EpistemicConfig {
    fn default() -> Self {
        EpistemicConfig {
            confidence_threshold: CONFIDENCE_THRESHOLD,
            noise_level: OBSERVER_NOISE_LEVEL,
        }
    }
}

impl EpistemicConfig {
    pub fn validate(&self) -> BanditResult<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(
                BanditError::InvalidConfiguration(
                    format!(
                        "confidence_threshold must be in [0, 1], got {}",
                        self.confidence_threshold
                    )
                )
            );
        }
        if !self.noise_level.is_finite() || self.noise_level < 0.0 {
            return Err(
                BanditError::InvalidConfiguration(
                    format!("noise_level must be a finite value >= 0, got {}", self.noise_level)
                )
            );
        }
        Ok(())
    }
}

/// Hint naming the arms an observer with access to the true probabilities
/// would rule out as optimal after seeing one round.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EpistemicClue {
    pub discard_arms: Vec<usize>,
}

/// Builds the clue for a round in which `action` was played and `reward`
/// observed. The played arm is never judged.
///
/// The confidence that another arm is sub-optimal is a heuristic, not a
/// Bayesian posterior:
/// - reward 1: `1 - p[arm] - noise_level`
/// - reward 0: `p[arm] + noise_level`
///
/// both clamped to [0, 1]. Arms whose confidence is strictly above the
/// threshold are returned in ascending order.
pub fn generate_epistemic_clue(
    reward_probabilities: &[f64],
    action: usize,
    reward: Reward,
    config: &EpistemicConfig
) -> EpistemicClue {
    let discard_arms = reward_probabilities
        .iter()
        .enumerate()
        .filter(|&(arm, _)| arm != action)
        .filter(|&(_, &probability)| {
            let confidence = discard_confidence(probability, reward, config.noise_level);
            confidence > config.confidence_threshold + CONFIDENCE_TOLERANCE
        })
        .map(|(arm, _)| arm)
        .collect();

    EpistemicClue { discard_arms }
}

fn discard_confidence(probability: f64, reward: Reward, noise_level: f64) -> f64 {
    let confidence = if reward == 1 {
        1.0 - probability - noise_level
    } else {
        probability + noise_level
    };
    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    const PROBABILITIES: [f64; 3] = [0.1, 0.5, 0.9];

    #[test]
    fn test_reward_on_best_arm_discards_nothing() {
        let clue = generate_epistemic_clue(&PROBABILITIES, 2, 1, &EpistemicConfig::default());

        assert_eq!(clue.discard_arms, Vec::<usize>::new());
    }

    #[test]
    fn test_confidence_equal_to_threshold_is_not_enough() {
        let confidence = discard_confidence(0.1, 1, 0.2);

        assert_relative_eq!(confidence, 0.7, epsilon = 1e-12);
        let clue = generate_epistemic_clue(&[0.1, 0.95, 0.95], 2, 1, &EpistemicConfig::default());
        assert!(clue.discard_arms.is_empty());
    }

    #[test]
    fn test_reward_discards_unattractive_arms() {
        let clue = generate_epistemic_clue(&[0.0, 0.05, 1.0], 2, 1, &EpistemicConfig::default());

        assert_eq!(clue.discard_arms, vec![0, 1]);
    }

    #[test]
    fn test_no_reward_discards_attractive_arms() {
        // arm 1: 0.5 + 0.2 sits on the threshold, arm 2: 0.9 + 0.2 clamps to 1.0
        let clue = generate_epistemic_clue(&PROBABILITIES, 0, 0, &EpistemicConfig::default());

        assert_eq!(clue.discard_arms, vec![2]);
    }

    #[test]
    fn test_played_arm_is_never_discarded() {
        let clue = generate_epistemic_clue(&[0.9, 0.9, 0.9], 1, 0, &EpistemicConfig::default());

        assert_eq!(clue.discard_arms, vec![0, 2]);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(discard_confidence(1.0, 1, 0.2), 0.0);
        assert_eq!(discard_confidence(0.95, 0, 0.2), 1.0);
    }

    #[test]
    fn test_injected_threshold_is_used() {
        let config = EpistemicConfig { confidence_threshold: 0.5, noise_level: 0.0 };

        let clue = generate_epistemic_clue(&PROBABILITIES, 2, 1, &config);

        assert_eq!(clue.discard_arms, vec![0]);
    }

    #[test]
    fn test_config_defaults_fill_missing_keys() {
        let config: EpistemicConfig =
            serde_json::from_str(r#"{"confidence_threshold": 0.6}"#).unwrap();

        assert_eq!(config.confidence_threshold, 0.6);
        assert_eq!(config.noise_level, OBSERVER_NOISE_LEVEL);
    }

    #[test]
    fn test_config_validation() {
        assert!(EpistemicConfig::default().validate().is_ok());

        let too_confident = EpistemicConfig { confidence_threshold: 1.5, noise_level: 0.2 };
        assert!(matches!(too_confident.validate(), Err(BanditError::InvalidConfiguration(_))));

        let negative_noise = EpistemicConfig { confidence_threshold: 0.7, noise_level: -0.1 };
        assert!(matches!(negative_noise.validate(), Err(BanditError::InvalidConfiguration(_))));
    }
}
