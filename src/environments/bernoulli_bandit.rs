use rand::rngs::StdRng;
use rand::{ Rng, SeedableRng };
use serde::Serialize;
use tracing::{ debug, trace, warn };

use crate::constants::NUM_OF_ARMS;
use crate::environments::epistemic::{ generate_epistemic_clue, EpistemicClue, EpistemicConfig };
use crate::environments::Reward;
use crate::errors::{ BanditError, BanditResult };

/// One played round as recorded in the environment history.
/// Rounds are numbered from 1 since the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundRecord {
    pub round: usize,
    pub action: usize,
    pub reward: Reward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentPhase {
    /// Constructed or reset, no round played yet.
    Ready,
    /// At least one round played since the last reset.
    Active,
}

/// Extra information returned alongside the reward. Empty unless the
/// environment was built with epistemic info enabled.
///
/// Both fields are derived from ground truth. They exist for offline
/// evaluation and for agents built to consume a supervisory channel; a
/// learning agent must never be fed them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StepInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_arm: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epistemic_clue: Option<EpistemicClue>,
}

impl StepInfo {
    pub fn is_empty(&self) -> bool {
        self.optimal_arm.is_none() && self.epistemic_clue.is_none()
    }
}

/// Three slot machine leavers, each paying 1 with a fixed probability that
/// the agent does not know and 0 otherwise. An optional noise term perturbs
/// the probability used for each individual pull.
#[derive(Debug, Clone)]
pub struct BernoulliBanditEnvironment<R: Rng> {
    reward_probabilities: Vec<f64>,
    noise: f64,
    epistemic_enabled: bool,
    epistemic_config: EpistemicConfig,
    optimal_arm: usize,
    round_index: usize,
    history: Vec<RoundRecord>,
    rng: R,
}

impl BernoulliBanditEnvironment<StdRng> {
    /// Builds an environment whose reward draws come from a `StdRng` seeded
    /// with `seed`.
    pub fn seeded(
        reward_probabilities: Vec<f64>,
        noise: f64,
        epistemic_enabled: bool,
        seed: u64
    ) -> BanditResult<Self> {
        Self::new(reward_probabilities, noise, epistemic_enabled, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> BernoulliBanditEnvironment<R> {
    pub fn new(
        reward_probabilities: Vec<f64>,
        noise: f64,
        epistemic_enabled: bool,
        rng: R
    ) -> BanditResult<Self> {
        Self::with_epistemic_config(
            reward_probabilities,
            noise,
            epistemic_enabled,
            EpistemicConfig::default(),
            rng
        )
    }

    /// Same as `new`, with the observer parameters used for epistemic clues
    /// supplied by the caller instead of the defaults.
    pub fn with_epistemic_config(
        reward_probabilities: Vec<f64>,
        noise: f64,
        epistemic_enabled: bool,
        epistemic_config: EpistemicConfig,
        rng: R
    ) -> BanditResult<Self> {
        validate_reward_probabilities(&reward_probabilities)?;
        if !noise.is_finite() || noise < 0.0 {
            return Err(
                BanditError::InvalidConfiguration(
                    format!("noise must be a finite value >= 0, got {noise}")
                )
            );
        }
        epistemic_config.validate()?;

        let optimal_arm = find_optimal_arm(&reward_probabilities);
        debug!(
            probabilities = ?reward_probabilities,
            noise,
            epistemic_enabled,
            optimal_arm,
            "Creating Bernoulli bandit environment"
        );

        Ok(BernoulliBanditEnvironment {
            reward_probabilities,
            noise,
            epistemic_enabled,
            epistemic_config,
            optimal_arm,
            round_index: 0,
            history: Vec::new(),
            rng,
        })
    }

    /// Clears the round counter and history and returns the true reward
    /// probabilities as the initial observation. Calling it twice in a row is
    /// the same as calling it once.
    pub fn reset(&mut self) -> Vec<f64> {
        debug!(rounds_played = self.round_index, "Resetting environment");
        self.round_index = 0;
        self.history.clear();
        self.get_true_probs()
    }

    pub fn get_true_probs(&self) -> Vec<f64> {
        self.reward_probabilities.clone()
    }

    /// Pulls the leaver `action`. Returns a reward of 1 (win) or 0 (loss)
    /// together with the step info. An out of range action is rejected
    /// before any state changes.
    pub fn step(&mut self, action: usize) -> BanditResult<(Reward, StepInfo)> {
        if action >= self.arm_count() {
            warn!(action, arm_count = self.arm_count(), "Rejecting out of range action");
            return Err(BanditError::InvalidAction { action, arm_count: self.arm_count() });
        }

        // effective_probability is clamped to [0, 1], so the draw cannot panic
        let probability = self.effective_probability(action);
        let reward: Reward = match self.rng.gen_bool(probability) {
            true => 1,
            false => 0,
        };

        self.round_index += 1;
        self.history.push(RoundRecord { round: self.round_index, action, reward });
        trace!(round = self.round_index, action, probability, reward, "Played round");

        let info = if self.epistemic_enabled {
            StepInfo {
                optimal_arm: Some(self.optimal_arm),
                epistemic_clue: Some(self.generate_epistemic_clue(action, reward)),
            }
        } else {
            StepInfo::default()
        };

        Ok((reward, info))
    }

    /// Hint computed from the true probabilities with the injected observer
    /// parameters. Independent of any agent state.
    pub fn generate_epistemic_clue(&self, action: usize, reward: Reward) -> EpistemicClue {
        generate_epistemic_clue(&self.reward_probabilities, action, reward, &self.epistemic_config)
    }

    /// clamp(p[action] + U(-noise, noise), 0, 1). No random draw is made when
    /// noise is zero. The unit draw is scaled afterwards so that any finite
    /// noise, up to f64::MAX, stays finite.
    fn effective_probability(&mut self, action: usize) -> f64 {
        let perturbation = if self.noise > 0.0 {
            self.rng.gen_range(-1.0..=1.0_f64) * self.noise
        } else {
            0.0
        };
        (self.reward_probabilities[action] + perturbation).clamp(0.0, 1.0)
    }

    pub fn arm_count(&self) -> usize {
        self.reward_probabilities.len()
    }

    /// Ground truth, for evaluating an agent after the fact.
    pub fn optimal_arm(&self) -> usize {
        self.optimal_arm
    }

    pub fn noise(&self) -> f64 {
        self.noise
    }

    pub fn is_epistemic_enabled(&self) -> bool {
        self.epistemic_enabled
    }

    pub fn round_index(&self) -> usize {
        self.round_index
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn phase(&self) -> EnvironmentPhase {
        if self.round_index == 0 { EnvironmentPhase::Ready } else { EnvironmentPhase::Active }
    }
}

fn validate_reward_probabilities(reward_probabilities: &[f64]) -> BanditResult<()> {
    if reward_probabilities.len() != NUM_OF_ARMS {
        return Err(
            BanditError::InvalidConfiguration(
                format!(
                    "expected {} reward probabilities, got {}",
                    NUM_OF_ARMS,
                    reward_probabilities.len()
                )
            )
        );
    }
    if let Some(probability) = reward_probabilities.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(
            BanditError::InvalidConfiguration(
                format!("Probability must be in the range [0, 1], got {probability}")
            )
        );
    }
    Ok(())
}

/// Index of the largest probability, the first one wins on ties.
fn find_optimal_arm(reward_probabilities: &[f64]) -> usize {
    reward_probabilities
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best_arm, best_value), (arm, &value)| {
            if value > best_value { (arm, value) } else { (best_arm, best_value) }
        }).0
}
