use rand::rngs::StdRng;
use rand::{ Rng, SeedableRng };
use serde::{ Deserialize, Serialize };
use tracing::{ debug, trace };

use crate::agents::{ Agent, AgentState };
use crate::constants::{ EPSILON, EPSILON_DECAY, EPSILON_MIN, LEARNING_RATE };
use crate::environments::Reward;
use crate::errors::{ BanditError, BanditResult };

/// Tunable parameters of the epsilon-greedy agent. Every key is optional when
/// deserialized; missing ones take the defaults from `constants`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Step size parameter used when updating the value function.
    pub learning_rate: f64,
    /// Initial probability of taking an exploratory action.
    pub epsilon: f64,
    /// Factor epsilon is multiplied by after every update.
    pub epsilon_decay: f64,
    /// Floor below which epsilon is never decayed.
    pub epsilon_min: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            learning_rate: LEARNING_RATE,
            epsilon: EPSILON,
            epsilon_decay: EPSILON_DECAY,
            epsilon_min: EPSILON_MIN,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> BanditResult<()> {
        let checks = [
            ("learning_rate", self.learning_rate, self.learning_rate > 0.0 && self.learning_rate <= 1.0),
            ("epsilon", self.epsilon, (0.0..=1.0).contains(&self.epsilon)),
            ("epsilon_decay", self.epsilon_decay, self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0),
            ("epsilon_min", self.epsilon_min, (0.0..=1.0).contains(&self.epsilon_min)),
        ];
        match checks.iter().find(|(_, _, valid)| !valid) {
            Some((name, value, _)) =>
                Err(BanditError::InvalidConfiguration(format!("{name} out of range: {value}"))),
            None => Ok(()),
        }
    }
}

/// Learns the value of each arm with the incremental update
/// new_estimate = old_estimate + learning_rate * (reward - old_estimate)
/// and selects arms epsilon-greedily, decaying epsilon towards a floor.
#[derive(Debug, Clone)]
pub struct EpsilonGreedyAgent<R: Rng> {
    arm_count: usize,
    learning_rate: f64,
    /// Index is the arm, value is the current estimate of its reward.
    estimated_values: Vec<f64>,
    /// Should be in range: 0 <= epsilon <= 1
    /// If epsilon = 0, greedy action is always taken. If epsilon = 1, random action is
    /// always taken.
    epsilon: f64,
    epsilon_decay: f64,
    epsilon_min: f64,
    rng: R,
}

impl EpsilonGreedyAgent<StdRng> {
    pub fn seeded(arm_count: usize, config: AgentConfig, seed: u64) -> BanditResult<Self> {
        Self::new(arm_count, config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> EpsilonGreedyAgent<R> {
    pub fn new(arm_count: usize, config: AgentConfig, rng: R) -> BanditResult<Self> {
        if arm_count == 0 {
            return Err(BanditError::InvalidConfiguration("arm_count must be > 0".to_string()));
        }
        config.validate()?;
        debug!(arm_count, ?config, "Creating epsilon-greedy agent");

        Ok(EpsilonGreedyAgent {
            arm_count,
            learning_rate: config.learning_rate,
            estimated_values: vec![0.0; arm_count],
            epsilon: config.epsilon,
            epsilon_decay: config.epsilon_decay,
            epsilon_min: config.epsilon_min,
            rng,
        })
    }

    fn random_action_selection_policy(&mut self) -> usize {
        let action = self.rng.gen_range(0..self.arm_count);
        trace!(action, "Random action selected");
        action
    }

    /// First arm attaining the highest estimated value.
    fn greedy_action_selection_policy(&self) -> usize {
        let (action, max_value) = self.estimated_values
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(best_action, best_value), (action, &value)| {
                if value > best_value { (action, value) } else { (best_action, best_value) }
            });
        trace!(action, max_value, epsilon = self.epsilon, "Greedy action selected");
        action
    }

    fn decay_epsilon(&mut self) {
        if self.epsilon > self.epsilon_min {
            self.epsilon = (self.epsilon * self.epsilon_decay).max(self.epsilon_min);
        }
    }
}

impl<R: Rng> Agent for EpsilonGreedyAgent<R> {
    fn choose_action(&mut self) -> usize {
        if self.rng.gen::<f64>() < self.epsilon {
            return self.random_action_selection_policy();
        }
        self.greedy_action_selection_policy()
    }

    fn update(&mut self, action: usize, reward: Reward) {
        assert!(action < self.arm_count, "Action must be in the range [0, {}).", self.arm_count);
        let error = f64::from(reward) - self.estimated_values[action];
        self.estimated_values[action] += self.learning_rate * error;
        self.decay_epsilon();

        trace!(
            action,
            reward,
            learning_rate = self.learning_rate,
            epsilon = self.epsilon,
            values = ?self.estimated_values,
            "Updated value function"
        );
    }

    fn get_internal_state(&self) -> AgentState {
        AgentState {
            values: self.estimated_values.clone(),
            epsilon: self.epsilon,
        }
    }
}
