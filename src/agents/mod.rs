pub mod epsilon_greedy;

use serde::Serialize;

use crate::environments::Reward;

pub use epsilon_greedy::{ AgentConfig, EpsilonGreedyAgent };

/// Snapshot of what an agent has learned so far. Owned by the caller, so
/// changing it does not affect the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentState {
    /// Estimated value of each arm, indexed by arm.
    pub values: Vec<f64>,
    pub epsilon: f64,
}

/// A learner that plays one side of the bandit protocol: it picks an arm,
/// the caller pulls it, and the observed reward is handed back through
/// `update`.
pub trait Agent {
    fn choose_action(&mut self) -> usize;
    fn update(&mut self, action: usize, reward: Reward);
    fn get_internal_state(&self) -> AgentState;
}
