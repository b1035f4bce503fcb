//! Three-armed Bernoulli bandit environment with an epsilon-greedy learning
//! agent, plus a runner that plays them against each other over many rounds.

pub mod agents;
pub mod constants;
pub mod environments;
pub mod errors;
pub mod simulation_runner;

pub use agents::{ Agent, AgentConfig, AgentState, EpsilonGreedyAgent };
pub use environments::{
    BernoulliBanditEnvironment,
    EpistemicClue,
    EpistemicConfig,
    Reward,
    StepInfo,
};
pub use errors::{ BanditError, BanditResult };
