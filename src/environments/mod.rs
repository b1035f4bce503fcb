pub mod bernoulli_bandit;
pub mod epistemic;

pub use bernoulli_bandit::{ BernoulliBanditEnvironment, EnvironmentPhase, RoundRecord, StepInfo };
pub use epistemic::{ generate_epistemic_clue, EpistemicClue, EpistemicConfig };

/// Outcome of one pull: 1 is a win, 0 is a loss.
pub type Reward = u8;
