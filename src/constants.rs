/// Number of arms the environment is specialised to. Reward probability
/// vectors of any other length are rejected.
pub const NUM_OF_ARMS: usize = 3;
/// Step size used when updating the value estimates:
/// new_estimate = old_estimate + LEARNING_RATE * (reward - old_estimate)
pub const LEARNING_RATE: f64 = 0.1;
/// Initial probability with which a random (exploratory) action is taken.
/// When EPSILON = 0 the agent always exploits, when EPSILON = 1 it always explores.
pub const EPSILON: f64 = 0.1;
/// Multiplicative factor applied to epsilon after every update.
pub const EPSILON_DECAY: f64 = 0.99;
/// Epsilon is never decayed below this floor.
pub const EPSILON_MIN: f64 = 0.01;
/// A non-played arm is hinted as discardable when the observer's confidence
/// that it is sub-optimal is strictly greater than this value.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;
/// Uncertainty of the idealised outside observer producing epistemic clues.
pub const OBSERVER_NOISE_LEVEL: f64 = 0.2;
/// Number of independent experiments the binary runs by default.
pub const NUM_OF_EXPERIMENTS_TO_RUN: usize = 100;
/// Number of rounds in one experiment.
pub const NUM_OF_ROUNDS_IN_AN_EXPERIMENT: usize = 1_000;
pub const DEFAULT_SEED: u64 = 42;
