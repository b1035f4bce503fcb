use anyhow::Context;
use clap::Parser;
use tracing::info;

use three_armed_bandit::constants::{
    CONFIDENCE_THRESHOLD,
    DEFAULT_SEED,
    EPSILON,
    EPSILON_DECAY,
    EPSILON_MIN,
    LEARNING_RATE,
    NUM_OF_EXPERIMENTS_TO_RUN,
    NUM_OF_ROUNDS_IN_AN_EXPERIMENT,
    OBSERVER_NOISE_LEVEL,
};
use three_armed_bandit::simulation_runner::{
    mean_reward_across,
    ExperimentSettings,
    ParallelExperimentRunner,
};
use three_armed_bandit::{ AgentConfig, EpistemicConfig };

#[derive(Parser, Debug)]
#[command(name = "three-armed-bandit")]
#[command(about = "Epsilon-greedy agent learning a three-armed Bernoulli bandit")]
#[command(version)]
struct Cli {
    /// True reward probability of each arm, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.1, 0.5, 0.9])]
    probabilities: Vec<f64>,

    /// Bound of the uniform perturbation applied to the probability on every pull
    #[arg(long, default_value_t = 0.0)]
    noise: f64,

    /// Return the optimal arm and an epistemic clue with every step
    #[arg(long, default_value_t = false)]
    epistemic: bool,

    /// Confidence above which an arm is hinted as discardable
    #[arg(long, default_value_t = CONFIDENCE_THRESHOLD)]
    confidence_threshold: f64,

    /// Uncertainty of the observer producing epistemic clues
    #[arg(long, default_value_t = OBSERVER_NOISE_LEVEL)]
    observer_noise: f64,

    #[arg(long, default_value_t = NUM_OF_ROUNDS_IN_AN_EXPERIMENT)]
    rounds: usize,

    #[arg(long, default_value_t = NUM_OF_EXPERIMENTS_TO_RUN)]
    experiments: usize,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    #[arg(long, default_value_t = LEARNING_RATE)]
    learning_rate: f64,

    #[arg(long, default_value_t = EPSILON)]
    epsilon: f64,

    #[arg(long, default_value_t = EPSILON_DECAY)]
    epsilon_decay: f64,

    #[arg(long, default_value_t = EPSILON_MIN)]
    epsilon_min: f64,
}

impl Cli {
    fn experiment_settings(&self) -> ExperimentSettings {
        ExperimentSettings {
            reward_probabilities: self.probabilities.clone(),
            noise: self.noise,
            epistemic_enabled: self.epistemic,
            epistemic_config: EpistemicConfig {
                confidence_threshold: self.confidence_threshold,
                noise_level: self.observer_noise,
            },
            agent_config: AgentConfig {
                learning_rate: self.learning_rate,
                epsilon: self.epsilon,
                epsilon_decay: self.epsilon_decay,
                epsilon_min: self.epsilon_min,
            },
            num_of_rounds: self.rounds,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "three_armed_bandit=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = cli.experiment_settings();
    info!(
        probabilities = ?settings.reward_probabilities,
        noise = settings.noise,
        epistemic = settings.epistemic_enabled,
        rounds = settings.num_of_rounds,
        experiments = cli.experiments,
        seed = cli.seed,
        "Running bandit experiments"
    );

    let runner = ParallelExperimentRunner::new(cli.experiments, settings, cli.seed);
    let summaries = runner
        .run_all_experiments_in_parallel()
        .context("Bandit experiments failed")?;

    for summary in &summaries {
        info!(
            experiment = summary.experiment,
            total_reward = summary.total_reward,
            mean_reward = summary.mean_reward,
            optimal_arm_rate = summary.optimal_arm_rate,
            values = ?summary.final_state.values,
            epsilon = summary.final_state.epsilon,
            clue_discards = summary.clue_discards,
            "Experiment summary"
        );
    }
    info!(
        experiments = summaries.len(),
        mean_reward = mean_reward_across(&summaries),
        "All experiments finished"
    );

    Ok(())
}
