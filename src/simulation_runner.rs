use std::time::Instant;

use rand::rngs::StdRng;
use rand::{ Rng, SeedableRng };
use rayon::prelude::*;
use serde::Serialize;
use tracing::{ debug, info };

use crate::agents::{ Agent, AgentConfig, AgentState, EpsilonGreedyAgent };
use crate::constants::{ NUM_OF_ROUNDS_IN_AN_EXPERIMENT, NUM_OF_EXPERIMENTS_TO_RUN, DEFAULT_SEED };
use crate::environments::{ BernoulliBanditEnvironment, EpistemicConfig, Reward };
use crate::errors::BanditResult;

/// Everything needed to build one experiment, shared by all experiments of
/// a parallel run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentSettings {
    pub reward_probabilities: Vec<f64>,
    pub noise: f64,
    pub epistemic_enabled: bool,
    pub epistemic_config: EpistemicConfig,
    pub agent_config: AgentConfig,
    pub num_of_rounds: usize,
}

impl Default for ExperimentSettings {
    fn default() -> Self {
        ExperimentSettings {
            reward_probabilities: vec![0.1, 0.5, 0.9],
            noise: 0.0,
            epistemic_enabled: false,
            epistemic_config: EpistemicConfig::default(),
            agent_config: AgentConfig::default(),
            num_of_rounds: NUM_OF_ROUNDS_IN_AN_EXPERIMENT,
        }
    }
}

/// What one experiment achieved. Ground truth fields (`optimal_arm`,
/// `true_probabilities`) are filled in after the run for evaluation only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentSummary {
    pub experiment: usize,
    pub num_of_rounds: usize,
    pub total_reward: u64,
    pub mean_reward: f64,
    pub optimal_arm: usize,
    /// Fraction of rounds in which the optimal arm was played.
    pub optimal_arm_rate: f64,
    pub true_probabilities: Vec<f64>,
    pub final_state: AgentState,
    /// Number of arms hinted as discardable across all rounds. Always zero
    /// when epistemic info is disabled.
    pub clue_discards: usize,
}

/// One agent playing one environment for a fixed number of rounds.
pub struct Experiment<A: Agent, R: Rng> {
    pub experiment: usize,
    pub num_of_rounds: usize,
    pub environment: BernoulliBanditEnvironment<R>,
    pub agent: A,
    /// Records action taken on each round. None until the experiment is run.
    pub resulting_actions: Option<Vec<usize>>,
    /// Records reward received on each round. None until the experiment is run.
    pub resulting_rewards: Option<Vec<Reward>>,
    clue_discards: usize,
}

impl Experiment<EpsilonGreedyAgent<StdRng>, StdRng> {
    /// Builds experiment number `experiment` of a run seeded with `base_seed`.
    /// The environment and the agent draw from separate generators, both
    /// derived from `base_seed + experiment`.
    pub fn seeded(
        experiment: usize,
        settings: &ExperimentSettings,
        base_seed: u64
    ) -> BanditResult<Self> {
        let mut seeder = StdRng::seed_from_u64(base_seed.wrapping_add(experiment as u64));
        let environment = BernoulliBanditEnvironment::with_epistemic_config(
            settings.reward_probabilities.clone(),
            settings.noise,
            settings.epistemic_enabled,
            settings.epistemic_config,
            StdRng::seed_from_u64(seeder.gen())
        )?;
        let agent = EpsilonGreedyAgent::seeded(
            environment.arm_count(),
            settings.agent_config,
            seeder.gen()
        )?;
        Ok(Experiment::new(experiment, settings.num_of_rounds, environment, agent))
    }
}

impl<A: Agent, R: Rng> Experiment<A, R> {
    pub fn new(
        experiment: usize,
        num_of_rounds: usize,
        environment: BernoulliBanditEnvironment<R>,
        agent: A
    ) -> Self {
        Experiment {
            experiment,
            num_of_rounds,
            environment,
            agent,
            resulting_actions: None,
            resulting_rewards: None,
            clue_discards: 0,
        }
    }

    /// Resets the environment and plays `num_of_rounds` rounds:
    /// agent chooses, environment steps, agent learns from the reward.
    /// The step info is only counted here, the agent never sees it.
    pub fn run(&mut self) -> BanditResult<ExperimentSummary> {
        self.environment.reset();
        let mut resulting_actions = Vec::with_capacity(self.num_of_rounds);
        let mut resulting_rewards = Vec::with_capacity(self.num_of_rounds);
        let mut clue_discards = 0;

        for _ in 0..self.num_of_rounds {
            let action = self.agent.choose_action();
            let (reward, info) = self.environment.step(action)?;
            self.agent.update(action, reward);

            if let Some(clue) = info.epistemic_clue {
                clue_discards += clue.discard_arms.len();
            }
            resulting_actions.push(action);
            resulting_rewards.push(reward);
        }

        self.resulting_actions = Some(resulting_actions);
        self.resulting_rewards = Some(resulting_rewards);
        self.clue_discards = clue_discards;

        let summary = self.summarize();
        debug!(
            experiment = summary.experiment,
            total_reward = summary.total_reward,
            optimal_arm_rate = summary.optimal_arm_rate,
            "Experiment finished"
        );
        Ok(summary)
    }

    fn summarize(&self) -> ExperimentSummary {
        let actions = self.resulting_actions.as_deref().unwrap_or_default();
        let rewards = self.resulting_rewards.as_deref().unwrap_or_default();
        let optimal_arm = self.environment.optimal_arm();

        let total_reward: u64 = rewards.iter().map(|&reward| u64::from(reward)).sum();
        let optimal_pulls = actions.iter().filter(|&&action| action == optimal_arm).count();

        ExperimentSummary {
            experiment: self.experiment,
            num_of_rounds: actions.len(),
            total_reward,
            mean_reward: ratio(total_reward as usize, actions.len()),
            optimal_arm,
            optimal_arm_rate: ratio(optimal_pulls, actions.len()),
            true_probabilities: self.environment.get_true_probs(),
            final_state: self.agent.get_internal_state(),
            clue_discards: self.clue_discards,
        }
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { (count as f64) / (total as f64) }
}

/// Runs independent experiments with the same settings in parallel.
pub struct ParallelExperimentRunner {
    pub num_of_experiments: usize,
    pub settings: ExperimentSettings,
    pub base_seed: u64,
}

impl Default for ParallelExperimentRunner {
    fn default() -> Self {
        ParallelExperimentRunner::new(
            NUM_OF_EXPERIMENTS_TO_RUN,
            ExperimentSettings::default(),
            DEFAULT_SEED
        )
    }
}

impl ParallelExperimentRunner {
    pub fn new(num_of_experiments: usize, settings: ExperimentSettings, base_seed: u64) -> Self {
        ParallelExperimentRunner { num_of_experiments, settings, base_seed }
    }

    /// Summaries come back in experiment order, and are identical between
    /// runs with the same seed whatever the thread scheduling.
    pub fn run_all_experiments_in_parallel(&self) -> BanditResult<Vec<ExperimentSummary>> {
        let start_time = Instant::now();
        let summaries = (0..self.num_of_experiments)
            .into_par_iter()
            .map(|experiment| {
                Experiment::seeded(experiment, &self.settings, self.base_seed)?.run()
            })
            .collect::<BanditResult<Vec<_>>>()?;

        info!(
            experiments = summaries.len(),
            elapsed = ?start_time.elapsed(),
            "Parallel run finished"
        );
        Ok(summaries)
    }
}

/// Mean of the per-experiment mean rewards.
pub fn mean_reward_across(summaries: &[ExperimentSummary]) -> f64 {
    if summaries.is_empty() {
        return 0.0;
    }
    let total: f64 = summaries.iter().map(|summary| summary.mean_reward).sum();
    total / (summaries.len() as f64)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::BanditError;
    use approx::assert_relative_eq;
    use rand::rngs::mock::StepRng;

    const SEED: u64 = 3;

    /// Always plays the same arm and learns nothing.
    struct FixedActionAgent {
        action: usize,
        updates: usize,
    }

    impl Agent for FixedActionAgent {
        fn choose_action(&mut self) -> usize {
            self.action
        }

        fn update(&mut self, _action: usize, _reward: Reward) {
            self.updates += 1;
        }

        fn get_internal_state(&self) -> AgentState {
            AgentState { values: vec![0.0; 3], epsilon: 0.0 }
        }
    }

    fn settings(num_of_rounds: usize) -> ExperimentSettings {
        ExperimentSettings { num_of_rounds, ..ExperimentSettings::default() }
    }

    #[test]
    fn test_running_one_experiment_populates_results() {
        let mut experiment = Experiment::seeded(0, &settings(500), SEED).unwrap();
        assert!(experiment.resulting_actions.is_none());
        assert!(experiment.resulting_rewards.is_none());

        let summary = experiment.run().unwrap();

        assert_eq!(experiment.resulting_actions.as_ref().unwrap().len(), 500);
        assert_eq!(experiment.resulting_rewards.as_ref().unwrap().len(), 500);
        assert_eq!(experiment.environment.round_index(), 500);
        assert_eq!(experiment.environment.history().len(), 500);
        assert_eq!(summary.num_of_rounds, 500);
        assert_eq!(summary.optimal_arm, 2);
        assert_eq!(summary.clue_discards, 0);
        assert_relative_eq!(summary.mean_reward, (summary.total_reward as f64) / 500.0);
    }

    #[test]
    fn test_fixed_action_agent_with_deterministic_draws() {
        let environment = BernoulliBanditEnvironment::new(
            vec![0.1, 0.5, 0.9],
            0.0,
            false,
            StepRng::new(u64::MAX / 2, 0)
        ).unwrap();
        let agent = FixedActionAgent { action: 0, updates: 0 };
        let mut experiment = Experiment::new(0, 20, environment, agent);

        let summary = experiment.run().unwrap();

        assert_eq!(summary.total_reward, 0);
        assert_eq!(summary.optimal_arm_rate, 0.0);
        assert_eq!(experiment.agent.updates, 20);
        assert_eq!(experiment.resulting_actions.unwrap(), vec![0; 20]);
    }

    #[test]
    fn test_greedy_agent_scenario_with_fixed_draw() {
        let mut environment = BernoulliBanditEnvironment::new(
            vec![0.1, 0.5, 0.9],
            0.0,
            false,
            StepRng::new(u64::MAX / 2, 0)
        ).unwrap();
        let config = AgentConfig { learning_rate: 0.1, epsilon: 0.0, ..AgentConfig::default() };
        let mut agent = EpsilonGreedyAgent::seeded(3, config, SEED).unwrap();

        let action = agent.choose_action();
        let (reward, info) = environment.step(action).unwrap();
        agent.update(action, reward);

        assert_eq!(action, 0);
        assert_eq!((reward, info.is_empty()), (0, true));
        assert_eq!(agent.get_internal_state().values[0], 0.0);
    }

    #[test]
    fn test_agent_learns_which_arm_pays_most() {
        let agent_config = AgentConfig {
            learning_rate: 0.05,
            epsilon: 1.0,
            epsilon_decay: 1.0,
            epsilon_min: 0.01,
        };
        let settings = ExperimentSettings { agent_config, num_of_rounds: 3000, ..settings(0) };
        let mut experiment = Experiment::seeded(0, &settings, SEED).unwrap();

        let summary = experiment.run().unwrap();

        let values = summary.final_state.values;
        assert!(values[2] > values[0], "Learned values do not rank the arms: {:?}", values);
        assert_relative_eq!(summary.mean_reward, 0.5, epsilon = 0.05);
    }

    #[test]
    fn test_clues_counted_when_epistemic_enabled() {
        // every loss on arm 0 hints arm 2 (0.9 + 0.2 > 0.7) as discardable
        let environment = BernoulliBanditEnvironment::new(
            vec![0.1, 0.5, 0.9],
            0.0,
            true,
            StepRng::new(u64::MAX / 2, 0)
        ).unwrap();
        let agent = FixedActionAgent { action: 0, updates: 0 };
        let mut experiment = Experiment::new(0, 10, environment, agent);

        let summary = experiment.run().unwrap();

        assert_eq!(summary.clue_discards, 10);
    }

    #[test]
    fn test_invalid_action_propagates_out_of_run() {
        let environment = BernoulliBanditEnvironment::seeded(vec![0.1, 0.5, 0.9], 0.0, false, SEED).unwrap();
        let agent = FixedActionAgent { action: 7, updates: 0 };
        let mut experiment = Experiment::new(0, 10, environment, agent);

        let result = experiment.run();

        assert_eq!(result, Err(BanditError::InvalidAction { action: 7, arm_count: 3 }));
        assert_eq!(experiment.agent.updates, 0);
        assert!(experiment.resulting_actions.is_none());
    }

    #[test]
    fn test_parallel_runner_creation() {
        let runner = ParallelExperimentRunner::default();

        assert_eq!(runner.num_of_experiments, NUM_OF_EXPERIMENTS_TO_RUN);
        assert_eq!(runner.base_seed, DEFAULT_SEED);
    }

    #[test]
    fn test_parallel_runner_runs_all_experiments_in_order() {
        let runner = ParallelExperimentRunner::new(8, settings(200), SEED);

        let summaries = runner.run_all_experiments_in_parallel().unwrap();

        assert_eq!(summaries.len(), 8);
        for (index, summary) in summaries.iter().enumerate() {
            assert_eq!(summary.experiment, index);
            assert_eq!(summary.num_of_rounds, 200);
        }
    }

    #[test]
    fn test_parallel_runner_is_deterministic_under_seed() {
        let runner = ParallelExperimentRunner::new(6, settings(300), SEED);

        let first = runner.run_all_experiments_in_parallel().unwrap();
        let second = runner.run_all_experiments_in_parallel().unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_parallel_runner_rejects_invalid_settings() {
        let settings = ExperimentSettings {
            reward_probabilities: vec![0.5, 0.5],
            ..ExperimentSettings::default()
        };
        let runner = ParallelExperimentRunner::new(4, settings, SEED);

        let result = runner.run_all_experiments_in_parallel();

        assert!(matches!(result, Err(BanditError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_mean_reward_across_experiments() {
        let runner = ParallelExperimentRunner::new(4, settings(100), SEED);
        let summaries = runner.run_all_experiments_in_parallel().unwrap();

        let expected: f64 = summaries.iter().map(|s| s.mean_reward).sum::<f64>() / 4.0;

        assert_relative_eq!(mean_reward_across(&summaries), expected);
        assert_eq!(mean_reward_across(&[]), 0.0);
    }
}
