pub mod builder;
pub mod hooks;

use crate::{
    Algorithm,
    env::Env,
    optimizer::OptimizerWithMaxGrad,
    policies::Policy,
    trajectory::{TrainingSet, Trajectory},
};
use candle_core::{Device, Result, Tensor};
use hooks::CloningHooks;
use rand::Rng;

macro_rules! break_on_hook_res {
    ($hook_res:expr) => {
        if $hook_res {
            break;
        }
    };
}

/// Cold start means the policy has never been fit, so rollouts are fully
/// random. After the first fit the loop mixes random and greedy actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ColdStart,
    Warm,
}

#[derive(Debug, Clone, Copy)]
pub struct CloningSettings {
    /// A trajectory is kept iff its cumulative reward is strictly above this.
    pub reward_threshold: f32,
    pub episodes_per_iteration: usize,
    pub fit_epochs: usize,
    pub demo_episodes: usize,
    /// Probability of taking a random action once the policy is warm.
    pub exploration: f64,
}

impl Default for CloningSettings {
    fn default() -> Self {
        Self {
            reward_threshold: 70.,
            episodes_per_iteration: 1000,
            fit_epochs: 10,
            demo_episodes: 10,
            exploration: 0.8,
        }
    }
}

/// Collects high-reward trajectories with an exploration policy and imitation
/// learns the policy network from them, forever alternating between the two.
pub struct BehaviorCloning<E: Env, P: Policy, H: CloningHooks> {
    pub env: E,
    pub policy: P,
    pub optimizer: OptimizerWithMaxGrad,
    pub settings: CloningSettings,
    pub phase: Phase,
    pub device: Device,
    pub hooks: H,
}

impl<E: Env, P: Policy, H: CloningHooks> BehaviorCloning<E, P, H> {
    fn exploration_action(&self, observation: &Tensor) -> Result<Tensor> {
        match self.phase {
            Phase::ColdStart => self.policy.random_action(),
            Phase::Warm => {
                if rand::rng().random_bool(self.settings.exploration) {
                    self.policy.random_action()
                } else {
                    self.policy.greedy_action(observation)
                }
            }
        }
    }

    pub fn rollout_episode(&mut self) -> Result<Trajectory> {
        let mut trajectory = Trajectory::default();
        let mut observation = self.env.reset(rand::random())?;
        loop {
            let action = self.exploration_action(&observation)?;
            let snapshot = self.env.step(&action)?;
            // the one-hot action doubles as the imitation label
            trajectory.push_step(observation, action, snapshot.reward);
            if snapshot.done() {
                break;
            }
            observation = snapshot.state;
        }
        Ok(trajectory)
    }

    /// Rollout & filter phase: runs the episode budget and keeps only the
    /// trajectories whose cumulative reward beats the threshold. Discarded
    /// episodes leave no diagnostic behind.
    pub fn collect(&mut self) -> Result<TrainingSet> {
        let mut set = TrainingSet::new(self.settings.reward_threshold);
        for _ in 0..self.settings.episodes_per_iteration {
            let trajectory = self.rollout_episode()?;
            set.absorb(trajectory);
        }
        Ok(set)
    }

    /// Fits the policy network to the retained pairs with a fixed number of
    /// full passes. An empty set fails in `to_batch` and the error
    /// propagates.
    pub fn learn(&mut self, set: &TrainingSet) -> Result<()> {
        let (observations, labels) = set.to_batch(&self.device)?;
        for epoch in 0..self.settings.fit_epochs {
            let log_probs = self.policy.log_probs(&observations, &labels)?;
            let loss = log_probs.mean_all()?.neg()?;
            self.optimizer.backward_step(&loss)?;
            println!("epoch: {:<2} nll: {:.4}", epoch, loss.to_scalar::<f32>()?);
        }
        Ok(())
    }

    /// Replays greedy episodes and prints the running score after every step,
    /// purely for manual inspection.
    pub fn demonstrate(&mut self) -> Result<()> {
        for episode in 0..self.settings.demo_episodes {
            let mut observation = self.env.reset(rand::random())?;
            let mut score = 0.;
            loop {
                let action = self.policy.greedy_action(&observation)?;
                let snapshot = self.env.step(&action)?;
                score += snapshot.reward;
                println!("demo episode: {:<2} score: {}", episode, score);
                if snapshot.done() {
                    break;
                }
                observation = snapshot.state;
            }
        }
        Ok(())
    }
}

impl<E: Env, P: Policy, H: CloningHooks> Algorithm for BehaviorCloning<E, P, H> {
    fn train(&mut self) -> Result<()> {
        if self.hooks.init_hook() {
            return Ok(());
        }
        loop {
            // rollout & filter phase
            let set = self.collect()?;
            break_on_hook_res!(self.hooks.post_rollout_hook(&set));

            // learning phase
            self.learn(&set)?;
            self.phase = Phase::Warm;

            // demonstration phase
            self.demonstrate()?;
            break_on_hook_res!(self.hooks.post_training_hook());
        }
        self.hooks.shutdown_hook()
    }
}
