pub mod categorical;

use candle_core::{Result, Tensor};
pub use categorical::CategoricalPolicy;

/// A function from observation to action preferences, plus the two action
/// sources the rollout loop mixes between.
pub trait Policy {
    /// One-hot of the highest scoring action under the current network.
    fn greedy_action(&self, observation: &Tensor) -> Result<Tensor>;

    /// One-hot of a uniformly sampled action, the stand-in for
    /// `action_space.sample()`.
    fn random_action(&self) -> Result<Tensor>;

    /// Per-row log probability of the given one-hot actions.
    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor>;
}
