//! Collects high-reward CartPole episodes under a mostly-random exploration
//! policy and imitation learns the policy network from them, over and over.

use candle_core::{Device, Result};
use rbc_core::Algorithm;
use rbc_core::cloning::builder::BehaviorCloningBuilder;
use rbc_envs::CartPole;

fn main() -> Result<()> {
    let device = Device::Cpu;
    let env = CartPole::new(&device);
    let builder = BehaviorCloningBuilder::default();
    let mut algo = builder.build(env, &device)?;
    algo.train()
}
