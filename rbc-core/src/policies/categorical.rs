use super::Policy;
use crate::trajectory::one_hot;
use candle_core::{Device, Result, Tensor};
use candle_nn::ops::log_softmax;
use candle_nn::{Module, Sequential};
use rand::Rng;

/// Policy network over a discrete action space. The network outputs raw
/// logits; no value head, no versioning.
pub struct CategoricalPolicy {
    action_size: usize,
    logits: Sequential,
    device: Device,
}

impl CategoricalPolicy {
    pub fn new(action_size: usize, logits: Sequential, device: Device) -> Self {
        Self {
            action_size,
            logits,
            device,
        }
    }

    pub fn action_size(&self) -> usize {
        self.action_size
    }
}

impl Policy for CategoricalPolicy {
    fn greedy_action(&self, observation: &Tensor) -> Result<Tensor> {
        assert!(
            observation.rank() == 1,
            "Observation should be a flattened tensor"
        );
        let observation = observation.unsqueeze(0)?;
        let logits = self.logits.forward(&observation)?;
        let action = logits.squeeze(0)?.argmax(0)?.to_scalar::<u32>()? as usize;
        one_hot(action, self.action_size, &self.device)
    }

    fn random_action(&self) -> Result<Tensor> {
        let action = rand::rng().random_range(0..self.action_size);
        one_hot(action, self.action_size, &self.device)
    }

    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let logits = self.logits.forward(states)?;
        let log_probs = log_softmax(&logits, 1)?;
        actions.mul(&log_probs)?.sum(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::build_sequential::build_sequential;
    use candle_core::DType;
    use candle_nn::{VarBuilder, VarMap};

    fn test_policy() -> Result<CategoricalPolicy> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let logits = build_sequential(4, &[8, 2], &vb, "policy")?;
        Ok(CategoricalPolicy::new(2, logits, device))
    }

    #[test]
    fn greedy_action_is_one_hot() -> Result<()> {
        let policy = test_policy()?;
        assert_eq!(policy.action_size(), 2);
        let observation = Tensor::from_vec(vec![0.1f32, -0.2, 0.3, 0.0], 4, &Device::Cpu)?;
        let action = policy.greedy_action(&observation)?.to_vec1::<f32>()?;
        assert_eq!(action.iter().sum::<f32>(), 1.);
        assert!(action.iter().all(|a| *a == 0. || *a == 1.));
        Ok(())
    }

    #[test]
    fn random_action_is_valid() -> Result<()> {
        let policy = test_policy()?;
        for _ in 0..20 {
            let action = policy.random_action()?.to_vec1::<f32>()?;
            assert_eq!(action.len(), 2);
            assert_eq!(action.iter().sum::<f32>(), 1.);
        }
        Ok(())
    }

    #[test]
    fn log_probs_are_negative() -> Result<()> {
        let policy = test_policy()?;
        let states = Tensor::zeros((3, 4), DType::F32, &Device::Cpu)?;
        let actions = Tensor::stack(
            &[
                one_hot(0, 2, &Device::Cpu)?,
                one_hot(1, 2, &Device::Cpu)?,
                one_hot(0, 2, &Device::Cpu)?,
            ],
            0,
        )?;
        let log_probs = policy.log_probs(&states, &actions)?.to_vec1::<f32>()?;
        assert_eq!(log_probs.len(), 3);
        assert!(log_probs.iter().all(|lp| *lp < 0.));
        Ok(())
    }
}
