use candle_core::{Device, Result, Tensor};

/// One-hot encodes a discrete action: 0 -> [1, 0], 1 -> [0, 1] for a
/// 2-action space.
pub fn one_hot(action: usize, action_size: usize, device: &Device) -> Result<Tensor> {
    let mut mask: Vec<f32> = vec![0.0; action_size];
    mask[action] = 1.;
    Tensor::from_vec(mask, action_size, device)
}

/// The (observation, label) pairs of a single episode plus its cumulative
/// reward.
#[derive(Debug, Default)]
pub struct Trajectory {
    pub observations: Vec<Tensor>,
    pub labels: Vec<Tensor>,
    pub total_reward: f32,
}

impl Trajectory {
    pub fn push_step(&mut self, observation: Tensor, label: Tensor, reward: f32) {
        self.observations.push(observation);
        self.labels.push(label);
        self.total_reward += reward;
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Accumulates the pairs of every retained trajectory for one outer
/// iteration. Rebuilt from scratch every iteration.
#[derive(Debug)]
pub struct TrainingSet {
    pub observations: Vec<Tensor>,
    pub labels: Vec<Tensor>,
    pub reward_threshold: f32,
    pub retained_episodes: usize,
}

impl TrainingSet {
    pub fn new(reward_threshold: f32) -> Self {
        Self {
            observations: vec![],
            labels: vec![],
            reward_threshold,
            retained_episodes: 0,
        }
    }

    /// Keeps the trajectory's pairs iff its cumulative reward is strictly
    /// greater than the threshold. Returns whether it was retained.
    pub fn absorb(&mut self, trajectory: Trajectory) -> bool {
        if trajectory.total_reward > self.reward_threshold {
            self.observations.extend(trajectory.observations);
            self.labels.extend(trajectory.labels);
            self.retained_episodes += 1;
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Stacks the set into one `[n, obs_dim]` / `[n, action_dim]` batch.
    /// Fails on an empty set, which is not guarded against upstream.
    pub fn to_batch(&self, device: &Device) -> Result<(Tensor, Tensor)> {
        let observations = Tensor::stack(&self.observations, 0)?.to_device(device)?;
        let labels = Tensor::stack(&self.labels, 0)?.to_device(device)?;
        Ok((observations, labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_trajectory(steps: usize, reward_per_step: f32) -> Result<Trajectory> {
        let device = Device::Cpu;
        let mut trajectory = Trajectory::default();
        for i in 0..steps {
            let observation = Tensor::zeros(4, candle_core::DType::F32, &device)?;
            let label = one_hot(i % 2, 2, &device)?;
            trajectory.push_step(observation, label, reward_per_step);
        }
        Ok(trajectory)
    }

    #[test]
    fn one_hot_encoding() -> Result<()> {
        let device = Device::Cpu;
        assert_eq!(one_hot(0, 2, &device)?.to_vec1::<f32>()?, vec![1., 0.]);
        assert_eq!(one_hot(1, 2, &device)?.to_vec1::<f32>()?, vec![0., 1.]);
        Ok(())
    }

    #[test]
    fn retention_is_strict() -> Result<()> {
        let mut set = TrainingSet::new(70.);
        // 5 * 14 = 70 exactly, which is not strictly above the threshold
        assert!(!set.absorb(constant_trajectory(5, 14.)?));
        assert!(set.is_empty());
        assert!(set.absorb(constant_trajectory(5, 14.1)?));
        assert_eq!(set.retained_episodes, 1);
        assert_eq!(set.len(), 5);
        Ok(())
    }

    #[test]
    fn labels_match_observations() -> Result<()> {
        let mut set = TrainingSet::new(70.);
        for _ in 0..3 {
            set.absorb(constant_trajectory(7, 100.)?);
        }
        assert_eq!(set.observations.len(), set.labels.len());
        assert_eq!(set.len(), 21);
        Ok(())
    }

    #[test]
    fn batch_shapes() -> Result<()> {
        let mut set = TrainingSet::new(0.);
        set.absorb(constant_trajectory(6, 1.)?);
        let (observations, labels) = set.to_batch(&Device::Cpu)?;
        assert_eq!(observations.dims(), &[6, 4]);
        assert_eq!(labels.dims(), &[6, 2]);
        Ok(())
    }
}
