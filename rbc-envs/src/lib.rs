use candle_core::{Device, Error, Result, Tensor};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rbc_core::env::{Env, EnvironmentDescription, SnapShot, Space};

const GRAVITY: f32 = 9.8;
const MASS_CART: f32 = 1.0;
const MASS_POLE: f32 = 0.1;
const TOTAL_MASS: f32 = MASS_CART + MASS_POLE;
// actually half the pole's length
const LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = MASS_POLE * LENGTH;
const FORCE_MAG: f32 = 10.0;
const TAU: f32 = 0.02;

const X_THRESHOLD: f32 = 2.4;
// 12 degrees
const THETA_THRESHOLD: f32 = 12.0 * 2.0 * std::f32::consts::PI / 360.0;
const MAX_EPISODE_STEPS: usize = 500;

/// CartPole with the CartPole-v1 dynamics: 4 dimensional observation
/// `[x, x_dot, theta, theta_dot]`, two actions (push left/right), reward 1
/// per step, termination on leaving the position or angle bounds, truncation
/// after 500 steps.
pub struct CartPole {
    state: [f32; 4],
    steps: usize,
    device: Device,
    rng: StdRng,
}

impl CartPole {
    pub fn new(device: &Device) -> Self {
        Self {
            state: [0.; 4],
            steps: 0,
            device: device.clone(),
            rng: StdRng::seed_from_u64(0),
        }
    }

    fn state_tensor(&self) -> Result<Tensor> {
        Tensor::from_slice(&self.state, 4, &self.device)
    }
}

impl Env for CartPole {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        self.rng = StdRng::seed_from_u64(seed);
        for x in self.state.iter_mut() {
            *x = self.rng.random_range(-0.05..0.05);
        }
        self.steps = 0;
        self.state_tensor()
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        let action = action.to_vec1::<f32>()?;
        let index = action
            .iter()
            .position(|a| *a > 0.)
            .ok_or_else(|| Error::Msg("action must be a one-hot vector".into()))?;
        let force = if index == 1 { FORCE_MAG } else { -FORCE_MAG };

        let [x, x_dot, theta, theta_dot] = self.state;
        let cos_theta = theta.cos();
        let sin_theta = theta.sin();
        let temp =
            (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin_theta) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (LENGTH * (4.0 / 3.0 - MASS_POLE * cos_theta * cos_theta / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos_theta / TOTAL_MASS;

        self.state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
        self.steps += 1;

        let terminated =
            self.state[0].abs() > X_THRESHOLD || self.state[2].abs() > THETA_THRESHOLD;
        let truncated = self.steps >= MAX_EPISODE_STEPS;
        Ok(SnapShot {
            state: self.state_tensor()?,
            reward: 1.0,
            terminated,
            truncated,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(Space::continuous_from_dims(vec![4]), Space::Discrete(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbc_core::trajectory::one_hot;

    #[test]
    fn reset_is_deterministic_per_seed() -> Result<()> {
        let device = Device::Cpu;
        let mut a = CartPole::new(&device);
        let mut b = CartPole::new(&device);
        let state_a = a.reset(42)?.to_vec1::<f32>()?;
        let state_b = b.reset(42)?.to_vec1::<f32>()?;
        assert_eq!(state_a, state_b);
        let state_c = b.reset(43)?.to_vec1::<f32>()?;
        assert_ne!(state_a, state_c);
        Ok(())
    }

    #[test]
    fn reset_starts_near_the_origin() -> Result<()> {
        let device = Device::Cpu;
        let mut env = CartPole::new(&device);
        let state = env.reset(7)?.to_vec1::<f32>()?;
        assert_eq!(state.len(), 4);
        assert!(state.iter().all(|x| x.abs() < 0.05));
        Ok(())
    }

    #[test]
    fn pushing_one_way_terminates() -> Result<()> {
        let device = Device::Cpu;
        let mut env = CartPole::new(&device);
        env.reset(0)?;
        let action = one_hot(1, 2, &device)?;
        for _ in 0..MAX_EPISODE_STEPS {
            let snapshot = env.step(&action)?;
            assert_eq!(snapshot.reward, 1.0);
            if snapshot.terminated {
                return Ok(());
            }
            assert!(!snapshot.truncated, "pole should fall before truncation");
        }
        panic!("constant force never toppled the pole");
    }

    #[test]
    fn description_matches_cartpole() {
        let env = CartPole::new(&Device::Cpu);
        let description = env.env_description();
        assert_eq!(description.observation_size(), 4);
        assert_eq!(description.action_size(), 2);
    }

    #[test]
    fn rejects_non_one_hot_actions() -> Result<()> {
        let device = Device::Cpu;
        let mut env = CartPole::new(&device);
        env.reset(0)?;
        let action = Tensor::zeros(2, candle_core::DType::F32, &device)?;
        assert!(env.step(&action).is_err());
        Ok(())
    }
}
