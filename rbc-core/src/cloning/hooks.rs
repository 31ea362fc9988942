use crate::trajectory::TrainingSet;
use candle_core::Result;

/// When to stop the outer loop. The source this reimplements never stops;
/// `Unbounded` keeps that behavior available.
#[derive(Debug, Clone, Copy)]
pub enum CloningSchedule {
    IterationBound {
        total_iterations: usize,
        current_iteration: usize,
    },
    Unbounded,
}

impl CloningSchedule {
    pub fn iteration_bound(total_iterations: usize) -> Self {
        Self::IterationBound {
            total_iterations,
            current_iteration: 0,
        }
    }
}

pub trait CloningHooks {
    fn init_hook(&mut self) -> bool;

    fn post_rollout_hook(&mut self, set: &TrainingSet) -> bool;

    fn post_training_hook(&mut self) -> bool;

    fn shutdown_hook(&mut self) -> Result<()>;
}

pub struct DefaultCloningHooks {
    iteration_idx: usize,
    schedule: CloningSchedule,
}

impl DefaultCloningHooks {
    pub fn new(schedule: CloningSchedule) -> Self {
        Self {
            iteration_idx: 0,
            schedule,
        }
    }
}

impl CloningHooks for DefaultCloningHooks {
    fn init_hook(&mut self) -> bool {
        false
    }

    fn post_rollout_hook(&mut self, set: &TrainingSet) -> bool {
        println!(
            "iteration: {:<3} retained episodes: {:<4} pairs: {:<6}",
            self.iteration_idx,
            set.retained_episodes,
            set.len()
        );
        self.iteration_idx += 1;
        false
    }

    fn post_training_hook(&mut self) -> bool {
        match &mut self.schedule {
            CloningSchedule::IterationBound {
                total_iterations,
                current_iteration,
            } => {
                *current_iteration += 1;
                current_iteration >= total_iterations
            }
            CloningSchedule::Unbounded => false,
        }
    }

    fn shutdown_hook(&mut self) -> Result<()> {
        Ok(())
    }
}
