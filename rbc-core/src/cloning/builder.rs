use crate::{
    cloning::{
        BehaviorCloning, CloningSettings, Phase,
        hooks::{CloningSchedule, DefaultCloningHooks},
    },
    env::Env,
    optimizer::OptimizerWithMaxGrad,
    policies::CategoricalPolicy,
    utils::build_sequential::build_sequential,
};
use candle_core::{DType, Device, Result};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};

pub struct BehaviorCloningBuilder {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub max_grad_norm: Option<f32>,
    pub settings: CloningSettings,
    pub schedule: CloningSchedule,
}

impl Default for BehaviorCloningBuilder {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 128, 256, 256],
            learning_rate: 1e-3,
            max_grad_norm: None,
            settings: CloningSettings::default(),
            schedule: CloningSchedule::iteration_bound(50),
        }
    }
}

impl BehaviorCloningBuilder {
    pub fn set_schedule(&mut self, schedule: CloningSchedule) {
        self.schedule = schedule;
    }

    pub fn set_settings(&mut self, settings: CloningSettings) {
        self.settings = settings;
    }

    pub fn build<E: Env>(
        &self,
        env: E,
        device: &Device,
    ) -> Result<BehaviorCloning<E, CategoricalPolicy, DefaultCloningHooks>> {
        let env_description = env.env_description();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let layers = [&self.hidden_layers[..], &[env_description.action_size()]].concat();
        let logits = build_sequential(env_description.observation_size(), &layers, &vb, "policy")?;
        let policy = CategoricalPolicy::new(env_description.action_size(), logits, device.clone());
        let optimizer_params = ParamsAdamW {
            lr: self.learning_rate,
            ..Default::default()
        };
        let optimizer = AdamW::new(varmap.all_vars(), optimizer_params)?;
        let optimizer = OptimizerWithMaxGrad::new(optimizer, self.max_grad_norm, varmap);
        let hooks = DefaultCloningHooks::new(self.schedule);
        Ok(BehaviorCloning {
            env,
            policy,
            optimizer,
            settings: self.settings,
            phase: Phase::ColdStart,
            device: device.clone(),
            hooks,
        })
    }
}
