pub mod cloning;
pub mod env;
pub mod optimizer;
pub mod policies;
pub mod trajectory;
pub mod utils;

use candle_core::Result;

pub trait Algorithm {
    fn train(&mut self) -> Result<()>;
}
