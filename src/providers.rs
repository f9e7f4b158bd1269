mod factory;
mod provider;

pub use factory::*;
pub use provider::*;
