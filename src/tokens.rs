mod class;
mod token;

pub use class::*;
pub use token::*;
