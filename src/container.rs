#[allow(clippy::module_inception)]
mod container;
mod context;
mod debug;
mod resolve;
mod resolve_async;

pub use container::*;
pub use context::ResolveContext;
pub use debug::*;
