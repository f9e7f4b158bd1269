use derive_more::Display;
use std::{error::Error, str::FromStr};

/// Lifetime policy for instances created by a provider.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, Default)]
pub enum Scope {
    /// One instance per container, created on first resolution.
    #[default]
    #[display(fmt = "singleton")]
    Singleton,

    /// A new instance for every resolution. Never cached.
    #[display(fmt = "transient")]
    Transient,

    /// One instance per request. Resolving requires a request in the
    /// [`ResolveContext`](crate::ResolveContext).
    #[display(fmt = "request")]
    Request,
}

/// The string could not be parsed as a [`Scope`].
#[derive(Clone, PartialEq, Eq, Debug, Display)]
#[display(
    fmt = "invalid scope '{}': must be 'singleton', 'transient', or 'request'",
    _0
)]
pub struct ParseScopeError(String);

impl Error for ParseScopeError {}

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "singleton" => Ok(Scope::Singleton),
            "transient" => Ok(Scope::Transient),
            "request" => Ok(Scope::Request),
            _ => Err(ParseScopeError(s.to_owned())),
        }
    }
}
