use crate::{InjectError, InjectionToken, RequestId, Scope};

/// Per-call information used while resolving a token. The only thing the
/// container needs from a host request is a stable [`RequestId`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct ResolveContext {
    request: Option<RequestId>,
}

impl ResolveContext {
    /// Creates a context with no active request.
    #[must_use]
    pub fn new() -> Self {
        ResolveContext::default()
    }

    /// Creates a context for the given request.
    #[must_use]
    pub fn for_request(request: RequestId) -> Self {
        ResolveContext {
            request: Some(request),
        }
    }

    /// Replaces the request of this context.
    #[must_use]
    pub fn with_request(mut self, request: RequestId) -> Self {
        self.request = Some(request);
        self
    }

    /// The active request, if any.
    #[must_use]
    pub fn request(&self) -> Option<RequestId> {
        self.request
    }
}

/// The chain of providers currently under construction for one top-level
/// resolve call. Each level of the recursion gets its own extended copy, so
/// nothing has to be popped when construction fails.
#[derive(Clone, Debug, Default)]
pub(crate) struct ResolutionPath {
    frames: Vec<(InjectionToken, Scope)>,
}

impl ResolutionPath {
    pub fn contains(&self, token: &InjectionToken) -> bool {
        self.frames.iter().any(|(frame, _)| frame == token)
    }

    #[must_use]
    pub fn with(&self, token: InjectionToken, scope: Scope) -> Self {
        let mut child = self.clone();
        child.frames.push((token, scope));
        child
    }

    /// Builds the error for re-entering `token`.
    pub fn cycle(&self, token: &InjectionToken) -> InjectError {
        let chain = self
            .frames
            .iter()
            .map(|(frame, _)| frame.clone())
            .chain(std::iter::once(token.clone()))
            .collect();
        InjectError::CircularDependency { chain }
    }

    /// The closest singleton on the path, which would capture anything
    /// request-scoped that it depends on.
    pub fn singleton_dependent(&self) -> Option<&InjectionToken> {
        self.frames
            .iter()
            .rev()
            .find(|(_, scope)| *scope == Scope::Singleton)
            .map(|(frame, _)| frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_lists_path_then_repeated_token() {
        let path = ResolutionPath::default()
            .with("A".into(), Scope::Singleton)
            .with("B".into(), Scope::Transient);

        assert!(path.contains(&"A".into()));
        assert_eq!(
            "circular dependency detected: A -> B -> A",
            path.cycle(&"A".into()).to_string()
        );
    }

    #[test]
    fn singleton_dependent_is_the_nearest_singleton() {
        let path = ResolutionPath::default()
            .with("ROOT".into(), Scope::Singleton)
            .with("MID".into(), Scope::Singleton)
            .with("LEAF".into(), Scope::Transient);

        assert_eq!(
            Some(&InjectionToken::from("MID")),
            path.singleton_dependent()
        );
        assert!(ResolutionPath::default()
            .with("LEAF".into(), Scope::Transient)
            .singleton_dependent()
            .is_none());
    }
}
