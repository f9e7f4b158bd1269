use crate::{get_token_name, InjectionToken};
use derive_more::Display;
use std::{
    any::{Any, TypeId},
    error::Error,
};

/// A reference-counted pointer holding a service.
pub type Svc<T> = std::sync::Arc<T>;

/// A reference-counted service pointer holding an instance of `dyn Any`.
pub type DynSvc = Svc<dyn Any + Send + Sync>;

/// A result from attempting to inject dependencies into a service and
/// construct an instance of it.
pub type InjectResult<T> = Result<T, InjectError>;

/// Implemented automatically on types that are capable of being a service.
pub trait Service: Any + Send + Sync {}
impl<T: ?Sized + Any + Send + Sync> Service for T {}

/// Type information about a service.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    /// Creates a [`ServiceInfo`] for the given type.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this service.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the full type name of this service.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Gets the type name of this service without its module path. Generic
    /// arguments are kept as they are.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let name = self.name;
        let base_end = name.find('<').unwrap_or(name.len());
        let start = name[..base_end].rfind("::").map_or(0, |index| index + 2);
        &name[start..]
    }
}

/// Machine-readable identifier of an [`InjectError`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum ErrorCode {
    /// The token is malformed.
    #[display(fmt = "INVALID_INJECTION_TOKEN")]
    InvalidInjectionToken,
    /// No provider exists for the token.
    #[display(fmt = "SERVICE_NOT_FOUND")]
    ServiceNotFound,
    /// A token depends on itself.
    #[display(fmt = "CIRCULAR_DEPENDENCY")]
    CircularDependency,
    /// A constructor parameter has no usable token.
    #[display(fmt = "MISSING_INJECTABLE_DECORATOR")]
    MissingInjectableDecorator,
    /// A provider is malformed or returned the wrong type.
    #[display(fmt = "INVALID_PROVIDER")]
    InvalidProvider,
    /// A singleton depends on a request-scoped service.
    #[display(fmt = "SCOPE_MISMATCH")]
    ScopeMismatch,
    /// A request-scoped service was resolved outside a request.
    #[display(fmt = "REQUEST_SCOPE_UNAVAILABLE")]
    RequestScopeUnavailable,
    /// User construction code failed.
    #[display(fmt = "ACTIVATION_FAILED")]
    ActivationFailed,
    /// The container's own state is inconsistent.
    #[display(fmt = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    /// The HTTP-style status attached to errors with this code. Every
    /// injection failure is a programming error rather than bad request
    /// input, so this is always 500.
    #[must_use]
    pub fn status(self) -> u16 {
        500
    }
}

/// An error that has occurred during registration or resolution of a
/// service.
#[derive(Debug, Display)]
#[non_exhaustive]
pub enum InjectError {
    /// The token is malformed.
    #[display(fmt = "invalid injection token: {}", reason)]
    InvalidInjectionToken {
        /// Why the token was rejected.
        reason: String,
    },

    /// Failed to find a provider for the requested token, either locally or
    /// in any parent container.
    #[display(fmt = "no provider is registered for {}", token)]
    ServiceNotFound {
        /// The token that was requested.
        token: InjectionToken,
    },

    /// A token was requested while it was already being constructed.
    #[display(
        fmt = "circular dependency detected: {}",
        "fmt_chain(chain)"
    )]
    CircularDependency {
        /// Every token on the resolution path followed by the repeated
        /// token.
        chain: Vec<InjectionToken>,
    },

    /// A constructor parameter's type could not be inferred and no explicit
    /// token was declared for it.
    #[display(
        fmt = "cannot resolve parameter {} of {}: its type could not be inferred (declare an explicit token or mark the parameter optional)",
        index,
        "class.short_name()"
    )]
    MissingInjectableDecorator {
        /// The class being constructed.
        class: ServiceInfo,
        /// Zero-based index of the failing constructor parameter.
        index: usize,
    },

    /// The provider is malformed or produced something unusable.
    #[display(fmt = "invalid provider for {}: {}", token, reason)]
    InvalidProvider {
        /// The token the provider is registered for.
        token: InjectionToken,
        /// What is wrong with the provider.
        reason: String,
    },

    /// A singleton-scoped service depends on a request-scoped one.
    #[display(
        fmt = "{} is singleton-scoped and cannot depend on the request-scoped {}",
        dependent,
        token
    )]
    ScopeMismatch {
        /// The request-scoped token that was requested.
        token: InjectionToken,
        /// The singleton-scoped token being constructed.
        dependent: InjectionToken,
    },

    /// A request-scoped token was resolved without a request in the
    /// resolution context.
    #[display(
        fmt = "{} is request-scoped but no request is present in the resolution context",
        token
    )]
    RequestScopeUnavailable {
        /// The request-scoped token that was requested.
        token: InjectionToken,
    },

    /// A constructor or factory failed with its own error.
    #[display(fmt = "an error occurred during activation of {}", token)]
    ActivationFailed {
        /// The token that was being constructed.
        token: InjectionToken,
        /// The error raised during construction.
        inner: Box<dyn Error + Send + Sync + 'static>,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    #[display(fmt = "an unexpected error occurred: {}", _0)]
    InternalError(String),
}

impl InjectError {
    /// Wraps an error raised by user construction code.
    pub fn activation_failed(
        token: impl Into<InjectionToken>,
        inner: impl Into<Box<dyn Error + Send + Sync + 'static>>,
    ) -> Self {
        InjectError::ActivationFailed {
            token: token.into(),
            inner: inner.into(),
        }
    }

    /// Gets the machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            InjectError::InvalidInjectionToken { .. } => {
                ErrorCode::InvalidInjectionToken
            }
            InjectError::ServiceNotFound { .. } => ErrorCode::ServiceNotFound,
            InjectError::CircularDependency { .. } => {
                ErrorCode::CircularDependency
            }
            InjectError::MissingInjectableDecorator { .. } => {
                ErrorCode::MissingInjectableDecorator
            }
            InjectError::InvalidProvider { .. } => ErrorCode::InvalidProvider,
            InjectError::ScopeMismatch { .. } => ErrorCode::ScopeMismatch,
            InjectError::RequestScopeUnavailable { .. } => {
                ErrorCode::RequestScopeUnavailable
            }
            InjectError::ActivationFailed { .. } => ErrorCode::ActivationFailed,
            InjectError::InternalError(_) => ErrorCode::InternalError,
        }
    }

    /// Gets the HTTP-style status for this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.code().status()
    }

    /// Whether this error means a provider could not be found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, InjectError::ServiceNotFound { .. })
    }
}

impl Error for InjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InjectError::ActivationFailed { inner, .. } => {
                Some(inner.as_ref() as &(dyn Error + 'static))
            }
            _ => None,
        }
    }
}

fn fmt_chain(chain: &[InjectionToken]) -> String {
    let mut joined = String::new();
    for token in chain {
        if !joined.is_empty() {
            joined.push_str(" -> ");
        }
        joined.push_str(&get_token_name(token));
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_string_token;

    mod nested {
        pub struct Repo;
    }

    #[test]
    fn short_name_strips_module_path() {
        let info = ServiceInfo::of::<nested::Repo>();
        assert_eq!("Repo", info.short_name());

        let info = ServiceInfo::of::<Vec<nested::Repo>>();
        assert!(info.short_name().starts_with("Vec<"));
    }

    #[test]
    fn every_error_reports_status_500() {
        let token: InjectionToken = create_string_token::<i32>("DB").into();
        let errors = vec![
            InjectError::InvalidInjectionToken {
                reason: "empty".into(),
            },
            InjectError::ServiceNotFound {
                token: token.clone(),
            },
            InjectError::CircularDependency {
                chain: vec![token.clone(), token.clone()],
            },
            InjectError::RequestScopeUnavailable { token },
            InjectError::InternalError("bug".into()),
        ];

        for error in errors {
            assert_eq!(500, error.status());
        }
    }

    #[test]
    fn codes_are_screaming_snake_case() {
        assert_eq!("SERVICE_NOT_FOUND", ErrorCode::ServiceNotFound.to_string());
        assert_eq!(
            "REQUEST_SCOPE_UNAVAILABLE",
            ErrorCode::RequestScopeUnavailable.to_string()
        );
        assert_eq!("SCOPE_MISMATCH", ErrorCode::ScopeMismatch.to_string());
    }

    #[test]
    fn circular_dependency_message_lists_chain() {
        let a: InjectionToken = create_string_token::<i32>("A").into();
        let b: InjectionToken = create_string_token::<i32>("B").into();
        let error = InjectError::CircularDependency {
            chain: vec![a.clone(), b, a],
        };

        assert_eq!(
            "circular dependency detected: A -> B -> A",
            error.to_string()
        );
    }

    #[test]
    fn activation_failure_exposes_source() {
        let error = InjectError::activation_failed(
            create_string_token::<i32>("DB"),
            "connection refused",
        );

        assert_eq!(ErrorCode::ActivationFailed, error.code());
        let source = error.source().expect("source should be present");
        assert_eq!("connection refused", source.to_string());
    }
}
