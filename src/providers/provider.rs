use crate::{
    Arguments, Class, DynSvc, Factory, InjectError, InjectResult, Injectable,
    InjectionToken, Scope, Svc, Token,
};
use futures_util::FutureExt;
use std::{
    fmt::{Debug, Formatter},
    future::Future,
};

/// A registration binding a token to a construction strategy. Exactly one
/// strategy must be set before the provider is registered.
///
/// ## Example
///
/// ```
/// use token_injector::{create_string_token, Container, Provider, Scope};
///
/// let greeting = create_string_token::<String>("GREETING");
/// let name = create_string_token::<String>("NAME");
///
/// let container = Container::default();
/// container.register(Provider::value(&name, "world".to_owned())).unwrap();
/// container
///     .register(
///         Provider::factory(&greeting, |args| {
///             let name = args.take::<String>()?;
///             Ok(format!("hello, {name}"))
///         })
///         .inject([&name])
///         .scope(Scope::Transient),
///     )
///     .unwrap();
///
/// assert_eq!("hello, world", *container.resolve(&greeting).unwrap());
/// ```
#[derive(Clone)]
pub struct Provider {
    provide: InjectionToken,
    use_class: Option<Class>,
    use_factory: Option<Factory>,
    use_value: Option<DynSvc>,
    use_existing: Option<InjectionToken>,
    inject: Option<Vec<InjectionToken>>,
    scope: Option<Scope>,
}

impl Provider {
    /// Creates a provider for a token with no strategy set.
    pub fn new(provide: impl Into<InjectionToken>) -> Self {
        Provider {
            provide: provide.into(),
            use_class: None,
            use_factory: None,
            use_value: None,
            use_existing: None,
            inject: None,
            scope: None,
        }
    }

    /// Creates a provider for `T` which constructs it with its own
    /// constructor.
    #[must_use]
    pub fn class<T: Injectable>() -> Self {
        let class = Class::of::<T>();
        Provider::new(class).use_class(class)
    }

    /// Creates a provider which always returns `value`.
    pub fn value<K: Token>(token: &K, value: K::Service) -> Self {
        Provider::new(token.token()).use_value(Svc::new(value))
    }

    /// Creates a provider which calls `factory` with the services listed in
    /// [`Provider::inject`].
    pub fn factory<K, F>(token: &K, factory: F) -> Self
    where
        K: Token,
        F: Fn(&mut Arguments) -> InjectResult<K::Service>
            + Send
            + Sync
            + 'static,
    {
        Provider::new(token.token()).use_factory(Factory::sync(move |args| {
            factory(args).map(|service| Svc::new(service) as DynSvc)
        }))
    }

    /// Creates a provider whose factory must be awaited. Tokens bound to
    /// async factories can only be resolved with
    /// [`Container::resolve_async`](crate::Container::resolve_async).
    pub fn async_factory<K, F, Fut>(token: &K, factory: F) -> Self
    where
        K: Token,
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = InjectResult<K::Service>> + Send + 'static,
    {
        Provider::new(token.token()).use_factory(Factory::from_async(
            move |args| {
                factory(args)
                    .map(|result| result.map(|service| Svc::new(service) as DynSvc))
            },
        ))
    }

    /// Creates a provider which forwards to another token of the same
    /// service type.
    pub fn existing<K, A>(token: &K, target: &A) -> Self
    where
        K: Token,
        A: Token<Service = K::Service>,
    {
        Provider::new(token.token()).use_existing(target.token())
    }

    /// Constructs the service with a class constructor.
    #[must_use]
    pub fn use_class(mut self, class: Class) -> Self {
        self.use_class = Some(class);
        self
    }

    /// Constructs the service with a factory.
    #[must_use]
    pub fn use_factory(mut self, factory: Factory) -> Self {
        self.use_factory = Some(factory);
        self
    }

    /// Provides a pre-built instance.
    #[must_use]
    pub fn use_value(mut self, value: DynSvc) -> Self {
        self.use_value = Some(value);
        self
    }

    /// Forwards to another token.
    #[must_use]
    pub fn use_existing(mut self, target: impl Into<InjectionToken>) -> Self {
        self.use_existing = Some(target.into());
        self
    }

    /// Sets the tokens resolved and passed to a factory, in order.
    #[must_use]
    pub fn inject<I>(mut self, tokens: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<InjectionToken>,
    {
        self.inject = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the scope of instances created by this provider.
    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// The token this provider is registered for.
    #[must_use]
    pub fn provide(&self) -> &InjectionToken {
        &self.provide
    }

    fn strategy_count(&self) -> usize {
        [
            self.use_class.is_some(),
            self.use_factory.is_some(),
            self.use_value.is_some(),
            self.use_existing.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Checks that exactly one construction strategy is set.
    pub fn validate(&self) -> InjectResult<()> {
        match self.strategy_count() {
            1 => Ok(()),
            0 => Err(InjectError::InvalidProvider {
                token: self.provide.clone(),
                reason: "one of use_class, use_factory, use_value, or \
                         use_existing must be set"
                    .to_owned(),
            }),
            count => Err(InjectError::InvalidProvider {
                token: self.provide.clone(),
                reason: format!(
                    "exactly one construction strategy may be set, found {count}"
                ),
            }),
        }
    }

    /// Validates this provider and fills in its defaults.
    pub fn normalize(self) -> InjectResult<NormalizedProvider> {
        self.validate()?;

        let Provider {
            provide,
            use_class,
            use_factory,
            use_value,
            use_existing,
            inject,
            scope,
        } = self;

        let kind = if let Some(class) = use_class {
            ProviderKind::Class(class)
        } else if let Some(factory) = use_factory {
            ProviderKind::Factory {
                factory,
                inject: inject.unwrap_or_default(),
            }
        } else if let Some(value) = use_value {
            ProviderKind::Value(value)
        } else if let Some(target) = use_existing {
            ProviderKind::Existing(target)
        } else {
            return Err(InjectError::InternalError(
                "validated provider has no strategy".to_owned(),
            ));
        };

        Ok(NormalizedProvider {
            provide,
            kind,
            scope: scope.unwrap_or_default(),
        })
    }
}

impl Debug for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("provide", &self.provide)
            .field("use_class", &self.use_class)
            .field("use_factory", &self.use_factory.is_some())
            .field("use_value", &self.use_value.is_some())
            .field("use_existing", &self.use_existing)
            .field("inject", &self.inject)
            .field("scope", &self.scope)
            .finish()
    }
}

/// How a normalized provider creates its service.
#[derive(Clone)]
pub enum ProviderKind {
    /// Construct through the class constructor, with dependencies taken
    /// from the metadata provider.
    Class(Class),
    /// Call a factory with the listed dependencies.
    Factory {
        /// The factory function.
        factory: Factory,
        /// Tokens resolved and passed to the factory.
        inject: Vec<InjectionToken>,
    },
    /// Return a pre-built instance.
    Value(DynSvc),
    /// Resolve another token instead.
    Existing(InjectionToken),
}

impl ProviderKind {
    /// A short name for this kind of provider.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            ProviderKind::Class(_) => "class",
            ProviderKind::Factory { .. } => "factory",
            ProviderKind::Value(_) => "value",
            ProviderKind::Existing(_) => "existing",
        }
    }
}

impl Debug for ProviderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Class(class) => {
                f.debug_tuple("Class").field(class).finish()
            }
            ProviderKind::Factory { inject, .. } => f
                .debug_struct("Factory")
                .field("inject", inject)
                .finish_non_exhaustive(),
            ProviderKind::Value(_) => f.write_str("Value"),
            ProviderKind::Existing(target) => {
                f.debug_tuple("Existing").field(target).finish()
            }
        }
    }
}

/// A validated provider with its defaults filled in.
#[derive(Clone, Debug)]
pub struct NormalizedProvider {
    provide: InjectionToken,
    kind: ProviderKind,
    scope: Scope,
}

impl NormalizedProvider {
    /// The token this provider is registered for.
    #[must_use]
    pub fn provide(&self) -> &InjectionToken {
        &self.provide
    }

    /// How this provider creates its service.
    #[must_use]
    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    /// The scope of instances created by this provider.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Describes this provider as `type(name, scope)`.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{}({}, {})", self.kind.type_name(), self.provide, self.scope)
    }
}
