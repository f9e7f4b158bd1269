use super::context::ResolutionPath;
use crate::{
    validate_token, Arguments, Class, Container, DynSvc, FactoryOutput,
    InjectError, InjectResult, InjectionToken, NormalizedProvider,
    ProviderKind, ResolveContext, Scope, Service, Svc, Token,
};

pub(crate) fn downcast<T: Service>(
    token: &InjectionToken,
    instance: DynSvc,
) -> InjectResult<Svc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| InjectError::InvalidProvider {
            token: token.clone(),
            reason: format!(
                "the provider returned a value that is not a {}",
                std::any::type_name::<T>()
            ),
        })
}

impl Container {
    /// Resolves a token outside of any request.
    ///
    /// ```
    /// use token_injector::{
    ///     Arguments, ClassToken, Container, InjectResult, Injectable, Provider,
    ///     Svc,
    /// };
    ///
    /// struct Engine;
    ///
    /// impl Injectable for Engine {
    ///     fn construct(_args: &mut Arguments) -> InjectResult<Self> {
    ///         Ok(Engine)
    ///     }
    /// }
    ///
    /// let container = Container::default();
    /// container.register(Provider::class::<Engine>()).unwrap();
    ///
    /// let first = container.resolve(&ClassToken::<Engine>::new()).unwrap();
    /// let second = container.resolve(&ClassToken::<Engine>::new()).unwrap();
    /// assert!(Svc::ptr_eq(&first, &second));
    /// ```
    pub fn resolve<K: Token>(&self, token: &K) -> InjectResult<Svc<K::Service>> {
        self.resolve_with(token, &ResolveContext::new())
    }

    /// Resolves a token within the given context.
    pub fn resolve_with<K: Token>(
        &self,
        token: &K,
        context: &ResolveContext,
    ) -> InjectResult<Svc<K::Service>> {
        let token = token.token();
        let instance = self.resolve_dyn_with(&token, context)?;
        downcast(&token, instance)
    }

    /// Resolves an untyped token outside of any request.
    pub fn resolve_dyn(&self, token: &InjectionToken) -> InjectResult<DynSvc> {
        self.resolve_dyn_with(token, &ResolveContext::new())
    }

    /// Resolves an untyped token within the given context.
    pub fn resolve_dyn_with(
        &self,
        token: &InjectionToken,
        context: &ResolveContext,
    ) -> InjectResult<DynSvc> {
        self.resolve_on_path(token, context, &ResolutionPath::default())
    }

    /// Resolves a token, returning `None` if no provider exists for it.
    /// Any other failure is still returned as an error.
    pub fn resolve_optional<K: Token>(
        &self,
        token: &K,
    ) -> InjectResult<Option<Svc<K::Service>>> {
        self.resolve_optional_with(token, &ResolveContext::new())
    }

    /// Resolves a token within the given context, returning `None` if no
    /// provider exists for it.
    pub fn resolve_optional_with<K: Token>(
        &self,
        token: &K,
        context: &ResolveContext,
    ) -> InjectResult<Option<Svc<K::Service>>> {
        match self.resolve_with(token, context) {
            Ok(instance) => Ok(Some(instance)),
            Err(InjectError::ServiceNotFound { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Resolves every instance registered for a token. Each token has at
    /// most one provider, so this returns zero or one instance.
    pub fn resolve_all<K: Token>(
        &self,
        token: &K,
    ) -> InjectResult<Vec<Svc<K::Service>>> {
        self.resolve_all_with(token, &ResolveContext::new())
    }

    /// Resolves every instance registered for a token within the given
    /// context.
    pub fn resolve_all_with<K: Token>(
        &self,
        token: &K,
        context: &ResolveContext,
    ) -> InjectResult<Vec<Svc<K::Service>>> {
        Ok(self
            .resolve_optional_with(token, context)?
            .into_iter()
            .collect())
    }

    pub(crate) fn resolve_on_path(
        &self,
        token: &InjectionToken,
        context: &ResolveContext,
        path: &ResolutionPath,
    ) -> InjectResult<DynSvc> {
        validate_token(token)?;
        if path.contains(token) {
            return Err(path.cycle(token));
        }

        let provider = self.find_provider(token)?;
        let scopes = &self.inner.scopes;
        match provider.scope() {
            Scope::Singleton => {
                if let Some(instance) = scopes.singleton(token) {
                    return Ok(instance);
                }

                let path = path.with(token.clone(), Scope::Singleton);
                let instance = self.construct(&provider, context, &path)?;
                scopes.set_singleton(token.clone(), instance.clone());
                Ok(instance)
            }
            Scope::Transient => {
                let path = path.with(token.clone(), Scope::Transient);
                self.construct(&provider, context, &path)
            }
            Scope::Request => {
                if let Some(dependent) = path.singleton_dependent() {
                    return Err(InjectError::ScopeMismatch {
                        token: token.clone(),
                        dependent: dependent.clone(),
                    });
                }

                let request =
                    scopes.ensure_request_scope(token, context.request())?;
                if let Some(instance) = scopes.request_scoped(request, token) {
                    return Ok(instance);
                }

                let path = path.with(token.clone(), Scope::Request);
                let instance = self.construct(&provider, context, &path)?;
                scopes.set_request_scoped(
                    request,
                    token.clone(),
                    instance.clone(),
                );
                Ok(instance)
            }
        }
    }

    fn construct(
        &self,
        provider: &NormalizedProvider,
        context: &ResolveContext,
        path: &ResolutionPath,
    ) -> InjectResult<DynSvc> {
        let token = provider.provide();
        match provider.kind() {
            ProviderKind::Class(class) => {
                let values = self.class_arguments(class, context, path)?;
                class.construct(&mut Arguments::new(token.clone(), values))
            }
            ProviderKind::Factory { factory, inject } => {
                let values = inject
                    .iter()
                    .map(|dependency| {
                        self.resolve_on_path(dependency, context, path).map(Some)
                    })
                    .collect::<InjectResult<Vec<_>>>()?;

                match factory.invoke(Arguments::new(token.clone(), values)) {
                    FactoryOutput::Ready(result) => result,
                    FactoryOutput::Pending(_) => {
                        Err(InjectError::InvalidProvider {
                            token: token.clone(),
                            reason: "the factory is asynchronous; resolve \
                                     this token with resolve_async"
                                .to_owned(),
                        })
                    }
                }
            }
            ProviderKind::Value(value) => Ok(value.clone()),
            ProviderKind::Existing(target) => {
                self.resolve_on_path(target, context, path)
            }
        }
    }

    fn class_arguments(
        &self,
        class: &Class,
        context: &ResolveContext,
        path: &ResolutionPath,
    ) -> InjectResult<Vec<Option<DynSvc>>> {
        let metadata = &self.inner.options.metadata;
        let optional = metadata.optional_params(class);

        metadata
            .constructor_tokens(class)
            .iter()
            .enumerate()
            .map(|(index, dependency)| {
                let is_optional = optional.contains(&index);
                if dependency.is_object_placeholder() {
                    return if is_optional {
                        Ok(None)
                    } else {
                        Err(InjectError::MissingInjectableDecorator {
                            class: class.info(),
                            index,
                        })
                    };
                }

                match self.resolve_on_path(dependency, context, path) {
                    Ok(instance) => Ok(Some(instance)),
                    Err(error) if is_optional && error.is_not_found() => Ok(None),
                    Err(error) => Err(error),
                }
            })
            .collect()
    }
}
