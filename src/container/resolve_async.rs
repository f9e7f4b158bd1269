use super::{context::ResolutionPath, resolve::downcast};
use crate::{
    validate_token, Arguments, Class, Container, DynSvc, FactoryOutput,
    InjectError, InjectResult, InjectionToken, NormalizedProvider,
    ProviderKind, ResolveContext, Scope, Svc, Token,
};
use futures_util::future::{BoxFuture, FutureExt};

impl Container {
    /// Resolves a token outside of any request, awaiting any asynchronous
    /// factories along the way.
    ///
    /// Two concurrent calls for the same uncached singleton may both
    /// construct it. The instance cached last wins. Resolve such singletons
    /// once at startup if they must be created exactly once.
    ///
    /// ```
    /// use token_injector::{create_string_token, Container, Provider};
    ///
    /// # futures_util::FutureExt::now_or_never(async {
    /// let url = create_string_token::<String>("URL");
    /// let container = Container::default();
    /// container
    ///     .register(Provider::async_factory(&url, |_| async {
    ///         Ok("postgres://localhost".to_owned())
    ///     }))
    ///     .unwrap();
    ///
    /// assert!(container.resolve(&url).is_err());
    /// assert_eq!(
    ///     "postgres://localhost",
    ///     *container.resolve_async(&url).await.unwrap()
    /// );
    /// # }).unwrap();
    /// ```
    pub fn resolve_async<K: Token>(
        &self,
        token: &K,
    ) -> BoxFuture<'static, InjectResult<Svc<K::Service>>> {
        self.resolve_async_with(token, ResolveContext::new())
    }

    /// Resolves a token asynchronously within the given context.
    pub fn resolve_async_with<K: Token>(
        &self,
        token: &K,
        context: ResolveContext,
    ) -> BoxFuture<'static, InjectResult<Svc<K::Service>>> {
        let token = token.token();
        let instance = self.resolve_dyn_async_with(token.clone(), context);
        async move { downcast(&token, instance.await?) }.boxed()
    }

    /// Resolves an untyped token asynchronously within the given context.
    pub fn resolve_dyn_async_with(
        &self,
        token: InjectionToken,
        context: ResolveContext,
    ) -> BoxFuture<'static, InjectResult<DynSvc>> {
        self.resolve_async_on_path(token, context, ResolutionPath::default())
    }

    /// Resolves a token asynchronously, returning `None` if no provider
    /// exists for it.
    pub fn resolve_optional_async<K: Token>(
        &self,
        token: &K,
        context: ResolveContext,
    ) -> BoxFuture<'static, InjectResult<Option<Svc<K::Service>>>> {
        let instance = self.resolve_async_with(token, context);
        async move {
            match instance.await {
                Ok(instance) => Ok(Some(instance)),
                Err(InjectError::ServiceNotFound { .. }) => Ok(None),
                Err(error) => Err(error),
            }
        }
        .boxed()
    }

    fn resolve_async_on_path(
        &self,
        token: InjectionToken,
        context: ResolveContext,
        path: ResolutionPath,
    ) -> BoxFuture<'static, InjectResult<DynSvc>> {
        let container = self.clone();
        async move {
            validate_token(&token)?;
            if path.contains(&token) {
                return Err(path.cycle(&token));
            }

            let provider = container.find_provider(&token)?;
            let scopes = container.inner.scopes.clone();
            match provider.scope() {
                Scope::Singleton => {
                    if let Some(instance) = scopes.singleton(&token) {
                        return Ok(instance);
                    }

                    let path = path.with(token.clone(), Scope::Singleton);
                    let instance = container
                        .construct_async(provider, context, path)
                        .await?;
                    scopes.set_singleton(token, instance.clone());
                    Ok(instance)
                }
                Scope::Transient => {
                    let path = path.with(token, Scope::Transient);
                    container.construct_async(provider, context, path).await
                }
                Scope::Request => {
                    if let Some(dependent) = path.singleton_dependent() {
                        return Err(InjectError::ScopeMismatch {
                            token,
                            dependent: dependent.clone(),
                        });
                    }

                    let request =
                        scopes.ensure_request_scope(&token, context.request())?;
                    if let Some(instance) = scopes.request_scoped(request, &token)
                    {
                        return Ok(instance);
                    }

                    let path = path.with(token.clone(), Scope::Request);
                    let instance = container
                        .construct_async(provider, context, path)
                        .await?;
                    scopes.set_request_scoped(request, token, instance.clone());
                    Ok(instance)
                }
            }
        }
        .boxed()
    }

    async fn construct_async(
        &self,
        provider: Svc<NormalizedProvider>,
        context: ResolveContext,
        path: ResolutionPath,
    ) -> InjectResult<DynSvc> {
        let token = provider.provide().clone();
        match provider.kind() {
            ProviderKind::Class(class) => {
                let values =
                    self.class_arguments_async(*class, context, &path).await?;
                class.construct(&mut Arguments::new(token, values))
            }
            ProviderKind::Factory { factory, inject } => {
                let mut values = Vec::with_capacity(inject.len());
                for dependency in inject {
                    let instance = self
                        .resolve_async_on_path(
                            dependency.clone(),
                            context,
                            path.clone(),
                        )
                        .await?;
                    values.push(Some(instance));
                }

                match factory.invoke(Arguments::new(token, values)) {
                    FactoryOutput::Ready(result) => result,
                    FactoryOutput::Pending(future) => future.await,
                }
            }
            ProviderKind::Value(value) => Ok(value.clone()),
            ProviderKind::Existing(target) => {
                self.resolve_async_on_path(target.clone(), context, path)
                    .await
            }
        }
    }

    async fn class_arguments_async(
        &self,
        class: Class,
        context: ResolveContext,
        path: &ResolutionPath,
    ) -> InjectResult<Vec<Option<DynSvc>>> {
        let metadata = &self.inner.options.metadata;
        let tokens = metadata.constructor_tokens(&class);
        let optional = metadata.optional_params(&class);

        let mut values = Vec::with_capacity(tokens.len());
        for (index, dependency) in tokens.into_iter().enumerate() {
            let is_optional = optional.contains(&index);
            if dependency.is_object_placeholder() {
                if is_optional {
                    values.push(None);
                    continue;
                }

                return Err(InjectError::MissingInjectableDecorator {
                    class: class.info(),
                    index,
                });
            }

            let resolved = self
                .resolve_async_on_path(dependency, context, path.clone())
                .await;
            match resolved {
                Ok(instance) => values.push(Some(instance)),
                // Optional dependencies tolerate any failure here, not just
                // a missing provider.
                Err(_) if is_optional => values.push(None),
                Err(error) => return Err(error),
            }
        }

        Ok(values)
    }
}
