use crate::{
    validate_token, ContainerBuilder, DebugInfo, InjectError, InjectResult,
    InjectionToken, MetadataProvider, MetadataRegistry, Module,
    NormalizedProvider, Provider, RequestLifecycle, RequestScopeGuard,
    ScopeManager, Svc,
};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
    sync::{Arc, OnceLock},
};
use tracing::debug;

/// Settings for a [`Container`].
#[derive(Clone)]
pub struct ContainerOptions {
    /// Whether classes marked injectable by the metadata provider are
    /// registered on first resolution. Defaults to `true`.
    pub auto_register: bool,

    /// Where constructor metadata comes from. Defaults to
    /// [`MetadataRegistry::global()`].
    pub metadata: Arc<dyn MetadataProvider>,

    /// A name used in diagnostics.
    pub name: Option<String>,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        ContainerOptions {
            auto_register: true,
            metadata: MetadataRegistry::global(),
            name: None,
        }
    }
}

impl Debug for ContainerOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerOptions")
            .field("auto_register", &self.auto_register)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub(crate) type ProviderMap =
    HashMap<InjectionToken, Svc<NormalizedProvider>>;

pub(crate) struct ContainerInner {
    pub providers: RwLock<ProviderMap>,
    pub scopes: Arc<ScopeManager>,
    pub parent: Option<Container>,
    pub options: ContainerOptions,
}

/// A dependency injection container. This holds the providers registered
/// for each token and the instances cached for each scope.
///
/// Cloning a container does not copy its registrations. Both handles share
/// the same providers and caches, so a container can be handed out freely.
///
/// ```
/// use token_injector::{
///     create_string_token, Container, Provider, Scope,
/// };
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let counter = create_string_token::<usize>("COUNTER");
/// let calls = AtomicUsize::new(0);
/// let container = Container::default();
/// container
///     .register(
///         Provider::factory(&counter, move |_| {
///             Ok(calls.fetch_add(1, Ordering::Relaxed))
///         })
///         .scope(Scope::Transient),
///     )
///     .unwrap();
///
/// assert_eq!(0, *container.resolve(&counter).unwrap());
/// assert_eq!(1, *container.resolve(&counter).unwrap());
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Container {
    /// Creates an empty root container.
    #[must_use]
    pub fn new(options: ContainerOptions) -> Self {
        Container::from_parts(options, None)
    }

    pub(crate) fn from_parts(
        options: ContainerOptions,
        parent: Option<Container>,
    ) -> Self {
        let scopes = Arc::new(ScopeManager::new());
        if let Some(parent) = &parent {
            parent.inner.scopes.adopt(&scopes);
        }

        Container {
            inner: Arc::new(ContainerInner {
                providers: RwLock::default(),
                scopes,
                parent,
                options,
            }),
        }
    }

    /// Creates a builder for a container.
    #[must_use]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    /// Gets the process-wide default container. It is created on first use
    /// with default options.
    pub fn global() -> Container {
        static GLOBAL: OnceLock<Container> = OnceLock::new();
        GLOBAL.get_or_init(Container::default).clone()
    }

    /// Creates a child container. Tokens the child does not register itself
    /// are looked up in this container. The child keeps its own instance
    /// caches, but requests ended on this container also end in the child.
    #[must_use]
    pub fn create_child(&self, options: ContainerOptions) -> Container {
        Container::from_parts(options, Some(self.clone()))
    }

    /// Creates a child container with the same metadata provider and
    /// auto-registration setting as this one.
    #[must_use]
    pub fn child(&self) -> Container {
        self.create_child(ContainerOptions {
            name: None,
            ..self.inner.options.clone()
        })
    }

    /// The options this container was created with.
    #[must_use]
    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    /// The parent container, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    /// The scope manager owning this container's cached instances.
    #[must_use]
    pub fn scope_manager(&self) -> &Arc<ScopeManager> {
        &self.inner.scopes
    }

    /// Registers a provider, replacing any provider already registered
    /// locally for the same token. A parent's registration is shadowed, not
    /// removed.
    pub fn register(&self, provider: Provider) -> InjectResult<()> {
        validate_token(provider.provide())?;
        let provider = provider.normalize()?;
        let token = provider.provide().clone();

        debug!(
            container = ?self.inner.options.name,
            provider = %provider.describe(),
            "registering provider"
        );
        self.inner
            .providers
            .write()
            .insert(token.clone(), Svc::new(provider));

        // Instances built by the replaced provider must not outlive it.
        self.inner.scopes.remove_singleton(&token);
        Ok(())
    }

    /// Registers each provider in order. Providers registered before a
    /// failure stay registered.
    pub fn register_many<I>(&self, providers: I) -> InjectResult<()>
    where
        I: IntoIterator<Item = Provider>,
    {
        providers
            .into_iter()
            .try_for_each(|provider| self.register(provider))
    }

    /// Registers every provider in a module.
    pub fn add_module(&self, module: Module) -> InjectResult<()> {
        self.register_many(module.providers)
    }

    /// Whether a provider is registered for the token here or in any
    /// ancestor.
    #[must_use]
    pub fn is_registered(&self, token: impl Into<InjectionToken>) -> bool {
        self.get_provider(token).is_some()
    }

    /// Gets the provider registered for the token here or in the nearest
    /// ancestor.
    pub fn get_provider(
        &self,
        token: impl Into<InjectionToken>,
    ) -> Option<Svc<NormalizedProvider>> {
        self.lookup(&token.into())
    }

    pub(crate) fn lookup(
        &self,
        token: &InjectionToken,
    ) -> Option<Svc<NormalizedProvider>> {
        let local = self.inner.providers.read().get(token).cloned();
        local.or_else(|| {
            self.inner
                .parent
                .as_ref()
                .and_then(|parent| parent.lookup(token))
        })
    }

    /// Finds the provider for a token, auto-registering injectable classes
    /// if enabled.
    pub(crate) fn find_provider(
        &self,
        token: &InjectionToken,
    ) -> InjectResult<Svc<NormalizedProvider>> {
        if let Some(provider) = self.lookup(token) {
            return Ok(provider);
        }

        if self.inner.options.auto_register {
            if let InjectionToken::Class(class) = token {
                let metadata = &self.inner.options.metadata;
                if metadata.is_injectable(class) {
                    let scope = metadata.injectable_scope(class);
                    debug!(%token, %scope, "auto-registering injectable class");
                    self.register(
                        Provider::new(*class).use_class(*class).scope(scope),
                    )?;

                    if let Some(provider) = self.lookup(token) {
                        return Ok(provider);
                    }
                }
            }
        }

        Err(InjectError::ServiceNotFound {
            token: token.clone(),
        })
    }

    /// Drops every cached singleton instance. Registrations are kept.
    pub fn clear_instances(&self) {
        self.inner.scopes.clear_singletons();
    }

    /// Removes every local registration and every cached instance.
    pub fn reset(&self) {
        debug!(container = ?self.inner.options.name, "resetting container");
        self.inner.providers.write().clear();
        self.inner.scopes.reset();
    }

    /// Describes the local registrations of this container.
    #[must_use]
    pub fn debug_info(&self) -> DebugInfo {
        let mut providers: Vec<String> = self
            .inner
            .providers
            .read()
            .values()
            .map(|provider| provider.describe())
            .collect();
        providers.sort();

        DebugInfo {
            name: self.inner.options.name.clone(),
            provider_count: providers.len(),
            providers,
            has_parent: self.inner.parent.is_some(),
        }
    }

    /// Begins a request on this container. Request-scoped instances created
    /// through the guard's context are dropped with the guard.
    #[must_use]
    pub fn begin_request(&self) -> RequestScopeGuard {
        self.inner.scopes.begin_request()
    }

    /// Lets a host evict request-scoped instances when its requests end.
    pub fn attach_request_lifecycle<H>(&self, host: &mut H)
    where
        H: RequestLifecycle + ?Sized,
    {
        self.inner.scopes.attach(host);
    }
}

impl Default for Container {
    fn default() -> Self {
        Container::new(ContainerOptions::default())
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("options", &self.inner.options)
            .field("providers", &self.inner.providers.read().len())
            .field("scopes", &self.inner.scopes)
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_string_token, Scope};

    #[test]
    fn child_lookup_falls_back_to_parent() {
        let parent = Container::default();
        let token = create_string_token::<i32>("VALUE");
        parent.register(Provider::value(&token, 1)).unwrap();

        let child = parent.child();
        assert!(child.is_registered(&token));
        assert!(child.debug_info().has_parent);
        assert_eq!(0, child.debug_info().provider_count);
    }

    #[test]
    fn re_registration_replaces_provider() {
        let container = Container::default();
        let token = create_string_token::<i32>("VALUE");
        container.register(Provider::value(&token, 1)).unwrap();
        container
            .register(Provider::value(&token, 2).scope(Scope::Transient))
            .unwrap();

        let provider = container.get_provider(&token).unwrap();
        assert_eq!(Scope::Transient, provider.scope());
        assert_eq!(1, container.debug_info().provider_count);
    }

    #[test]
    fn invalid_registration_is_rejected() {
        let container = Container::default();
        assert!(container.register(Provider::new("EMPTY")).is_err());
        assert!(container
            .register(Provider::new(" ").use_value(Svc::new(1i32)))
            .is_err());
        assert!(!container.is_registered("EMPTY"));
    }

    #[test]
    fn debug_info_lists_sorted_providers() {
        let mut builder = Container::builder();
        builder.name("app");
        let container = builder.build().unwrap();
        let b = create_string_token::<i32>("B");
        let a = create_string_token::<i32>("A");
        container.register(Provider::value(&b, 1)).unwrap();
        container.register(Provider::value(&a, 2)).unwrap();

        let info = container.debug_info();
        assert_eq!(
            vec!["value(A, singleton)", "value(B, singleton)"],
            info.providers
        );
        assert_eq!(
            "container app (2 providers)\n  value(A, singleton)\n  value(B, singleton)",
            info.to_string()
        );
    }

    #[test]
    fn reset_removes_registrations() {
        let container = Container::default();
        let token = create_string_token::<i32>("VALUE");
        container.register(Provider::value(&token, 1)).unwrap();

        container.reset();
        assert!(!container.is_registered(&token));
    }
}
