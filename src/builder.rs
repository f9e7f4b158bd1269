use crate::{
    Container, ContainerOptions, InjectResult, MetadataProvider, Module,
    Provider,
};
use std::sync::Arc;

/// A builder for a [`Container`].
///
/// ```
/// use token_injector::{create_string_token, Container, Provider};
///
/// let port = create_string_token::<u16>("PORT");
///
/// let mut builder = Container::builder();
/// builder.name("app").auto_register(false);
/// builder.provide(Provider::value(&port, 8080));
///
/// let container = builder.build().unwrap();
/// assert_eq!(8080, *container.resolve(&port).unwrap());
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    providers: Vec<Provider>,
    options: ContainerOptions,
    parent: Option<Container>,
}

impl ContainerBuilder {
    /// Queues a provider to register when the container is built.
    pub fn provide(&mut self, provider: Provider) -> &mut Self {
        self.providers.push(provider);
        self
    }

    /// Queues every provider in a module.
    pub fn add_module(&mut self, module: Module) -> &mut Self {
        self.providers.extend(module.providers);
        self
    }

    /// Sets whether injectable classes are registered on first resolution.
    pub fn auto_register(&mut self, enabled: bool) -> &mut Self {
        self.options.auto_register = enabled;
        self
    }

    /// Sets where constructor metadata comes from.
    pub fn metadata(&mut self, metadata: Arc<dyn MetadataProvider>) -> &mut Self {
        self.options.metadata = metadata;
        self
    }

    /// Sets the name used in diagnostics.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.options.name = Some(name.into());
        self
    }

    /// Makes the built container a child of `parent`.
    pub fn parent(&mut self, parent: Container) -> &mut Self {
        self.parent = Some(parent);
        self
    }

    /// Builds the container, registering every queued provider.
    pub fn build(self) -> InjectResult<Container> {
        let container = Container::from_parts(self.options, self.parent);
        container.register_many(self.providers)?;
        Ok(container)
    }
}
