//! Constructor metadata consumed by the container.
//!
//! The container never inspects how metadata is collected. It only asks a
//! [`MetadataProvider`] which classes are injectable, what scope they
//! declare, and which token each constructor parameter resolves to.
//! [`MetadataRegistry`] is a table-backed implementation that is filled in
//! explicitly at startup.

use crate::{Class, Injectable, InjectionToken, Scope};
use parking_lot::RwLock;
use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
    sync::{Arc, OnceLock},
};

/// Source of per-class constructor metadata.
pub trait MetadataProvider: Send + Sync {
    /// Whether the class is marked as injectable. Only injectable classes
    /// are auto-registered.
    fn is_injectable(&self, class: &Class) -> bool;

    /// The scope the class declares for itself.
    fn injectable_scope(&self, class: &Class) -> Scope;

    /// One token per constructor parameter, in order. Parameters whose type
    /// could not be inferred are reported as [`Class::object()`].
    fn constructor_tokens(&self, class: &Class) -> Vec<InjectionToken>;

    /// Indices of constructor parameters that may be left unresolved.
    fn optional_params(&self, class: &Class) -> HashSet<usize>;
}

/// Metadata describing how to construct a single class.
///
/// ```
/// use token_injector::{ClassMetadata, Scope};
///
/// let metadata = ClassMetadata::injectable()
///     .scope(Scope::Transient)
///     .param("DB")
///     .untyped_param()
///     .inject(1, "CACHE")
///     .optional(1);
///
/// assert_eq!(2, metadata.constructor_tokens().len());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ClassMetadata {
    injectable: bool,
    scope: Scope,
    param_types: Vec<InjectionToken>,
    overrides: HashMap<usize, InjectionToken>,
    optional: HashSet<usize>,
}

impl ClassMetadata {
    /// Creates metadata for a class that is not marked as injectable. The
    /// class can still be registered explicitly.
    #[must_use]
    pub fn new() -> Self {
        ClassMetadata::default()
    }

    /// Creates metadata for an injectable class.
    #[must_use]
    pub fn injectable() -> Self {
        ClassMetadata {
            injectable: true,
            ..ClassMetadata::default()
        }
    }

    /// Sets the scope declared by the class.
    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Appends a constructor parameter of the given type.
    #[must_use]
    pub fn param(mut self, token: impl Into<InjectionToken>) -> Self {
        self.param_types.push(token.into());
        self
    }

    /// Appends a constructor parameter whose type is unknown.
    #[must_use]
    pub fn untyped_param(mut self) -> Self {
        self.param_types.push(Class::object().into());
        self
    }

    /// Appends an optional constructor parameter of the given type.
    #[must_use]
    pub fn optional_param(self, token: impl Into<InjectionToken>) -> Self {
        let index = self.param_types.len();
        self.param(token).optional(index)
    }

    /// Overrides the token of the parameter at `index`. The override takes
    /// precedence over the declared parameter type.
    #[must_use]
    pub fn inject(mut self, index: usize, token: impl Into<InjectionToken>) -> Self {
        self.overrides.insert(index, token.into());
        self
    }

    /// Marks the parameter at `index` as optional.
    #[must_use]
    pub fn optional(mut self, index: usize) -> Self {
        self.optional.insert(index);
        self
    }

    /// Whether the class is marked as injectable.
    #[must_use]
    pub fn is_injectable(&self) -> bool {
        self.injectable
    }

    /// Gets the declared scope.
    #[must_use]
    pub fn declared_scope(&self) -> Scope {
        self.scope
    }

    /// Gets the indices of optional parameters.
    #[must_use]
    pub fn optional_params(&self) -> &HashSet<usize> {
        &self.optional
    }

    /// Gets the token for each constructor parameter. Overrides beyond the
    /// declared parameters extend the list, with any gap filled by
    /// [`Class::object()`].
    #[must_use]
    pub fn constructor_tokens(&self) -> Vec<InjectionToken> {
        let len = self
            .overrides
            .keys()
            .map(|index| index + 1)
            .chain(std::iter::once(self.param_types.len()))
            .max()
            .unwrap_or_default();

        (0..len)
            .map(|index| {
                self.overrides
                    .get(&index)
                    .or_else(|| self.param_types.get(index))
                    .cloned()
                    .unwrap_or_else(|| Class::object().into())
            })
            .collect()
    }
}

/// A [`MetadataProvider`] backed by an explicit registration table.
///
/// ```
/// use token_injector::{
///     Arguments, Class, ClassMetadata, InjectResult, Injectable,
///     MetadataProvider, MetadataRegistry, Scope,
/// };
///
/// struct Mailer;
///
/// impl Injectable for Mailer {
///     fn construct(_args: &mut Arguments) -> InjectResult<Self> {
///         Ok(Mailer)
///     }
/// }
///
/// let registry = MetadataRegistry::new();
/// registry.register::<Mailer>(ClassMetadata::injectable().scope(Scope::Transient));
///
/// let class = Class::of::<Mailer>();
/// assert!(registry.is_injectable(&class));
/// assert_eq!(Scope::Transient, registry.injectable_scope(&class));
/// ```
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    classes: RwLock<HashMap<TypeId, ClassMetadata>>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        MetadataRegistry::default()
    }

    /// Gets the process-wide registry used by containers created with
    /// default options.
    pub fn global() -> Arc<MetadataRegistry> {
        static GLOBAL: OnceLock<Arc<MetadataRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(Arc::default).clone()
    }

    /// Records metadata for `T`, returning any metadata it replaces.
    pub fn register<T: Injectable>(
        &self,
        metadata: ClassMetadata,
    ) -> Option<ClassMetadata> {
        self.register_class(&Class::of::<T>(), metadata)
    }

    /// Records metadata for a class, returning any metadata it replaces.
    pub fn register_class(
        &self,
        class: &Class,
        metadata: ClassMetadata,
    ) -> Option<ClassMetadata> {
        self.classes.write().insert(class.info().id(), metadata)
    }

    /// Gets the metadata recorded for a class.
    #[must_use]
    pub fn get(&self, class: &Class) -> Option<ClassMetadata> {
        self.classes.read().get(&class.info().id()).cloned()
    }

    /// Removes the metadata recorded for a class.
    pub fn remove(&self, class: &Class) -> Option<ClassMetadata> {
        self.classes.write().remove(&class.info().id())
    }

    /// Number of classes with recorded metadata.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    /// Whether no metadata has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}

impl MetadataProvider for MetadataRegistry {
    fn is_injectable(&self, class: &Class) -> bool {
        self.classes
            .read()
            .get(&class.info().id())
            .map_or(false, ClassMetadata::is_injectable)
    }

    fn injectable_scope(&self, class: &Class) -> Scope {
        self.classes
            .read()
            .get(&class.info().id())
            .map(ClassMetadata::declared_scope)
            .unwrap_or_default()
    }

    fn constructor_tokens(&self, class: &Class) -> Vec<InjectionToken> {
        self.classes
            .read()
            .get(&class.info().id())
            .map(ClassMetadata::constructor_tokens)
            .unwrap_or_default()
    }

    fn optional_params(&self, class: &Class) -> HashSet<usize> {
        self.classes
            .read()
            .get(&class.info().id())
            .map(|metadata| metadata.optional_params().clone())
            .unwrap_or_default()
    }
}
