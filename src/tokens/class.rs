use crate::{
    Arguments, DynSvc, InjectError, InjectResult, InjectionToken, Service,
    ServiceInfo, Svc, Token,
};
use std::{
    fmt::{Debug, Formatter},
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// A type which can be constructed by a container. The container resolves
/// the constructor parameters described by the
/// [`MetadataProvider`](crate::MetadataProvider) and passes them in order
/// through [`Arguments`].
///
/// ## Example
///
/// ```
/// use token_injector::{Arguments, InjectResult, Injectable, Svc};
///
/// struct Config {
///     url: String,
/// }
///
/// struct Database {
///     config: Svc<Config>,
/// }
///
/// impl Injectable for Database {
///     fn construct(args: &mut Arguments) -> InjectResult<Self> {
///         Ok(Database {
///             config: args.take()?,
///         })
///     }
/// }
/// ```
pub trait Injectable: Service + Sized {
    /// Creates an instance of this type from its resolved dependencies.
    fn construct(args: &mut Arguments) -> InjectResult<Self>;
}

type Constructor = fn(&mut Arguments) -> InjectResult<DynSvc>;

fn construct_erased<T: Injectable>(args: &mut Arguments) -> InjectResult<DynSvc> {
    let service = T::construct(args)?;
    Ok(Svc::new(service) as DynSvc)
}

/// A runtime handle to an injectable type: its identity plus its
/// constructor. Classes are compared by type only.
#[derive(Clone, Copy)]
pub struct Class {
    info: ServiceInfo,
    constructor: Constructor,
}

impl Class {
    /// Gets the class for an injectable type.
    #[must_use]
    pub fn of<T: Injectable>() -> Self {
        Class {
            info: ServiceInfo::of::<T>(),
            constructor: construct_erased::<T>,
        }
    }

    /// Gets the placeholder class used when the type of a constructor
    /// parameter could not be inferred.
    #[must_use]
    pub fn object() -> Self {
        Class::of::<Object>()
    }

    /// Whether this is the [`Class::object()`] placeholder.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.info == ServiceInfo::of::<Object>()
    }

    /// Gets type information about this class.
    #[must_use]
    pub fn info(&self) -> ServiceInfo {
        self.info
    }

    /// Invokes the class constructor.
    pub fn construct(&self, args: &mut Arguments) -> InjectResult<DynSvc> {
        (self.constructor)(args)
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.info.id() == other.info.id()
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.info.id().hash(state);
    }
}

impl Debug for Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Class").field(&self.info.name()).finish()
    }
}

/// Placeholder type standing in for constructor parameters whose type is
/// unknown, typically because it was declared as an interface.
#[derive(Debug)]
pub struct Object;

impl Injectable for Object {
    fn construct(_args: &mut Arguments) -> InjectResult<Self> {
        Err(InjectError::InternalError(
            "the Object placeholder cannot be constructed".to_owned(),
        ))
    }
}

/// A typed token for a class.
///
/// ```
/// use token_injector::{
///     Arguments, ClassToken, Container, InjectResult, Injectable, Provider,
/// };
///
/// struct Clock;
///
/// impl Injectable for Clock {
///     fn construct(_args: &mut Arguments) -> InjectResult<Self> {
///         Ok(Clock)
///     }
/// }
///
/// const CLOCK: ClassToken<Clock> = ClassToken::new();
///
/// let container = Container::default();
/// container.register(Provider::class::<Clock>()).unwrap();
/// let _clock = container.resolve(&CLOCK).unwrap();
/// ```
pub struct ClassToken<T>(PhantomData<fn() -> T>);

impl<T> ClassToken<T> {
    /// Creates a token for `T`.
    #[must_use]
    pub const fn new() -> Self {
        ClassToken(PhantomData)
    }
}

impl<T: Injectable> ClassToken<T> {
    /// Gets the class identified by this token.
    #[must_use]
    pub fn class(&self) -> Class {
        Class::of::<T>()
    }
}

impl<T> Clone for ClassToken<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ClassToken<T> {}

impl<T> Default for ClassToken<T> {
    fn default() -> Self {
        ClassToken::new()
    }
}

impl<T> Debug for ClassToken<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ClassToken")
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Injectable> Token for ClassToken<T> {
    type Service = T;

    fn token(&self) -> InjectionToken {
        InjectionToken::Class(Class::of::<T>())
    }
}

impl<T: Injectable> From<ClassToken<T>> for InjectionToken {
    fn from(token: ClassToken<T>) -> Self {
        token.token()
    }
}

impl<T: Injectable> From<&ClassToken<T>> for InjectionToken {
    fn from(token: &ClassToken<T>) -> Self {
        token.token()
    }
}
