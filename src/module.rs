use crate::Provider;

/// A collection of providers that can be added all at once to a
/// [`Container`](crate::Container) or
/// [`ContainerBuilder`](crate::ContainerBuilder). Modules group related
/// registrations so a container can be configured in pieces.
///
/// For creating a module easily via a domain specific language, see
/// [`define_module!`].
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub(crate) providers: Vec<Provider>,
}

impl Module {
    /// Adds a provider to this module.
    pub fn provide(&mut self, provider: Provider) -> &mut Self {
        self.providers.push(provider);
        self
    }

    /// The providers in this module, in registration order.
    #[must_use]
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }
}

impl FromIterator<Provider> for Module {
    fn from_iter<I: IntoIterator<Item = Provider>>(iter: I) -> Self {
        Module {
            providers: iter.into_iter().collect(),
        }
    }
}

/// Defines a new module using a domain specific language.
///
/// # Example
///
/// ```
/// use token_injector::{
///     create_string_token, define_module, Arguments, ClassToken, Container,
///     InjectResult, Injectable, Provider, Scope,
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
/// let timeout = create_string_token::<u64>("TIMEOUT");
///
/// let module = define_module! {
///     providers = [
///         Provider::class::<Clock>().scope(Scope::Transient),
///         Provider::value(&timeout, 30),
///     ],
/// };
///
/// let container = Container::default();
/// container.add_module(module).unwrap();
///
/// assert_eq!(30, *container.resolve(&timeout).unwrap());
/// assert!(container.is_registered(ClassToken::<Clock>::new()));
/// ```
#[macro_export]
macro_rules! define_module {
    {
        $($key:ident = $value:tt),*
        $(,)?
    } => {
        {
            #[allow(unused_mut)]
            let mut module = <$crate::Module as ::std::default::Default>::default();
            $($crate::define_module!(@provide module, $key = $value);)*
            module
        }
    };
    (
        @provide $module:expr,
        providers = [
            $($provider:expr),*
            $(,)?
        ]
    ) => {
        $($module.provide($provider);)*
    };
}
