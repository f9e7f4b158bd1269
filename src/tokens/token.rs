use crate::{Class, InjectError, InjectResult, Service};
use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier with an optional description. Two symbols are only
/// equal if one is a clone of the other, even if their descriptions match.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Option<Arc<str>>,
}

impl Symbol {
    /// Creates a new, unique symbol.
    #[must_use]
    pub fn new(description: Option<&str>) -> Self {
        Symbol {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: description.map(Arc::from),
        }
    }

    /// Gets the description this symbol was created with.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Symbol")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish()
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.description() {
            Some(description) => f.write_str(description),
            None => write!(f, "Symbol()"),
        }
    }
}

/// Identifies a service in a container. Tokens are compared by identity:
/// classes by type, strings by content, and symbols by their unique id.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum InjectionToken {
    /// A class acting as its own identity.
    Class(Class),
    /// A named token.
    String(Arc<str>),
    /// A unique symbol.
    Symbol(Symbol),
}

impl InjectionToken {
    /// Whether this is a class token.
    #[must_use]
    pub fn is_class(&self) -> bool {
        matches!(self, InjectionToken::Class(_))
    }

    /// Whether this is a string token.
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, InjectionToken::String(_))
    }

    /// Whether this is a symbol token.
    #[must_use]
    pub fn is_symbol(&self) -> bool {
        matches!(self, InjectionToken::Symbol(_))
    }

    /// Gets the class if this is a class token.
    #[must_use]
    pub fn as_class(&self) -> Option<&Class> {
        match self {
            InjectionToken::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Whether this is the placeholder used for constructor parameters whose
    /// type could not be inferred.
    #[must_use]
    pub fn is_object_placeholder(&self) -> bool {
        self.as_class().map_or(false, Class::is_object)
    }
}

impl Display for InjectionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&get_token_name(self))
    }
}

impl Debug for InjectionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InjectionToken::Class(class) => {
                f.debug_tuple("Class").field(&class.info().name()).finish()
            }
            InjectionToken::String(name) => {
                f.debug_tuple("String").field(name).finish()
            }
            InjectionToken::Symbol(symbol) => {
                f.debug_tuple("Symbol").field(symbol).finish()
            }
        }
    }
}

impl From<Class> for InjectionToken {
    fn from(class: Class) -> Self {
        InjectionToken::Class(class)
    }
}

impl From<&str> for InjectionToken {
    fn from(name: &str) -> Self {
        InjectionToken::String(Arc::from(name))
    }
}

impl From<String> for InjectionToken {
    fn from(name: String) -> Self {
        InjectionToken::String(Arc::from(name))
    }
}

impl From<Symbol> for InjectionToken {
    fn from(symbol: Symbol) -> Self {
        InjectionToken::Symbol(symbol)
    }
}

impl From<&InjectionToken> for InjectionToken {
    fn from(token: &InjectionToken) -> Self {
        token.clone()
    }
}

/// A token which knows the type of service it identifies.
pub trait Token {
    /// The type of service this token resolves to.
    type Service: Service;

    /// Gets the untyped token used as the registry key.
    fn token(&self) -> InjectionToken;
}

/// A string token carrying the type of the service it identifies.
pub struct StringToken<T> {
    name: Arc<str>,
    marker: PhantomData<fn() -> T>,
}

impl<T> StringToken<T> {
    /// Gets the name of this token.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for StringToken<T> {
    fn clone(&self) -> Self {
        StringToken {
            name: self.name.clone(),
            marker: PhantomData,
        }
    }
}

impl<T> PartialEq for StringToken<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for StringToken<T> {}

impl<T> Debug for StringToken<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StringToken").field(&self.name).finish()
    }
}

impl<T: Service> Token for StringToken<T> {
    type Service = T;

    fn token(&self) -> InjectionToken {
        InjectionToken::String(self.name.clone())
    }
}

impl<T> From<&StringToken<T>> for InjectionToken {
    fn from(token: &StringToken<T>) -> Self {
        InjectionToken::String(token.name.clone())
    }
}

impl<T> From<StringToken<T>> for InjectionToken {
    fn from(token: StringToken<T>) -> Self {
        InjectionToken::String(token.name)
    }
}

/// A symbol token carrying the type of the service it identifies.
pub struct SymbolToken<T> {
    symbol: Symbol,
    marker: PhantomData<fn() -> T>,
}

impl<T> SymbolToken<T> {
    /// Gets the symbol backing this token.
    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }
}

impl<T> Clone for SymbolToken<T> {
    fn clone(&self) -> Self {
        SymbolToken {
            symbol: self.symbol.clone(),
            marker: PhantomData,
        }
    }
}

impl<T> PartialEq for SymbolToken<T> {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl<T> Eq for SymbolToken<T> {}

impl<T> Debug for SymbolToken<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SymbolToken").field(&self.symbol).finish()
    }
}

impl<T: Service> Token for SymbolToken<T> {
    type Service = T;

    fn token(&self) -> InjectionToken {
        InjectionToken::Symbol(self.symbol.clone())
    }
}

impl<T> From<&SymbolToken<T>> for InjectionToken {
    fn from(token: &SymbolToken<T>) -> Self {
        InjectionToken::Symbol(token.symbol.clone())
    }
}

impl<T> From<SymbolToken<T>> for InjectionToken {
    fn from(token: SymbolToken<T>) -> Self {
        InjectionToken::Symbol(token.symbol)
    }
}

/// Creates a string token. No uniqueness checks are made: two string tokens
/// with the same name identify the same service.
///
/// ## Example
///
/// ```
/// use token_injector::{create_string_token, Container, Provider};
///
/// let port = create_string_token::<u16>("PORT");
///
/// let container = Container::default();
/// container.register(Provider::value(&port, 8080)).unwrap();
///
/// assert_eq!(8080, *container.resolve(&port).unwrap());
/// ```
pub fn create_string_token<T>(name: impl Into<Arc<str>>) -> StringToken<T> {
    StringToken {
        name: name.into(),
        marker: PhantomData,
    }
}

/// Creates a symbol token. Every call returns a distinct token.
#[must_use]
pub fn create_symbol_token<T>(description: Option<&str>) -> SymbolToken<T> {
    SymbolToken {
        symbol: Symbol::new(description),
        marker: PhantomData,
    }
}

/// Whether the token is a class token.
#[must_use]
pub fn is_class_token(token: &InjectionToken) -> bool {
    token.is_class()
}

/// Whether the token is a string token.
#[must_use]
pub fn is_string_token(token: &InjectionToken) -> bool {
    token.is_string()
}

/// Whether the token is a symbol token.
#[must_use]
pub fn is_symbol_token(token: &InjectionToken) -> bool {
    token.is_symbol()
}

/// Checks that a token can be used as a registry key. Every class and symbol
/// token is valid. String tokens must have a name that is not empty or
/// whitespace only, which is stricter than accepting any string.
pub fn validate_token(token: &InjectionToken) -> InjectResult<()> {
    match token {
        InjectionToken::String(name) if name.trim().is_empty() => {
            Err(InjectError::InvalidInjectionToken {
                reason: "string tokens must have a non-empty name".to_owned(),
            })
        }
        _ => Ok(()),
    }
}

/// Gets a human-readable name for a token.
#[must_use]
pub fn get_token_name(token: &InjectionToken) -> String {
    match token {
        InjectionToken::String(name) => name.to_string(),
        InjectionToken::Symbol(symbol) => symbol.to_string(),
        InjectionToken::Class(class) => {
            let name = class.info().short_name();
            if name.is_empty() || name.contains("{{closure}}") {
                "AnonymousClass".to_owned()
            } else {
                name.to_owned()
            }
        }
    }
}
