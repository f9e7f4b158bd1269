//! Token-based dependency injection.
//!
//! Services are registered against an [`InjectionToken`]: a class (the type
//! itself), a string, or a unique symbol. Each registration is a
//! [`Provider`] naming how the service is built and how long instances live.
//! Services are only created when they are first requested.
//!
//! # Tokens
//!
//! Typed tokens carry the type of the service they identify, so resolving
//! one gives back a pointer of the right type:
//!
//! - [`ClassToken<T>`]: the class `T` acts as its own identity.
//! - [`StringToken<T>`], from [`create_string_token`]: two string tokens
//!   with the same name identify the same service.
//! - [`SymbolToken<T>`], from [`create_symbol_token`]: every symbol token
//!   is distinct, even if its description matches another one.
//!
//! # Providers
//!
//! A provider uses exactly one of four strategies:
//!
//! - Class: construct the type through [`Injectable::construct`], with the
//!   constructor parameters described by a [`MetadataProvider`].
//! - Factory: call a function with the services listed in its `inject`
//!   list. Factories may be asynchronous, in which case the token can only
//!   be resolved with [`Container::resolve_async`].
//! - Value: hand out a pre-built instance.
//! - Existing: forward to another token.
//!
//! # Scopes
//!
//! - [`Scope::Singleton`]: one instance per container (the default).
//! - [`Scope::Transient`]: a new instance for every resolution.
//! - [`Scope::Request`]: one instance per request. The request is named by
//!   the [`ResolveContext`] passed to the container, and its instances are
//!   dropped when the request ends.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use token_injector::{
//!     create_string_token, Arguments, ClassMetadata, ClassToken, Container,
//!     ContainerOptions, InjectResult, Injectable, MetadataRegistry, Provider,
//!     Svc,
//! };
//!
//! trait Database: Send + Sync {
//!     fn query(&self) -> u32;
//! }
//!
//! struct InMemoryDatabase;
//!
//! impl Database for InMemoryDatabase {
//!     fn query(&self) -> u32 {
//!         42
//!     }
//! }
//!
//! // The token names the interface, so the implementation can be swapped
//! // without touching the services that depend on it.
//! let db = create_string_token::<Box<dyn Database>>("DB");
//!
//! struct Repo {
//!     db: Svc<Box<dyn Database>>,
//! }
//!
//! impl Injectable for Repo {
//!     fn construct(args: &mut Arguments) -> InjectResult<Self> {
//!         Ok(Repo { db: args.take()? })
//!     }
//! }
//!
//! let metadata = Arc::new(MetadataRegistry::new());
//! metadata.register::<Repo>(ClassMetadata::injectable().param(&db));
//!
//! let container = Container::new(ContainerOptions {
//!     metadata,
//!     ..ContainerOptions::default()
//! });
//! container
//!     .register(Provider::factory(&db, |_| {
//!         Ok(Box::new(InMemoryDatabase) as Box<dyn Database>)
//!     }))
//!     .unwrap();
//!
//! // Repo is injectable, so it does not need to be registered explicitly.
//! let repo = container.resolve(&ClassToken::<Repo>::new()).unwrap();
//! assert_eq!(42, repo.db.query());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::needless_pass_by_value
)]

mod builder;
mod container;
mod metadata;
mod module;
mod providers;
mod scope;
mod scope_manager;
mod services;
mod tokens;

pub use builder::*;
pub use container::*;
pub use metadata::*;
pub use module::*;
pub use providers::*;
pub use scope::*;
pub use scope_manager::*;
pub use services::*;
pub use tokens::*;

#[cfg(test)]
mod tests;
