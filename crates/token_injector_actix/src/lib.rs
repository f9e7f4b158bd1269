//! Utility library for injecting dependencies into actix-web applications.
//!
//! Register a [`Container`] as app data, then take services as handler
//! parameters with [`Injected<T>`] or [`RequestContainer`]. Each HTTP request
//! gets its own request scope, which ends when actix-web drops the request.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::needless_pass_by_value
)]

pub use token_injector::*;

mod service;

pub use service::*;
