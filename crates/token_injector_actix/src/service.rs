use actix_web::{
    dev::Payload, error::ErrorInternalServerError, FromRequest, HttpMessage,
    HttpRequest,
};
use futures_util::future::{
    err, ready, BoxFuture, FutureExt, LocalBoxFuture, Ready,
};
use std::{fmt::Display, ops::Deref};
use token_injector::{
    ClassToken, Container, InjectResult, Injectable, RequestScopeGuard,
    ResolveContext, Svc, Token,
};

/// Gets the container and the request scope for an HTTP request. The
/// request scope is started on first use and stored in the request's
/// extensions, so it ends when actix-web drops the request.
fn request_scope(req: &HttpRequest) -> actix_web::Result<RequestContainer> {
    let container: &Container = req.app_data().ok_or_else(|| {
        ErrorInternalServerError("no container is present in app_data")
    })?;

    let mut extensions = req.extensions_mut();
    let existing = extensions
        .get::<RequestScopeGuard>()
        .filter(|guard| guard.is_for(container.scope_manager()))
        .map(RequestScopeGuard::context);

    let context = if let Some(context) = existing {
        context
    } else {
        let guard = container.begin_request();
        let context = guard.context();
        extensions.insert(guard);
        context
    };

    Ok(RequestContainer {
        container: container.clone(),
        context,
    })
}

/// An injected service. Any injectable class can be taken as a parameter to
/// a request handler by wrapping it in this type. Request-scoped services
/// are shared by every extractor within the same HTTP request.
///
/// ## Example
///
/// ```no_run
/// use actix_web::{get, App, HttpResponse, HttpServer, Responder};
/// use token_injector_actix::{
///     Arguments, Container, InjectResult, Injectable, Injected, Provider,
/// };
///
/// struct Greeter;
///
/// impl Injectable for Greeter {
///     fn construct(_args: &mut Arguments) -> InjectResult<Self> {
///         Ok(Greeter)
///     }
/// }
///
/// #[actix_web::main]
/// async fn main() -> std::io::Result<()> {
///     let container = Container::default();
///     container.register(Provider::class::<Greeter>()).unwrap();
///
///     HttpServer::new(move || {
///         App::new().app_data(container.clone()).service(index)
///     })
///     .bind(("127.0.0.1", 8080))?
///     .run()
///     .await
/// }
///
/// #[get("/")]
/// async fn index(_greeter: Injected<Greeter>) -> impl Responder {
///     HttpResponse::Ok().body("hello")
/// }
/// ```
#[derive(Debug)]
pub struct Injected<T>(Svc<T>);

impl<T> Injected<T> {
    /// Converts an [`Injected<T>`] to its service pointer.
    pub fn into_inner(value: Injected<T>) -> Svc<T> {
        value.0
    }
}

impl<T> Clone for Injected<T> {
    fn clone(&self) -> Self {
        Injected(self.0.clone())
    }
}

impl<T> Deref for Injected<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Display> Display for Injected<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: Injectable> FromRequest for Injected<T> {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, actix_web::Result<Self>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let scope = match request_scope(req) {
            Ok(scope) => scope,
            Err(error) => return err(error).boxed_local(),
        };

        scope
            .resolve_async(&ClassToken::<T>::new())
            .map(|result| result.map(Injected).map_err(ErrorInternalServerError))
            .boxed_local()
    }
}

/// The container together with the scope of the current HTTP request. Use
/// this to resolve string or symbol tokens from a handler.
///
/// ```no_run
/// use actix_web::{get, HttpResponse, Responder};
/// use token_injector_actix::{create_string_token, RequestContainer};
///
/// #[get("/motd")]
/// async fn motd(scope: RequestContainer) -> actix_web::Result<impl Responder> {
///     let motd = create_string_token::<String>("MOTD");
///     let message = scope
///         .resolve(&motd)
///         .map_err(actix_web::error::ErrorInternalServerError)?;
///     Ok(HttpResponse::Ok().body(message.to_string()))
/// }
/// ```
#[derive(Clone, Debug)]
pub struct RequestContainer {
    container: Container,
    context: ResolveContext,
}

impl RequestContainer {
    /// The container registered as app data.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// The resolution context bound to the current request.
    #[must_use]
    pub fn context(&self) -> ResolveContext {
        self.context
    }

    /// Resolves a token within the current request.
    pub fn resolve<K: Token>(&self, token: &K) -> InjectResult<Svc<K::Service>> {
        self.container.resolve_with(token, &self.context)
    }

    /// Resolves a token asynchronously within the current request.
    pub fn resolve_async<K: Token>(
        &self,
        token: &K,
    ) -> BoxFuture<'static, InjectResult<Svc<K::Service>>> {
        self.container.resolve_async_with(token, self.context)
    }
}

impl FromRequest for RequestContainer {
    type Error = actix_web::Error;
    type Future = Ready<actix_web::Result<Self>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(request_scope(req))
    }
}
