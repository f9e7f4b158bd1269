//! Spawns a web server that listens on localhost. A password must be sent to
//! access the index page via the query string. Try connecting to
//! <http://localhost:8080/> without any query strings, then connect with the
//! query string `?code=my_secret_password`. The authenticator is a singleton
//! injected into the request handler, and every request gets its own
//! request-scoped audit entry.

use actix_web::{
    get, web::Query, App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use token_injector_actix::{
    create_string_token, define_module, Arguments, ClassMetadata, Container,
    ContainerOptions, InjectResult, Injectable, Injected, MetadataRegistry,
    Provider, Scope, Svc,
};

pub struct QueryRequestAuthenticator {
    secret: Svc<String>,
}

impl Injectable for QueryRequestAuthenticator {
    fn construct(args: &mut Arguments) -> InjectResult<Self> {
        Ok(QueryRequestAuthenticator {
            secret: args.take()?,
        })
    }
}

impl QueryRequestAuthenticator {
    fn is_allowed(&self, request: &HttpRequest) -> bool {
        #[derive(Deserialize)]
        struct QueryData {
            code: String,
        }

        let query = match Query::<QueryData>::from_query(request.query_string())
        {
            Ok(query) => query,
            Err(_) => return false,
        };

        query.code == *self.secret
    }
}

pub struct AuditEntry {
    id: u64,
}

impl Injectable for AuditEntry {
    fn construct(_args: &mut Arguments) -> InjectResult<Self> {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Ok(AuditEntry {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        })
    }
}

fn configure_services() -> InjectResult<Container> {
    let secret = create_string_token::<String>("SECRET");

    let metadata = MetadataRegistry::new();
    metadata.register::<QueryRequestAuthenticator>(
        ClassMetadata::injectable().param(&secret),
    );
    metadata.register::<AuditEntry>(
        ClassMetadata::injectable().scope(Scope::Request),
    );

    let container = Container::new(ContainerOptions {
        metadata: std::sync::Arc::new(metadata),
        name: Some("query_string_auth".to_owned()),
        ..ContainerOptions::default()
    });
    container.add_module(define_module! {
        providers = [
            Provider::value(&secret, "my_secret_password".to_owned()),
        ],
    })?;

    Ok(container)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let container = configure_services()
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::Other, error))?;

    HttpServer::new(move || {
        App::new().app_data(container.clone()).service(index)
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}

#[get("/")]
async fn index(
    request: HttpRequest,
    auth: Injected<QueryRequestAuthenticator>,
    audit: Injected<AuditEntry>,
) -> impl Responder {
    if auth.is_allowed(&request) {
        HttpResponse::Ok()
            .body(format!("You got the password right! (request {})", audit.id))
    } else {
        HttpResponse::Forbidden()
            .body(format!("Incorrect password (request {})", audit.id))
    }
}
