use crate::{
    create_string_token, create_symbol_token, Arguments, ClassMetadata,
    ClassToken, Container, ContainerOptions, ErrorCode, InjectError,
    InjectResult, Injectable, MetadataRegistry, Provider, RequestEndHook,
    RequestId, RequestLifecycle, ResolveContext, Scope, Svc,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tracing_test::traced_test;

fn container_with(metadata: &Arc<MetadataRegistry>) -> Container {
    Container::new(ContainerOptions {
        metadata: metadata.clone(),
        ..ContainerOptions::default()
    })
}

#[derive(Debug)]
struct Svc1;

impl Injectable for Svc1 {
    fn construct(_args: &mut Arguments) -> InjectResult<Self> {
        Ok(Svc1)
    }
}

#[derive(Debug)]
struct Svc2 {
    dep1: Svc<Svc1>,
}

impl Injectable for Svc2 {
    fn construct(args: &mut Arguments) -> InjectResult<Self> {
        Ok(Svc2 { dep1: args.take()? })
    }
}

#[derive(Debug)]
struct CycleA;

impl Injectable for CycleA {
    fn construct(args: &mut Arguments) -> InjectResult<Self> {
        args.take::<CycleB>()?;
        Ok(CycleA)
    }
}

#[derive(Debug)]
struct CycleB;

impl Injectable for CycleB {
    fn construct(args: &mut Arguments) -> InjectResult<Self> {
        args.take::<CycleA>()?;
        Ok(CycleB)
    }
}

#[test]
fn missing_provider_is_not_found() {
    let container = container_with(&Arc::default());
    let name = create_string_token::<String>("NAME");

    let error = container.resolve(&name).unwrap_err();
    assert_eq!(ErrorCode::ServiceNotFound, error.code());
    assert_eq!(500, error.status());

    let error = container.resolve(&ClassToken::<Svc1>::new()).unwrap_err();
    match error {
        InjectError::ServiceNotFound { token } => {
            assert_eq!("Svc1", token.to_string());
        }
        error => panic!("unexpected error: {error}"),
    }
}

#[test]
fn missing_dependency_is_not_found() {
    let metadata = Arc::new(MetadataRegistry::new());
    metadata.register::<Svc2>(
        ClassMetadata::new().param(ClassToken::<Svc1>::new()),
    );

    let container = container_with(&metadata);
    container.register(Provider::class::<Svc2>()).unwrap();

    let error = container.resolve(&ClassToken::<Svc2>::new()).unwrap_err();
    assert!(error.is_not_found());
}

#[test]
fn cycles_are_detected_and_do_not_poison_the_container() {
    let metadata = Arc::new(MetadataRegistry::new());
    metadata.register::<CycleA>(
        ClassMetadata::new().param(ClassToken::<CycleB>::new()),
    );
    metadata.register::<CycleB>(
        ClassMetadata::new().param(ClassToken::<CycleA>::new()),
    );

    let container = container_with(&metadata);
    container.register(Provider::class::<CycleA>()).unwrap();
    container.register(Provider::class::<CycleB>()).unwrap();
    container.register(Provider::class::<Svc1>()).unwrap();

    let error = container.resolve(&ClassToken::<CycleA>::new()).unwrap_err();
    assert_eq!(ErrorCode::CircularDependency, error.code());
    assert!(error.to_string().contains("CycleA -> CycleB -> CycleA"));

    assert!(container.resolve(&ClassToken::<Svc1>::new()).is_ok());
}

#[test]
fn singletons_are_shared_and_transients_are_not() {
    let metadata = Arc::new(MetadataRegistry::new());
    metadata.register::<Svc2>(
        ClassMetadata::new().param(ClassToken::<Svc1>::new()),
    );

    let container = container_with(&metadata);
    container.register(Provider::class::<Svc1>()).unwrap();
    container
        .register(Provider::class::<Svc2>().scope(Scope::Transient))
        .unwrap();

    let first = container.resolve(&ClassToken::<Svc2>::new()).unwrap();
    let second = container.resolve(&ClassToken::<Svc2>::new()).unwrap();

    assert!(!Svc::ptr_eq(&first, &second));
    assert!(Svc::ptr_eq(&first.dep1, &second.dep1));
}

#[test]
fn request_scope_is_per_request() {
    let counter = create_string_token::<usize>("COUNTER");
    let next = Arc::new(AtomicUsize::new(0));

    let container = Container::default();
    container
        .register(
            Provider::factory(&counter, move |_| {
                Ok(next.fetch_add(1, Ordering::Relaxed))
            })
            .scope(Scope::Request),
        )
        .unwrap();

    let r1 = container.begin_request();
    let r2 = container.begin_request();

    let a = container.resolve_with(&counter, &r1.context()).unwrap();
    let b = container.resolve_with(&counter, &r1.context()).unwrap();
    let c = container.resolve_with(&counter, &r2.context()).unwrap();

    assert!(Svc::ptr_eq(&a, &b));
    assert!(!Svc::ptr_eq(&a, &c));
    assert_eq!(2, container.scope_manager().request_count());

    let error = container.resolve(&counter).unwrap_err();
    assert_eq!(ErrorCode::RequestScopeUnavailable, error.code());

    drop(r1);
    drop(r2);
    assert_eq!(0, container.scope_manager().request_count());
}

#[test]
fn attached_hosts_end_requests() {
    #[derive(Default)]
    struct Host {
        hooks: Vec<RequestEndHook>,
    }

    impl RequestLifecycle for Host {
        fn on_request_end(&mut self, hook: RequestEndHook) {
            self.hooks.push(hook);
        }
    }

    impl Host {
        fn finish(&self, request: RequestId) {
            for hook in &self.hooks {
                hook(request);
            }
        }
    }

    let user = create_string_token::<String>("USER");
    let container = Container::default();
    container
        .register(
            Provider::factory(&user, |_| Ok("alice".to_owned()))
                .scope(Scope::Request),
        )
        .unwrap();

    let mut host = Host::default();
    container.attach_request_lifecycle(&mut host);

    let request = RequestId::from_raw(7);
    let context = ResolveContext::for_request(request);
    container.resolve_with(&user, &context).unwrap();
    assert!(container
        .scope_manager()
        .has_request_scoped(request, &(&user).into()));

    host.finish(request);
    assert_eq!(0, container.scope_manager().request_count());
}

#[test]
fn singletons_cannot_depend_on_request_scoped_services() {
    let session = create_string_token::<String>("SESSION");
    let report = create_string_token::<String>("REPORT");

    let container = Container::default();
    container
        .register(
            Provider::factory(&session, |_| Ok("session".to_owned()))
                .scope(Scope::Request),
        )
        .unwrap();
    container
        .register(
            Provider::factory(&report, |args| {
                Ok(format!("report for {}", args.take::<String>()?))
            })
            .inject([&session]),
        )
        .unwrap();

    let request = container.begin_request();
    let error = container
        .resolve_with(&report, &request.context())
        .unwrap_err();

    match error {
        InjectError::ScopeMismatch { token, dependent } => {
            assert_eq!("SESSION", token.to_string());
            assert_eq!("REPORT", dependent.to_string());
        }
        error => panic!("unexpected error: {error}"),
    }
}

#[test]
fn child_registrations_shadow_parent() {
    let level = create_string_token::<&'static str>("LEVEL");

    let parent = Container::default();
    parent.register(Provider::value(&level, "parent")).unwrap();

    let child = parent.child();
    assert_eq!("parent", *child.resolve(&level).unwrap());

    child.register(Provider::value(&level, "child")).unwrap();
    assert_eq!("child", *child.resolve(&level).unwrap());
    assert_eq!("parent", *parent.resolve(&level).unwrap());
}

#[test]
fn child_containers_cache_parent_singletons_separately() {
    let container = Container::default();
    container.register(Provider::class::<Svc1>()).unwrap();
    let child = container.child();

    let from_parent = container.resolve(&ClassToken::<Svc1>::new()).unwrap();
    let from_child = child.resolve(&ClassToken::<Svc1>::new()).unwrap();
    assert!(!Svc::ptr_eq(&from_parent, &from_child));
}

#[test]
fn ending_a_request_evicts_child_request_caches() {
    let user = create_string_token::<String>("USER");
    let parent = Container::default();
    parent
        .register(
            Provider::factory(&user, |_| Ok("alice".to_owned()))
                .scope(Scope::Request),
        )
        .unwrap();
    let child = parent.child();

    let guard = parent.begin_request();
    child.resolve_with(&user, &guard.context()).unwrap();
    assert_eq!(1, child.scope_manager().request_count());

    drop(guard);
    assert_eq!(0, child.scope_manager().request_count());
}

#[test]
fn resolve_optional_only_swallows_missing_providers() {
    let missing = create_string_token::<u32>("MISSING");
    let pending = create_string_token::<u32>("PENDING");

    let container = Container::default();
    container
        .register(Provider::async_factory(&pending, |_| async { Ok(1) }))
        .unwrap();

    assert!(container.resolve_optional(&missing).unwrap().is_none());
    assert!(container.resolve_all(&missing).unwrap().is_empty());

    let error = container.resolve_optional(&pending).unwrap_err();
    assert_eq!(ErrorCode::InvalidProvider, error.code());
}

#[tokio::test]
async fn async_factories_need_async_resolution() {
    let config = create_string_token::<String>("CONFIG");
    let container = Container::default();
    container
        .register(Provider::async_factory(&config, |_| async {
            tokio::task::yield_now().await;
            Ok("loaded".to_owned())
        }))
        .unwrap();

    let error = container.resolve(&config).unwrap_err();
    assert_eq!(ErrorCode::InvalidProvider, error.code());
    assert!(error.to_string().contains("resolve_async"));

    let value = container.resolve_async(&config).await.unwrap();
    assert_eq!("loaded", *value);

    // The singleton is now cached, so synchronous resolution succeeds.
    let cached = container.resolve(&config).unwrap();
    assert!(Svc::ptr_eq(&value, &cached));
}

#[derive(Debug)]
struct Db;

impl Db {
    fn query(&self) -> u32 {
        42
    }
}

#[derive(Debug)]
struct Repo {
    db: Svc<Db>,
}

impl Injectable for Repo {
    fn construct(args: &mut Arguments) -> InjectResult<Self> {
        Ok(Repo { db: args.take()? })
    }
}

#[test]
fn repo_receives_singleton_database() {
    let metadata = Arc::new(MetadataRegistry::new());
    metadata.register::<Repo>(
        ClassMetadata::new().untyped_param().inject(0, "DB"),
    );

    let db = create_string_token::<Db>("DB");
    let container = container_with(&metadata);
    container
        .register(Provider::factory(&db, |_| Ok(Db)).scope(Scope::Singleton))
        .unwrap();
    container
        .register(Provider::class::<Repo>().scope(Scope::Transient))
        .unwrap();

    let first = container.resolve(&ClassToken::<Repo>::new()).unwrap();
    let second = container.resolve(&ClassToken::<Repo>::new()).unwrap();

    assert_eq!(42, first.db.query());
    assert!(!Svc::ptr_eq(&first, &second));
    assert!(Svc::ptr_eq(&first.db, &second.db));
}

#[derive(Debug)]
struct Notifier {
    mailer: Option<Svc<String>>,
    sink: Option<Svc<String>>,
}

impl Injectable for Notifier {
    fn construct(args: &mut Arguments) -> InjectResult<Self> {
        Ok(Notifier {
            mailer: args.take_optional()?,
            sink: args.take_optional()?,
        })
    }
}

#[test]
fn optional_parameters_resolve_to_none() {
    let metadata = Arc::new(MetadataRegistry::new());
    metadata.register::<Notifier>(
        ClassMetadata::new()
            .optional_param("MAILER")
            .untyped_param()
            .optional(1),
    );

    let container = container_with(&metadata);
    container.register(Provider::class::<Notifier>()).unwrap();

    let notifier = container.resolve(&ClassToken::<Notifier>::new()).unwrap();
    assert!(notifier.mailer.is_none());
    assert!(notifier.sink.is_none());
}

#[test]
fn untyped_required_parameters_are_rejected() {
    let metadata = Arc::new(MetadataRegistry::new());
    metadata.register::<Notifier>(
        ClassMetadata::new().optional_param("MAILER").untyped_param(),
    );

    let container = container_with(&metadata);
    container.register(Provider::class::<Notifier>()).unwrap();

    let error = container
        .resolve(&ClassToken::<Notifier>::new())
        .unwrap_err();
    match error {
        InjectError::MissingInjectableDecorator { class, index } => {
            assert_eq!("Notifier", class.short_name());
            assert_eq!(1, index);
        }
        error => panic!("unexpected error: {error}"),
    }
}

#[tokio::test]
async fn optional_parameters_tolerate_failures_only_when_async() {
    let metadata = Arc::new(MetadataRegistry::new());
    metadata.register::<Notifier>(
        ClassMetadata::new().optional_param("MAILER").optional_param("SINK"),
    );

    let mailer = create_string_token::<String>("MAILER");
    let container = container_with(&metadata);
    container
        .register(Provider::factory(&mailer, |args| {
            Err(InjectError::activation_failed(
                args.owner(),
                "smtp server unreachable",
            ))
        }))
        .unwrap();
    container
        .register(Provider::class::<Notifier>().scope(Scope::Transient))
        .unwrap();

    let error = container
        .resolve(&ClassToken::<Notifier>::new())
        .unwrap_err();
    assert_eq!(ErrorCode::ActivationFailed, error.code());

    let notifier = container
        .resolve_async(&ClassToken::<Notifier>::new())
        .await
        .unwrap();
    assert!(notifier.mailer.is_none());
}

#[test]
fn injectable_classes_are_auto_registered() {
    let metadata = Arc::new(MetadataRegistry::new());
    metadata.register::<Svc1>(ClassMetadata::injectable().scope(Scope::Transient));

    let container = container_with(&metadata);
    let token = ClassToken::<Svc1>::new();
    assert!(!container.is_registered(token));

    container.resolve(&token).unwrap();
    let provider = container.get_provider(token).unwrap();
    assert_eq!(Scope::Transient, provider.scope());

    let disabled = Container::new(ContainerOptions {
        auto_register: false,
        metadata: metadata.clone(),
        name: None,
    });
    assert!(disabled.resolve(&token).unwrap_err().is_not_found());
}

#[test]
fn existing_providers_share_the_target_instance() {
    let primary = create_symbol_token::<String>(Some("primary"));
    let alias = create_symbol_token::<String>(Some("alias"));

    let container = Container::default();
    container
        .register(Provider::factory(&primary, |_| Ok("db".to_owned())))
        .unwrap();
    container
        .register(Provider::existing(&alias, &primary))
        .unwrap();

    let a = container.resolve(&primary).unwrap();
    let b = container.resolve(&alias).unwrap();
    assert!(Svc::ptr_eq(&a, &b));
}

#[test]
fn values_are_returned_unchanged() {
    let shared = Svc::new(5u8);
    let token = create_string_token::<u8>("FIVE");

    let container = Container::default();
    container
        .register(Provider::new(&token).use_value(shared.clone()))
        .unwrap();

    let resolved = container.resolve(&token).unwrap();
    assert!(Svc::ptr_eq(&shared, &resolved));
}

#[test]
fn re_registration_drops_cached_singleton() {
    let token = create_string_token::<u32>("VERSION");
    let container = Container::default();

    container.register(Provider::factory(&token, |_| Ok(1))).unwrap();
    assert_eq!(1, *container.resolve(&token).unwrap());

    container.register(Provider::factory(&token, |_| Ok(2))).unwrap();
    assert_eq!(2, *container.resolve(&token).unwrap());
}

#[test]
fn clear_instances_keeps_registrations() {
    let container = Container::default();
    container.register(Provider::class::<Svc1>()).unwrap();

    let token = ClassToken::<Svc1>::new();
    let first = container.resolve(&token).unwrap();
    container.clear_instances();
    let second = container.resolve(&token).unwrap();

    assert!(!Svc::ptr_eq(&first, &second));
}

#[test]
fn mismatched_token_type_is_invalid_provider() {
    let container = Container::default();
    container
        .register(Provider::new("PORT").use_value(Svc::new("8080")))
        .unwrap();

    let port = create_string_token::<u16>("PORT");
    let error = container.resolve(&port).unwrap_err();
    assert_eq!(ErrorCode::InvalidProvider, error.code());
}

#[tokio::test]
async fn concurrent_async_singletons_may_construct_twice() {
    let token = create_string_token::<usize>("SLOW");
    let constructed = Arc::new(AtomicUsize::new(0));

    let container = Container::default();
    let counter = constructed.clone();
    container
        .register(Provider::async_factory(&token, move |_| {
            let counter = counter.clone();
            async move {
                let id = counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(id)
            }
        }))
        .unwrap();

    let (a, b) = tokio::join!(
        container.resolve_async(&token),
        container.resolve_async(&token)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(2, constructed.load(Ordering::SeqCst));
    assert!(!Svc::ptr_eq(&a, &b));

    let cached = container.resolve(&token).unwrap();
    assert!(Svc::ptr_eq(&cached, &a) || Svc::ptr_eq(&cached, &b));
}

#[traced_test]
#[test]
fn registration_and_auto_registration_are_logged() {
    let metadata = Arc::new(MetadataRegistry::new());
    metadata.register::<Svc1>(ClassMetadata::injectable());

    let container = container_with(&metadata);
    container.resolve(&ClassToken::<Svc1>::new()).unwrap();

    assert!(logs_contain("auto-registering injectable class"));
    assert!(logs_contain("registering provider"));
}
