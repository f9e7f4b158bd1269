use crate::{DynSvc, InjectError, InjectResult, InjectionToken, ResolveContext};
use derive_more::Display;
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};
use tracing::{debug, trace};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one request for the purpose of caching request-scoped
/// services. A request id only needs to be stable while its request is
/// active.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[display(fmt = "request#{}", _0)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocates a process-unique request id.
    #[must_use]
    pub fn next() -> Self {
        RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps an id supplied by the host.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        RequestId(id)
    }

    /// Gets the raw id.
    #[must_use]
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

/// Callback invoked by a host when one of its requests completes.
pub type RequestEndHook = Box<dyn Fn(RequestId) + Send + Sync>;

/// A host which can notify the container when a request ends.
///
/// ```
/// use std::sync::Arc;
/// use token_injector::{
///     RequestEndHook, RequestId, RequestLifecycle, ScopeManager,
/// };
///
/// #[derive(Default)]
/// struct Server {
///     hooks: Vec<RequestEndHook>,
/// }
///
/// impl RequestLifecycle for Server {
///     fn on_request_end(&mut self, hook: RequestEndHook) {
///         self.hooks.push(hook);
///     }
/// }
///
/// let manager = Arc::new(ScopeManager::new());
/// let mut server = Server::default();
/// manager.attach(&mut server);
///
/// let request = RequestId::next();
/// manager.set_request_scoped(request, "USER".into(), Arc::new(7u32));
/// assert_eq!(1, manager.request_count());
///
/// for hook in &server.hooks {
///     hook(request);
/// }
/// assert_eq!(0, manager.request_count());
/// ```
pub trait RequestLifecycle {
    /// Registers a hook to call whenever a request ends.
    fn on_request_end(&mut self, hook: RequestEndHook);
}

/// Owns the cached instances of singleton and request-scoped services.
///
/// Scope managers of child containers are adopted by their parent's manager
/// so that ending a request anywhere above a child also evicts the child's
/// entries for that request.
#[derive(Default)]
pub struct ScopeManager {
    singletons: RwLock<HashMap<InjectionToken, DynSvc>>,
    requests: RwLock<HashMap<RequestId, HashMap<InjectionToken, DynSvc>>>,
    children: RwLock<Vec<Weak<ScopeManager>>>,
}

impl ScopeManager {
    /// Creates an empty scope manager.
    #[must_use]
    pub fn new() -> Self {
        ScopeManager::default()
    }

    /// Whether a singleton instance is cached for the token.
    #[must_use]
    pub fn has_singleton(&self, token: &InjectionToken) -> bool {
        self.singletons.read().contains_key(token)
    }

    /// Gets the cached singleton instance for the token, if any.
    #[must_use]
    pub fn singleton(&self, token: &InjectionToken) -> Option<DynSvc> {
        let instance = self.singletons.read().get(token).cloned();
        trace!(%token, hit = instance.is_some(), "singleton cache lookup");
        instance
    }

    /// Gets the cached singleton instance for the token. A missing entry
    /// means the cache is inconsistent with an earlier
    /// [`has_singleton`](ScopeManager::has_singleton) check.
    pub fn get_singleton_or_throw(
        &self,
        token: &InjectionToken,
    ) -> InjectResult<DynSvc> {
        self.singleton(token).ok_or_else(|| {
            InjectError::InternalError(format!(
                "singleton instance for {token} is missing from the cache"
            ))
        })
    }

    /// Caches a singleton instance, replacing any previous instance.
    pub fn set_singleton(&self, token: InjectionToken, instance: DynSvc) {
        trace!(%token, "caching singleton instance");
        self.singletons.write().insert(token, instance);
    }

    /// Removes the cached singleton instance for the token.
    pub fn remove_singleton(&self, token: &InjectionToken) -> Option<DynSvc> {
        self.singletons.write().remove(token)
    }

    /// Whether an instance is cached for the token in the given request.
    #[must_use]
    pub fn has_request_scoped(
        &self,
        request: RequestId,
        token: &InjectionToken,
    ) -> bool {
        self.requests
            .read()
            .get(&request)
            .map_or(false, |cache| cache.contains_key(token))
    }

    /// Gets the instance cached for the token in the given request, if any.
    #[must_use]
    pub fn request_scoped(
        &self,
        request: RequestId,
        token: &InjectionToken,
    ) -> Option<DynSvc> {
        let instance = self
            .requests
            .read()
            .get(&request)
            .and_then(|cache| cache.get(token))
            .cloned();
        trace!(%token, %request, hit = instance.is_some(), "request cache lookup");
        instance
    }

    /// Gets the instance cached for the token in the given request.
    pub fn get_request_scoped_or_throw(
        &self,
        request: RequestId,
        token: &InjectionToken,
    ) -> InjectResult<DynSvc> {
        self.request_scoped(request, token).ok_or_else(|| {
            InjectError::InternalError(format!(
                "request-scoped instance for {token} is missing from the \
                 cache of {request}"
            ))
        })
    }

    /// Caches an instance for the token in the given request.
    pub fn set_request_scoped(
        &self,
        request: RequestId,
        token: InjectionToken,
        instance: DynSvc,
    ) {
        trace!(%token, %request, "caching request-scoped instance");
        self.requests
            .write()
            .entry(request)
            .or_default()
            .insert(token, instance);
    }

    /// Gets the request a request-scoped token is being resolved for.
    pub fn ensure_request_scope(
        &self,
        token: &InjectionToken,
        request: Option<RequestId>,
    ) -> InjectResult<RequestId> {
        request.ok_or_else(|| InjectError::RequestScopeUnavailable {
            token: token.clone(),
        })
    }

    /// Drops every instance cached for the request, here and in every
    /// adopted child manager.
    pub fn end_request(&self, request: RequestId) {
        if let Some(cache) = self.requests.write().remove(&request) {
            debug!(%request, evicted = cache.len(), "request scope ended");
        }

        let children: Vec<Arc<ScopeManager>> = {
            let mut children = self.children.write();
            children.retain(|child| child.strong_count() > 0);
            children.iter().filter_map(Weak::upgrade).collect()
        };
        for child in children {
            child.end_request(request);
        }
    }

    /// Makes a child manager follow this manager's request lifecycle. The
    /// child is held weakly.
    pub fn adopt(&self, child: &Arc<ScopeManager>) {
        self.children.write().push(Arc::downgrade(child));
    }

    /// Registers a hook on the host that evicts a request's instances when
    /// the request ends. The hook does not keep the manager alive.
    pub fn attach<H>(self: &Arc<Self>, host: &mut H)
    where
        H: RequestLifecycle + ?Sized,
    {
        let manager = Arc::downgrade(self);
        host.on_request_end(Box::new(move |request| {
            if let Some(manager) = manager.upgrade() {
                manager.end_request(request);
            }
        }));
    }

    /// Begins a request with a fresh id. The request ends when the returned
    /// guard is dropped.
    #[must_use]
    pub fn begin_request(self: &Arc<Self>) -> RequestScopeGuard {
        self.begin_request_with(RequestId::next())
    }

    /// Begins a request with a host-supplied id.
    #[must_use]
    pub fn begin_request_with(
        self: &Arc<Self>,
        request: RequestId,
    ) -> RequestScopeGuard {
        trace!(%request, "request scope started");
        RequestScopeGuard {
            request,
            manager: Arc::downgrade(self),
        }
    }

    /// Drops every cached singleton instance.
    pub fn clear_singletons(&self) {
        let mut singletons = self.singletons.write();
        debug!(evicted = singletons.len(), "clearing singleton instances");
        singletons.clear();
    }

    /// Drops every cached instance of every scope.
    pub fn reset(&self) {
        self.clear_singletons();
        self.requests.write().clear();
    }

    /// Number of requests with at least one cached instance.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }

    /// Number of cached singleton instances.
    #[must_use]
    pub fn singleton_count(&self) -> usize {
        self.singletons.read().len()
    }
}

impl Debug for ScopeManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeManager")
            .field("singletons", &self.singleton_count())
            .field("requests", &self.request_count())
            .finish()
    }
}

/// An active request. Dropping the guard evicts the request's cached
/// instances.
#[derive(Debug)]
pub struct RequestScopeGuard {
    request: RequestId,
    manager: Weak<ScopeManager>,
}

impl RequestScopeGuard {
    /// The id of this request.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.request
    }

    /// A resolution context bound to this request.
    #[must_use]
    pub fn context(&self) -> ResolveContext {
        ResolveContext::for_request(self.request)
    }

    /// Whether this guard belongs to the given scope manager.
    #[must_use]
    pub fn is_for(&self, manager: &Arc<ScopeManager>) -> bool {
        Weak::ptr_eq(&self.manager, &Arc::downgrade(manager))
    }
}

impl Drop for RequestScopeGuard {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.end_request(self.request);
        }
    }
}
