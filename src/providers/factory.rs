use crate::{DynSvc, InjectError, InjectResult, InjectionToken, Service, Svc};
use futures_util::future::{BoxFuture, FutureExt};
use std::{
    fmt::{Debug, Formatter},
    future::Future,
    sync::Arc,
};

/// Resolved dependencies handed to a constructor or factory, in declaration
/// order. Optional dependencies that could not be resolved are `None`.
pub struct Arguments {
    owner: InjectionToken,
    len: usize,
    values: std::vec::IntoIter<Option<DynSvc>>,
}

impl Arguments {
    /// Creates the argument list for constructing `owner`.
    #[must_use]
    pub fn new(owner: InjectionToken, values: Vec<Option<DynSvc>>) -> Self {
        Arguments {
            owner,
            len: values.len(),
            values: values.into_iter(),
        }
    }

    /// The token being constructed.
    #[must_use]
    pub fn owner(&self) -> &InjectionToken {
        &self.owner
    }

    /// Total number of arguments, including those already taken.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no arguments at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of arguments not yet taken.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    fn next_index(&self) -> usize {
        self.len - self.values.len()
    }

    /// Takes the next argument, which may be `None` if it was optional and
    /// could not be resolved.
    pub fn take_dyn(&mut self) -> InjectResult<Option<DynSvc>> {
        let index = self.next_index();
        self.values.next().ok_or_else(|| InjectError::InvalidProvider {
            token: self.owner.clone(),
            reason: format!(
                "argument {index} was requested but only {} were declared",
                self.len
            ),
        })
    }

    /// Takes the next argument as an optional service.
    pub fn take_optional<T: Service>(&mut self) -> InjectResult<Option<Svc<T>>> {
        let index = self.next_index();
        match self.take_dyn()? {
            None => Ok(None),
            Some(value) => value.downcast::<T>().map(Some).map_err(|_| {
                InjectError::InvalidProvider {
                    token: self.owner.clone(),
                    reason: format!(
                        "argument {index} is not a {}",
                        std::any::type_name::<T>()
                    ),
                }
            }),
        }
    }

    /// Takes the next argument, failing if it was left unresolved.
    pub fn take<T: Service>(&mut self) -> InjectResult<Svc<T>> {
        let index = self.next_index();
        self.take_optional()?
            .ok_or_else(|| InjectError::InvalidProvider {
                token: self.owner.clone(),
                reason: format!("argument {index} was not resolved"),
            })
    }
}

impl Debug for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arguments")
            .field("owner", &self.owner)
            .field("len", &self.len)
            .field("remaining", &self.values.len())
            .finish()
    }
}

/// The result of invoking a [`Factory`].
pub enum FactoryOutput {
    /// The factory completed synchronously.
    Ready(InjectResult<DynSvc>),
    /// The factory returned a future that must be awaited.
    Pending(BoxFuture<'static, InjectResult<DynSvc>>),
}

impl FactoryOutput {
    /// Whether the factory needs to be awaited.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, FactoryOutput::Pending(_))
    }
}

impl Debug for FactoryOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FactoryOutput::Ready(result) => {
                f.debug_tuple("Ready").field(&result.is_ok()).finish()
            }
            FactoryOutput::Pending(_) => f.write_str("Pending"),
        }
    }
}

type FactoryFn = dyn Fn(Arguments) -> FactoryOutput + Send + Sync;

/// A type-erased factory function. Factories receive the services named by
/// their provider's `inject` list.
#[derive(Clone)]
pub struct Factory {
    func: Arc<FactoryFn>,
}

impl Factory {
    /// Creates a factory from a function that decides per call whether to
    /// complete synchronously.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Arguments) -> FactoryOutput + Send + Sync + 'static,
    {
        Factory {
            func: Arc::new(func),
        }
    }

    /// Creates a factory that always completes synchronously.
    pub fn sync<F>(func: F) -> Self
    where
        F: Fn(&mut Arguments) -> InjectResult<DynSvc> + Send + Sync + 'static,
    {
        Factory::new(move |mut args| FactoryOutput::Ready(func(&mut args)))
    }

    /// Creates a factory that always returns a future.
    pub fn from_async<F, Fut>(func: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = InjectResult<DynSvc>> + Send + 'static,
    {
        Factory::new(move |args| FactoryOutput::Pending(func(args).boxed()))
    }

    /// Calls the factory.
    pub fn invoke(&self, args: Arguments) -> FactoryOutput {
        (self.func)(args)
    }
}

impl Debug for Factory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    fn args(values: Vec<Option<DynSvc>>) -> Arguments {
        Arguments::new(InjectionToken::from("OWNER"), values)
    }

    #[test]
    fn arguments_are_taken_in_order() {
        let mut args = args(vec![
            Some(Svc::new(1i32) as DynSvc),
            None,
            Some(Svc::new("three") as DynSvc),
        ]);

        assert_eq!(1, *args.take::<i32>().unwrap());
        assert!(args.take_optional::<u8>().unwrap().is_none());
        assert_eq!("three", *args.take::<&str>().unwrap());
        assert_eq!(0, args.remaining());
        assert_eq!(3, args.len());
    }

    #[test]
    fn wrong_argument_type_is_invalid_provider() {
        let mut args = args(vec![Some(Svc::new(1i32) as DynSvc)]);
        let error = args.take::<String>().unwrap_err();

        match error {
            InjectError::InvalidProvider { token, reason } => {
                assert_eq!(InjectionToken::from("OWNER"), token);
                assert!(reason.contains("argument 0"));
            }
            error => panic!("unexpected error: {error}"),
        }
    }

    #[test]
    fn taking_past_the_end_fails() {
        let mut args = args(Vec::new());
        assert!(args.is_empty());
        assert!(args.take_dyn().is_err());
    }

    #[test]
    fn sync_factories_are_ready() {
        let factory = Factory::sync(|_| Ok(Svc::new(5u8) as DynSvc));
        match factory.invoke(args(Vec::new())) {
            FactoryOutput::Ready(Ok(value)) => {
                assert_eq!(5, *value.downcast::<u8>().unwrap());
            }
            output => panic!("unexpected output: {output:?}"),
        }
    }

    #[test]
    fn async_factories_are_pending() {
        let factory =
            Factory::from_async(|_| async { Ok(Svc::new(6u8) as DynSvc) });
        let output = factory.invoke(args(Vec::new()));
        assert!(output.is_pending());

        let FactoryOutput::Pending(future) = output else {
            panic!("expected a pending output");
        };
        let value = future.now_or_never().unwrap().unwrap();
        assert_eq!(6, *value.downcast::<u8>().unwrap());
    }
}
