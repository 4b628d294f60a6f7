//! Callback type and constructors.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::spec::HookSpec;
use crate::error::CallbackResult;

/// The future a callback returns.
pub type CallbackFuture<T> = BoxFuture<'static, CallbackResult<T>>;

type CallbackFn<H> = dyn Fn(<H as HookSpec>::Args) -> CallbackFuture<<H as HookSpec>::Output>
    + Send
    + Sync;

/// A callback bound to hook category `H`.
///
/// Takes its own copy of the arguments and returns a boxed `Send` future, so
/// the dispatcher can await it from any runtime thread. Cloning shares the
/// underlying closure.
pub struct Callback<H: HookSpec> {
    inner: Arc<CallbackFn<H>>,
}

impl<H: HookSpec> Callback<H> {
    /// Wrap an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(H::Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult<H::Output>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |args: H::Args| -> CallbackFuture<H::Output> {
                Box::pin(f(args))
            }),
        }
    }

    /// Wrap a synchronous closure; the returned future is already resolved.
    pub fn from_sync<F>(f: F) -> Self
    where
        F: Fn(H::Args) -> CallbackResult<H::Output> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |args: H::Args| -> CallbackFuture<H::Output> {
                Box::pin(std::future::ready(f(args)))
            }),
        }
    }

    /// Invoke the callback. Panics raised before the future is returned
    /// propagate to the caller.
    pub fn call(&self, args: H::Args) -> CallbackFuture<H::Output> {
        (self.inner)(args)
    }
}

impl<H: HookSpec> Clone for Callback<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: HookSpec> fmt::Debug for Callback<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("category", &H::CATEGORY)
            .finish_non_exhaustive()
    }
}

/// Wrap an async closure into a [`Callback`].
pub fn callback<H, F, Fut>(f: F) -> Callback<H>
where
    H: HookSpec,
    F: Fn(H::Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallbackResult<H::Output>> + Send + 'static,
{
    Callback::new(f)
}

/// Wrap a synchronous closure into a [`Callback`].
pub fn sync_callback<H, F>(f: F) -> Callback<H>
where
    H: HookSpec,
    F: Fn(H::Args) -> CallbackResult<H::Output> + Send + Sync + 'static,
{
    Callback::from_sync(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::spec::{IsUserExpired, UserMayCreateRoom};
    use homestead_core::UserId;

    fn alice() -> UserId {
        UserId::new("@alice:example.org").unwrap()
    }

    #[tokio::test]
    async fn test_async_callback() {
        let cb = callback::<UserMayCreateRoom, _, _>(|user: UserId| async move {
            Ok(user.server_name() == "example.org")
        });
        assert_eq!(cb.call(alice()).await, Ok(true));
    }

    #[tokio::test]
    async fn test_sync_callback() {
        let cb = sync_callback::<IsUserExpired, _>(|_user| Ok(Some(true)));
        let shared = cb.clone();
        assert_eq!(shared.call(alice()).await, Ok(Some(true)));
    }
}
