//! Delivering the result of an awaitable, or a plain value, to a callback.

use std::cell::OnceCell;
use std::convert::Infallible;
use std::fmt;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use metrics::counter;
use tracing::{debug, trace};

use crate::error::{BridgeError, ContextError};
use crate::runtime::{Runtime, RuntimeConfig, yield_now};

/// A value handed to a bridge call.
///
/// Whether the callback fires inline or only after the runtime has driven a
/// future to completion is decided by the variant, see [`Input::is_awaitable`].
pub enum Input<'a, T, E = Infallible> {
    /// Already available; delivered without touching any runtime.
    Plain(T),
    /// A deferred computation producing `T` or failing with `E`.
    Awaitable(LocalBoxFuture<'a, Result<T, E>>),
}

impl<'a, T, E> Input<'a, T, E> {
    pub fn plain(value: T) -> Self {
        Input::Plain(value)
    }

    /// Wraps a fallible future.
    pub fn awaitable<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T, E>> + 'a,
    {
        Input::Awaitable(fut.boxed_local())
    }

    pub fn is_awaitable(&self) -> bool {
        matches!(self, Input::Awaitable(_))
    }
}

impl<'a, T: 'a> Input<'a, T, Infallible> {
    /// A plain value whose bridge call can only fail for lack of a runtime.
    pub fn value(value: T) -> Self {
        Input::Plain(value)
    }

    /// Wraps a future that cannot fail.
    pub fn infallible<F>(fut: F) -> Self
    where
        F: Future<Output = T> + 'a,
    {
        Input::Awaitable(fut.map(Ok).boxed_local())
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Input<'_, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Input::Awaitable(_) => f.write_str("Awaitable(..)"),
        }
    }
}

/// Converts awaitables into synchronous callback invocations.
///
/// Owns the [`Runtime`] used for awaitable inputs. The runtime is built on
/// the first awaitable call, so a bridge that only ever sees plain values
/// never creates one.
#[derive(Debug, Default)]
pub struct Bridge {
    config: RuntimeConfig,
    runtime: OnceCell<Runtime>,
}

impl Bridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the runtime from `config` when it is first needed.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            config,
            runtime: OnceCell::new(),
        }
    }

    /// Uses an already constructed runtime.
    pub fn with_runtime(runtime: Runtime) -> Self {
        Self {
            config: runtime.config().clone(),
            runtime: OnceCell::from(runtime),
        }
    }

    /// Whether the runtime has been built yet.
    pub fn has_runtime(&self) -> bool {
        self.runtime.get().is_some()
    }

    /// Returns the owned runtime, building it on first use.
    pub fn runtime(&self) -> Result<&Runtime, ContextError> {
        if let Some(runtime) = self.runtime.get() {
            return Ok(runtime);
        }
        let runtime = Runtime::with_config(self.config.clone())?;
        Ok(self.runtime.get_or_init(|| runtime))
    }

    /// Delivers `input` to `callback`.
    ///
    /// A plain value is passed to `callback` before this returns, without
    /// blocking. An awaitable is driven to completion on the owned runtime,
    /// blocking the calling thread, and `callback` runs inside that same
    /// `block_on` with the produced value.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::Failed`] carrying the awaitable's own error.
    /// * [`BridgeError::ContextUnavailable`] if the runtime cannot be built or
    ///   the calling thread is already driving a runtime.
    ///
    /// `callback` is not invoked when an error is returned.
    pub fn call<T, E, C>(&self, input: Input<'_, T, E>, callback: C) -> Result<(), BridgeError<E>>
    where
        C: FnOnce(T),
    {
        self.deliver(input, callback)
    }

    /// Like [`Bridge::call`], but hands back whatever `callback` returns.
    pub fn deliver<T, E, R, C>(
        &self,
        input: Input<'_, T, E>,
        callback: C,
    ) -> Result<R, BridgeError<E>>
    where
        C: FnOnce(T) -> R,
    {
        let fut = match input {
            Input::Plain(value) => {
                counter!("coro_bridge_calls_total", "branch" => "plain").increment(1);
                trace!("plain value, invoking callback inline");
                return Ok(callback(value));
            }
            Input::Awaitable(fut) => fut,
        };

        counter!("coro_bridge_calls_total", "branch" => "awaitable").increment(1);
        let outcome = self.runtime().and_then(|runtime| {
            trace!(runtime = runtime.name(), "driving awaitable");
            runtime.block_on(async move {
                let value = fut.await?;
                Ok::<R, E>(callback(value))
            })
        });

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => {
                counter!("coro_bridge_failures_total", "kind" => "failed").increment(1);
                debug!("awaited computation failed");
                Err(BridgeError::Failed(err))
            }
            Err(err) => {
                counter!("coro_bridge_failures_total", "kind" => "context").increment(1);
                debug!(error = %err, "no scheduling context for awaitable");
                Err(err.into())
            }
        }
    }

    /// Runs a bridge call from inside some other async executor.
    ///
    /// The call itself still blocks the polling thread while an awaitable
    /// input is driven. The callback hands the value straight back, and the
    /// returned future gives the outer executor one turn before producing
    /// it. Plain inputs resolve to themselves.
    ///
    /// Polled from within [`Runtime::block_on`], an awaitable input resolves
    /// to [`ContextError::Reentrant`].
    pub async fn resolve<T, E>(&self, input: Input<'_, T, E>) -> Result<T, BridgeError<E>> {
        let value = self.deliver(input, |value| value)?;
        yield_now().await;
        Ok(value)
    }
}

/// Delivers `input` to `callback` using a fresh [`Bridge`].
///
/// See [`Bridge::call`].
pub fn bridge<T, E, C>(input: Input<'_, T, E>, callback: C) -> Result<(), BridgeError<E>>
where
    C: FnOnce(T),
{
    Bridge::new().call(input, callback)
}
