//! The scheduling context that drives awaitables to completion.
//!
//! A [`Runtime`] is a single-threaded, cooperative driver: [`Runtime::block_on`]
//! polls one future on the calling thread and parks that thread whenever the
//! future is pending. The runtime is an explicit handle owned by its caller;
//! the only thread-local state is a marker recording that the current thread
//! is inside a `block_on`, which is what makes nested calls detectable.

use std::cell::Cell;
use std::net::{Ipv4Addr, SocketAddr};
use std::pin::{Pin, pin};
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::thread;

use metrics::{counter, gauge};
use tracing::{debug_span, info, trace};

use crate::error::ContextError;
use crate::waker::{self, Unparker};

thread_local! {
    static IN_BLOCK_ON: Cell<bool> = const { Cell::new(false) };
}

/// Settings for a [`Runtime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Recorded on the `block_on` tracing span and in `Busy` errors.
    pub name: String,
    /// When set, a Prometheus exporter is installed listening on this address.
    pub metrics_addr: Option<SocketAddr>,
}

impl RuntimeConfig {
    pub const DEFAULT_NAME: &'static str = "coro_bridge";
    pub const DEFAULT_METRICS_PORT: u16 = 9000;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_metrics(mut self, addr: SocketAddr) -> Self {
        self.metrics_addr = Some(addr);
        self
    }

    /// Serves metrics on `127.0.0.1:9000`.
    pub fn with_default_metrics(self) -> Self {
        self.with_metrics(SocketAddr::from((
            Ipv4Addr::LOCALHOST,
            Self::DEFAULT_METRICS_PORT,
        )))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_owned(),
            metrics_addr: None,
        }
    }
}

/// A single-threaded scheduling context.
#[derive(Debug)]
pub struct Runtime {
    config: RuntimeConfig,
    /// Set while some thread is inside `block_on` on this runtime.
    running: AtomicBool,
}

impl Runtime {
    /// Creates a runtime with the default configuration.
    pub fn new() -> Result<Self, ContextError> {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates a runtime, installing the metrics exporter if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Metrics`] if the exporter cannot be installed,
    /// for instance because a global metrics recorder is already set.
    pub fn with_config(config: RuntimeConfig) -> Result<Self, ContextError> {
        if let Some(addr) = config.metrics_addr {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
                .map_err(|e| ContextError::Metrics(e.to_string()))?;
            info!(runtime = %config.name, "metrics enabled at http://{addr}/metrics");
        }

        Ok(Self {
            config,
            running: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Whether some thread is currently inside [`Runtime::block_on`].
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Blocks the current thread until `fut` completes and returns its output.
    ///
    /// The future is polled on the calling thread. While it is pending the
    /// thread parks, and the waker handed to the future unparks it again.
    ///
    /// # Errors
    ///
    /// * [`ContextError::Reentrant`] if the calling thread is already inside a
    ///   `block_on` of any runtime.
    /// * [`ContextError::Busy`] if another thread is driving this runtime.
    ///
    /// The future is dropped without being polled in both cases. A panic
    /// raised by the future unwinds out of this call and leaves the runtime
    /// usable.
    pub fn block_on<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        let _guard = self.enter()?;
        let span = debug_span!("block_on", runtime = %self.config.name);
        let _entered = span.enter();

        let mut future = pin!(fut);
        let unparker = Unparker::current();
        let waker = waker::unpark_waker(unparker.clone());
        let mut cx = Context::from_waker(&waker);

        loop {
            if !unparker.take_notification() {
                counter!("coro_bridge_parks_total").increment(1);
                thread::park();
                continue;
            }

            if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                trace!("future completed");
                return Ok(output);
            }
        }
    }

    /// Marks this runtime and the calling thread as busy until the guard drops.
    fn enter(&self) -> Result<EnterGuard<'_>, ContextError> {
        if in_context() {
            return Err(ContextError::Reentrant);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ContextError::Busy(self.config.name.clone()));
        }

        IN_BLOCK_ON.with(|flag| flag.set(true));
        gauge!("coro_bridge_block_on_active").increment(1.0);
        Ok(EnterGuard { runtime: self })
    }
}

/// Clears the busy markers, also when the driven future panics.
struct EnterGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for EnterGuard<'_> {
    fn drop(&mut self) {
        IN_BLOCK_ON.with(|flag| flag.set(false));
        self.runtime.running.store(false, Ordering::Release);
        gauge!("coro_bridge_block_on_active").decrement(1.0);
    }
}

/// Whether the current thread is inside a [`Runtime::block_on`].
pub fn in_context() -> bool {
    IN_BLOCK_ON.with(Cell::get)
}

/// Gives up one scheduling turn.
///
/// The returned future is pending on its first poll, waking itself
/// immediately, and ready on the next.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`].
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
