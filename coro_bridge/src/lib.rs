//! Bridges awaitable computations to callback-style consumers.
//!
//! A bridge call takes an [`Input`] that is either a plain value or an
//! awaitable and invokes a callback exactly once with the result:
//!
//! - [`bridge`]: delivers an input using a fresh [`Bridge`]
//! - [`Bridge`]: owns the [`Runtime`] that drives awaitables, built on first use
//! - [`runtime`]: the single-threaded scheduling context and [`yield_now`]
//! - [`error`]: [`BridgeError`] and [`ContextError`]
//!
//! ```
//! use coro_bridge::{Bridge, Input};
//!
//! let bridge = Bridge::new();
//! let mut seen = Vec::new();
//! bridge.call(Input::value(42), |v| seen.push(v)).unwrap();
//! bridge.call(Input::infallible(async { 7 }), |v| seen.push(v)).unwrap();
//! assert_eq!(seen, [42, 7]);
//! ```

pub mod bridge;
pub mod error;
pub mod runtime;
mod waker;

pub use bridge::{Bridge, Input, bridge};
pub use error::{BridgeError, ContextError};
pub use runtime::{Runtime, RuntimeConfig, YieldNow, yield_now};

pub use coro_bridge_macros::{main, test};
