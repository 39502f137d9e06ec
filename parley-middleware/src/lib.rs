#![deny(missing_docs)]
//! Middleware chain for parley turns.
//!
//! A [`MiddlewareSet`] holds handlers in registration order and wraps them
//! around a [`Bot`](parley_core::Bot). Code a handler runs before calling
//! [`Next::run`] executes on the way in, in registration order; code after
//! it executes on the way out, in reverse order. Not calling `next`
//! short-circuits the rest of the chain, bot included.
//!
//! Built-in middleware:
//! - [`ShowTypingMiddleware`]: periodic typing indicator while the turn runs
//! - [`TracingMiddleware`]: structured `tracing` events for inbound and
//!   outbound traffic

pub mod middleware;
pub mod set;
pub mod tracing_middleware;
pub mod typing;

pub use middleware::{Middleware, Next, middleware_fn};
pub use set::MiddlewareSet;
pub use tracing_middleware::TracingMiddleware;
pub use typing::{ShowTypingMiddleware, TypingSettings};
