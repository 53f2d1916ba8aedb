//! A blocking, FIFO-fair, per-host sliding-window rate limiter for
//! outbound HTTP requests.
//!
//! `turnstile` throttles requests per destination host, enforced
//! globally across every independently-configured HTTP client in the
//! process: clients share a [`LimiterRegistry`], so two transports
//! that both route to `api.example.com` draw from one budget. The
//! limiter is a true sliding window - at most `permits` admissions
//! fall within *any* rolling `period`, with none of the burst
//! doubling that fixed windows allow at their boundaries.
//!
//! Admission blocks the calling thread and is strictly fair: callers
//! are admitted in the order their [`acquire`][`SlidingWindow::acquire`]
//! calls arrived, even when the window stays full across multiple
//! expiries. A waiting call can be aborted through its
//! [`CancelToken`]; a request that turns out to be answered from a
//! local cache can hand its permit back with
//! [`Admission::return_credit`] (or [`SlidingWindow::release`]).
//!
//! # Quickstart
//!
//! ```rust
//! use std::sync::Arc;
//! use nonzero_ext::nonzero;
//! use turnstile::{AdmissionControl, CancelToken, LimiterRegistry, Policy, Quota};
//! use url::Url;
//!
//! // One registry per process, shared by every client:
//! let registry = Arc::new(LimiterRegistry::new());
//!
//! // A client with a global cap plus a tighter per-host rule:
//! let control = AdmissionControl::new(Arc::clone(&registry))
//!     .with_policy(Policy::global(Quota::per_second(nonzero!(10u32))))
//!     .with_policy(Policy::for_host("img.example.com", Quota::per_second(nonzero!(2u32))));
//!
//! let url = Url::parse("https://img.example.com/cover.jpg").unwrap();
//! let token = CancelToken::new();
//!
//! // Blocks until every matching policy admits the request:
//! let admission = control.admit(&url, &token).unwrap();
//! assert!(admission.is_governed());
//!
//! // ... perform the request. If it never touched the network:
//! admission.return_credit();
//! ```
//!
//! # What this crate is not
//!
//! All state is in-process: there is no cross-process or cross-machine
//! coordination, no smoothing or burst shaping, and nothing persists
//! across restarts. The engine knows nothing about HTML, JSON, or what
//! the requests are for - only about host, capacity, window, and an
//! admission decision.
//!
//! # A known sharp edge
//!
//! A host's limiter is parameterized by whichever [`Quota`] first
//! causes its creation; later policies naming the same host with a
//! different quota silently reuse it. Likewise, the routing key is
//! always the destination host, so a host that needs
//! independently-tracked sub-budgets cannot express that today.

#![warn(missing_docs)]

pub mod clock;

mod cancel;
mod errors;
mod gate;
mod middleware;
mod nanos;
mod policy;
mod quota;
mod registry;
mod window;

pub use cancel::CancelToken;
pub use errors::{Cancelled, InvalidQuota};
pub use middleware::{Admission, AdmissionControl};
pub use nanos::Nanos;
pub use policy::{routing_key, Policy, Predicate, Scope};
pub use quota::Quota;
pub use registry::LimiterRegistry;
pub use window::{Receipt, SlidingWindow, Throttled};
