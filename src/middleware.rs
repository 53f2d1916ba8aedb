//! The admission middleware: the integration point between configured
//! policies and the outbound request path.
//!
//! A transport calls [`AdmissionControl::admit`] once per outgoing
//! request, before touching the network. The call classifies the
//! request against the configured policies, blocks on every matching
//! limiter in turn, and hands back an [`Admission`]. If the response
//! later turns out not to have consumed network capacity (a local
//! cache hit), the transport calls
//! [`Admission::return_credit`] to give the permits back. Layers above
//! the transport never see any of this; a throttled request just
//! appears to take longer.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;
use url::Url;

use crate::cancel::CancelToken;
use crate::clock::{Clock, DefaultClock};
use crate::errors::Cancelled;
use crate::policy::{routing_key, Policy};
use crate::registry::LimiterRegistry;
use crate::window::{Receipt, SlidingWindow};

struct Grant<C: Clock> {
    limiter: Arc<SlidingWindow<C>>,
    receipt: Receipt,
}

/// The outcome of a positive admission decision.
///
/// Holds one receipt per policy that matched the request. Dropping an
/// admission is the common case (the request consumed real network
/// capacity, the permits stay spent); calling
/// [`return_credit`][`Admission::return_credit`] is the cache-hit
/// case.
pub struct Admission<C: Clock = DefaultClock> {
    grants: SmallVec<[Grant<C>; 2]>,
}

impl<C: Clock> Admission<C> {
    /// Whether any policy governed this request. Ungoverned requests
    /// receive an empty admission and proceed immediately.
    pub fn is_governed(&self) -> bool {
        !self.grants.is_empty()
    }

    /// The number of policy limiters this admission drew from.
    pub fn grants(&self) -> usize {
        self.grants.len()
    }

    /// Returns every held permit, freeing slots sooner than the window
    /// would naturally vacate them.
    ///
    /// Call this when the response was served without a network round
    /// trip, so a cache hit does not count against the destination's
    /// budget.
    pub fn return_credit(self) {
        for grant in &self.grants {
            grant.limiter.release(grant.receipt);
        }
        if !self.grants.is_empty() {
            trace!(grants = self.grants.len(), "returned admission credits");
        }
    }
}

impl<C: Clock> fmt::Debug for Admission<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Admission")
            .field("grants", &self.grants.len())
            .finish()
    }
}

/// Per-client admission control over a shared limiter registry.
///
/// Each HTTP client constructs one `AdmissionControl` carrying its own
/// policy list, but all of them share the registry - so independently
/// configured clients that route to the same host draw from one
/// budget.
///
/// ```rust
/// # use std::sync::Arc;
/// # use turnstile::{AdmissionControl, CancelToken, LimiterRegistry, Policy, Quota};
/// # use nonzero_ext::nonzero;
/// # use url::Url;
/// let registry = Arc::new(LimiterRegistry::new());
/// let control = AdmissionControl::new(Arc::clone(&registry))
///     .with_policy(Policy::for_host("api.example.com", Quota::per_second(nonzero!(4u32))));
///
/// let url = Url::parse("https://api.example.com/v1/items").unwrap();
/// let admission = control.admit(&url, &CancelToken::new()).unwrap();
/// assert!(admission.is_governed());
/// // ... perform the request; if it was a cache hit:
/// admission.return_credit();
/// ```
pub struct AdmissionControl<C: Clock = DefaultClock> {
    registry: Arc<LimiterRegistry<C>>,
    policies: Vec<Policy>,
}

impl<C: Clock> AdmissionControl<C> {
    /// Constructs admission control with no policies over the given
    /// registry. Until policies are attached, every request is
    /// ungoverned.
    pub fn new(registry: Arc<LimiterRegistry<C>>) -> Self {
        AdmissionControl {
            registry,
            policies: Vec::new(),
        }
    }

    /// Attaches a policy. Policies are consulted in attachment order;
    /// a request matching several must be admitted by each of them.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }

    /// The attached policies, in consultation order.
    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    /// The registry this control resolves limiters through.
    pub fn registry(&self) -> &Arc<LimiterRegistry<C>> {
        &self.registry
    }

    /// Gates one outgoing request.
    ///
    /// Blocks until every matching policy's limiter admits the
    /// request, acquiring them sequentially in policy order. If the
    /// token fires while any acquisition is waiting, permits already
    /// granted for this request are returned and the whole admission
    /// fails with [`Cancelled`].
    pub fn admit(&self, url: &Url, token: &CancelToken) -> Result<Admission<C>, Cancelled> {
        let mut grants: SmallVec<[Grant<C>; 2]> = SmallVec::new();
        let host = match routing_key(url) {
            Some(host) => host,
            None => return Ok(Admission { grants }),
        };
        for policy in self.policies.iter().filter(|p| p.applies_to(url)) {
            let limiter = self.registry.get(host, policy.quota());
            match limiter.acquire(token) {
                Ok(receipt) => grants.push(Grant { limiter, receipt }),
                Err(cancelled) => {
                    for grant in &grants {
                        grant.limiter.release(grant.receipt);
                    }
                    return Err(cancelled);
                }
            }
        }
        if !grants.is_empty() {
            trace!(host, grants = grants.len(), "request admitted");
        }
        Ok(Admission { grants })
    }
}

impl<C: Clock> fmt::Debug for AdmissionControl<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionControl")
            .field("policies", &self.policies)
            .field("registry", &self.registry)
            .finish()
    }
}
