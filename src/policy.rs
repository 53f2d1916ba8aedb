//! Throttling policies and the request classifier.
//!
//! A [`Policy`] binds a [`Quota`] to the set of requests it governs.
//! Classification answers two questions per outgoing request: which
//! policies apply, and which routing key selects the limiter. The
//! routing key is always the destination host, for every scope - two
//! policies with different predicates that resolve to the same host
//! share one limiter. Hosts needing independently-tracked sub-budgets
//! are not expressible; see the crate docs.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::Quota;

/// A predicate deciding whether a policy governs a given request URL.
pub type Predicate = Arc<dyn Fn(&Url) -> bool + Send + Sync>;

/// Which requests a [`Policy`] applies to.
#[derive(Clone)]
pub enum Scope {
    /// Applies to every request.
    Global,
    /// Applies to requests whose destination host equals this host.
    Host(String),
    /// Applies to requests whose URL satisfies the predicate.
    Matching(Predicate),
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "Global"),
            Scope::Host(host) => f.debug_tuple("Host").field(host).finish(),
            Scope::Matching(_) => write!(f, "Matching(..)"),
        }
    }
}

/// One throttling rule: a quota plus the scope of requests it governs.
///
/// Policies are immutable once constructed. Several policies may be
/// attached to one client, and the same host may be named by policies
/// on several clients; all of them meter through the limiter registered
/// under that host.
///
/// ```rust
/// # use turnstile::{Policy, Quota};
/// # use nonzero_ext::nonzero;
/// # use url::Url;
/// let covers = Policy::for_host("api.example.com", Quota::per_minute(nonzero!(30u32)));
/// let url = Url::parse("https://api.example.com/v1/items").unwrap();
/// assert!(covers.applies_to(&url));
/// let elsewhere = Url::parse("https://cdn.example.com/a.jpg").unwrap();
/// assert!(!covers.applies_to(&elsewhere));
/// ```
#[derive(Debug, Clone)]
pub struct Policy {
    quota: Quota,
    scope: Scope,
}

impl Policy {
    /// A policy that unconditionally governs every request.
    pub fn global(quota: Quota) -> Policy {
        Policy {
            quota,
            scope: Scope::Global,
        }
    }

    /// A policy governing requests to exactly the given host.
    ///
    /// Matching is case-insensitive; parsed URLs carry their host
    /// lowercased already.
    pub fn for_host(host: impl Into<String>, quota: Quota) -> Policy {
        Policy {
            quota,
            scope: Scope::Host(host.into().to_ascii_lowercase()),
        }
    }

    /// A policy governing requests whose URL satisfies `predicate`.
    pub fn matching<F>(predicate: F, quota: Quota) -> Policy
    where
        F: Fn(&Url) -> bool + Send + Sync + 'static,
    {
        Policy {
            quota,
            scope: Scope::Matching(Arc::new(predicate)),
        }
    }

    /// The quota enforced on requests this policy governs.
    pub fn quota(&self) -> Quota {
        self.quota
    }

    /// The scope of requests this policy governs.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Whether this policy governs a request to `url`.
    pub fn applies_to(&self, url: &Url) -> bool {
        match &self.scope {
            Scope::Global => true,
            Scope::Host(host) => url.host_str() == Some(host.as_str()),
            Scope::Matching(predicate) => predicate(url),
        }
    }
}

/// The routing key governing a request: its destination host.
///
/// URLs without a host (`data:`, `mailto:`, ...) have no routing key
/// and are never rate-limited.
pub fn routing_key(url: &Url) -> Option<&str> {
    url.host_str()
}
