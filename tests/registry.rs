use std::sync::Arc;
use std::time::Duration;

use nonzero_ext::nonzero;
use turnstile::clock::FakeRelativeClock;
use turnstile::{CancelToken, LimiterRegistry, Quota};

#[test]
fn concurrent_first_access_yields_one_instance() {
    let registry = LimiterRegistry::new();
    let quota = Quota::per_second(nonzero!(5u32));

    let limiters: Vec<_> = crossbeam::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|_| registry.get("racy.example", quota)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(1, registry.len());
    for limiter in &limiters[1..] {
        assert!(Arc::ptr_eq(&limiters[0], limiter));
    }
}

#[test]
fn budget_is_shared_per_key_not_per_caller() {
    let clock = FakeRelativeClock::default();
    let registry = LimiterRegistry::with_clock(clock);
    let quota = Quota::per_second(nonzero!(2u32));

    // Two independently-obtained handles to the same host:
    let client_x = registry.get("shared.example", quota);
    let client_y = registry.get("shared.example", quota);

    assert!(client_x.try_acquire().is_ok());
    assert!(client_x.try_acquire().is_ok());

    // The other handle finds the budget already spent.
    assert!(client_y.try_acquire().is_err());
    assert_eq!(2, client_y.outstanding());
}

#[test]
fn blocked_caller_proceeds_when_another_client_releases() {
    let registry = Arc::new(LimiterRegistry::new());
    let quota = Quota::new(nonzero!(1u32), Duration::from_secs(30)).unwrap();

    let client_x = registry.get("slow.example", quota);
    let receipt = client_x.acquire(&CancelToken::new()).unwrap();

    let handle = {
        let registry = Arc::clone(&registry);
        std::thread::spawn(move || {
            let client_y = registry.get("slow.example", quota);
            client_y.acquire(&CancelToken::new())
        })
    };

    std::thread::sleep(Duration::from_millis(100));
    client_x.release(receipt);
    assert!(handle.join().unwrap().is_ok());
}

/// Known limitation, preserved deliberately: the first quota to create
/// a key's limiter fixes its parameters, and later differing quotas
/// for the same key are silently ignored.
#[test]
fn first_quota_wins_per_key() {
    let clock = FakeRelativeClock::default();
    let registry = LimiterRegistry::with_clock(clock);

    let strict = Quota::per_second(nonzero!(1u32));
    let generous = Quota::per_second(nonzero!(100u32));

    let first = registry.get("contested.example", strict);
    let second = registry.get("contested.example", generous);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(strict, second.quota());

    // The generously-configured caller is still held to 1 per second.
    assert!(second.try_acquire().is_ok());
    assert!(second.try_acquire().is_err());
}
