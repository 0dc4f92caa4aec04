//! Reconnection strategies as a feed owner consults them
//!
//! The manager never reconnects by itself; these tests walk the schedules an
//! owner sees after consecutive closes.

use hypersockets::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
use std::time::Duration;

/// Delays handed out until the strategy gives up (bounded by `limit`)
fn schedule(strategy: &dyn ReconnectionStrategy, limit: usize) -> Vec<u128> {
    (0..limit)
        .map_while(|attempt| strategy.next_delay(attempt))
        .map(|d| d.as_millis())
        .collect()
}

#[test]
fn test_backoff_doubles_until_budget_is_spent() {
    let strategy = ExponentialBackoff::new(Duration::from_millis(250), Duration::from_secs(60), Some(4));

    assert_eq!(schedule(&strategy, 20), vec![250, 500, 1000, 2000]);
}

#[test]
fn test_backoff_caps_at_max_delay() {
    let strategy = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(30), None);

    let delays = schedule(&strategy, 8);
    assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000, 30000, 30000]);
}

#[test]
fn test_backoff_survives_huge_attempt_numbers() {
    let strategy = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_secs(5), None);

    for attempt in [31, 32, 64, usize::MAX] {
        assert_eq!(strategy.next_delay(attempt), Some(Duration::from_secs(5)));
    }
}

#[test]
fn test_fixed_delay_budget() {
    let limited = FixedDelay::new(Duration::from_millis(300), Some(2));
    assert_eq!(schedule(&limited, 10), vec![300, 300]);

    let unlimited = FixedDelay::new(Duration::from_millis(300), None);
    assert_eq!(schedule(&unlimited, 50).len(), 50);
}

#[test]
fn test_never_reconnect_gives_no_delay() {
    assert!(schedule(&NeverReconnect, 10).is_empty());
    assert_eq!(NeverReconnect.next_delay(usize::MAX), None);
}

#[test]
fn test_strategies_behind_a_box() {
    let strategies: Vec<Box<dyn ReconnectionStrategy>> = vec![
        Box::new(NeverReconnect),
        Box::new(FixedDelay::new(Duration::from_millis(50), Some(1))),
        Box::new(ExponentialBackoff::new(
            Duration::from_millis(50),
            Duration::from_millis(80),
            Some(3),
        )),
    ];

    let summary: Vec<(&str, Vec<u128>)> = strategies
        .iter()
        .map(|s| (s.name(), schedule(s.as_ref(), 10)))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("never", vec![]),
            ("fixed", vec![50]),
            ("exponential", vec![50, 80, 80]),
        ]
    );

    // No internal state: the same attempt always maps to the same delay
    for strategy in &strategies {
        assert_eq!(strategy.next_delay(0), strategy.next_delay(0));
    }
}
