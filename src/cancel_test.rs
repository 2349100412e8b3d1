use std::thread;
use std::time::Duration;
use std::time::Instant;

use crate::CancellationToken;

#[test]
fn test_wait_timeout_elapses_without_cancel() {
    let token = CancellationToken::new();
    let start = Instant::now();

    assert!(!token.wait_timeout(Duration::from_millis(20)));
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn test_cancel_wakes_sleeper_early() {
    let token = CancellationToken::new();
    let sleeper = token.clone();

    let handle = thread::spawn(move || {
        let start = Instant::now();
        let cancelled = sleeper.wait_timeout(Duration::from_secs(30));
        (cancelled, start.elapsed())
    });

    thread::sleep(Duration::from_millis(20));
    token.cancel();

    let (cancelled, elapsed) = handle.join().unwrap();
    assert!(cancelled);
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn test_cancel_is_idempotent_and_shared_by_clones() {
    let token = CancellationToken::new();
    let clone = token.clone();

    token.cancel();
    token.cancel();

    assert!(clone.is_cancelled());
    assert!(clone.wait_timeout(Duration::ZERO));
}
