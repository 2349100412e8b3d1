use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use crate::ConfigHolder;
use crate::ConfigState;
use crate::ConfigUpdate;
use crate::ConfigValue;

fn update(
    generation: u64,
    text: &str,
) -> ConfigUpdate {
    let value = ConfigValue::from_text(text);
    let md5 = value.md5();
    ConfigUpdate::new(value, ConfigState::new(generation, md5), true)
}

#[test]
fn test_put_then_take() {
    let holder = ConfigHolder::new();
    assert!(!holder.poll());

    holder.put(update(1, "a 1"));
    assert!(holder.poll());

    let taken = holder.take().expect("update should be pending");
    assert_eq!(taken.generation(), 1);
    assert!(!holder.poll());
    assert!(holder.take().is_none());
}

#[test]
fn test_put_overwrites_unconsumed_update() {
    let holder = ConfigHolder::new();
    holder.put(update(1, "a 1"));
    holder.put(update(2, "a 2"));

    let taken = holder.take().unwrap();
    assert_eq!(taken.generation(), 2);
    assert!(holder.take().is_none());
}

#[test]
fn test_wait_returns_immediately_when_pending() {
    let holder = ConfigHolder::new();
    holder.put(update(0, "a 1"));

    let start = Instant::now();
    assert!(holder.wait(Duration::from_secs(10)));
    assert!(start.elapsed() < Duration::from_secs(1));
    // wait does not consume
    assert!(holder.poll());
}

#[test]
fn test_wait_times_out_without_update() {
    let holder = ConfigHolder::new();
    let start = Instant::now();

    assert!(!holder.wait(Duration::from_millis(30)));
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_wait_wakes_on_put_from_other_thread() {
    let holder = Arc::new(ConfigHolder::new());
    let writer = holder.clone();

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        writer.put(update(5, "a 5"));
    });

    assert!(holder.wait(Duration::from_secs(10)));
    assert_eq!(holder.take().unwrap().generation(), 5);
    handle.join().unwrap();
}

#[test]
fn test_cancel_unblocks_waiter_promptly() {
    let holder = Arc::new(ConfigHolder::new());
    let waiter = holder.clone();

    let handle = thread::spawn(move || {
        let start = Instant::now();
        let available = waiter.wait(Duration::from_secs(30));
        (available, start.elapsed())
    });

    thread::sleep(Duration::from_millis(20));
    holder.cancel();

    let (available, elapsed) = handle.join().unwrap();
    assert!(!available);
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn test_put_after_cancel_is_ignored() {
    let holder = ConfigHolder::new();
    holder.put(update(1, "a 1"));
    holder.cancel();

    assert!(holder.is_cancelled());
    assert!(!holder.poll());

    holder.put(update(2, "a 2"));
    assert!(!holder.poll());
    assert!(holder.take().is_none());
    assert!(!holder.wait(Duration::from_millis(10)));
}

#[test]
fn test_cancel_also_cancels_token() {
    let holder = ConfigHolder::new();
    let token = holder.token();
    assert!(!token.is_cancelled());

    holder.cancel();
    assert!(token.is_cancelled());
}
