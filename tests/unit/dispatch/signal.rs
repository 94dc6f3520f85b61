use std::sync::Arc;
use std::thread;

use super::*;

#[test]
fn request_bumps_generation() {
    let s = DispatchSignal::new();
    assert_eq!(s.generation(), 0);
    s.request();
    s.request();
    assert_eq!(s.generation(), 2);
}

#[test]
fn earlier_request_is_not_lost() {
    let s = DispatchSignal::new();
    let seen = s.generation();
    s.request();
    assert!(s.wait_for(seen, Duration::from_millis(1)));
}

#[test]
fn wait_times_out_without_request() {
    let s = DispatchSignal::new();
    let start = Instant::now();
    assert!(!s.wait_for(s.generation(), Duration::from_millis(10)));
    assert!(start.elapsed() >= Duration::from_millis(10));
}

#[test]
fn wakes_on_request_from_another_thread() {
    let s = Arc::new(DispatchSignal::new());
    let seen = s.generation();
    let t = {
        let s = Arc::clone(&s);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            s.request();
        })
    };
    assert!(s.wait_for(seen, Duration::from_secs(5)));
    t.join().unwrap();
}
