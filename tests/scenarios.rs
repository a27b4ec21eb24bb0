use std::sync::Arc;
use std::time::{Duration, Instant};

use golite::channel::{timeout_channel, BufferedChannel, Channel, Selectable, SyncChannel, Timeout};
use golite::{select, select_nowait, select_timeout, selectf, task, Value};

fn downcast<T: 'static>(v: Value) -> T {
    *v.downcast::<T>().unwrap_or_else(|_| panic!("wrong type out of select"))
}

/// S1 — a Sync channel delivers to a single consumer in send order.
#[test]
fn s1_sync_rendezvous_preserves_order() {
    let chan = SyncChannel::<&'static str>::new();
    let producer = {
        let chan = chan.clone();
        task::spawn(move || {
            chan.put("a").unwrap();
            chan.put("b").unwrap();
            Ok(())
        })
    };

    assert_eq!(chan.take(), Some("a"));
    assert_eq!(chan.take(), Some("b"));
    producer.join().unwrap();
}

/// S2 — a Buffered(2) channel accepts two puts without blocking, then
/// suspends a third until a take frees space, all in FIFO order.
#[test]
fn s2_buffered_capacity_and_order() {
    let chan = BufferedChannel::<i32>::new(2).unwrap();
    chan.put(1).unwrap();
    chan.put(2).unwrap();
    assert_eq!(chan.size(), 2);

    let producer = {
        let chan = chan.clone();
        task::spawn(move || {
            chan.put(3).unwrap();
            Ok(())
        })
    };

    // Give the third put a moment to genuinely block on capacity before
    // we drain: a tiny, non-essential timing nicety for the assertion
    // below, not a correctness requirement of the test itself.
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(chan.size(), 2);

    assert_eq!(chan.take(), Some(1));
    assert_eq!(chan.take(), Some(2));
    assert_eq!(chan.take(), Some(3));
    producer.join().unwrap();
}

/// S3 — select between an empty Buffered channel and a Timeout channel
/// returns the timeout sentinel until a value is put, after which the
/// buffered channel wins.
#[test]
fn s3_select_timeout_then_value() {
    let b = BufferedChannel::<&'static str>::new(1).unwrap();
    let t = timeout_channel(Duration::from_millis(50));

    let started = Instant::now();
    let cases: [&dyn Selectable; 2] = [&*b, &*t];
    let (idx, value) = select(&cases);
    assert_eq!(idx, 1);
    assert_eq!(downcast::<Timeout>(value), Timeout);
    assert!(started.elapsed() >= Duration::from_millis(45));

    let b2 = BufferedChannel::<&'static str>::new(1).unwrap();
    let t2 = timeout_channel(Duration::from_millis(200));
    b2.put("x").unwrap();
    let cases2: [&dyn Selectable; 2] = [&*b2, &*t2];
    let (idx2, value2) = select(&cases2);
    assert_eq!(idx2, 0);
    assert_eq!(downcast::<&'static str>(value2), "x");
}

/// S4 — a preferred channel dominates a non-preferred one whenever both
/// are ready, across many trials.
#[test]
fn s4_preference_dominance() {
    let a = SyncChannel::<&'static str>::new();
    let b = SyncChannel::<&'static str>::new();
    a.prefer();

    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let pa = {
        let a = a.clone();
        let stop = stop.clone();
        task::spawn(move || {
            while !stop.load(std::sync::atomic::Ordering::Acquire) {
                if a.put("A").is_err() {
                    break;
                }
            }
            Ok(())
        })
    };
    let pb = {
        let b = b.clone();
        let stop = stop.clone();
        task::spawn(move || {
            while !stop.load(std::sync::atomic::Ordering::Acquire) {
                if b.put("B").is_err() {
                    break;
                }
            }
            Ok(())
        })
    };

    for _ in 0..500 {
        let cases: [&dyn Selectable; 2] = [&*a, &*b];
        let (idx, value) = select(&cases);
        if idx == 0 {
            assert_eq!(downcast::<&'static str>(value), "A");
        }
    }

    stop.store(true, std::sync::atomic::Ordering::Release);
    a.close();
    b.close();
    pa.join().unwrap();
    pb.join().unwrap();
}

/// S5 — select-nowait returns the sentinel immediately on an empty
/// channel, then the value once another task delivers one.
#[test]
fn s5_select_nowait_completeness() {
    let c = BufferedChannel::<&'static str>::new(1).unwrap();
    let cases: [&dyn Selectable; 1] = [&*c];
    assert!(select_nowait(&cases).is_none());

    let producer = {
        let c = c.clone();
        task::spawn(move || {
            c.put("v").unwrap();
            Ok(())
        })
    };
    producer.join().unwrap();

    let (idx, value) = loop {
        if let Some(result) = select_nowait(&cases) {
            break result;
        }
        std::thread::sleep(Duration::from_millis(5));
    };
    assert_eq!(idx, 0);
    assert_eq!(downcast::<&'static str>(value), "v");
}

/// S6 — selectf dispatches to the handler paired with the chosen
/// channel, or runs the default when nothing was ready.
#[test]
fn s6_selectf_dispatch_identity() {
    let c = BufferedChannel::<i32>::new(1).unwrap();

    let empty_result = selectf(
        vec![golite::case(&*c, |v: i32| v * 2)],
        Some(Box::new(|| -1)),
    );
    assert_eq!(empty_result, -1);

    c.put(21).unwrap();
    let full_result = selectf(
        vec![golite::case(&*c, |v: i32| v * 2)],
        Some(Box::new(|| -1)),
    );
    assert_eq!(full_result, 42);
}

/// Property 4 — once closed, a channel never accepts another put, and
/// yields its remaining buffered values before returning `None`.
#[test]
fn close_monotonicity() {
    let chan = BufferedChannel::<i32>::new(4).unwrap();
    chan.put(1).unwrap();
    chan.put(2).unwrap();
    chan.close();

    assert!(chan.put(3).is_err());
    assert_eq!(chan.take(), Some(1));
    assert_eq!(chan.take(), Some(2));
    assert_eq!(chan.take(), None);
}

/// Property 3 — a Buffered channel's size never exceeds its capacity,
/// even with concurrent producers racing to fill it.
#[test]
fn capacity_bound_under_contention() {
    let chan = BufferedChannel::<i32>::new(3).unwrap();
    let producers: Vec<_> = (0..5)
        .map(|i| {
            let chan = chan.clone();
            task::spawn(move || {
                let _ = chan.put(i);
                Ok(())
            })
        })
        .collect();

    std::thread::sleep(Duration::from_millis(20));
    assert!(chan.size() <= 3);

    for _ in 0..5 {
        chan.take();
    }
    for p in producers {
        p.join().unwrap();
    }
}
