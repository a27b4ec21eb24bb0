use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use log::debug;

use super::{render, Channel, Kind, PutError, Selectable, Value};

struct Slot<T> {
    value: Option<T>,
    taken: bool,
}

/// A rendezvous channel: `put` blocks until a concurrent `take` (or a
/// `poll` that wins the race) accepts the value directly. There is no
/// internal buffering — a single-element handoff slot plays that role
/// only for the instant between a producer parking its value and a
/// consumer lifting it out, which is why `size()` is always `0`.
///
/// Modeled on the teacher's `Mutex` + `Condvar` blocking queue, split
/// into two condition variables (one for "a value is waiting", one for
/// "the value was taken") so `put` can genuinely block until handoff
/// completes rather than just until the slot has space.
pub struct SyncChannel<T> {
    open: AtomicBool,
    preferred: AtomicBool,
    state: Mutex<Slot<T>>,
    has_value: Condvar,
    was_taken: Condvar,
}

impl<T> SyncChannel<T> {
    pub fn new() -> Arc<SyncChannel<T>> {
        Arc::new(SyncChannel {
            open: AtomicBool::new(true),
            preferred: AtomicBool::new(false),
            state: Mutex::new(Slot {
                value: None,
                taken: false,
            }),
            has_value: Condvar::new(),
            was_taken: Condvar::new(),
        })
    }
}

impl<T: Clone + Send + 'static> Selectable for SyncChannel<T> {
    fn kind(&self) -> Kind {
        Kind::Sync
    }

    fn closed(&self) -> bool {
        !self.open.load(Ordering::Acquire)
    }

    fn preferred(&self) -> bool {
        self.preferred.load(Ordering::Acquire)
    }

    fn prefer(&self) {
        self.preferred.store(true, Ordering::Release);
    }

    fn unprefer(&self) {
        self.preferred.store(false, Ordering::Release);
    }

    fn probe_ready(&self) -> bool {
        Channel::peek(self).is_some()
    }

    fn poll_erased(&self) -> Option<Value> {
        Channel::poll(self).map(|v| Box::new(v) as Value)
    }
}

impl<T: Clone + Send + 'static> Channel<T> for SyncChannel<T> {
    fn put(&self, value: T) -> Result<(), PutError<T>> {
        let mut state = self.state.lock().unwrap();
        if !self.open.load(Ordering::Acquire) {
            return Err(PutError::Closed(value));
        }
        // Wait for any previous in-flight value to be taken: a Sync
        // channel holds exactly one value at a time.
        while state.value.is_some() && self.open.load(Ordering::Acquire) {
            state = self.has_value.wait(state).unwrap();
        }
        if !self.open.load(Ordering::Acquire) {
            return Err(PutError::Closed(value));
        }
        state.value = Some(value);
        state.taken = false;
        self.has_value.notify_all();
        // Block until a consumer actually lifts the value out.
        while !state.taken && self.open.load(Ordering::Acquire) {
            state = self.was_taken.wait(state).unwrap();
        }
        if state.taken {
            Ok(())
        } else {
            // Closed mid-handoff with nobody having taken the value.
            let leftover = state.value.take();
            match leftover {
                Some(v) => Err(PutError::Closed(v)),
                None => Ok(()),
            }
        }
    }

    fn take(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(v) = state.value.take() {
                state.taken = true;
                self.was_taken.notify_all();
                self.has_value.notify_all();
                return Some(v);
            }
            if !self.open.load(Ordering::Acquire) {
                return None;
            }
            state = self.has_value.wait(state).unwrap();
        }
    }

    fn poll(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        let v = state.value.take()?;
        state.taken = true;
        self.was_taken.notify_all();
        self.has_value.notify_all();
        Some(v)
    }

    fn peek(&self) -> Option<T> {
        let state = self.state.lock().unwrap();
        state.value.clone()
    }

    fn size(&self) -> usize {
        0
    }

    fn clear(&self) -> Result<(), crate::error::ChannelError> {
        let mut state = self.state.lock().unwrap();
        if state.value.take().is_some() {
            state.taken = true;
            self.was_taken.notify_all();
        }
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
        let _state = self.state.lock().unwrap();
        self.has_value.notify_all();
        self.was_taken.notify_all();
        debug!("sync channel closed");
    }

    fn snapshot(&self) -> Vec<T> {
        let state = self.state.lock().unwrap();
        state.value.clone().into_iter().collect()
    }

    fn drain(&self) -> Vec<T> {
        let mut state = self.state.lock().unwrap();
        match state.value.take() {
            Some(v) => {
                state.taken = true;
                self.was_taken.notify_all();
                vec![v]
            }
            None => Vec::new(),
        }
    }
}

impl<T: Clone + Send + 'static + fmt::Debug> fmt::Display for SyncChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = Channel::snapshot(self);
        write!(f, "{}", render(&values, self.closed()))
    }
}
