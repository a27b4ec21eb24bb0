use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::trace;

use super::{render, Channel, Kind, PutError, Selectable, Value};
use crate::error::ChannelError;
use crate::task;

/// The distinguished sentinel value a [`TimeoutChannel`] yields once its
/// deadline elapses. Comparable and cheap to copy, so it never gets
/// confused with `None`/`∅` the way a nullable payload type might.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timeout;

/// A single-slot, one-shot channel. `put` and `clear` are unsupported;
/// a background task armed at construction (via [`task::spawn_detached`],
/// so it rides along with the rest of golite's task bookkeeping rather
/// than a bare unmanaged thread) sleeps for the configured duration, then
/// enqueues [`Timeout`] and closes the channel.
pub struct TimeoutChannel {
    slot: Mutex<Option<Timeout>>,
    condvar: Condvar,
    open: AtomicBool,
    preferred: AtomicBool,
    deadline: Instant,
}

/// Creates a [`TimeoutChannel`] that fires after `duration`.
///
/// # Examples
///
/// ```
/// use golite::channel::{timeout_channel, Channel};
/// use std::time::Duration;
///
/// let t = timeout_channel(Duration::from_millis(10));
/// assert_eq!(t.take(), Some(golite::channel::Timeout));
/// ```
pub fn timeout_channel(duration: Duration) -> Arc<TimeoutChannel> {
    let chan = Arc::new(TimeoutChannel {
        slot: Mutex::new(None),
        condvar: Condvar::new(),
        open: AtomicBool::new(true),
        // Timeout channels are born preferred (§3) so a deadline racing
        // regular data sources doesn't need to win a uniform coin flip
        // against them.
        preferred: AtomicBool::new(true),
        deadline: Instant::now() + duration,
    });

    let bg = chan.clone();
    task::spawn_detached(move || {
        thread::sleep(duration);
        let mut slot = bg.slot.lock().unwrap();
        *slot = Some(Timeout);
        bg.open.store(false, Ordering::Release);
        bg.condvar.notify_all();
        trace!("timeout channel fired after {:?}", duration);
    });

    chan
}

impl Selectable for TimeoutChannel {
    fn kind(&self) -> Kind {
        Kind::Timeout
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

impl Channel<Timeout> for TimeoutChannel {
    fn put(&self, value: Timeout) -> Result<(), PutError<Timeout>> {
        Err(PutError::Unsupported(value))
    }

    fn take(&self) -> Option<Timeout> {
        let mut slot = self.slot.lock().unwrap();
        loop {
            if let Some(v) = slot.take() {
                return Some(v);
            }
            if !self.open.load(Ordering::Acquire) {
                return None;
            }
            let remaining = self.deadline.saturating_duration_since(Instant::now());
            let (guard, _) = self
                .condvar
                .wait_timeout(slot, remaining + Duration::from_millis(1))
                .unwrap();
            slot = guard;
        }
    }

    fn poll(&self) -> Option<Timeout> {
        self.slot.lock().unwrap().take()
    }

    fn peek(&self) -> Option<Timeout> {
        *self.slot.lock().unwrap()
    }

    fn size(&self) -> usize {
        if self.slot.lock().unwrap().is_some() {
            1
        } else {
            0
        }
    }

    fn clear(&self) -> Result<(), ChannelError> {
        Err(ChannelError::Unsupported("clear on timeout channel"))
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
        let _slot = self.slot.lock().unwrap();
        self.condvar.notify_all();
    }

    fn snapshot(&self) -> Vec<Timeout> {
        let current: Option<Timeout> = *self.slot.lock().unwrap();
        current.into_iter().collect()
    }

    fn drain(&self) -> Vec<Timeout> {
        self.poll().into_iter().collect()
    }
}

impl fmt::Display for TimeoutChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = Channel::snapshot(self);
        write!(f, "{}", render(&values, self.closed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_duration() {
        let chan = timeout_channel(Duration::from_millis(20));
        assert_eq!(chan.peek(), None);
        let start = Instant::now();
        assert_eq!(chan.take(), Some(Timeout));
        assert!(start.elapsed() >= Duration::from_millis(15));
        assert!(chan.closed());
        assert_eq!(chan.take(), None);
    }

    #[test]
    fn born_preferred() {
        let chan = timeout_channel(Duration::from_millis(20));
        assert!(chan.preferred());
        chan.unprefer();
        assert!(!chan.preferred());
    }

    #[test]
    fn put_and_clear_are_unsupported() {
        let chan = timeout_channel(Duration::from_secs(10));
        assert!(Channel::put(&*chan, Timeout).is_err());
        assert!(chan.clear().is_err());
    }
}
