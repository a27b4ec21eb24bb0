use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use log::debug;

use super::{render, Channel, Kind, PutError, Selectable, Value};
use crate::error::ChannelError;

/// A bounded FIFO of fixed capacity. `put` blocks while the buffer is
/// full; `take` blocks while it is empty. Strict FIFO across all
/// producers and consumers, same as the teacher's `BlockQueue`
/// (`Mutex<VecDeque<T>>` + `Condvar`), generalized with a second
/// condition variable so producers waiting on space don't have to share
/// a wakeup with consumers waiting on data.
pub struct BufferedChannel<T> {
    open: AtomicBool,
    preferred: AtomicBool,
    capacity: usize,
    queue: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BufferedChannel<T> {
    pub fn new(capacity: usize) -> Result<Arc<BufferedChannel<T>>, ChannelError> {
        if capacity == 0 {
            return Err(ChannelError::InvalidArgument(
                "buffered channel capacity must be positive".into(),
            ));
        }
        Ok(Arc::new(BufferedChannel {
            open: AtomicBool::new(true),
            preferred: AtomicBool::new(false),
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone + Send + 'static> Selectable for BufferedChannel<T> {
    fn kind(&self) -> Kind {
        Kind::Buffered
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

impl<T: Clone + Send + 'static> Channel<T> for BufferedChannel<T> {
    fn put(&self, value: T) -> Result<(), PutError<T>> {
        let mut queue = self.queue.lock().unwrap();
        if !self.open.load(Ordering::Acquire) {
            return Err(PutError::Closed(value));
        }
        while queue.len() >= self.capacity && self.open.load(Ordering::Acquire) {
            queue = self.not_full.wait(queue).unwrap();
        }
        if !self.open.load(Ordering::Acquire) {
            return Err(PutError::Closed(value));
        }
        queue.push_back(value);
        self.not_empty.notify_one();
        Ok(())
    }

    fn take(&self) -> Option<T> {
        let mut queue = self.queue.lock().unwrap();
        loop {
            if let Some(v) = queue.pop_front() {
                self.not_full.notify_one();
                return Some(v);
            }
            if !self.open.load(Ordering::Acquire) {
                return None;
            }
            queue = self.not_empty.wait(queue).unwrap();
        }
    }

    fn poll(&self) -> Option<T> {
        let mut queue = self.queue.lock().unwrap();
        let v = queue.pop_front()?;
        self.not_full.notify_one();
        Some(v)
    }

    fn peek(&self) -> Option<T> {
        let queue = self.queue.lock().unwrap();
        queue.front().cloned()
    }

    fn size(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    fn clear(&self) -> Result<(), ChannelError> {
        let mut queue = self.queue.lock().unwrap();
        queue.clear();
        self.not_full.notify_all();
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
        let _queue = self.queue.lock().unwrap();
        self.not_empty.notify_all();
        self.not_full.notify_all();
        debug!("buffered channel closed (capacity {})", self.capacity);
    }

    fn snapshot(&self) -> Vec<T> {
        self.queue.lock().unwrap().iter().cloned().collect()
    }

    fn drain(&self) -> Vec<T> {
        let mut queue = self.queue.lock().unwrap();
        let drained: Vec<T> = queue.drain(..).collect();
        if !drained.is_empty() {
            self.not_full.notify_all();
        }
        drained
    }
}

impl<T: Clone + Send + 'static + fmt::Debug> fmt::Display for BufferedChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = Channel::snapshot(self);
        write!(f, "{}", render(&values, self.closed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_capacity() {
        assert!(BufferedChannel::<i32>::new(0).is_err());
    }

    #[test]
    fn fifo_order() {
        let chan = BufferedChannel::<i32>::new(4).unwrap();
        chan.put(1).unwrap();
        chan.put(2).unwrap();
        chan.put(3).unwrap();
        assert_eq!(chan.take(), Some(1));
        assert_eq!(chan.take(), Some(2));
        assert_eq!(chan.take(), Some(3));
    }

    #[test]
    fn peek_does_not_remove() {
        let chan = BufferedChannel::<i32>::new(2).unwrap();
        chan.put(7).unwrap();
        assert_eq!(chan.peek(), Some(7));
        assert_eq!(chan.peek(), Some(7));
        assert_eq!(chan.size(), 1);
        assert_eq!(chan.take(), Some(7));
    }

    #[test]
    fn drain_empties_atomically() {
        let chan = BufferedChannel::<i32>::new(4).unwrap();
        chan.put(1).unwrap();
        chan.put(2).unwrap();
        assert_eq!(chan.drain(), vec![1, 2]);
        assert_eq!(chan.size(), 0);
        assert_eq!(chan.poll(), None);
    }

    #[test]
    fn close_then_put_fails_but_drains_remainder() {
        let chan = BufferedChannel::<i32>::new(4).unwrap();
        chan.put(1).unwrap();
        chan.close();
        assert!(chan.closed());
        match chan.put(2) {
            Err(e) if e.is_closed() => assert_eq!(e.into_inner(), 2),
            _ => panic!("expected PutError::Closed"),
        }
        assert_eq!(chan.take(), Some(1));
        assert_eq!(chan.take(), None);
    }

    #[test]
    fn prefer_toggle() {
        let chan = BufferedChannel::<i32>::new(1).unwrap();
        assert!(!chan.preferred());
        chan.prefer();
        assert!(chan.preferred());
        chan.unprefer();
        assert!(!chan.preferred());
    }
}
