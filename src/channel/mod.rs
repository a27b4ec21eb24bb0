//! The channel family: [`Sync`](sync::SyncChannel), [`Buffered`](buffered::BufferedChannel)
//! and [`Timeout`](timeout::TimeoutChannel) channels behind one common
//! [`Channel`] contract, plus the type-erased [`Selectable`] supertrait
//! the [`select`](crate::select) engine scans across heterogeneous
//! channels.

mod buffered;
mod sync;
mod timeout;

use std::any::Any;
use std::fmt;

pub use buffered::BufferedChannel;
pub use sync::SyncChannel;
pub use timeout::{timeout_channel, Timeout, TimeoutChannel};

use crate::error::ChannelError;

/// The three channel kinds, exposed for introspection and `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Sync,
    Buffered,
    Timeout,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Sync => write!(f, "sync"),
            Kind::Buffered => write!(f, "buffered"),
            Kind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Returned by a failed [`Channel::put`], carrying the value back so it
/// is never silently dropped.
pub enum PutError<T> {
    /// The channel was already closed.
    Closed(T),
    /// This channel kind does not support `put` (a [`TimeoutChannel`]).
    Unsupported(T),
}

impl<T> PutError<T> {
    /// Recovers the value that could not be delivered.
    pub fn into_inner(self) -> T {
        match self {
            PutError::Closed(v) | PutError::Unsupported(v) => v,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PutError::Closed(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, PutError::Unsupported(_))
    }
}

impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutError::Closed(_) => write!(f, "PutError::Closed(..)"),
            PutError::Unsupported(_) => write!(f, "PutError::Unsupported(..)"),
        }
    }
}

impl<T> fmt::Display for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutError::Closed(_) => write!(f, "put on closed channel"),
            PutError::Unsupported(_) => write!(f, "put is not supported on this channel"),
        }
    }
}

impl<T> std::error::Error for PutError<T> {}

/// A value erased to its dynamic type, used only at the boundary of a
/// heterogeneous [`select`](crate::select) call where channels of
/// different element types are scanned together. Recover the concrete
/// type with [`Box::downcast`].
pub type Value = Box<dyn Any + Send>;

/// The type-, generic-parameter-free subset of the channel contract:
/// everything [`select`](crate::select) needs to scan a channel for
/// readiness and pull out an erased value, regardless of what element
/// type it carries. [`Channel`] extends this supertrait, so any
/// `&dyn Channel<T>` upcasts to `&dyn Selectable` for free — this is
/// what lets the select engine hold a `Vec<&dyn Selectable>` mixing
/// channels of unrelated element types, the same way a Go `select`
/// statement mixes cases over differently-typed channels.
pub trait Selectable: Send + Sync {
    fn kind(&self) -> Kind;
    fn preferred(&self) -> bool;
    fn prefer(&self);
    fn unprefer(&self);
    fn closed(&self) -> bool;
    /// Non-blocking, non-consuming readiness probe (the internal
    /// analogue of `peek() != ∅` from §4.2.1).
    fn probe_ready(&self) -> bool;
    /// `poll`, boxing the result so it can travel alongside channels of
    /// other element types.
    fn poll_erased(&self) -> Option<Value>;
}

/// Common contract shared by every channel kind (§4.1).
///
/// `T` must be `Clone` so that non-consuming inspection (`peek`,
/// `snapshot`) can hand back owned copies without borrowing out of a
/// lock guard.
pub trait Channel<T>: Selectable
where
    T: Clone + Send + 'static,
{
    /// Deliver a value. Fails with [`PutError::Closed`] if the channel
    /// is closed, or [`PutError::Unsupported`] on a [`TimeoutChannel`].
    fn put(&self, value: T) -> Result<(), PutError<T>>;

    /// Remove and return the oldest value, blocking until one is
    /// available. Returns `None` once the channel is closed and drained.
    fn take(&self) -> Option<T>;

    /// Remove and return the oldest value if one is immediately
    /// available; otherwise return `None` without blocking.
    fn poll(&self) -> Option<T>;

    /// Return the oldest value without removing it, or `None` if none;
    /// never blocks.
    fn peek(&self) -> Option<T>;

    /// Current queue length. Always `0` for a [`SyncChannel`].
    fn size(&self) -> usize;

    /// Discard all buffered values. Fails with
    /// [`ChannelError::Unsupported`] on a [`TimeoutChannel`].
    fn clear(&self) -> Result<(), ChannelError>;

    /// Mark the channel closed. Idempotent.
    fn close(&self);

    /// A non-removing copy of the channel's current contents, oldest
    /// first.
    fn snapshot(&self) -> Vec<T>;

    /// Atomically remove and return everything currently buffered.
    fn drain(&self) -> Vec<T>;

    /// A finite, race-permissive lazy sequence that repeatedly `poll`s
    /// until it first sees `None`. A concurrent producer may cause the
    /// sequence to end early or to observe values that arrive mid-walk.
    fn lazy_drain(&self) -> LazyDrain<'_, T>
    where
        Self: Sized,
    {
        LazyDrain { chan: self }
    }
}

/// Iterator returned by [`Channel::lazy_drain`].
pub struct LazyDrain<'a, T> {
    chan: &'a dyn Channel<T>,
}

impl<T: Clone + Send + 'static> Iterator for LazyDrain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.chan.poll()
    }
}

pub(crate) fn render<T: fmt::Debug>(values: &[T], closed: bool) -> String {
    let mut out = String::new();
    if closed {
        out.push_str(":closed ");
    }
    out.push_str("<=[ ");
    for v in values {
        out.push_str(&format!("{:?} ", v));
    }
    out.push(']');
    out
}
