use thiserror::Error;

/// Errors surfaced by channel operations.
///
/// `put` on a closed channel fails with [`ChannelError::Closed`]; `put`
/// or `clear` on a [`TimeoutChannel`](crate::channel::TimeoutChannel)
/// fails with [`ChannelError::Unsupported`]; construction-time mistakes
/// (a non-positive buffer capacity, a negative timeout, an odd number of
/// arguments to [`selectf`](crate::select::selectf)) fail synchronously
/// with [`ChannelError::InvalidArgument`].
#[derive(Debug, Error)]
pub enum ChannelError {
    /// `put` was attempted on a channel that is already closed.
    #[error("put on closed channel")]
    Closed,

    /// The operation is not supported by this channel kind.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// A caller-supplied argument was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Signals that a [`TaskHandle`](crate::task::TaskHandle) was cancelled while
/// blocked at a suspension point (a channel operation, a `select`, or a
/// sleep). `spawn_logged` swallows this error; plain `spawn` propagates
/// it to whoever joins the returned handle.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("task cancelled")]
pub struct Cancelled;
