//! A CSP-style concurrency library: lightweight tasks that communicate
//! through typed, first-class channels, plus a non-deterministic
//! multi-way `select` over them. This is Go's channel + goroutine +
//! select model, ported onto Rust's native threads.
//!
//! ## Usage
//!
//! First, add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! golite = "0.1"
//! ```
//!
//! # Example
//!
//! ```
//! use golite::channel::{BufferedChannel, Channel};
//! use golite::task;
//! use std::time::Duration;
//!
//! let chan = BufferedChannel::<i32>::new(4).unwrap();
//!
//! let producer = {
//!     let chan = chan.clone();
//!     task::spawn(move || {
//!         for i in 0..4 {
//!             chan.put(i).unwrap();
//!         }
//!         chan.close();
//!         Ok(())
//!     })
//! };
//!
//! let mut received = Vec::new();
//! while let Some(v) = chan.take() {
//!     received.push(v);
//! }
//! producer.join().unwrap();
//!
//! assert_eq!(received, vec![0, 1, 2, 3]);
//! ```
//!
//! See [`channel`] for the three channel kinds, [`select`] for the
//! select engine, and [`task`] for the goroutine-spawning glue.

pub mod channel;
pub mod error;
pub mod select;
pub mod task;

pub use channel::{
    BufferedChannel, Channel, Kind, Selectable, SyncChannel, Timeout, TimeoutChannel, Value,
};
pub use error::ChannelError;
pub use select::{case, select, select_nowait, select_nowait_or, select_timeout, selectf, Case};
pub use task::{is_cancelled, spawn, spawn_detached, spawn_logged, shutdown, stop_all, with_timeout, TaskHandle};
