//! The select engine (§4.2): a non-deterministic, preference-aware,
//! multi-way receive over a heterogeneous set of channels.
//!
//! Readiness is checked with `peek`, the winning value is taken with
//! `poll`, never `take` — `peek`+`take` would race across concurrent
//! selectors, `peek`+`poll` lets a lost race be detected and retried
//! (§4.2.1). The waiting discipline is the bounded exponential backoff
//! described in §4.2.2; it is a permitted, not a mandated,
//! implementation of the observable contract (eventually one value, or
//! timeout).

use std::thread;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;

use crate::channel::{Channel, Selectable, Value};
use crate::error::ChannelError;

const INITIAL_BACKOFF: Duration = Duration::from_micros(200);
const BACKOFF_INCREMENT: Duration = Duration::from_micros(25);
const BACKOFF_CEILING: Duration = Duration::from_micros(1500);

/// One attempt at steps 1–3 of §4.2.1: partition into preferred/ready,
/// choose uniformly within the winning tier, `poll` it. Returns `None`
/// if nothing was ready, or if the chosen channel lost the race to
/// another selector (the caller decides whether to retry).
fn attempt(chans: &[&dyn Selectable]) -> Option<(usize, Value)> {
    let preferred_ready: Vec<usize> = chans
        .iter()
        .enumerate()
        .filter(|(_, c)| c.preferred() && c.probe_ready())
        .map(|(i, _)| i)
        .collect();

    let pool = if !preferred_ready.is_empty() {
        preferred_ready
    } else {
        chans
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.preferred() && c.probe_ready())
            .map(|(i, _)| i)
            .collect()
    };

    let idx = *pool.choose(&mut rand::thread_rng())?;
    chans[idx].poll_erased().map(|v| (idx, v))
}

fn select_until(chans: &[&dyn Selectable], deadline: Option<Instant>) -> Option<(usize, Value)> {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        if let Some(result) = attempt(chans) {
            return Some(result);
        }
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let remaining = deadline - now;
            thread::sleep(backoff.min(remaining));
        } else {
            thread::sleep(backoff);
        }
        backoff = (backoff + BACKOFF_INCREMENT).min(BACKOFF_CEILING);
    }
}

/// Blocking select: returns `(index, value)` for the channel chosen
/// from `chans`, waiting indefinitely until one is ready.
pub fn select(chans: &[&dyn Selectable]) -> (usize, Value) {
    select_until(chans, None).expect("blocking select waits forever; it does not give up")
}

/// Timed select: as [`select`], but gives up after `timeout_ms`
/// milliseconds with no selection, returning `Ok(None)`. A timeout of
/// `0` means "probe readiness exactly once." Negative timeouts are
/// rejected with [`ChannelError::InvalidArgument`].
pub fn select_timeout(
    timeout_ms: i64,
    chans: &[&dyn Selectable],
) -> Result<Option<(usize, Value)>, ChannelError> {
    if timeout_ms < 0 {
        return Err(ChannelError::InvalidArgument(
            "select timeout must not be negative".into(),
        ));
    }
    if timeout_ms == 0 {
        return Ok(attempt(chans));
    }
    let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
    Ok(select_until(chans, Some(deadline)))
}

/// Non-blocking select: performs steps 1–3 once. No wait loop — a lost
/// race is reported the same as nothing being ready.
pub fn select_nowait(chans: &[&dyn Selectable]) -> Option<(usize, Value)> {
    attempt(chans)
}

/// Like [`select_nowait`], but returns `sentinel` instead of `None` when
/// nothing is ready (the index is meaningless in that case, so only the
/// value is returned).
pub fn select_nowait_or(chans: &[&dyn Selectable], sentinel: Value) -> Value {
    match select_nowait(chans) {
        Some((_, v)) => v,
        None => sentinel,
    }
}

/// One `(channel, handler)` pairing built by [`case`], consumed by
/// [`selectf`]. `R` is the return type shared by every handler (and the
/// `:default` clause) in one `selectf` call.
pub struct Case<'a, R> {
    identity: *const (),
    selectable: &'a dyn Selectable,
    handler: Box<dyn FnOnce(Value) -> R + 'a>,
}

/// Pairs a channel with the handler that should run if it is the one
/// `selectf` chooses. Duplicate channel identities collapse to the last
/// `case` supplied, matching §4.2.3's "duplicate channel arguments
/// collapse to the last handler."
pub fn case<'a, T, R>(
    chan: &'a (dyn Channel<T> + 'a),
    handler: impl FnOnce(T) -> R + 'a,
) -> Case<'a, R>
where
    T: Clone + Send + 'static,
{
    let identity = chan as *const dyn Channel<T> as *const ();
    let selectable: &'a dyn Selectable = chan;
    Case {
        identity,
        selectable,
        handler: Box::new(move |boxed: Value| {
            let value = *boxed
                .downcast::<T>()
                .unwrap_or_else(|_| panic!("selectf: channel produced an unexpected value type"));
            handler(value)
        }),
    }
}

/// Dispatch select (§4.2.3): reads one value — blocking if `default` is
/// `None`, non-blocking if it is `Some` — then invokes the handler
/// paired with the chosen channel and returns its result. The
/// `:default` handler runs, with no argument, only when no channel was
/// ready.
pub fn selectf<R>(cases: Vec<Case<'_, R>>, default: Option<Box<dyn FnOnce() -> R + '_>>) -> R {
    let mut deduped: Vec<Case<'_, R>> = Vec::with_capacity(cases.len());
    for c in cases {
        deduped.retain(|existing| existing.identity != c.identity);
        deduped.push(c);
    }
    let selectables: Vec<&dyn Selectable> = deduped.iter().map(|c| c.selectable).collect();

    let chosen = if default.is_some() {
        select_nowait(&selectables)
    } else {
        Some(select(&selectables))
    };

    match chosen {
        Some((idx, value)) => {
            let case = deduped
                .into_iter()
                .nth(idx)
                .expect("selectf: chosen index within bounds");
            (case.handler)(value)
        }
        None => (default.expect("selectf: no channel ready and no default clause"))(),
    }
}
