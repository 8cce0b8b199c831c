//! Two-epoch rendezvous: deliver one transient event to exactly the
//! receivers standing at publication time.
//!
//! A [`Rendezvous`] keeps two generations of state. Receivers join the
//! *current* epoch and stand there until they have consumed an event or
//! given up. A publisher flips the current epoch, posts its signal on the
//! now-closed *grace* epoch, wakes the sleepers of that epoch, and spins
//! until every one of them has left. Late joiners land in the fresh epoch
//! and see nothing; the publisher returns only when the grace epoch is
//! empty, so whatever backed the event can be reclaimed immediately.
//!
//! Epoch flips and joins serialize on the `current` mutex, which keeps the
//! presence counters honest: the counter of a non-current epoch can only
//! decrease, and an epoch is never reused while its counter is nonzero.
//!
//! Sleeping happens on a [`WaitQueue`], one condition variable per epoch
//! behind a shared gate mutex. Publishers post signals before notifying
//! under the gate, and sleepers re-check their predicate under the gate,
//! so a wakeup cannot be lost between the check and the sleep.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_utils::Backoff;
use parking_lot::{Condvar, Mutex};

/// Event posted on an epoch, visible to the receivers standing in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Signal {
    /// Nothing happened yet; keep waiting.
    None = 0,
    /// A message is staged for this epoch.
    Message = 1,
    /// The epoch was flushed by an awake-all.
    Broadcast = 2,
}

impl Signal {
    #[inline]
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Signal::Message,
            2 => Signal::Broadcast,
            _ => Signal::None,
        }
    }
}

/// Proof of membership in an epoch.
///
/// Obtained from [`Rendezvous::join`] and consumed by
/// [`Rendezvous::leave`]; moving it around keeps the leave exactly-once.
#[must_use]
#[derive(Debug)]
pub(crate) struct Token {
    epoch: usize,
}

impl Token {
    /// Epoch this token stands in, for picking the matching wait queue.
    #[inline]
    pub(crate) fn epoch(&self) -> usize {
        self.epoch
    }
}

/// The two-epoch delivery primitive.
pub(crate) struct Rendezvous {
    /// Epoch open to new joiners. Joins and flips serialize here.
    current: Mutex<usize>,
    /// Posted event per epoch. Always `None` for the current epoch.
    signal: [AtomicU8; 2],
    /// Standing receivers per epoch.
    standing: [AtomicUsize; 2],
}

impl Rendezvous {
    pub(crate) fn new() -> Self {
        Self {
            current: Mutex::new(0),
            signal: [AtomicU8::new(0), AtomicU8::new(0)],
            standing: [AtomicUsize::new(0), AtomicUsize::new(0)],
        }
    }

    /// Stand in the current epoch.
    pub(crate) fn join(&self) -> Token {
        let current = self.current.lock();
        self.standing[*current].fetch_add(1, Ordering::SeqCst);
        Token { epoch: *current }
    }

    /// Stop standing. The epoch's publisher may be spinning on this count.
    pub(crate) fn leave(&self, token: Token) {
        self.standing[token.epoch].fetch_sub(1, Ordering::SeqCst);
    }

    /// Event posted on the token's epoch, if any.
    #[inline]
    pub(crate) fn posted(&self, token: &Token) -> Signal {
        Signal::from_u8(self.signal[token.epoch].load(Ordering::SeqCst))
    }

    /// Post `kind` on the current epoch and retire it.
    ///
    /// The caller must hold the producer lock of whatever owns this
    /// instance; publications on one instance must not race. `wake` runs
    /// after the flip with the grace epoch and must notify every queue a
    /// standing receiver of that epoch may sleep on. Returns once the
    /// grace epoch has fully drained, after which the event's backing
    /// storage cannot be observed by anyone.
    pub(crate) fn publish(&self, kind: Signal, wake: impl FnOnce(usize)) -> usize {
        let grace = {
            let mut current = self.current.lock();
            let grace = *current;
            self.signal[grace].store(kind as u8, Ordering::SeqCst);
            *current ^= 1;
            self.signal[*current].store(Signal::None as u8, Ordering::SeqCst);
            grace
        };
        wake(grace);
        let backoff = Backoff::new();
        while self.standing[grace].load(Ordering::SeqCst) > 0 {
            backoff.snooze();
        }
        grace
    }

    /// Standing receivers across both epochs.
    pub(crate) fn standing_total(&self) -> usize {
        self.standing[0].load(Ordering::SeqCst) + self.standing[1].load(Ordering::SeqCst)
    }
}

/// Per-epoch sleeping quarters for one rendezvous user.
///
/// The gate mutex carries no data; the state sleepers wait on lives in
/// the atomics of one or more [`Rendezvous`] instances.
pub(crate) struct WaitQueue {
    gate: Mutex<()>,
    sleepers: [Condvar; 2],
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self {
            gate: Mutex::new(()),
            sleepers: [Condvar::new(), Condvar::new()],
        }
    }

    /// Sleep on `epoch`'s queue until `ready` holds or the deadline
    /// passes. Returns false only on deadline expiry with `ready` still
    /// false.
    pub(crate) fn park(
        &self,
        epoch: usize,
        mut ready: impl FnMut() -> bool,
        deadline: Option<Instant>,
    ) -> bool {
        let mut gate = self.gate.lock();
        loop {
            if ready() {
                return true;
            }
            match deadline {
                Some(at) => {
                    if self.sleepers[epoch].wait_until(&mut gate, at).timed_out() {
                        return ready();
                    }
                }
                None => self.sleepers[epoch].wait(&mut gate),
            }
        }
    }

    /// Wake every sleeper of one epoch.
    pub(crate) fn wake(&self, epoch: usize) {
        let _gate = self.gate.lock();
        self.sleepers[epoch].notify_all();
    }

    /// Wake every sleeper of both epochs.
    pub(crate) fn wake_all(&self) {
        let _gate = self.gate.lock();
        self.sleepers[0].notify_all();
        self.sleepers[1].notify_all();
    }
}
