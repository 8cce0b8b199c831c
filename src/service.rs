//! The public surface: a service owning the tag table and uid-carrying
//! client handles exposing the four operations.
//!
//! Every operation validates, takes the descriptor's shared slot lock,
//! checks access, then runs against the tag's delivery machinery. The
//! plain forms block indefinitely; the `*_timeout` forms convert the
//! timeout into a deadline threaded through every blocking point, so an
//! expiry anywhere surfaces as [`TagError::Interrupted`].

use std::time::{Duration, Instant};

use log::{debug, trace};
use parking_lot::{Mutex, MutexGuard};

use crate::config::{Config, LEVELS};
use crate::error::{Result, TagError};
use crate::registry::{OpenFlags, Registry};
use crate::rendezvous::Signal;
use crate::snapshot::{self, TagStat};
use crate::tag::{Permission, TagKey, Uid};

/// Control-surface commands for [`Client::ctl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Wake every standing receiver of the tag, on all levels.
    AwakeAll,
    /// Tear the tag down, retrying until in-flight operations finish.
    Remove,
    /// Tear the tag down, failing with [`TagError::Busy`] instead of
    /// waiting out contention.
    RemoveNonblock,
}

/// What a control command accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtlOutcome {
    /// Standing receivers were flushed.
    Awakened,
    /// The tag is gone; a keyed identity is free for reuse.
    Removed(TagKey),
}

/// The message-exchange facility.
///
/// Owns the tag table. Operations go through [`Client`] handles so each
/// call carries a caller uid; diagnostics are available directly.
pub struct TagService {
    registry: Registry,
}

impl TagService {
    /// Service with the default limits.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Service with explicit limits.
    pub fn with_config(config: Config) -> Self {
        debug!(
            "tag service up (max_tags={}, max_keys={}, max_message={})",
            config.max_tags, config.max_keys, config.max_message
        );
        Self {
            registry: Registry::new(config),
        }
    }

    /// The limits this service was built with.
    pub fn config(&self) -> Config {
        *self.registry.config()
    }

    /// Handle for operations issued by `uid`.
    pub fn client(&self, uid: Uid) -> Client<'_> {
        Client { service: self, uid }
    }

    /// Census of live tags and their standing receivers.
    ///
    /// Slots whose lock is exclusively held are skipped rather than
    /// waited on, so a snapshot never delays creation or removal.
    pub fn snapshot(&self) -> Vec<TagStat> {
        snapshot::collect(&self.registry)
    }

    /// The census as text, one line per level with standing receivers.
    pub fn report(&self) -> String {
        snapshot::render(&self.snapshot())
    }
}

impl Default for TagService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TagService {
    fn drop(&mut self) {
        debug!("tag service down");
    }
}

/// A caller's view of a [`TagService`].
#[derive(Clone, Copy)]
pub struct Client<'a> {
    service: &'a TagService,
    uid: Uid,
}

impl<'a> Client<'a> {
    /// The uid this handle operates as.
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Resolve or create a tag; returns its descriptor.
    ///
    /// `TagKey::Private` always creates (flags are ignored). A keyed open
    /// must carry [`OpenFlags::CREATE`] and either returns the mapped
    /// descriptor or creates and maps a fresh tag; adding
    /// [`OpenFlags::EXCL`] makes an existing mapping an error.
    pub fn open(&self, key: TagKey, flags: OpenFlags, permission: Permission) -> Result<usize> {
        self.open_inner(key, flags, permission, None)
    }

    /// [`open`](Self::open) with a deadline on lock acquisition.
    pub fn open_timeout(
        &self,
        key: TagKey,
        flags: OpenFlags,
        permission: Permission,
        timeout: Duration,
    ) -> Result<usize> {
        self.open_inner(key, flags, permission, deadline(timeout))
    }

    /// Deliver `payload` to the receivers standing on `tag`/`level`.
    ///
    /// Blocks until every receiver that was standing at publication has
    /// taken its copy. With nobody standing this is a no-op success; the
    /// payload is not stored. An empty payload returns success without
    /// publishing at all.
    pub fn send(&self, tag: usize, level: usize, payload: &[u8]) -> Result<()> {
        self.send_inner(tag, level, payload, None)
    }

    /// [`send`](Self::send) that gives up at a deadline.
    pub fn send_timeout(
        &self,
        tag: usize,
        level: usize,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<()> {
        self.send_inner(tag, level, payload, deadline(timeout))
    }

    /// Wait for a delivery on `tag`/`level`.
    ///
    /// Returns the copied byte count, or 0 when an awake-all flushed the
    /// wait. A message larger than `buf` fails with
    /// [`TagError::NoBufferSpace`] and stays available to the other
    /// standing receivers.
    pub fn recv(&self, tag: usize, level: usize, buf: &mut [u8]) -> Result<usize> {
        self.recv_inner(tag, level, buf, None)
    }

    /// [`recv`](Self::recv) that gives up at a deadline.
    pub fn recv_timeout(
        &self,
        tag: usize,
        level: usize,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        self.recv_inner(tag, level, buf, deadline(timeout))
    }

    /// Run a control command against `tag`.
    pub fn ctl(&self, tag: usize, command: Command) -> Result<CtlOutcome> {
        self.ctl_inner(tag, command, None)
    }

    /// [`ctl`](Self::ctl) that gives up at a deadline.
    pub fn ctl_timeout(&self, tag: usize, command: Command, timeout: Duration) -> Result<CtlOutcome> {
        self.ctl_inner(tag, command, deadline(timeout))
    }

    fn open_inner(
        &self,
        key: TagKey,
        flags: OpenFlags,
        permission: Permission,
        deadline: Option<Instant>,
    ) -> Result<usize> {
        self.service
            .registry
            .get_or_create(key, flags, self.uid, permission, deadline)
    }

    fn send_inner(
        &self,
        tag: usize,
        level: usize,
        payload: &[u8],
        deadline: Option<Instant>,
    ) -> Result<()> {
        if level >= LEVELS || payload.len() > self.service.registry.config().max_message {
            return Err(TagError::InvalidArgument);
        }
        let slot = self.service.registry.read_slot(tag, deadline)?;
        let target = slot.as_ref().ok_or(TagError::NotFound)?;
        target.check_access(self.uid)?;
        let lane = &target.levels[level];

        let _producer = lock_interruptible(&lane.producer, deadline)?;
        if payload.is_empty() {
            // validated and permitted, but wakes no one and leaves the
            // epochs untouched
            return Ok(());
        }
        trace!("tag {} level {}: delivering {} bytes", tag, level, payload.len());
        *lane.message.lock() = Some(payload.to_vec().into_boxed_slice());
        lane.rendezvous
            .publish(Signal::Message, |epoch| lane.queue.wake(epoch));
        // the drain above guarantees nobody can still read this
        *lane.message.lock() = None;
        trace!("tag {} level {}: delivery drained", tag, level);
        Ok(())
    }

    fn recv_inner(
        &self,
        tag: usize,
        level: usize,
        buf: &mut [u8],
        deadline: Option<Instant>,
    ) -> Result<usize> {
        if level >= LEVELS {
            return Err(TagError::InvalidArgument);
        }
        let slot = self.service.registry.read_slot(tag, deadline)?;
        let target = slot.as_ref().ok_or(TagError::NotFound)?;
        target.check_access(self.uid)?;
        let lane = &target.levels[level];

        let message = lane.rendezvous.join();
        let awake = target.awake.join();

        let woke = lane.queue.park(
            message.epoch(),
            || {
                lane.rendezvous.posted(&message) != Signal::None
                    || target.awake.posted(&awake) != Signal::None
            },
            deadline,
        );

        let outcome = if !woke {
            Err(TagError::Interrupted)
        } else if lane.rendezvous.posted(&message) == Signal::Message {
            let staged = lane.message.lock();
            let data = staged
                .as_deref()
                .expect("message staged while its grace epoch is standing");
            if data.len() > buf.len() {
                Err(TagError::NoBufferSpace)
            } else {
                buf[..data.len()].copy_from_slice(data);
                Ok(data.len())
            }
        } else {
            // flushed by an awake-all
            Ok(0)
        };

        lane.rendezvous.leave(message);
        target.awake.leave(awake);
        outcome
    }

    fn ctl_inner(&self, tag: usize, command: Command, deadline: Option<Instant>) -> Result<CtlOutcome> {
        match command {
            Command::AwakeAll => {
                self.awake_all(tag, deadline)?;
                Ok(CtlOutcome::Awakened)
            }
            Command::Remove => self
                .service
                .registry
                .remove(tag, self.uid, false, deadline)
                .map(CtlOutcome::Removed),
            Command::RemoveNonblock => self
                .service
                .registry
                .remove(tag, self.uid, true, deadline)
                .map(CtlOutcome::Removed),
        }
    }

    fn awake_all(&self, tag: usize, deadline: Option<Instant>) -> Result<()> {
        let slot = self.service.registry.read_slot(tag, deadline)?;
        let target = slot.as_ref().ok_or(TagError::NotFound)?;
        target.check_access(self.uid)?;

        let _producer = lock_interruptible(&target.awake_producer, deadline)?;
        debug!("tag {}: awake-all", tag);
        target.awake.publish(Signal::Broadcast, |_| {
            // sleepers of either epoch on every level belong to the audience
            for lane in &target.levels {
                lane.queue.wake_all();
            }
        });
        Ok(())
    }
}

#[inline]
fn deadline(timeout: Duration) -> Option<Instant> {
    Some(Instant::now() + timeout)
}

fn lock_interruptible<'m>(
    mutex: &'m Mutex<()>,
    deadline: Option<Instant>,
) -> Result<MutexGuard<'m, ()>> {
    match deadline {
        Some(at) => mutex.try_lock_until(at).ok_or(TagError::Interrupted),
        None => Ok(mutex.lock()),
    }
}
