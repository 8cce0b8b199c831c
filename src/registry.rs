//! Fixed tag table and the key → descriptor index.
//!
//! Descriptors are slot indices. Each slot is a readers/writer lock over
//! an optional tag: operations share it, creation and removal take it
//! exclusively. Exclusive acquisition always probes (`try_write`) instead
//! of parking, so shared users are never stuck behind a pending writer.
//! The key map is a plain array under one mutex; `None` marks an unmapped
//! key.

use std::time::Instant;

use bitflags::bitflags;
use crossbeam_utils::Backoff;
use log::debug;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::config::Config;
use crate::error::{Result, TagError};
use crate::tag::{Permission, Tag, TagKey, Uid};

bitflags! {
    /// Creation flags for [`open`](crate::Client::open).
    ///
    /// Keyed opens must carry `CREATE`; `EXCL` alone or an empty set is
    /// rejected. Private opens ignore the flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// Create the tag if the key is unmapped.
        const CREATE = 1 << 0;
        /// Together with `CREATE`, fail if the key is already mapped.
        const EXCL = 1 << 1;
    }
}

pub(crate) type SlotGuard<'a> = RwLockReadGuard<'a, Option<Box<Tag>>>;

pub(crate) struct Registry {
    slots: Box<[RwLock<Option<Box<Tag>>>]>,
    /// key → descriptor; a single coarse lock covers lookup and install.
    keys: Mutex<Box<[Option<usize>]>>,
    cfg: Config,
}

impl Registry {
    pub(crate) fn new(cfg: Config) -> Self {
        Self {
            slots: (0..cfg.max_tags).map(|_| RwLock::new(None)).collect(),
            keys: Mutex::new(vec![None; cfg.max_keys].into_boxed_slice()),
            cfg,
        }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.cfg
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Shared guard on a descriptor's slot.
    pub(crate) fn read_slot(&self, desc: usize, deadline: Option<Instant>) -> Result<SlotGuard<'_>> {
        let lock = self.slots.get(desc).ok_or(TagError::InvalidArgument)?;
        match deadline {
            Some(at) => lock.try_read_until(at).ok_or(TagError::Interrupted),
            None => Ok(lock.read()),
        }
    }

    /// Non-blocking shared probe. Used by diagnostics, which would rather
    /// skip a slot than delay a writer.
    pub(crate) fn try_read_slot(&self, desc: usize) -> Option<SlotGuard<'_>> {
        self.slots.get(desc)?.try_read()
    }

    /// Resolve or create a tag, per the open contract.
    pub(crate) fn get_or_create(
        &self,
        key: TagKey,
        flags: OpenFlags,
        caller: Uid,
        permission: Permission,
        deadline: Option<Instant>,
    ) -> Result<usize> {
        let k = match key {
            TagKey::Private => return self.create_scan(TagKey::Private, caller, permission),
            TagKey::Key(k) => k,
        };
        if k as usize >= self.cfg.max_keys || !flags.contains(OpenFlags::CREATE) {
            return Err(TagError::InvalidArgument);
        }
        let mut keys = match deadline {
            Some(at) => self.keys.try_lock_until(at).ok_or(TagError::Interrupted)?,
            None => self.keys.lock(),
        };
        if let Some(desc) = keys[k as usize] {
            if flags.contains(OpenFlags::EXCL) {
                return Err(TagError::AlreadyExists);
            }
            return Ok(desc);
        }
        let desc = self.create_scan(key, caller, permission)?;
        keys[k as usize] = Some(desc);
        Ok(desc)
    }

    /// Probe every slot for a free one and install a fresh tag there.
    fn create_scan(&self, key: TagKey, owner: Uid, permission: Permission) -> Result<usize> {
        for (desc, slot) in self.slots.iter().enumerate() {
            if let Some(mut guard) = slot.try_write() {
                if guard.is_none() {
                    *guard = Some(Box::new(Tag::new(key, owner, permission)));
                    debug!("tag {} created (key={}, owner={})", desc, key, owner);
                    return Ok(desc);
                }
            }
        }
        Err(TagError::TryAgain)
    }

    /// Tear a tag down and return its key.
    ///
    /// The key is unmapped before the tag is detached, so no lookup that
    /// starts after this returns can reach it. `nonblock` turns every
    /// lock acquisition into a single probe that fails with `Busy`.
    pub(crate) fn remove(
        &self,
        desc: usize,
        caller: Uid,
        nonblock: bool,
        deadline: Option<Instant>,
    ) -> Result<TagKey> {
        let lock = self.slots.get(desc).ok_or(TagError::InvalidArgument)?;
        let mut guard = if nonblock {
            lock.try_write().ok_or(TagError::Busy)?
        } else {
            let backoff = Backoff::new();
            loop {
                if let Some(guard) = lock.try_write() {
                    break guard;
                }
                if let Some(at) = deadline {
                    if Instant::now() >= at {
                        return Err(TagError::Interrupted);
                    }
                }
                backoff.snooze();
            }
        };
        {
            let tag = guard.as_ref().ok_or(TagError::NotFound)?;
            tag.check_access(caller)?;
            if let TagKey::Key(k) = tag.key {
                let mut keys = if nonblock {
                    self.keys.try_lock().ok_or(TagError::Busy)?
                } else {
                    match deadline {
                        Some(at) => self.keys.try_lock_until(at).ok_or(TagError::Interrupted)?,
                        None => self.keys.lock(),
                    }
                };
                keys[k as usize] = None;
            }
        }
        let tag = guard.take().expect("occupied under write lock");
        drop(guard);
        debug!("tag {} removed (key={})", desc, tag.key);
        Ok(tag.key)
    }
}
