//! Per-tag state: 32 level slots plus the channel-wide awake path.

use std::fmt;

use parking_lot::Mutex;

use crate::config::LEVELS;
use crate::error::{Result, TagError};
use crate::rendezvous::{Rendezvous, WaitQueue};

/// Identity of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKey {
    /// Unkeyed tag, reachable only through the descriptor returned at
    /// creation.
    Private,
    /// Keyed tag, shareable through the key → descriptor map.
    Key(u32),
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKey::Private => write!(f, "private"),
            TagKey::Key(k) => write!(f, "{}", k),
        }
    }
}

/// Caller credential. Recorded as the owner at creation and compared on
/// every operation against restricted tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid(pub u32);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access policy, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Any uid may operate on the tag.
    Everyone,
    /// Only the creating uid may operate on the tag.
    OwnerOnly,
}

/// One priority level of a tag.
pub(crate) struct Level {
    /// Serializes senders on this level. Held across the whole delivery,
    /// drain included.
    pub(crate) producer: Mutex<()>,
    /// Staged payload. `Some` strictly between a delivery's install and
    /// the end of its drain.
    pub(crate) message: Mutex<Option<Box<[u8]>>>,
    pub(crate) rendezvous: Rendezvous,
    pub(crate) queue: WaitQueue,
}

impl Level {
    fn new() -> Self {
        Self {
            producer: Mutex::new(()),
            message: Mutex::new(None),
            rendezvous: Rendezvous::new(),
            queue: WaitQueue::new(),
        }
    }
}

/// A live tag: identity, access policy, and the delivery machinery.
pub(crate) struct Tag {
    pub(crate) key: TagKey,
    pub(crate) owner: Uid,
    pub(crate) permission: Permission,
    pub(crate) levels: [Level; LEVELS],
    /// Channel-wide awake rendezvous; its sleepers are spread across the
    /// level queues.
    pub(crate) awake: Rendezvous,
    pub(crate) awake_producer: Mutex<()>,
}

impl Tag {
    pub(crate) fn new(key: TagKey, owner: Uid, permission: Permission) -> Self {
        Self {
            key,
            owner,
            permission,
            levels: core::array::from_fn(|_| Level::new()),
            awake: Rendezvous::new(),
            awake_producer: Mutex::new(()),
        }
    }

    /// Owner check for restricted tags.
    pub(crate) fn check_access(&self, caller: Uid) -> Result<()> {
        match self.permission {
            Permission::Everyone => Ok(()),
            Permission::OwnerOnly if self.owner == caller => Ok(()),
            Permission::OwnerOnly => Err(TagError::PermissionDenied),
        }
    }

    /// Standing receivers per level, both epochs summed.
    pub(crate) fn standing_by_level(&self) -> [usize; LEVELS] {
        core::array::from_fn(|i| self.levels[i].rendezvous.standing_total())
    }
}
