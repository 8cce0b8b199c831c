//! Etiket: tag-addressed rendezvous message exchange.
//!
//! A [`TagService`] hosts up to `max_tags` *tags*. A tag is a channel
//! with 32 independent priority levels, addressed by a descriptor and
//! optionally by a shared key. Delivery is a rendezvous, not a queue: a
//! message put on a tag/level is copied out by exactly the receivers
//! already waiting there, then discarded. Nothing is ever stored, and a
//! send with no audience is a silent success.
//!
//! # Key Features
//!
//! - **Exact-audience delivery**: a two-epoch rendezvous with a grace
//!   drain; receivers arriving after publication never see the message
//! - **32 levels per tag**: senders on different levels do not contend
//! - **Broadcast flush**: one control call wakes every receiver of a tag
//!   across all levels
//! - **Keyed or private tags**: a fixed key space maps keys to
//!   descriptors; private tags stay reachable only by descriptor
//! - **Deadline-based interruption**: every blocking call has a
//!   `*_timeout` form failing with [`TagError::Interrupted`]
//!
//! # Example
//!
//! ```rust
//! use etiket::{OpenFlags, Permission, TagKey, TagService, Uid};
//! use std::thread;
//!
//! let service = TagService::new();
//! let client = service.client(Uid(1000));
//! let tag = client
//!     .open(TagKey::Key(7), OpenFlags::CREATE, Permission::Everyone)
//!     .unwrap();
//!
//! thread::scope(|scope| {
//!     scope.spawn(|| {
//!         let receiver = service.client(Uid(1000));
//!         let mut buf = [0u8; 16];
//!         let n = receiver.recv(tag, 0, &mut buf).unwrap();
//!         assert_eq!(&buf[..n], b"hello");
//!     });
//!
//!     // deliver once the receiver is standing
//!     while service.snapshot().iter().all(|stat| stat.readers[0] == 0) {
//!         thread::yield_now();
//!     }
//!     client.send(tag, 0, b"hello").unwrap();
//! });
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod registry;
mod rendezvous;
mod service;
mod snapshot;
mod tag;

pub use config::{Config, DEFAULT_MAX_KEYS, DEFAULT_MAX_MESSAGE, DEFAULT_MAX_TAGS, LEVELS};
pub use error::{Result, TagError};
pub use registry::OpenFlags;
pub use service::{Client, Command, CtlOutcome, TagService};
pub use snapshot::TagStat;
pub use tag::{Permission, TagKey, Uid};
