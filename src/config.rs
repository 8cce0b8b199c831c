//! Facility limits, fixed when the service is built.

/// Number of priority levels per tag. Part of the wire contract, not
/// configurable.
pub const LEVELS: usize = 32;

/// Default number of tag slots.
pub const DEFAULT_MAX_TAGS: usize = 256;
/// Default size of the key space.
pub const DEFAULT_MAX_KEYS: usize = 256;
/// Default ceiling on message payload length, in bytes.
pub const DEFAULT_MAX_MESSAGE: usize = 4096;

/// Capacity limits for a [`TagService`](crate::TagService).
///
/// The limits mirror the load-time parameters of the facility and cannot
/// change once the service exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of tag slots (descriptors run from 0 to `max_tags - 1`).
    pub max_tags: usize,
    /// Size of the key space (valid keys run from 0 to `max_keys - 1`).
    pub max_keys: usize,
    /// Largest accepted message payload, in bytes.
    pub max_message: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_tags: DEFAULT_MAX_TAGS,
            max_keys: DEFAULT_MAX_KEYS,
            max_message: DEFAULT_MAX_MESSAGE,
        }
    }
}
