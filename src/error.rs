use std::fmt;

/// Typed errors for tag operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagError {
    /// A parameter was out of range: unknown descriptor, level >= 32,
    /// oversized payload, key outside the key space, or a bad flag combination
    InvalidArgument,
    /// The descriptor does not name a live tag
    NotFound,
    /// Exclusive creation was requested but the key is already mapped
    AlreadyExists,
    /// The tag is restricted to its owner and the caller is someone else
    PermissionDenied,
    /// A blocking wait was cut short by its deadline
    Interrupted,
    /// An allocation failed while building a tag or staging a message
    OutOfMemory,
    /// The receive buffer is smaller than the delivered message
    NoBufferSpace,
    /// A non-blocking removal found the tag in use
    Busy,
    /// Every tag slot is occupied or contended; the caller may retry
    TryAgain,
    /// A caller-supplied buffer could not be read or written
    Fault,
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagError::InvalidArgument => write!(f, "invalid argument"),
            TagError::NotFound => write!(f, "no such tag"),
            TagError::AlreadyExists => write!(f, "tag already exists"),
            TagError::PermissionDenied => write!(f, "operation not permitted"),
            TagError::Interrupted => write!(f, "interrupted"),
            TagError::OutOfMemory => write!(f, "out of memory"),
            TagError::NoBufferSpace => write!(f, "no buffer space available"),
            TagError::Busy => write!(f, "tag busy"),
            TagError::TryAgain => write!(f, "resource temporarily unavailable"),
            TagError::Fault => write!(f, "bad address"),
        }
    }
}

impl std::error::Error for TagError {}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, TagError>;
