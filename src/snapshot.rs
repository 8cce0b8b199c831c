//! Read-only census of live tags.

use std::fmt;

use crate::config::LEVELS;
use crate::registry::Registry;
use crate::tag::{TagKey, Uid};

/// Standing-receiver counts of one live tag.
#[derive(Debug, Clone)]
pub struct TagStat {
    /// Slot index of the tag.
    pub descriptor: usize,
    /// Tag identity.
    pub key: TagKey,
    /// Creator uid.
    pub owner: Uid,
    /// Standing receivers per level, both epochs summed.
    pub readers: [usize; LEVELS],
}

impl fmt::Display for TagStat {
    /// One line per level with standing receivers; quiet levels print
    /// nothing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (level, &readers) in self.readers.iter().enumerate() {
            if readers > 0 {
                writeln!(
                    f,
                    "key={}\towner={}\tlevel={}\treaders={}",
                    self.key, self.owner, level, readers
                )?;
            }
        }
        Ok(())
    }
}

/// Probe every slot without blocking; contended slots are skipped.
pub(crate) fn collect(registry: &Registry) -> Vec<TagStat> {
    let mut stats = Vec::new();
    for descriptor in 0..registry.slot_count() {
        let Some(guard) = registry.try_read_slot(descriptor) else {
            continue;
        };
        if let Some(tag) = guard.as_ref() {
            stats.push(TagStat {
                descriptor,
                key: tag.key,
                owner: tag.owner,
                readers: tag.standing_by_level(),
            });
        }
    }
    stats
}

pub(crate) fn render(stats: &[TagStat]) -> String {
    stats.iter().map(|stat| stat.to_string()).collect()
}
