//! Sync item priority levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing priority of a sync item.
///
/// Batch selection orders by priority rank descending, then by enqueue time
/// ascending, so higher priorities jump the queue while items of equal
/// priority stay FIFO.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background work; processed after everything else.
    Low,
    /// The default priority.
    #[default]
    Normal,
    /// Processed before normal traffic.
    High,
    /// Jumps ahead of all other priorities.
    Critical,
}

impl Priority {
    /// Returns the numeric rank; higher ranks are selected first.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
            Priority::Critical => 3,
        }
    }

    /// Returns the snake_case name used on the wire and in filters.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_ordering() {
        assert!(Priority::Critical.rank() > Priority::High.rank());
        assert!(Priority::High.rank() > Priority::Normal.rank());
        assert!(Priority::Normal.rank() > Priority::Low.rank());
    }

    #[test]
    fn derived_ord_matches_rank() {
        assert!(Priority::Critical > Priority::Low);
        assert!(Priority::High > Priority::Normal);
    }

    #[test]
    fn default_is_normal() {
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn serde_names() {
        let json = serde_json::to_string(&Priority::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
