use serde::{Deserialize, Serialize};

/// Library-wide statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of scrolls known to the index
    pub num_scrolls: u64,

    /// Combined size of all files in the knowledge directory, in bytes
    pub total_size: u64,
}
