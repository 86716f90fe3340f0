pub mod scroll;
pub mod stats;

pub use scroll::*;
pub use stats::*;
