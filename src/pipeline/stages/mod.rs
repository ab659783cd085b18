//! The built-in assembly stages.

mod caption;
mod merge;
mod optimize;

pub use caption::{truncate_caption, CaptionStage, MAX_CAPTION_CHARS};
pub use merge::MergeStage;
pub use optimize::OptimizeStage;
