//! Media metadata probing.

mod ffprobe;

pub use ffprobe::{parse_ffprobe_json, probe_with_ffprobe};
