//! Track metadata and output naming

mod layout;
mod sanitize;
mod snapshot;

pub use layout::{track_file_name, OutputLayout};
pub use sanitize::{sanitize_segment, MAX_SEGMENT_LEN};
pub use snapshot::{format_clock, TrackSnapshot, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
