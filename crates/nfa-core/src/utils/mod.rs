//! Small pure helpers.

mod duration;
mod similarity;

pub use duration::{DurationParseError, parse_duration};
pub use similarity::{levenshtein, similarity};
