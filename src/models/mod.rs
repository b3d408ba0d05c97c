pub mod evaluation;

pub use evaluation::{Metric, NewVideo, Rating, Scores, VideoMetadata};
