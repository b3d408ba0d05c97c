pub mod rating;
pub mod video;
