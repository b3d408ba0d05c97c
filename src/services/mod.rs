pub mod reconcile;
pub mod video_dir;
