pub mod config;
pub mod shot;

pub use config::WatchConfig;
pub use shot::{ShotInfo, ShotListing};
