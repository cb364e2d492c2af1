pub mod cache;
pub mod catalog;
pub mod config;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod waveform;

/// Application name for XDG paths
pub const APP_NAME: &str = "albumwave";

/// Default coarse resampling window (milliseconds).
pub const DEFAULT_COARSE_MS: u64 = 500;

/// Default fine resampling step (milliseconds).
pub const DEFAULT_FINE_MS: u64 = 50;
