//! Scene segmentation, face grouping and a persistent frame-scan cache.
//!
//! A video probe delivers per-frame difference values, mean colors and face
//! descriptors. They are cached per file in [`db::ScanStore`], densified by
//! [`frames::repair()`], cut into [`scenes`], grouped by [`faces::clustering`]
//! and presented through [`faces::sorting`]. [`analysis`] runs that chain for
//! one or many files.

pub mod analysis;
pub mod config;
pub mod db;
pub mod export;
pub mod faces;
pub mod frames;
pub mod logging;
pub mod scenes;

pub use config::Config;
pub use db::ScanStore;
