//! Capture backends.

pub mod file;
pub mod synthetic;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use file::FileBackend;
pub use synthetic::SyntheticBackend;
#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Backend;
