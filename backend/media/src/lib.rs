//! Camera acquisition and still capture.
//!
//! A [`CameraSessionManager`] owns at most one live [`CameraSession`] opened
//! through a [`CameraBackend`]. The [`FrameCapturer`] freezes the current
//! frame of a ready session into a JPEG [`StillImage`](cardscan_core::StillImage)
//! and closes the session behind it.

pub mod backends;
pub mod camera;
pub mod capture;
pub mod frame;
pub mod mime_detect;

pub use camera::{CameraBackend, CameraSession, CameraSessionManager, FrameDimensions, VideoStream};
pub use capture::{encode_jpeg, FrameCapturer, JPEG_MIME};
pub use frame::{PixelFormat, VideoFrame};
pub use mime_detect::{detect_mime_type, is_supported_image, sniff_image_mime};
