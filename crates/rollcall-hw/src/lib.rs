//! rollcall-hw — Hardware abstraction for camera capture.
//!
//! Provides V4L2-based camera access yielding intensity frames, with
//! format negotiation for the common webcam pixel layouts.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, CaptureSession, DeviceInfo, PixelFormat};
pub use frame::Frame;
