//! Per-frame composition: base frames, the driver, and range rendering.

/// Per-frame driver that composes the base image and overlay clips.
pub mod driver;
/// Premultiplied RGBA8 frame type.
pub mod frame;
/// Range rendering into a frame sink.
pub mod pipeline;
/// Base image sources.
pub mod source;
