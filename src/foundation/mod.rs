/// Frame indices, ranges, frame rates and canvas size.
pub mod core;
/// Crate error type.
pub mod error;
/// Linear functions and small numeric helpers.
pub mod math;
