/// Break detection between consecutive images and fade transitions.
pub mod breaks;
/// Premultiplied alpha-over and frame blitting.
pub mod composite;
