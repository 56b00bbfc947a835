//! Project files: what to read, how to pace it, which overlays to draw.

/// JSON project file schema, validation and conversion into runtime types.
pub mod project;
