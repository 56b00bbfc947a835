/// Image records and manifest loading.
pub mod manifest;
/// Display start and duration per image.
pub mod timeline;
