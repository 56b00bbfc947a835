/// Convenience result type used across gpsoverlay.
pub type OverlayResult<T> = Result<T, OverlayError>;

/// Top-level error taxonomy used by engine APIs.
///
/// `DataGap`, `OffsetNotFound` and `MalformedRecord` are recoverable: the track store and loaders
/// log them and continue. `Configuration` and `CacheConsistency` are fatal and surface before the
/// first frame is rendered.
#[derive(thiserror::Error, Debug)]
pub enum OverlayError {
    /// Invalid user-provided parameters or data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A time query fell outside the range covered by the track.
    #[error("data gap: {0}")]
    DataGap(String),

    /// The clock-offset search exhausted its bound without a position match.
    #[error("offset not found: {0}")]
    OffsetNotFound(String),

    /// A track point or image record could not be parsed.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Overlay registry or renderer setup is inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Persisted map cache metadata disagrees with the current configuration.
    #[error("cache consistency error: {0}")]
    CacheConsistency(String),

    /// A renderer failed while producing a frame or overlay.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OverlayError {
    /// Build a [`OverlayError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`OverlayError::DataGap`] value.
    pub fn data_gap(msg: impl Into<String>) -> Self {
        Self::DataGap(msg.into())
    }

    /// Build a [`OverlayError::OffsetNotFound`] value.
    pub fn offset_not_found(msg: impl Into<String>) -> Self {
        Self::OffsetNotFound(msg.into())
    }

    /// Build a [`OverlayError::MalformedRecord`] value.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Build a [`OverlayError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`OverlayError::CacheConsistency`] value.
    pub fn cache_consistency(msg: impl Into<String>) -> Self {
        Self::CacheConsistency(msg.into())
    }

    /// Build a [`OverlayError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`OverlayError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// True for the error kinds that loaders recover from by skipping the offending item.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DataGap(_) | Self::OffsetNotFound(_) | Self::MalformedRecord(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
