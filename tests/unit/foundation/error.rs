use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        OverlayError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(OverlayError::data_gap("x").to_string().contains("data gap:"));
    assert!(
        OverlayError::offset_not_found("x")
            .to_string()
            .contains("offset not found:")
    );
    assert!(
        OverlayError::malformed("x")
            .to_string()
            .contains("malformed record:")
    );
    assert!(
        OverlayError::configuration("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        OverlayError::cache_consistency("x")
            .to_string()
            .contains("cache consistency error:")
    );
    assert!(OverlayError::render("x").to_string().contains("render error:"));
    assert!(
        OverlayError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn recoverable_kinds() {
    assert!(OverlayError::data_gap("x").is_recoverable());
    assert!(OverlayError::offset_not_found("x").is_recoverable());
    assert!(OverlayError::malformed("x").is_recoverable());
    assert!(!OverlayError::configuration("x").is_recoverable());
    assert!(!OverlayError::cache_consistency("x").is_recoverable());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = OverlayError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
