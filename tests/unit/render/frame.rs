use super::*;

#[test]
fn solid_frames_are_premultiplied() {
    let f = FrameRGBA::solid(2, 1, [255, 128, 0, 128]);
    assert_eq!(f.data.len(), 8);
    assert_eq!(f.pixel(1, 0), Some([128, 64, 0, 128]));
    assert_eq!(f.pixel(2, 0), None);
}

#[test]
fn straight_buffers_are_checked_and_converted() {
    assert!(FrameRGBA::from_straight(2, 2, vec![0; 4]).is_err());
    let f = FrameRGBA::from_straight(1, 1, vec![200, 100, 50, 0]).unwrap();
    assert_eq!(f.data, vec![0, 0, 0, 0]);
}

#[test]
fn image_round_trip_keeps_opaque_pixels() {
    let img = image::RgbaImage::from_raw(1, 1, vec![10, 20, 30, 255]).unwrap();
    let f = FrameRGBA::from_image(img);
    assert_eq!(f.to_image().unwrap().into_raw(), vec![10, 20, 30, 255]);
}

#[test]
fn fingerprint_tracks_content() {
    let a = FrameRGBA::solid(4, 4, [1, 2, 3, 255]);
    let b = FrameRGBA::solid(4, 4, [1, 2, 3, 255]);
    let c = FrameRGBA::solid(4, 4, [1, 2, 4, 255]);
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
}
