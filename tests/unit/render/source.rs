use super::*;

fn write_png(path: &std::path::Path, w: u32, h: u32, rgba: [u8; 4]) {
    image::RgbaImage::from_pixel(w, h, image::Rgba(rgba))
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

#[test]
fn decodes_and_resizes_to_the_canvas() {
    let dir = std::env::temp_dir().join(format!("gpsoverlay_source_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let a = dir.join("a.png");
    let b = dir.join("b.png");
    write_png(&a, 8, 4, [255, 0, 0, 255]);
    write_png(&b, 4, 4, [0, 0, 255, 255]);

    let mut src = ImageSequenceSource::new(vec![a, b]).unwrap();
    let canvas = Canvas::new(16, 8).unwrap();
    let f0 = src.frame(Some(0), canvas).unwrap();
    assert_eq!((f0.width, f0.height), (16, 8));
    assert_eq!(f0.pixel(8, 4).unwrap(), [255, 0, 0, 255]);

    let f1 = src.frame(Some(1), canvas).unwrap();
    assert_eq!(f1.pixel(0, 0).unwrap(), [0, 0, 255, 255]);
    // Out of range clamps to the last image; track-only mode shows the first.
    assert_eq!(src.frame(Some(9), canvas).unwrap(), f1);
    assert_eq!(src.frame(None, canvas).unwrap(), f0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_files_are_errors() {
    let mut src = ImageSequenceSource::new(vec!["/nonexistent/x.png".into()]).unwrap();
    assert!(src.frame(Some(0), Canvas::new(2, 2).unwrap()).is_err());
    assert!(ImageSequenceSource::new(Vec::new()).is_err());
}

#[test]
fn solid_source_fills_the_canvas() {
    let mut src = SolidColorSource {
        rgba: [1, 2, 3, 255],
    };
    let f = src.frame(None, Canvas::new(3, 2).unwrap()).unwrap();
    assert_eq!(f, FrameRGBA::solid(3, 2, [1, 2, 3, 255]));
}
