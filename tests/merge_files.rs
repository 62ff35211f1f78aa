//! Merging files from disk

use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use slidepress::{assemble, Error};

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([30, 60, 90]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

#[test]
fn mixes_pdfs_and_images() {
    let dir = tempfile::tempdir().unwrap();

    // Two-page PDF built from images
    let two = dir.path().join("two.pdf");
    let mut doc = assemble::merge_documents(vec![
        assemble::image_page(&encode(20, 10, ImageFormat::Png), 72.0).unwrap(),
        assemble::image_page(&encode(20, 10, ImageFormat::Png), 72.0).unwrap(),
    ])
    .unwrap();
    assemble::save(&mut doc, &two).unwrap();

    // Extension is ignored, content decides
    let png = dir.path().join("frame.bin");
    std::fs::write(&png, encode(30, 15, ImageFormat::Png)).unwrap();
    let jpg = dir.path().join("photo.jpg");
    std::fs::write(&jpg, encode(40, 20, ImageFormat::Jpeg)).unwrap();

    let mut merged = assemble::merge_files(&[png, two, jpg], 72.0).unwrap();
    assert_eq!(merged.get_pages().len(), 4);

    let out = dir.path().join("nested").join("all.pdf");
    let bytes = assemble::save(&mut merged, &out).unwrap();
    assert!(bytes > 0);
    assert_eq!(assemble::count_pages(&out).unwrap(), 4);
}

#[test]
fn missing_input_is_reported_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("a.png");
    std::fs::write(&present, encode(4, 4, ImageFormat::Png)).unwrap();
    let missing = dir.path().join("missing.pdf");

    match assemble::merge_files(&[present, missing.clone()], 100.0) {
        Err(Error::InputNotFound(path)) => assert_eq!(path, missing),
        other => panic!("expected InputNotFound, got {:?}", other.map(|d| d.get_pages().len())),
    }
}

#[test]
fn no_inputs() {
    let inputs: Vec<PathBuf> = Vec::new();
    assert!(assemble::merge_files(&inputs, 100.0).is_err());
}

#[test]
fn count_pages_of_missing_file() {
    let err = assemble::count_pages(std::path::Path::new("/nowhere/deck.pdf")).unwrap_err();
    assert!(matches!(err, Error::InputNotFound(_)));
}
