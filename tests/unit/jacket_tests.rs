//! Unit tests for jacket cropping and URL building.

use std::io::Cursor;

use chunibot::game::jacket::{crop_random, crop_with_rng, HttpJacketSource};
use chunibot::game::JacketSource;
use chunibot::AppError;
use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Encode a gradient whose red/green channels record each pixel's x/y.
fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([u8::try_from(x).unwrap(), u8::try_from(y).unwrap(), 0])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode");
    out.into_inner()
}

#[test]
fn crop_produces_square_png_of_requested_size() {
    let png = crop_random(&gradient_png(200, 150), 90).expect("crop");
    assert_eq!(
        image::guess_format(&png).expect("format"),
        ImageFormat::Png
    );
    let cropped = image::load_from_memory(&png).expect("decode");
    assert_eq!(cropped.dimensions(), (90, 90));
}

#[test]
fn crop_window_stays_inside_the_image() {
    let source = gradient_png(200, 150);
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let png = crop_with_rng(&source, 90, &mut rng).expect("crop");
        let cropped = image::load_from_memory(&png).expect("decode").to_rgb8();

        let origin = cropped.get_pixel(0, 0);
        let (x, y) = (u32::from(origin[0]), u32::from(origin[1]));
        assert!(x <= 200 - 90, "x offset {x} out of range");
        assert!(y <= 150 - 90, "y offset {y} out of range");

        let corner = cropped.get_pixel(89, 89);
        assert_eq!(u32::from(corner[0]), x + 89);
        assert_eq!(u32::from(corner[1]), y + 89);
    }
}

#[test]
fn same_seed_gives_same_crop() {
    let source = gradient_png(200, 150);
    let a = crop_with_rng(&source, 90, &mut StdRng::seed_from_u64(42)).expect("a");
    let b = crop_with_rng(&source, 90, &mut StdRng::seed_from_u64(42)).expect("b");
    assert_eq!(a, b);
}

#[test]
fn exact_size_image_is_returned_whole() {
    let png = crop_random(&gradient_png(90, 90), 90).expect("crop");
    let cropped = image::load_from_memory(&png).expect("decode").to_rgb8();
    assert_eq!(cropped.get_pixel(0, 0)[0], 0);
    assert_eq!(cropped.get_pixel(89, 89)[0], 89);
}

#[test]
fn image_smaller_than_crop_is_rejected() {
    let result = crop_random(&gradient_png(60, 200), 90);
    assert!(matches!(result, Err(AppError::Image(msg)) if msg.contains("60x200")));
}

#[test]
fn undecodable_bytes_are_rejected() {
    assert!(matches!(
        crop_random(b"definitely not an image", 90),
        Err(AppError::Image(_))
    ));
}

#[test]
fn url_joins_base_and_file_name() {
    let with_slash = HttpJacketSource::new(reqwest::Client::new(), "https://example.com/img/");
    let without = HttpJacketSource::new(reqwest::Client::new(), "https://example.com/img");
    assert_eq!(with_slash.url("abc.jpg"), "https://example.com/img/abc.jpg");
    assert_eq!(without.url("abc.jpg"), "https://example.com/img/abc.jpg");
}
