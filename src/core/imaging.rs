use crate::utils::error::Result;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

/// Decodes `bytes`, scales the image to cover a `size`×`size` square,
/// centre-crops the overflow and re-encodes it as JPEG.
pub fn square_jpeg(bytes: &[u8], size: u32, quality: u8) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)?;
    let squared = square_image(&decoded, size);

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(&squared)?;
    Ok(jpeg)
}

pub fn square_image(image: &DynamicImage, size: u32) -> image::RgbImage {
    // JPEG has no alpha channel, so flatten first.
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    rgb.resize_to_fill(size, size, FilterType::Lanczos3).to_rgb8()
}
