use std::io::Cursor;

use anyhow::{Context as _, bail};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

/// Target width and height of a scaled upload.
pub type Dimensions = (u32, u32);

/// Centre crop `(x, y, width, height)` of a `src` image so that it has the
/// aspect ratio of `dst`.
pub fn crop_box(src: Dimensions, dst: Dimensions) -> (u32, u32, u32, u32) {
    let (src_width, src_height) = src;
    let (dst_width, dst_height) = dst;
    let src_ratio = f64::from(src_width) / f64::from(src_height);
    let dst_ratio = f64::from(dst_width) / f64::from(dst_height);

    if dst_ratio < src_ratio {
        let crop_height = src_height;
        let crop_width = (f64::from(crop_height) * dst_ratio) as u32;
        let x_offset = (src_width - crop_width) / 2;
        (x_offset, 0, crop_width.max(1), crop_height)
    } else {
        let crop_width = src_width;
        let crop_height = (f64::from(crop_width) / dst_ratio) as u32;
        let y_offset = (src_height - crop_height) / 2;
        (0, y_offset, crop_width, crop_height.max(1))
    }
}

/// Crop and scale an uploaded image to `max_size`, returning PNG bytes.
///
/// The result is always RGB. Undecodable input is an error.
pub fn scale_image(bytes: &[u8], max_size: Dimensions) -> anyhow::Result<Vec<u8>> {
    let (dst_width, dst_height) = max_size;
    if dst_width == 0 || dst_height == 0 {
        bail!("target image size must be non-zero, got {dst_width}x{dst_height}");
    }

    let img = image::load_from_memory(bytes).context("failed to decode uploaded image")?;
    let (src_width, src_height) = img.dimensions();
    if src_width == 0 || src_height == 0 {
        bail!("uploaded image has no pixels");
    }

    let (x, y, width, height) = crop_box((src_width, src_height), max_size);
    let scaled = img
        .crop_imm(x, y, width, height)
        .resize_exact(dst_width, dst_height, FilterType::Lanczos3);
    let rgb = DynamicImage::ImageRgb8(scaled.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Png)
        .context("failed to encode scaled image")?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, RgbaImage};

    use super::{crop_box, scale_image};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn wide_images_are_cropped_horizontally() {
        assert_eq!(crop_box((400, 200), (256, 256)), (100, 0, 200, 200));
    }

    #[test]
    fn tall_images_are_cropped_vertically() {
        assert_eq!(crop_box((200, 400), (256, 256)), (0, 100, 200, 200));
    }

    #[test]
    fn matching_ratio_is_not_cropped() {
        assert_eq!(crop_box((512, 512), (256, 256)), (0, 0, 512, 512));
    }

    #[test]
    fn scales_to_target_rgb_png() {
        let scaled = scale_image(&png_bytes(400, 200), (256, 256)).unwrap();
        let decoded = image::load_from_memory_with_format(&scaled, ImageFormat::Png).unwrap();
        assert_eq!(decoded.dimensions(), (256, 256));
        assert_eq!(decoded.color(), ColorType::Rgb8);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(scale_image(b"definitely not an image", (256, 256)).is_err());
    }

    #[test]
    fn zero_target_is_rejected() {
        assert!(scale_image(&png_bytes(10, 10), (0, 256)).is_err());
    }
}
