use image::{imageops::FilterType, RgbImage};
use ndarray::{Array3, ArrayView3};

/// Trait to convert into ndarray::Array3, this is different than nshare version
/// because it uses the shape [height, width, channels] instead of [channels, height, width].
pub trait IntoArray3 {
    fn into_array3(self) -> Array3<u8>;
}

impl IntoArray3 for RgbImage {
    fn into_array3(self) -> Array3<u8> {
        let (width, height) = self.dimensions();
        Array3::from_shape_vec((height as usize, width as usize, 3), self.into_raw())
            .expect("RgbImage buffers are packed row major with 3 channels")
    }
}

/// Trait to convert objects into image::RgbImage
pub trait IntoImageRgb8 {
    fn into_image_rgb8(self) -> RgbImage;
}

impl IntoImageRgb8 for ArrayView3<'_, u8> {
    fn into_image_rgb8(self) -> RgbImage {
        let (height, width, channels) = self.dim();
        assert_eq!(channels, 3, "Array3 must have 3 channels");
        RgbImage::from_fn(width as u32, height as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            image::Rgb([self[(y, x, 0)], self[(y, x, 1)], self[(y, x, 2)]])
        })
    }
}

impl IntoImageRgb8 for ArrayView3<'_, f32> {
    /// Values are expected in [0, 1]. They are clamped then rounded to 8 bits.
    fn into_image_rgb8(self) -> RgbImage {
        let (height, width, channels) = self.dim();
        assert_eq!(channels, 3, "Array3 must have 3 channels");
        let to_u8 = |v: f32| (num::clamp(v, 0.0, 1.0) * 255.0).round() as u8;
        RgbImage::from_fn(width as u32, height as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            image::Rgb([
                to_u8(self[(y, x, 0)]),
                to_u8(self[(y, x, 1)]),
                to_u8(self[(y, x, 2)]),
            ])
        })
    }
}

/// Converts an 8 bits image into floats in [0, 1].
pub fn to_float_image(image: &ArrayView3<u8>) -> Array3<f32> {
    image.mapv(|v| v as f32 / 255.0)
}

/// Bilinear resize of a color image.
pub fn resize_rgb(image: &ArrayView3<u8>, width: usize, height: usize) -> Array3<u8> {
    let (src_height, src_width, _) = image.dim();
    if src_height == height && src_width == width {
        return image.to_owned();
    }

    image::imageops::resize(
        &image.view().into_image_rgb8(),
        width as u32,
        height as u32,
        FilterType::Triangle,
    )
    .into_array3()
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;
    use rstest::rstest;

    use super::*;
    use crate::unit_test::gradient_rgb;

    #[rstest]
    fn array_image_conversion_should_preserve_pixels(gradient_rgb: Array3<u8>) {
        let image = gradient_rgb.view().into_image_rgb8();
        assert_eq!(image.dimensions(), (64, 48));
        assert_eq!(image.get_pixel(10, 5)[0], gradient_rgb[(5, 10, 0)]);
        assert_eq!(image.get_pixel(10, 5)[2], gradient_rgb[(5, 10, 2)]);
        assert_eq!(image.into_array3(), gradient_rgb);
    }

    #[rstest]
    fn float_image_should_be_normalized(gradient_rgb: Array3<u8>) {
        let float_image = to_float_image(&gradient_rgb.view());
        assert!(float_image.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(float_image.view().into_image_rgb8().into_array3(), gradient_rgb);
    }

    #[rstest]
    fn resize_should_change_shape(gradient_rgb: Array3<u8>) {
        let resized = resize_rgb(&gradient_rgb.view(), 32, 24);
        assert_eq!(resized.dim(), (24, 32, 3));

        let same = resize_rgb(&gradient_rgb.view(), 64, 48);
        assert_eq!(same, gradient_rgb);
    }
}
