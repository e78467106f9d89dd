use ndarray::{parallel::prelude::*, Array3, ArrayView3, ArrayViewMut1, Axis};

use crate::error::Error;

/// Bilinear sample of every channel of `image` at `(x, y)`, written into `output`.
///
/// Pixel centers are at integer coordinates. Neighbours outside the image
/// contribute zero, and so does a `NaN` coordinate.
///
/// # Arguments:
///
/// * `image`: Image with shape `[height, width, channels]`.
/// * `x`: The column coordinate.
/// * `y`: The row coordinate.
/// * `output`: Destination with `channels` elements.
pub fn sample_bilinear(image: &ArrayView3<f32>, x: f32, y: f32, mut output: ArrayViewMut1<f32>) {
    output.fill(0.0);
    if !x.is_finite() || !y.is_finite() {
        return;
    }

    let (height, width, _) = image.dim();
    let (x0, y0) = (x.floor(), y.floor());
    let (x_frac, y_frac) = (x - x0, y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);

    let corners = [
        (x0, y0, (1.0 - x_frac) * (1.0 - y_frac)),
        (x0 + 1, y0, x_frac * (1.0 - y_frac)),
        (x0, y0 + 1, (1.0 - x_frac) * y_frac),
        (x0 + 1, y0 + 1, x_frac * y_frac),
    ];

    for (cx, cy, weight) in corners {
        if cx < 0 || cy < 0 || cx >= width as i64 || cy >= height as i64 || weight == 0.0 {
            continue;
        }
        let pixel = image.slice(ndarray::s![cy as usize, cx as usize, ..]);
        output.zip_mut_with(&pixel, |out, value| *out += weight * value);
    }
}

/// Samples `image` at the coordinates of `coords`, like a `grid_sample` with
/// bilinear interpolation, zero padding and aligned corners, but taking
/// pixel coordinates instead of normalized ones.
///
/// # Arguments
///
/// * `image` - Source image with shape `[height, width, channels]`.
/// * `coords` - Sampling coordinates `(x, y)` with shape `[out_height, out_width, 2]`.
///
/// # Returns
///
/// * Sampled image with shape `[out_height, out_width, channels]`.
pub fn grid_sample(image: &ArrayView3<f32>, coords: &ArrayView3<f32>) -> Result<Array3<f32>, Error> {
    let (out_height, out_width, coord_dim) = coords.dim();
    if coord_dim != 2 {
        return Err(Error::invalid_parameter(format!(
            "sampling coordinates need 2 components, found {coord_dim}"
        )));
    }

    let channels = image.dim().2;
    let mut output = Array3::<f32>::zeros((out_height, out_width, channels));
    output
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(coords.axis_iter(Axis(0)).into_par_iter())
        .for_each(|(mut out_row, coord_row)| {
            for (out_pixel, coord) in out_row
                .axis_iter_mut(Axis(0))
                .zip(coord_row.axis_iter(Axis(0)))
            {
                sample_bilinear(image, coord[0], coord[1], out_pixel);
            }
        });

    Ok(output)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array3};
    use rstest::rstest;

    use super::*;
    use crate::unit_test::textured_rgb;

    #[rstest]
    fn integer_coordinates_should_match_image(textured_rgb: Array3<f32>) {
        let mut value = Array1::<f32>::zeros(3);
        for (y, x) in [(0, 0), (20, 33), (47, 63)] {
            sample_bilinear(&textured_rgb.view(), x as f32, y as f32, value.view_mut());
            for c in 0..3 {
                assert_relative_eq!(value[c], textured_rgb[(y, x, c)], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn should_interpolate_between_pixels() {
        let image = Array3::from_shape_fn((2, 2, 1), |(y, x, _)| (y * 2 + x) as f32);
        let mut value = Array1::<f32>::zeros(1);
        sample_bilinear(&image.view(), 0.5, 0.5, value.view_mut());
        assert_relative_eq!(value[0], 1.5);
        sample_bilinear(&image.view(), 0.25, 0.0, value.view_mut());
        assert_relative_eq!(value[0], 0.25);
    }

    #[test]
    fn outside_samples_should_be_zero_padded() {
        let image = Array3::from_elem((4, 4, 1), 1.0);
        let mut value = Array1::<f32>::zeros(1);

        sample_bilinear(&image.view(), -0.5, 1.0, value.view_mut());
        assert_relative_eq!(value[0], 0.5);

        sample_bilinear(&image.view(), 3.5, 3.0, value.view_mut());
        assert_relative_eq!(value[0], 0.5);

        sample_bilinear(&image.view(), 10.0, 1.0, value.view_mut());
        assert_eq!(value[0], 0.0);

        sample_bilinear(&image.view(), f32::NAN, 1.0, value.view_mut());
        assert_eq!(value[0], 0.0);
    }

    #[rstest]
    fn grid_sample_with_pixel_grid_should_copy_image(textured_rgb: Array3<f32>) {
        let (height, width, _) = textured_rgb.dim();
        let coords = Array3::from_shape_fn((height, width, 2), |(y, x, c)| {
            if c == 0 {
                x as f32
            } else {
                y as f32
            }
        });
        let sampled = grid_sample(&textured_rgb.view(), &coords.view()).unwrap();
        assert!(sampled
            .iter()
            .zip(textured_rgb.iter())
            .all(|(lhs, rhs)| (lhs - rhs).abs() < 1e-6));
    }

    #[test]
    fn grid_sample_should_validate_coordinates() {
        let image = Array3::<f32>::zeros((4, 4, 3));
        let coords = Array3::<f32>::zeros((4, 4, 3));
        assert!(grid_sample(&image.view(), &coords.view()).is_err());
    }
}
