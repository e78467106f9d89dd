use ndarray::{Array2, ArrayView2};

/// Raw value used by 7-Scenes depth PNGs for pixels without measurement.
pub const SEVEN_SCENES_INVALID_DEPTH: u16 = 65535;

/// Converts raw 16 bits depth into metres. Zero and `invalid` raw values map to 0.0.
pub fn depth_from_raw(raw: &ArrayView2<u16>, depth_scale: f32, invalid: u16) -> Array2<f32> {
    raw.mapv(|value| {
        if value == 0 || value == invalid {
            0.0
        } else {
            value as f32 * depth_scale
        }
    })
}

/// Resize a depth image with nearest neighbour sampling so that no depth is
/// interpolated across object borders or into empty pixels.
///
/// # Arguments
///
/// * `depth_image` - The depth image to resize.
/// * `dst_width` - The target width of the resized image.
/// * `dst_height` - The target height of the resized image.
pub fn resize_depth(depth_image: &ArrayView2<f32>, dst_width: usize, dst_height: usize) -> Array2<f32> {
    let (src_height, src_width) = depth_image.dim();
    if (src_height, src_width) == (dst_height, dst_width) {
        return depth_image.to_owned();
    }
    if src_height == 0 || src_width == 0 {
        return Array2::zeros((dst_height, dst_width));
    }

    let height_ratio = src_height as f32 / dst_height as f32;
    let width_ratio = src_width as f32 / dst_width as f32;

    Array2::from_shape_fn((dst_height, dst_width), |(i_dst, j_dst)| {
        let i_src = ((i_dst as f32 * height_ratio) as usize).min(src_height - 1);
        let j_src = ((j_dst as f32 * width_ratio) as usize).min(src_width - 1);
        depth_image[(i_src, j_src)]
    })
}
