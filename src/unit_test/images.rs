use ndarray::Array3;
use rstest::fixture;

#[fixture]
pub fn gradient_rgb() -> Array3<u8> {
    Array3::from_shape_fn((48, 64, 3), |(y, x, c)| match c {
        0 => (y * 4) as u8,
        1 => (x * 3) as u8,
        _ => ((x + y) * 2) as u8,
    })
}

/// Smooth color texture in [0, 1], shape `[48, 64, 3]`.
#[fixture]
pub fn textured_rgb() -> Array3<f32> {
    Array3::from_shape_fn((48, 64, 3), |(y, x, c)| {
        let (x, y) = (x as f32, y as f32);
        let phase = c as f32 * 0.7;
        0.5 + 0.25 * (x * 0.3 + phase).sin() + 0.2 * (y * 0.25 - phase).cos()
    })
}
