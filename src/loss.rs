//! Photometric losses between a warped image and its target.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};

use crate::error::Error;

/// Reflects an index in `[-1, len]` back into `[0, len)`.
fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    let reflected = if index < 0 {
        -index
    } else if index >= len {
        2 * (len - 1) - index
    } else {
        index
    };
    reflected as usize
}

/// 3x3 mean filter with one pixel of reflection padding.
fn mean_pool3(image: &ArrayView2<f32>) -> Array2<f32> {
    let (height, width) = image.dim();
    Array2::from_shape_fn((height, width), |(y, x)| {
        let mut sum = 0.0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let yy = reflect(y as isize + dy, height);
                let xx = reflect(x as isize + dx, width);
                sum += image[(yy, xx)];
            }
        }
        sum / 9.0
    })
}

fn check_shapes(x: &ArrayView3<f32>, y: &ArrayView3<f32>) -> Result<(), Error> {
    if x.dim() != y.dim() {
        return Err(Error::invalid_parameter(format!(
            "image shapes differ: {:?} and {:?}",
            x.dim(),
            y.dim()
        )));
    }
    let (height, width, channels) = x.dim();
    if height < 2 || width < 2 || channels == 0 {
        return Err(Error::invalid_parameter(format!(
            "images must be at least 2x2 with one channel, found {:?}",
            x.dim()
        )));
    }
    Ok(())
}

/// Windowed SSIM loss, `clamp((1 - SSIM) / 2, 0, 1)` over 3x3 neighbourhoods.
#[derive(Clone, Debug)]
pub struct Ssim {
    pub c1: f32,
    pub c2: f32,
}

impl Default for Ssim {
    fn default() -> Self {
        Self {
            c1: 0.01 * 0.01,
            c2: 0.03 * 0.03,
        }
    }
}

impl Ssim {
    /// Per-channel SSIM loss map.
    ///
    /// # Arguments
    ///
    /// * `x`, `y` - Images with the same `[height, width, channels]` shape.
    pub fn forward(&self, x: &ArrayView3<f32>, y: &ArrayView3<f32>) -> Result<Array3<f32>, Error> {
        check_shapes(x, y)?;

        let mut loss = Array3::<f32>::zeros(x.dim());
        for ((xc, yc), mut out) in x
            .axis_iter(Axis(2))
            .zip(y.axis_iter(Axis(2)))
            .zip(loss.axis_iter_mut(Axis(2)))
        {
            let mu_x = mean_pool3(&xc);
            let mu_y = mean_pool3(&yc);
            let sigma_x = mean_pool3(&(&xc * &xc).view()) - &mu_x * &mu_x;
            let sigma_y = mean_pool3(&(&yc * &yc).view()) - &mu_y * &mu_y;
            let sigma_xy = mean_pool3(&(&xc * &yc).view()) - &mu_x * &mu_y;

            Zip::from(&mut out)
                .and(&mu_x)
                .and(&mu_y)
                .and(&sigma_x)
                .and(&sigma_y)
                .and(&sigma_xy)
                .for_each(|out, &mx, &my, &sx, &sy, &sxy| {
                    let n = (2.0 * mx * my + self.c1) * (2.0 * sxy + self.c2);
                    let d = (mx * mx + my * my + self.c1) * (sx + sy + self.c2);
                    *out = num::clamp((1.0 - n / d) / 2.0, 0.0, 1.0);
                });
        }

        Ok(loss)
    }
}

/// Per-pixel photometric loss `w * SSIM + (1 - w) * L1`, both averaged over channels.
#[derive(Clone, Debug)]
pub struct ReprojectionLoss {
    pub ssim_weight: f32,
    ssim: Ssim,
}

impl Default for ReprojectionLoss {
    fn default() -> Self {
        Self::new(0.85)
    }
}

impl ReprojectionLoss {
    pub fn new(ssim_weight: f32) -> Self {
        Self {
            ssim_weight,
            ssim: Ssim::default(),
        }
    }

    /// Loss map with shape `[height, width]`.
    pub fn compute(&self, pred: &ArrayView3<f32>, target: &ArrayView3<f32>) -> Result<Array2<f32>, Error> {
        check_shapes(pred, target)?;
        let channels = pred.dim().2 as f32;

        let l1 = (pred - target).mapv(f32::abs).sum_axis(Axis(2)) / channels;
        if self.ssim_weight == 0.0 {
            return Ok(l1);
        }
        let ssim = self.ssim.forward(pred, target)?.sum_axis(Axis(2)) / channels;

        Ok(ssim * self.ssim_weight + l1 * (1.0 - self.ssim_weight))
    }

    /// Like [`Self::compute`], but pixels without depth take the target value
    /// in `pred`, so they contribute no L1 error.
    pub fn compute_masked(
        &self,
        pred: &ArrayView3<f32>,
        target: &ArrayView3<f32>,
        depth: &ArrayView2<f32>,
    ) -> Result<Array2<f32>, Error> {
        let (height, width, _) = pred.dim();
        if depth.dim() != (height, width) {
            return Err(Error::invalid_parameter(format!(
                "depth shape {:?} does not match image shape {:?}",
                depth.dim(),
                (height, width)
            )));
        }

        let mut masked = pred.to_owned();
        for ((y, x), d) in depth.indexed_iter() {
            if *d == 0.0 {
                for c in 0..pred.dim().2 {
                    masked[(y, x, c)] = target[(y, x, c)];
                }
            }
        }
        self.compute(&masked.view(), target)
    }
}
