pub mod camera;
pub mod error;
pub mod eval;
pub mod io;
pub mod loss;
pub mod metrics;
pub mod options;
pub mod trajectory;
pub mod transform;
pub mod warp;

#[cfg(test)]
mod unit_test;

pub mod image;
pub use crate::image::{RgbdFrame, RgbdImage};
