use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::{UnitQuaternion, Vector3};
use ndarray::{Array2, Array3};
use warp3d::{
    camera::CameraIntrinsics,
    loss::{ReprojectionLoss, Ssim},
    transform::Transform,
    warp::warp_image,
};

fn warp_benchmark(c: &mut Criterion) {
    let (width, height) = (640, 480);
    let camera = CameraIntrinsics::seven_scenes();
    let source = Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
        0.5 + 0.25 * (x as f32 * 0.05 + c as f32).sin() + 0.2 * (y as f32 * 0.04).cos()
    });
    let target = source.mapv(|v| v * 0.9 + 0.05);
    let depth = Array2::from_shape_fn((height, width), |(y, x)| 1.5 + 0.001 * (x + y) as f32);
    let target_to_source = Transform::new(
        &Vector3::new(0.05, -0.01, 0.02),
        UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 0.02, 0.01)).quaternion(),
    );

    c.bench_function("warp 640x480", |b| {
        b.iter(|| warp_image(&source.view(), &depth.view(), &camera, &target_to_source).unwrap());
    });

    let ssim = Ssim::default();
    c.bench_function("ssim 640x480", |b| {
        b.iter(|| ssim.forward(&source.view(), &target.view()).unwrap());
    });

    let loss = ReprojectionLoss::default();
    c.bench_function("reprojection loss 640x480", |b| {
        b.iter(|| loss.compute(&source.view(), &target.view()).unwrap());
    });
}

criterion_group!(benches, warp_benchmark);
criterion_main!(benches);
