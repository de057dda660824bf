//! Terrain camera walk-through
//!
//! Loads a camera configuration from JSON, then orbits a camera over the
//! pole with inversion disabled and enabled, zooms with the wheel and prints
//! where the camera ends up.

use anyhow::Context;
use framekit_core::{Point3d, Vector3d};
use framekit_interact::{spherical_angles, Camera, TerrainCameraConfig, TerrainCameraController};

const CONFIG: &str = r#"{
    "rotation_factor": 0.5,
    "wheel_zoom_step": 0.2,
    "elevation_limit": 80.0
}"#;

fn report(label: &str, camera: &Camera) {
    let (azimuth, elevation) = spherical_angles(camera);
    println!(
        "{:<22} az={:>8.2}° el={:>8.2}° dist={:>6.3} up=[{:.2}, {:.2}, {:.2}]",
        label,
        azimuth,
        elevation,
        camera.distance(),
        camera.view_up.x,
        camera.view_up.y,
        camera.view_up.z
    );
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("framekit Terrain Camera Session");
    println!("===============================");

    let config: TerrainCameraConfig =
        serde_json::from_str(CONFIG).context("parsing terrain camera config")?;
    config.validate()?;

    let start = Camera::new(
        Point3d::new(8.0, 0.0, 6.0),
        Point3d::origin(),
        Vector3d::z(),
    );

    let mut clamped = start.clone();
    let controller = TerrainCameraController::new(config);
    report("start", &clamped);
    for _ in 0..40 {
        controller.orbit(&mut clamped, 0.0, -10.0);
    }
    report("clamped at limit", &clamped);

    let mut free = start;
    let mut inverting = TerrainCameraController::new(config);
    inverting.set_allow_inversion(true);
    for step in 0..8 {
        inverting.orbit(&mut free, 0.0, -40.0);
        report(&format!("over the pole #{}", step + 1), &free);
    }

    for _ in 0..3 {
        controller.wheel_zoom(&mut free, 1.0);
    }
    report("after 3 wheel notches", &free);

    log::info!("camera distance {:.3}", free.distance());
    Ok(())
}
