use std::path::PathBuf;

use cgmath::{Deg, InnerSpace, Vector3};
use gloam::{
    config::AppConfig,
    gfx::{
        geometry::generate_cube,
        scene::{Mesh, Model, Scene},
    },
    GameApp,
};

const CRATE_POSITIONS: [[f32; 3]; 5] = [
    [0.0, 1.5, 0.0],
    [2.0, 0.5, 1.0],
    [-1.0, 0.5, 2.0],
    [3.0, 1.0, -3.0],
    [-3.0, 0.5, -2.0],
];

fn demo_scene() -> Scene {
    let mut scene = Scene::new();

    scene.add_model(
        Model::new("floor", vec![Mesh::from_geometry(&generate_cube())])
            .with_scale(30.0, 0.01, 30.0)
            .with_tint([0.8, 0.8, 0.8]),
    );

    let axis = Vector3::new(0.5, 1.0, 0.0).normalize();
    for (i, [x, y, z]) in CRATE_POSITIONS.into_iter().enumerate() {
        scene.add_model(
            Model::new(format!("crate {i}"), vec![Mesh::from_geometry(&generate_cube())])
                .with_position(x, y, z)
                .with_rotation(axis, Deg(20.0 * i as f32)),
        );
    }

    scene
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    log::info!(
        "Starting {} ({}x{}{})",
        config.title,
        config.width,
        config.height,
        if config.fullscreen { ", fullscreen" } else { "" }
    );

    let models: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();

    let result = GameApp::new(config, demo_scene()).with_models(models).run();
    if let Err(err) = &result {
        log::error!("{err:#}");
    }
    result
}
