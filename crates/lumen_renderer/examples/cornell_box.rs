//! Cornell box example.
//!
//! Renders the classic box with a ceiling light, two blocks, a glass sphere
//! and a small mesh pyramid, then writes a PNG.
//!
//! ```text
//! cargo run --release --example cornell_box -- [output.png] [config.json]
//! ```

use std::time::Instant;

use anyhow::Context;
use lumen_renderer::lumen_core::{CameraParams, GeomKind, Material, Mesh, Scene};
use lumen_renderer::lumen_math::{Placement, Transform, Vec3};
use lumen_renderer::{RenderConfig, Renderer};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "cornell_box.png".to_string());
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            RenderConfig::from_json(&json)?
        }
        None => RenderConfig::default().with_quality(128, 8),
    };

    let start = Instant::now();
    let scene = build_scene()?;
    log::info!("Scene built in {:.2?}", start.elapsed());

    let mut renderer = Renderer::new(scene, config)?;
    let mut accum = renderer.create_buffer();

    let start = Instant::now();
    renderer.render(&mut accum, |done, total| {
        if done % 16 == 0 || done == total {
            log::info!("{done}/{total} iterations");
        }
    })?;
    log::info!("Rendered in {:.2?}", start.elapsed());

    image::save_buffer(
        &output,
        &accum.to_rgba8(),
        accum.width(),
        accum.height(),
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("writing {output}"))?;
    log::info!("Saved to {}", output);

    Ok(())
}

fn wall(translation: Vec3, rotation: Vec3) -> Transform {
    Transform::from_placement(Placement::new(translation, rotation, Vec3::splat(2.0)))
}

fn build_scene() -> anyhow::Result<Scene> {
    let camera = CameraParams::default()
        .with_resolution(512, 512)
        .with_position(Vec3::new(0.0, 0.0, 3.6), Vec3::ZERO, Vec3::Y)
        .with_lens(40.0, 0.0, 3.6);
    let mut scene = Scene::new(camera);

    let white = scene.add_material(Material::diffuse(Vec3::splat(0.73)));
    let red = scene.add_material(Material::diffuse(Vec3::new(0.65, 0.05, 0.05)));
    let green = scene.add_material(Material::diffuse(Vec3::new(0.12, 0.45, 0.15)));
    let lamp = scene.add_material(Material::light(Vec3::new(1.0, 0.85, 0.6), 12.0));
    let glass = scene.add_material(Material::glass(1.5));
    let gold = scene.add_material(Material::microfacet(Vec3::new(1.0, 0.78, 0.34), 0.25));
    let plastic = scene.add_material(Material::plastic(Vec3::new(0.2, 0.3, 0.7), 1.5));

    // Walls, each facing into the box
    scene.add_geom(GeomKind::SquarePlane, wall(Vec3::new(0.0, -1.0, 0.0), Vec3::new(-90.0, 0.0, 0.0)), white)?;
    scene.add_geom(GeomKind::SquarePlane, wall(Vec3::new(0.0, 1.0, 0.0), Vec3::new(90.0, 0.0, 0.0)), white)?;
    scene.add_geom(GeomKind::SquarePlane, wall(Vec3::new(0.0, 0.0, -1.0), Vec3::ZERO), white)?;
    scene.add_geom(GeomKind::SquarePlane, wall(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 90.0, 0.0)), red)?;
    scene.add_geom(GeomKind::SquarePlane, wall(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, -90.0, 0.0)), green)?;

    scene.add_geom(
        GeomKind::SquarePlane,
        Transform::from_placement(Placement::new(
            Vec3::new(0.0, 0.99, 0.0),
            Vec3::new(90.0, 0.0, 0.0),
            Vec3::splat(0.5),
        )),
        lamp,
    )?;

    scene.add_geom(
        GeomKind::Cube,
        Transform::from_placement(Placement::new(
            Vec3::new(-0.35, -0.4, -0.35),
            Vec3::new(0.0, 18.0, 0.0),
            Vec3::new(0.6, 1.2, 0.6),
        )),
        plastic,
    )?;
    scene.add_geom(
        GeomKind::Cube,
        Transform::from_placement(Placement::new(
            Vec3::new(0.4, -0.7, 0.3),
            Vec3::new(0.0, -17.0, 0.0),
            Vec3::splat(0.6),
        )),
        white,
    )?;
    scene.add_geom(
        GeomKind::Sphere,
        Transform::from_translation_scale(Vec3::new(0.4, -0.15, 0.3), Vec3::splat(0.5)),
        glass,
    )?;

    scene.add_mesh(
        pyramid(),
        Transform::from_placement(Placement::new(
            Vec3::new(-0.45, -1.0, 0.45),
            Vec3::new(0.0, 30.0, 0.0),
            Vec3::splat(0.4),
        )),
        gold,
    )?;

    Ok(scene)
}

/// Square pyramid with its base on y = 0.
fn pyramid() -> Mesh {
    let positions = vec![
        Vec3::new(-0.5, 0.0, -0.5),
        Vec3::new(0.5, 0.0, -0.5),
        Vec3::new(0.5, 0.0, 0.5),
        Vec3::new(-0.5, 0.0, 0.5),
        Vec3::new(0.0, 1.0, 0.0),
    ];
    let indices = vec![
        0, 1, 2, 0, 2, 3, // base
        3, 2, 4, 2, 1, 4, 1, 0, 4, 0, 3, 4,
    ];
    Mesh::new(positions, indices, None)
}
