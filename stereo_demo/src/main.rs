//! Stereo render demo
//!
//! Builds a head with a left/right/centre camera rig looking at a field of
//! cubes, then renders both eyes for a number of frames through the in-memory
//! recording surface and logs the per-eye reports and GPU timing averages.
//!
//! Usage: `stereo_demo [config.toml|config.ron]`

use std::sync::Arc;

use rand::Rng;
use vr_engine::foundation::logging;
use vr_engine::foundation::math::{utils::deg_to_rad, Quat};
use vr_engine::prelude::*;

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 1024;
const FRAMES: usize = 60;
const CUBES: usize = 24;

fn load_config() -> Result<EngineConfig, ConfigError> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from_file(&path)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Head node carrying the rig, with one camera child per eye plus the centre
fn build_rig(scene: &mut Scene) -> Result<NodeId, SceneError> {
    let graph = scene.graph_mut();
    let head = graph.create_node("head");
    graph.attach_transform(head, NodeTransform::from_position(Vec3::new(0.0, 1.6, 0.0)))?;

    let mut eye_camera = |name: &str, mask: RenderMask| -> Result<NodeId, SceneError> {
        let node = graph.create_node(name);
        let camera = Camera::perspective(deg_to_rad(90.0), 1.0, 0.1, 100.0, mask)
            .with_background(Vec4::new(0.05, 0.05, 0.08, 1.0))
            .with_post_effect(PostEffectData::color_blend(Vec3::new(0.0, 0.0, 0.1), 0.1));
        graph.attach_camera(node, camera)?;
        graph.add_child(head, node)?;
        Ok(node)
    };
    let left = eye_camera("left eye", RenderMask::LEFT)?;
    let right = eye_camera("right eye", RenderMask::RIGHT)?;
    let center = eye_camera("center eye", RenderMask::BOTH)?;

    graph.attach_camera_rig(head, CameraRig::new(left, right, center))?;
    scene.add_node(head)?;
    scene.set_main_camera_rig(head)?;
    Ok(head)
}

/// Scatter cubes in front of the head; every fourth one is translucent
fn build_field(scene: &mut Scene) -> Result<Vec<NodeId>, SceneError> {
    let mut rng = rand::thread_rng();
    let mesh = Arc::new(Mesh::cube(0.5));
    let solid = Arc::new(Material::unlit(Vec4::new(0.8, 0.7, 0.5, 1.0)).with_name("solid"));
    let glass = Arc::new(Material::unlit(Vec4::new(0.6, 0.8, 1.0, 1.0)).with_opacity(0.4).with_name("glass"));

    let mut cubes = Vec::with_capacity(CUBES);
    for i in 0..CUBES {
        let position = Vec3::new(
            rng.gen_range(-8.0..8.0),
            rng.gen_range(0.0..4.0),
            rng.gen_range(-30.0..-3.0),
        );
        let material = if i % 4 == 0 { Arc::clone(&glass) } else { Arc::clone(&solid) };

        let graph = scene.graph_mut();
        let cube = graph.create_node(format!("cube {i}"));
        graph.attach_transform(cube, NodeTransform::from_position(position))?;
        graph.attach_render_data(cube, RenderData::with_mesh_and_material(Arc::clone(&mesh), material))?;
        graph.attach_pickable(cube, PickableVolume::new())?;
        if i % 3 == 0 {
            graph.set_lod_range(cube, 0.0, 20.0)?;
        }
        scene.add_node(cube)?;
        cubes.push(cube);
    }
    Ok(cubes)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init_with_filter(&config.log_level);
    log::info!("Starting stereo demo: {:?}", config);

    let mut scene = Scene::with_settings(config.scene);
    let head = build_rig(&mut scene)?;
    let cubes = build_field(&mut scene)?;
    log::info!("Scene built: {} nodes, {} cubes", scene.whole_scene_nodes().len(), cubes.len());

    let mut surface = RecordingSurface::new(WIDTH, HEIGHT).with_timer_queries(1_200_000);
    let mut renderer = SceneRenderer::new(config.renderer);
    renderer.create_post_effect_targets(&mut surface, WIDTH, HEIGHT)?;
    let target = RenderTarget::screen(WIDTH, HEIGHT);

    let eyes: Vec<(Eye, NodeId)> = [Eye::Left, Eye::Right]
        .into_iter()
        .filter_map(|eye| scene.main_camera(eye).map(|camera| (eye, camera)))
        .collect();

    for frame in 0..FRAMES {
        let turn = Quat::from_axis_angle(&Vec3::y_axis(), deg_to_rad(0.5));
        scene.graph_mut().update_transform(head, |t| t.rotate(turn))?;

        for &(eye, camera) in &eyes {
            let report = renderer.render_camera(&mut scene, camera, &target, &mut surface)?;
            log::debug!("frame {frame} {eye:?}: {report:?}");
        }
        scene.end_frame();
        surface.take_commands();

        if (frame + 1) % 10 == 0 {
            log::info!(
                "frame {}: {} draws / {} triangles last pass, average GPU draw time {:.2} ms",
                frame + 1,
                renderer.stats().draw_calls(),
                renderer.stats().triangles(),
                renderer.stats().average_draw_time_ms()
            );
        }
    }

    if let Some(center) = scene.main_camera(Eye::Center) {
        let hits = scene.pick_from_camera(center)?;
        match hits.first() {
            Some(hit) => log::info!("Centre eye looks at {:?} at {:.2} m", hit.node, hit.distance),
            None => log::info!("Centre eye looks at nothing"),
        }
    }

    renderer.release(&mut surface);
    log::info!("Done after {} frames", renderer.stats().frame_count());
    Ok(())
}
