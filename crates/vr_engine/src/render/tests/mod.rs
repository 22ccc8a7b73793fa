//! End-to-end render-pass scenarios against the recording surface

use std::sync::Arc;

use crate::core::config::SceneSettings;
use crate::foundation::math::{utils::deg_to_rad, Mat4, Vec3, Vec4};
use crate::scene::components::{Camera, Material, Mesh, NodeTransform, RenderData, RenderMask};
use crate::scene::{NodeId, Scene};

mod render_pass;

pub(super) const WIDTH: u32 = 64;
pub(super) const HEIGHT: u32 = 64;

/// Scene with a camera at `z = 5` looking down -Z and a unit cube at `cube_z`
pub(super) struct Fixture {
    pub scene: Scene,
    pub camera: NodeId,
    pub cube: NodeId,
}

impl Fixture {
    pub fn new(settings: SceneSettings, cube_z: f32) -> Self {
        let mut scene = Scene::with_settings(settings);
        let camera = add_camera(&mut scene, RenderMask::BOTH, 5.0);
        let cube = add_cube(&mut scene, "cube", Vec3::new(0.0, 0.0, cube_z));
        Self { scene, camera, cube }
    }

    pub fn at_origin() -> Self {
        Self::new(SceneSettings::default(), 0.0)
    }

    pub fn view_projection(&mut self) -> Mat4 {
        let graph = self.scene.graph_mut();
        let projection = *graph.node(self.camera).unwrap().camera().unwrap().projection_matrix();
        projection * graph.view_matrix(self.camera).unwrap().unwrap()
    }
}

pub(super) fn add_camera(scene: &mut Scene, mask: RenderMask, z: f32) -> NodeId {
    let graph = scene.graph_mut();
    let camera = graph.create_node("camera");
    let lens = Camera::perspective(deg_to_rad(90.0), 1.0, 0.1, 100.0, mask)
        .with_background(Vec4::new(0.1, 0.1, 0.1, 1.0));
    graph.attach_camera(camera, lens).unwrap();
    graph.attach_transform(camera, NodeTransform::from_position(Vec3::new(0.0, 0.0, z))).unwrap();
    scene.add_node(camera).unwrap();
    camera
}

pub(super) fn add_cube(scene: &mut Scene, name: &str, position: Vec3) -> NodeId {
    add_mesh_node(scene, name, position, Material::unlit(Vec4::new(1.0, 1.0, 1.0, 1.0)))
}

pub(super) fn add_mesh_node(scene: &mut Scene, name: &str, position: Vec3, material: Material) -> NodeId {
    let graph = scene.graph_mut();
    let id = graph.create_node(name);
    let data = RenderData::with_mesh_and_material(Arc::new(Mesh::cube(0.5)), Arc::new(material));
    graph.attach_render_data(id, data).unwrap();
    graph.attach_transform(id, NodeTransform::from_position(position)).unwrap();
    scene.add_node(id).unwrap();
    id
}
