//! Render-pass tests: culling, skipping, post effects, fallbacks, state

use super::*;
use crate::core::config::RendererConfig;
use crate::render::headless::{RecordingSurface, SurfaceCommand};
use crate::render::post_effect::PingPong;
use crate::render::shader::ShaderType;
use crate::render::stats::DRAW_TIME_WINDOW;
use crate::render::surface::{Capability, Face, FramebufferId, RenderTarget};
use crate::render::{RenderError, SceneRenderer};
use crate::scene::components::{CullFace, PolygonOffset, PostEffectData, RenderQueue};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn screen() -> RenderTarget {
        RenderTarget::screen(WIDTH, HEIGHT)
    }

    fn render(fixture: &mut Fixture, renderer: &mut SceneRenderer, surface: &mut RecordingSurface) -> crate::render::FrameReport {
        renderer
            .render_camera(&mut fixture.scene, fixture.camera, &screen(), surface)
            .unwrap()
    }

    #[test]
    fn test_node_at_origin_is_kept_and_drawn_once() {
        let mut fixture = Fixture::at_origin();
        let vp = fixture.view_projection();
        let (cube, camera) = (fixture.cube, fixture.camera);
        assert!(!fixture.scene.graph_mut().cull(cube, camera, &vp).unwrap());

        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        let report = render(&mut fixture, &mut renderer, &mut surface);

        assert!(!report.skipped);
        assert_eq!(report.visible, 1);
        assert_eq!(report.draw_calls, 1);
        assert_eq!(report.triangles, 12);
        assert_eq!(renderer.draw_list().nodes(), vec![cube]);
        assert_eq!(surface.draws(), vec![("unlit", FramebufferId::DEFAULT, None)]);
        assert_eq!(surface.clear_count(), 1);
    }

    #[test]
    fn test_node_beyond_far_plane_is_culled() {
        let mut fixture = Fixture::new(SceneSettings::default(), -500.0);
        let vp = fixture.view_projection();
        let (cube, camera) = (fixture.cube, fixture.camera);
        assert!(fixture.scene.graph_mut().cull(cube, camera, &vp).unwrap());

        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        let report = render(&mut fixture, &mut renderer, &mut surface);

        assert_eq!(report.culled, 1);
        assert_eq!(report.draw_calls, 0);
        assert_eq!(surface.draw_count(), 0);
        assert!(!fixture.scene.graph().node(cube).unwrap().in_frustum());
    }

    #[test]
    fn test_frustum_culling_off_draws_everything() {
        let settings = SceneSettings::default().with_frustum_culling(false);
        let mut fixture = Fixture::new(settings, -500.0);
        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);

        let report = render(&mut fixture, &mut renderer, &mut surface);
        assert_eq!(report.culled, 0);
        assert_eq!(report.draw_calls, 1);
    }

    #[test]
    fn test_clean_scene_issues_no_draws_or_clears() {
        let mut fixture = Fixture::at_origin();
        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);

        render(&mut fixture, &mut renderer, &mut surface);
        fixture.scene.end_frame();
        surface.take_commands();

        let report = render(&mut fixture, &mut renderer, &mut surface);
        assert!(report.skipped);
        assert_eq!(report.draw_calls, 0);
        assert_eq!(surface.draw_count(), 0);
        assert_eq!(surface.clear_count(), 0);
        assert!(surface.commands().is_empty());
    }

    #[test]
    fn test_two_post_effects_alternate_ping_pong_targets() {
        let mut fixture = Fixture::at_origin();
        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        renderer.create_post_effect_targets(&mut surface, WIDTH, HEIGHT).unwrap();

        let lens = fixture.scene.graph_mut().camera_mut(fixture.camera).unwrap();
        lens.add_post_effect(PostEffectData::color_blend(Vec3::new(1.0, 0.0, 0.0), 0.25));
        lens.add_post_effect(PostEffectData::horizontal_flip());

        let report = render(&mut fixture, &mut renderer, &mut surface);
        assert_eq!(report.draw_calls, 1);

        let targets = *renderer.post_effect_targets().unwrap();
        let (a, b) = (targets.get(PingPong::A), targets.get(PingPong::B));
        assert_eq!(
            surface.draws(),
            vec![
                ("unlit", a.framebuffer, None),
                ("color_blend", b.framebuffer, Some(a.texture)),
                ("horizontal_flip", FramebufferId::DEFAULT, Some(b.texture)),
            ]
        );
        assert_eq!(surface.clear_count(), 3);
        assert_eq!(surface.bound_target(), screen());
    }

    #[test]
    fn test_composites_run_without_depth_test_or_culling() {
        let mut fixture = Fixture::at_origin();
        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        renderer.create_post_effect_targets(&mut surface, WIDTH, HEIGHT).unwrap();
        fixture
            .scene
            .graph_mut()
            .camera_mut(fixture.camera)
            .unwrap()
            .add_post_effect(PostEffectData::horizontal_flip());

        render(&mut fixture, &mut renderer, &mut surface);
        assert!(!surface.capability(Capability::DepthTest));
        assert!(!surface.capability(Capability::CullFace));
    }

    #[test]
    fn test_post_effects_without_targets_fail_the_pass() {
        let mut fixture = Fixture::at_origin();
        fixture
            .scene
            .graph_mut()
            .camera_mut(fixture.camera)
            .unwrap()
            .add_post_effect(PostEffectData::horizontal_flip());

        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        let result = renderer.render_camera(&mut fixture.scene, fixture.camera, &screen(), &mut surface);
        assert!(matches!(result, Err(RenderError::PostEffectTargetsMissing)));
        assert_eq!(surface.draw_count(), 0);
    }

    #[test]
    fn test_failing_program_falls_back_to_error_shader() {
        let mut fixture = Fixture::at_origin();
        let second = add_cube(&mut fixture.scene, "second", Vec3::new(1.0, 0.0, 0.0));
        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        surface.fail_program("unlit");

        let report = render(&mut fixture, &mut renderer, &mut surface);
        assert_eq!(report.draw_calls, 2);
        assert_eq!(renderer.draw_list().len(), 2);
        assert!(renderer.draw_list().nodes().contains(&second));
        assert!(surface.draws().iter().all(|d| d.0 == "error"));
    }

    #[test]
    fn test_unregistered_shader_type_uses_error_shader() {
        let mut fixture = Fixture::new(SceneSettings::default(), 10.0);
        add_mesh_node(
            &mut fixture.scene,
            "custom",
            Vec3::zeros(),
            Material::new(ShaderType::custom(7)),
        );
        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);

        let report = render(&mut fixture, &mut renderer, &mut surface);
        assert_eq!(report.draw_calls, 1);
        assert_eq!(surface.draws(), vec![("error", FramebufferId::DEFAULT, None)]);
    }

    #[test]
    fn test_render_mask_skips_other_eye() {
        let mut fixture = Fixture::at_origin();
        fixture.scene.graph_mut().render_data_mut(fixture.cube).unwrap().render_mask = RenderMask::LEFT;
        let right = add_camera(&mut fixture.scene, RenderMask::RIGHT, 5.0);
        let left = add_camera(&mut fixture.scene, RenderMask::LEFT, 5.0);

        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);

        let report = renderer.render_camera(&mut fixture.scene, right, &screen(), &mut surface).unwrap();
        assert_eq!(report.visible, 1);
        assert_eq!(report.draw_calls, 0);

        let report = renderer.render_camera(&mut fixture.scene, left, &screen(), &mut surface).unwrap();
        assert_eq!(report.draw_calls, 1);
    }

    #[test]
    fn test_transparent_drawn_after_opaque_back_to_front() {
        let mut fixture = Fixture::new(SceneSettings::default(), 10.0);
        let glass = Material::unlit(Vec4::new(1.0, 1.0, 1.0, 1.0)).with_opacity(0.5);
        let near_glass = add_mesh_node(&mut fixture.scene, "near glass", Vec3::new(0.0, 0.0, 2.0), glass.clone());
        let far_glass = add_mesh_node(&mut fixture.scene, "far glass", Vec3::new(0.0, 0.0, -2.0), glass);
        let wall = add_cube(&mut fixture.scene, "wall", Vec3::new(0.0, 0.0, -4.0));

        let rendering_order = fixture.scene.graph().node(near_glass).unwrap().render_data().unwrap().rendering_order;
        assert_eq!(rendering_order, RenderQueue::TRANSPARENT);

        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        render(&mut fixture, &mut renderer, &mut surface);

        assert_eq!(renderer.draw_list().nodes(), vec![wall, far_glass, near_glass]);
    }

    #[test]
    fn test_transparent_order_without_frustum_culling() {
        let settings = SceneSettings::default().with_frustum_culling(false);
        let mut fixture = Fixture::new(settings, 10.0);
        let glass = Material::unlit(Vec4::new(1.0, 1.0, 1.0, 1.0)).with_opacity(0.5);
        let near_glass = add_mesh_node(&mut fixture.scene, "near glass", Vec3::new(0.0, 0.0, 2.0), glass.clone());
        let far_glass = add_mesh_node(&mut fixture.scene, "far glass", Vec3::new(0.0, 0.0, -2.0), glass);

        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        render(&mut fixture, &mut renderer, &mut surface);

        assert_eq!(renderer.draw_list().nodes(), vec![fixture.cube, far_glass, near_glass]);
        let graph = fixture.scene.graph();
        let distance = |id| graph.node(id).unwrap().render_data().unwrap().camera_distance();
        assert_relative_eq!(distance(near_glass), 9.0, epsilon = 1e-3);
        assert_relative_eq!(distance(far_glass), 49.0, epsilon = 1e-3);
    }

    #[test]
    fn test_custom_render_order_is_used() {
        let mut fixture = Fixture::at_origin();
        let behind = add_cube(&mut fixture.scene, "behind", Vec3::new(0.0, 0.0, -3.0));
        let mut renderer = SceneRenderer::default();
        renderer.set_render_order(|a, b| b.camera_distance.total_cmp(&a.camera_distance));
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);

        render(&mut fixture, &mut renderer, &mut surface);
        assert_eq!(renderer.draw_list().nodes(), vec![behind, fixture.cube]);
    }

    #[test]
    fn test_per_draw_state_is_overridden_and_restored() {
        let mut fixture = Fixture::at_origin();
        {
            let data = fixture.scene.graph_mut().render_data_mut(fixture.cube).unwrap();
            data.cull_face = CullFace::None;
            data.depth_test = false;
        }
        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        render(&mut fixture, &mut renderer, &mut surface);

        let commands = surface.commands();
        let draw = commands
            .iter()
            .position(|c| matches!(c, SurfaceCommand::Draw { .. }))
            .unwrap();
        let before = &commands[..draw];
        let after = &commands[draw + 1..];

        assert!(before.ends_with(&[
            SurfaceCommand::SetCapability(Capability::CullFace, false),
            SurfaceCommand::SetCapability(Capability::DepthTest, false),
        ]));
        assert_eq!(
            after,
            &[
                SurfaceCommand::SetCapability(Capability::CullFace, true),
                SurfaceCommand::SetCapability(Capability::DepthTest, true),
            ]
        );
        assert!(surface.capability(Capability::Blend));
        assert!(!surface.capability(Capability::PolygonOffsetFill));
    }

    /// Render the fixture cube with `configure` applied and split the
    /// recorded commands around its draw
    fn commands_around_draw(configure: impl FnOnce(&mut RenderData)) -> (Vec<SurfaceCommand>, Vec<SurfaceCommand>) {
        let mut fixture = Fixture::at_origin();
        configure(fixture.scene.graph_mut().render_data_mut(fixture.cube).unwrap());
        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        render(&mut fixture, &mut renderer, &mut surface);

        let commands = surface.commands();
        let draw = commands
            .iter()
            .position(|c| matches!(c, SurfaceCommand::Draw { .. }))
            .unwrap();
        (commands[..draw].to_vec(), commands[draw + 1..].to_vec())
    }

    #[test]
    fn test_opaque_blend_override_is_restored() {
        let (before, after) = commands_around_draw(|data| data.alpha_blend = false);
        assert_eq!(before.last(), Some(&SurfaceCommand::SetCapability(Capability::Blend, false)));
        assert_eq!(after, vec![SurfaceCommand::SetCapability(Capability::Blend, true)]);
    }

    #[test]
    fn test_polygon_offset_override_is_restored() {
        let (before, after) = commands_around_draw(|data| {
            data.polygon_offset = Some(PolygonOffset { factor: 1.5, units: 2.0 });
        });
        assert!(before.ends_with(&[
            SurfaceCommand::SetCapability(Capability::PolygonOffsetFill, true),
            SurfaceCommand::PolygonOffset { factor: 1.5, units: 2.0 },
        ]));
        assert_eq!(after, vec![SurfaceCommand::SetCapability(Capability::PolygonOffsetFill, false)]);
    }

    #[test]
    fn test_front_face_culling_override_is_restored() {
        let (before, after) = commands_around_draw(|data| data.cull_face = CullFace::Front);
        assert_eq!(before.last(), Some(&SurfaceCommand::CullFace(Face::Front)));
        assert_eq!(after, vec![SurfaceCommand::CullFace(Face::Back)]);
    }

    #[test]
    fn test_missing_camera_component_is_an_error() {
        let mut fixture = Fixture::at_origin();
        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        let result = renderer.render_camera(&mut fixture.scene, fixture.cube, &screen(), &mut surface);
        assert!(matches!(result, Err(RenderError::CameraMissing(id)) if id == fixture.cube));
    }

    #[test]
    fn test_singular_camera_transform_is_an_error() {
        let mut fixture = Fixture::at_origin();
        let camera = fixture.camera;
        fixture
            .scene
            .graph_mut()
            .update_transform(camera, |t| t.set_scale(Vec3::zeros()))
            .unwrap();
        let mut renderer = SceneRenderer::default();
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT);
        let result = renderer.render_camera(&mut fixture.scene, camera, &screen(), &mut surface);
        assert!(matches!(result, Err(RenderError::SingularView(id)) if id == camera));
    }

    #[test]
    fn test_stereo_stats_average_after_window() {
        let settings = SceneSettings::default().with_stats(true);
        let mut fixture = Fixture::new(settings, 0.0);
        let left = add_camera(&mut fixture.scene, RenderMask::LEFT, 5.0);
        let right = add_camera(&mut fixture.scene, RenderMask::RIGHT, 5.0);

        let mut renderer = SceneRenderer::new(RendererConfig::default());
        let mut surface = RecordingSurface::new(WIDTH, HEIGHT).with_timer_queries(1_500_000);

        for _ in 0..DRAW_TIME_WINDOW {
            for eye in [left, right] {
                renderer.render_camera(&mut fixture.scene, eye, &screen(), &mut surface).unwrap();
            }
            fixture.scene.end_frame();
        }

        assert_eq!(renderer.stats().frame_count(), DRAW_TIME_WINDOW);
        assert_relative_eq!(renderer.stats().average_draw_time_ms(), 3.0, epsilon = 1e-4);
    }
}
