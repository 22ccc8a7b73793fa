//! Per-renderer frame statistics
//!
//! Draw-call and triangle counters for the current pass plus GPU timing with
//! double-buffered timer queries: the query ended this frame is read back on
//! the next one, so reading never waits on the GPU.

use crate::scene::QueryId;
use crate::scene::components::RenderMask;
use super::surface::{GpuSurface, QueryKind};

/// Frames averaged into [`FrameStats::average_draw_time_ms`]
pub const DRAW_TIME_WINDOW: u64 = 10;

/// Outcome of one `render_camera` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// The scene was clean and nothing was drawn
    pub skipped: bool,
    /// Draw calls issued for scene content
    pub draw_calls: u32,
    /// Triangles submitted for scene content
    pub triangles: u64,
    /// Render data entries that made it into the draw list
    pub visible: usize,
    /// Render data entries rejected by culling
    pub culled: usize,
}

/// Counters and GPU timers owned by one renderer
#[derive(Debug)]
pub struct FrameStats {
    draw_calls: u32,
    triangles: u64,
    monoscopic: bool,
    queries: [[QueryId; 2]; 2],
    current_query: usize,
    last_query: usize,
    timer_running: bool,
    draw_time_ms: f32,
    average_draw_time_ms: f32,
    frame_count: u64,
}

impl FrameStats {
    /// Fresh statistics; `monoscopic` renders one camera per frame
    pub fn new(monoscopic: bool) -> Self {
        Self {
            draw_calls: 0,
            triangles: 0,
            monoscopic,
            queries: [[QueryId::next(), QueryId::next()], [QueryId::next(), QueryId::next()]],
            current_query: 0,
            last_query: 0,
            timer_running: false,
            draw_time_ms: 0.0,
            average_draw_time_ms: 0.0,
            frame_count: 0,
        }
    }

    /// Timer slot of a camera: 1 for a right-eye-only camera, 0 otherwise
    pub fn eye_index(mask: RenderMask) -> usize {
        usize::from(mask == RenderMask::RIGHT)
    }

    /// Zero the per-pass counters
    pub fn reset_counters(&mut self) {
        self.draw_calls = 0;
        self.triangles = 0;
    }

    /// Count one draw call
    pub fn record_draw(&mut self, triangles: usize) {
        self.draw_calls += 1;
        self.triangles += triangles as u64;
    }

    /// Draw calls in the current pass
    pub fn draw_calls(&self) -> u32 {
        self.draw_calls
    }

    /// Triangles in the current pass
    pub fn triangles(&self) -> u64 {
        self.triangles
    }

    /// GPU draw time averaged over the last full window, in milliseconds
    pub fn average_draw_time_ms(&self) -> f32 {
        self.average_draw_time_ms
    }

    /// Frames whose timing has been accumulated
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Whether one camera makes a frame
    pub fn is_monoscopic(&self) -> bool {
        self.monoscopic
    }

    /// Switch between stereo and monoscopic accumulation
    pub fn set_monoscopic(&mut self, monoscopic: bool) {
        self.monoscopic = monoscopic;
    }

    /// Begin timing `eye`'s pass; no-op without timer support
    pub fn start_gpu_timer(&mut self, surface: &mut dyn GpuSurface, eye: usize) {
        if !surface.supports_timer_queries() || self.timer_running {
            return;
        }
        surface.begin_query(QueryKind::TimeElapsed, self.queries[eye][self.current_query]);
        self.timer_running = true;
    }

    /// End timing `eye`'s pass.
    ///
    /// In stereo mode the frame is accounted after the right eye (both eyes'
    /// previous results are read); in monoscopic mode after every camera.
    pub fn stop_gpu_timer(&mut self, surface: &mut dyn GpuSurface, eye: usize) {
        if !self.timer_running {
            return;
        }
        surface.end_query(QueryKind::TimeElapsed);
        self.timer_running = false;

        if eye == 0 && !self.monoscopic {
            return;
        }

        let disjoint = surface.take_disjoint();
        if disjoint {
            log::debug!("GPU disjoint event, discarding timer results");
        }
        self.draw_time_ms += self.gpu_timer_result(surface, 0, disjoint);
        if !self.monoscopic {
            self.draw_time_ms += self.gpu_timer_result(surface, 1, disjoint);
        }

        self.last_query = self.current_query;
        self.current_query = 1 - self.current_query;

        self.frame_count += 1;
        if self.frame_count % DRAW_TIME_WINDOW == 0 {
            self.average_draw_time_ms = self.draw_time_ms / DRAW_TIME_WINDOW as f32;
            self.draw_time_ms = 0.0;
        }
    }

    fn gpu_timer_result(&self, surface: &mut dyn GpuSurface, eye: usize, disjoint: bool) -> f32 {
        let id = self.queries[eye][self.last_query];
        if disjoint || !surface.is_query_available(id) {
            return 0.0;
        }
        (surface.query_result(id) as f64 / 1_000_000.0) as f32
    }

    /// Delete the timer queries from the surface
    pub fn release_queries(&self, surface: &mut dyn GpuSurface) {
        for id in self.queries.iter().flatten() {
            surface.delete_query(*id);
        }
    }
}
