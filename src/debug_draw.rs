//! Immediate-mode debug drawing.
//!
//! [`DebugRender`] accumulates colored lines and points over a frame, batches
//! them into one line displayable and one point displayable, draws both, and
//! clears. Nothing persists across frames; callers re-submit every frame the
//! primitives should stay visible.

use glam::{Vec3, Vec4};
use std::sync::Arc;

use crate::context::GpuContext;
use crate::display::{Displayable, LineMeshDisplay, PointCloudDisplay};
use crate::error::GpuMeshResult;
use crate::geometry::mesh::{AttribArrayGeometry, LineMesh};
use crate::geometry::{Attrib, ATTRIB_COLOR};
use crate::shader::ShaderProgram;

/// Accumulator of per-frame debug primitives.
#[derive(Default)]
pub struct DebugRender {
    line_positions: Vec<Vec3>,
    line_colors: Vec<Vec4>,
    line_indices: Vec<[u32; 2]>,
    point_positions: Vec<Vec3>,
    point_colors: Vec<Vec4>,
}

impl DebugRender {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one line segment.
    pub fn add_line(&mut self, from: Vec3, to: Vec3, color: Vec4) {
        let base = self.line_positions.len() as u32;
        self.line_positions.push(from);
        self.line_positions.push(to);
        self.line_colors.push(color);
        self.line_colors.push(color);
        self.line_indices.push([base, base + 1]);
    }

    /// Queue an axis-aligned cross centered at `pos`.
    pub fn add_cross(&mut self, pos: Vec3, size: f32, color: Vec4) {
        let half = size * 0.5;
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            self.add_line(pos - axis * half, pos + axis * half, color);
        }
    }

    /// Queue the twelve edges of an axis-aligned box.
    pub fn add_aabb(&mut self, min: Vec3, max: Vec3, color: Vec4) {
        let corner = |x: bool, y: bool, z: bool| {
            Vec3::new(
                if x { max.x } else { min.x },
                if y { max.y } else { min.y },
                if z { max.z } else { min.z },
            )
        };
        for (a, b) in [
            // Bottom face
            (corner(false, false, false), corner(true, false, false)),
            (corner(true, false, false), corner(true, false, true)),
            (corner(true, false, true), corner(false, false, true)),
            (corner(false, false, true), corner(false, false, false)),
            // Top face
            (corner(false, true, false), corner(true, true, false)),
            (corner(true, true, false), corner(true, true, true)),
            (corner(true, true, true), corner(false, true, true)),
            (corner(false, true, true), corner(false, true, false)),
            // Verticals
            (corner(false, false, false), corner(false, true, false)),
            (corner(true, false, false), corner(true, true, false)),
            (corner(true, false, true), corner(true, true, true)),
            (corner(false, false, true), corner(false, true, true)),
        ] {
            self.add_line(a, b, color);
        }
    }

    /// Queue one point.
    pub fn add_point(&mut self, point: Vec3, color: Vec4) {
        self.point_positions.push(point);
        self.point_colors.push(color);
    }

    /// Queue a batch of points sharing one color.
    pub fn add_points(&mut self, points: &[Vec3], color: Vec4) {
        self.point_positions.extend_from_slice(points);
        self.point_colors.extend(std::iter::repeat(color).take(points.len()));
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.line_indices.is_empty() && self.point_positions.is_empty()
    }

    /// Number of queued line segments.
    pub fn num_lines(&self) -> usize {
        self.line_indices.len()
    }

    /// Number of queued points.
    pub fn num_points(&self) -> usize {
        self.point_positions.len()
    }

    /// Draw and clear everything queued this frame.
    ///
    /// Line and point batches draw with their respective programs; empty
    /// batches are skipped entirely.
    pub fn render(
        &mut self,
        ctx: &Arc<GpuContext>,
        line_program: &ShaderProgram,
        point_program: &ShaderProgram,
    ) -> GpuMeshResult<()> {
        if !self.line_indices.is_empty() {
            let geometry = LineMesh::new(&self.line_positions, std::mem::take(&mut self.line_indices))
                .with_attrib(Attrib::vec4(ATTRIB_COLOR, &self.line_colors));
            let mut display = LineMeshDisplay::new("debug_lines", geometry);
            display.render(ctx, line_program)?;
        }
        if !self.point_positions.is_empty() {
            let geometry = AttribArrayGeometry::from_positions(&self.point_positions)
                .with_attrib(Attrib::vec4(ATTRIB_COLOR, &self.point_colors));
            let mut display = PointCloudDisplay::new("debug_points", geometry);
            display.render(ctx, point_program)?;
        }
        self.clear();
        Ok(())
    }

    /// Drop everything queued without drawing.
    pub fn clear(&mut self) {
        self.line_positions.clear();
        self.line_colors.clear();
        self.line_indices.clear();
        self.point_positions.clear();
        self.point_colors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{DrawCall, RenderMode};
    use crate::geometry::ATTRIB_POSITION;

    fn progs() -> (ShaderProgram, ShaderProgram) {
        // Debug programs put position at 0 and color at 5 by convention
        let lines = ShaderProgram::new("debug_lines")
            .with_attribute(ATTRIB_POSITION, 0)
            .with_attribute(ATTRIB_COLOR, 5);
        let points = ShaderProgram::new("debug_points")
            .with_attribute(ATTRIB_POSITION, 0)
            .with_attribute(ATTRIB_COLOR, 5);
        (lines, points)
    }

    #[test]
    fn test_accumulation_counts() {
        let mut debug = DebugRender::new();
        debug.add_line(Vec3::ZERO, Vec3::X, Vec4::ONE);
        debug.add_cross(Vec3::ZERO, 1.0, Vec4::ONE);
        debug.add_aabb(Vec3::ZERO, Vec3::ONE, Vec4::ONE);
        debug.add_point(Vec3::ZERO, Vec4::ONE);
        debug.add_points(&[Vec3::X, Vec3::Y], Vec4::ONE);

        assert_eq!(debug.num_lines(), 1 + 3 + 12);
        assert_eq!(debug.num_points(), 3);
    }

    #[test]
    fn test_render_draws_and_clears() {
        let ctx = GpuContext::new();
        let (line_prog, point_prog) = progs();
        let mut debug = DebugRender::new();
        debug.add_line(Vec3::ZERO, Vec3::X, Vec4::ONE);
        debug.add_point(Vec3::Y, Vec4::ONE);

        debug.render(&ctx, &line_prog, &point_prog).unwrap();
        assert!(debug.is_empty());

        let calls = ctx.take_draw_calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(
            calls[0],
            DrawCall::Elements {
                mode: RenderMode::Lines,
                count: 2,
                ..
            }
        ));
        assert!(matches!(
            calls[1],
            DrawCall::Arrays {
                mode: RenderMode::Points,
                first: 0,
                count: 1
            }
        ));
    }

    #[test]
    fn test_empty_render_is_a_noop() {
        let ctx = GpuContext::new();
        let (line_prog, point_prog) = progs();
        DebugRender::new()
            .render(&ctx, &line_prog, &point_prog)
            .unwrap();
        assert!(ctx.take_draw_calls().is_empty());
        assert_eq!(ctx.upload_count(), 0);
    }
}
