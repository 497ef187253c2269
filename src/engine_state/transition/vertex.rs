//! Vertex format for the busy-mode transition.
//!
//! The snapshot of the last pre-busy frame is drawn as textured quads. Each
//! vertex carries its own alpha so a crossfade and a wipe share one layout.

/// A vertex of the transition overlay.
///
/// # Memory Layout
/// - Position: [f32; 2] in pixels, origin at the top-left (8 bytes)
/// - Texture Coordinates: [f32; 2] into the snapshot, normalized (8 bytes)
/// - Alpha: f32 (4 bytes)
///
/// Total size: 20 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransitionVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    pub alpha: f32,
}

impl TransitionVertex {
    pub fn new(x: f32, y: f32, u: f32, v: f32, alpha: f32) -> Self {
        Self {
            position: [x, y],
            tex_coords: [u, v],
            alpha,
        }
    }
}

/// Emits two triangles for an axis-aligned quad.
///
/// `top_left_y`/`top_right_y` let wipe columns slant between neighbours.
pub(super) fn push_quad(
    vertices: &mut Vec<TransitionVertex>,
    x: (f32, f32),
    top_y: (f32, f32),
    height: f32,
    u: (f32, f32),
    alpha: f32,
) {
    let (x0, x1) = x;
    let (y0, y1) = top_y;
    let (u0, u1) = u;

    let top_left = TransitionVertex::new(x0, y0, u0, 0.0, alpha);
    let top_right = TransitionVertex::new(x1, y1, u1, 0.0, alpha);
    let bottom_left = TransitionVertex::new(x0, y0 + height, u0, 1.0, alpha);
    let bottom_right = TransitionVertex::new(x1, y1 + height, u1, 1.0, alpha);

    vertices.extend_from_slice(&[
        top_left,
        bottom_left,
        top_right,
        top_right,
        bottom_left,
        bottom_right,
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertices_cast_to_bytes_without_padding() {
        let vertices = [TransitionVertex::new(1.0, 2.0, 0.0, 1.0, 0.5); 3];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 3 * std::mem::size_of::<TransitionVertex>());
        assert_eq!(std::mem::size_of::<TransitionVertex>(), 20);
    }
}
