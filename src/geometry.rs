//! Static geometry: the two cube representations and the screen quad.
//!
//! All vertex data is uploaded once at startup and never mutated. The
//! reduced cube keeps only the four faces that stay visible while the
//! cube spins about its X/Y axes, halving vertex work at the Low tier.
//! The full cube uses 24 unique vertices (four per face, none shared
//! across faces) plus 36 indices; sharing corner vertices between faces
//! would average their normals and break flat per-face shading.

use bytemuck::{Pod, Zeroable};
use glow::HasContext;

use crate::policy::GeometryKind;

/// A cube vertex: position, per-face normal, vertex color.
#[derive(Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct CubeVertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Face normal (unit length, identical for all vertices of a face).
    pub normal: [f32; 3],
    /// RGB vertex color.
    pub color: [f32; 3],
}

/// A screen-quad vertex: clip-space position and texture coordinate.
#[derive(Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct QuadVertex {
    /// Clip-space XY position.
    pub position: [f32; 2],
    /// Texture coordinate.
    pub uv: [f32; 2],
}

const fn cv(position: [f32; 3], normal: [f32; 3], color: [f32; 3]) -> CubeVertex {
    CubeVertex {
        position,
        normal,
        color,
    }
}

/// Reduced cube: front, right, top, and left faces as unindexed triangles
/// (4 faces x 2 triangles x 3 vertices). Low tier only.
#[rustfmt::skip]
pub const REDUCED_CUBE_VERTICES: [CubeVertex; 24] = [
    // Front (+Z)
    cv([-0.5, -0.5,  0.5], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
    cv([ 0.5, -0.5,  0.5], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    cv([ 0.5,  0.5,  0.5], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]),
    cv([-0.5, -0.5,  0.5], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
    cv([ 0.5,  0.5,  0.5], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]),
    cv([-0.5,  0.5,  0.5], [0.0, 0.0, 1.0], [1.0, 1.0, 0.0]),
    // Right (+X)
    cv([ 0.5,  0.5,  0.5], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
    cv([ 0.5,  0.5, -0.5], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
    cv([ 0.5, -0.5, -0.5], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    cv([ 0.5, -0.5, -0.5], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    cv([ 0.5, -0.5,  0.5], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    cv([ 0.5,  0.5,  0.5], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
    // Top (+Y)
    cv([-0.5,  0.5, -0.5], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
    cv([ 0.5,  0.5, -0.5], [0.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
    cv([ 0.5,  0.5,  0.5], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
    cv([ 0.5,  0.5,  0.5], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
    cv([-0.5,  0.5,  0.5], [0.0, 1.0, 0.0], [1.0, 1.0, 1.0]),
    cv([-0.5,  0.5, -0.5], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
    // Left (-X)
    cv([-0.5,  0.5,  0.5], [-1.0, 0.0, 0.0], [1.0, 0.0, 1.0]),
    cv([-0.5,  0.5, -0.5], [-1.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
    cv([-0.5, -0.5, -0.5], [-1.0, 0.0, 0.0], [0.0, 1.0, 1.0]),
    cv([-0.5, -0.5, -0.5], [-1.0, 0.0, 0.0], [0.0, 1.0, 1.0]),
    cv([-0.5, -0.5,  0.5], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    cv([-0.5,  0.5,  0.5], [-1.0, 0.0, 0.0], [1.0, 0.0, 1.0]),
];

/// Full cube: 24 unique vertices, four per face.
#[rustfmt::skip]
pub const FULL_CUBE_VERTICES: [CubeVertex; 24] = [
    // Back (-Z)
    cv([-0.5, -0.5, -0.5], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
    cv([ 0.5, -0.5, -0.5], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    cv([ 0.5,  0.5, -0.5], [0.0, 0.0, -1.0], [0.0, 0.0, 1.0]),
    cv([-0.5,  0.5, -0.5], [0.0, 0.0, -1.0], [1.0, 1.0, 0.0]),
    // Front (+Z)
    cv([-0.5, -0.5,  0.5], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0]),
    cv([ 0.5, -0.5,  0.5], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0]),
    cv([ 0.5,  0.5,  0.5], [0.0, 0.0, 1.0], [1.0, 1.0, 0.0]),
    cv([-0.5,  0.5,  0.5], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]),
    // Left (-X)
    cv([-0.5,  0.5,  0.5], [-1.0, 0.0, 0.0], [1.0, 0.0, 1.0]),
    cv([-0.5,  0.5, -0.5], [-1.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
    cv([-0.5, -0.5, -0.5], [-1.0, 0.0, 0.0], [0.0, 1.0, 1.0]),
    cv([-0.5, -0.5,  0.5], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    // Right (+X)
    cv([ 0.5,  0.5,  0.5], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
    cv([ 0.5,  0.5, -0.5], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
    cv([ 0.5, -0.5, -0.5], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    cv([ 0.5, -0.5,  0.5], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    // Bottom (-Y)
    cv([-0.5, -0.5, -0.5], [0.0, -1.0, 0.0], [0.0, 1.0, 1.0]),
    cv([ 0.5, -0.5, -0.5], [0.0, -1.0, 0.0], [1.0, 0.0, 1.0]),
    cv([ 0.5, -0.5,  0.5], [0.0, -1.0, 0.0], [1.0, 1.0, 0.0]),
    cv([-0.5, -0.5,  0.5], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]),
    // Top (+Y)
    cv([-0.5,  0.5, -0.5], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
    cv([ 0.5,  0.5, -0.5], [0.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
    cv([ 0.5,  0.5,  0.5], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
    cv([-0.5,  0.5,  0.5], [0.0, 1.0, 0.0], [1.0, 1.0, 1.0]),
];

/// Index list for the full cube: two triangles per face.
#[rustfmt::skip]
pub const FULL_CUBE_INDICES: [u32; 36] = [
     0,  1,  2,  2,  3,  0, // back
     4,  5,  6,  6,  7,  4, // front
     8,  9, 10, 10, 11,  8, // left
    12, 13, 14, 14, 15, 12, // right
    16, 17, 18, 18, 19, 16, // bottom
    20, 21, 22, 22, 23, 20, // top
];

const fn qv(position: [f32; 2], uv: [f32; 2]) -> QuadVertex {
    QuadVertex { position, uv }
}

/// Screen-filling quad for the post-process pass.
#[rustfmt::skip]
pub const SCREEN_QUAD_VERTICES: [QuadVertex; 6] = [
    qv([-1.0,  1.0], [0.0, 1.0]),
    qv([-1.0, -1.0], [0.0, 0.0]),
    qv([ 1.0, -1.0], [1.0, 0.0]),
    qv([-1.0,  1.0], [0.0, 1.0]),
    qv([ 1.0, -1.0], [1.0, 0.0]),
    qv([ 1.0,  1.0], [1.0, 1.0]),
];

/// GL objects backing one uploaded mesh.
struct Mesh {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    ebo: Option<glow::Buffer>,
}

/// Owner of all static vertex/index buffers.
///
/// Uploaded once at startup; meshes are immutable afterwards. The store
/// owns its GL objects exclusively — callers only ever bind them for the
/// duration of a draw call.
pub struct GeometryStore {
    reduced_cube: Mesh,
    full_cube: Mesh,
    screen_quad: Mesh,
}

impl GeometryStore {
    /// Upload all three meshes.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context. The caller must ensure
    /// [`destroy`](Self::destroy) runs before the context is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error string if any GL object allocation fails.
    pub unsafe fn new(gl: &glow::Context) -> Result<Self, String> {
        let reduced_cube = unsafe { upload_cube_mesh(gl, &REDUCED_CUBE_VERTICES, None)? };
        let full_cube =
            unsafe { upload_cube_mesh(gl, &FULL_CUBE_VERTICES, Some(&FULL_CUBE_INDICES))? };
        let screen_quad = unsafe { upload_quad_mesh(gl, &SCREEN_QUAD_VERTICES)? };

        Ok(Self {
            reduced_cube,
            full_cube,
            screen_quad,
        })
    }

    /// Draw the requested cube representation with the given vertex or
    /// index count. Indexed drawing is used only for the full cube.
    ///
    /// # Safety
    ///
    /// Requires a current GL context matching the one passed to
    /// [`new`](Self::new); a program must already be bound.
    pub unsafe fn draw_cube(&self, gl: &glow::Context, kind: GeometryKind, count: i32) {
        let mesh = match kind {
            GeometryKind::ReducedCube => &self.reduced_cube,
            GeometryKind::FullCube => &self.full_cube,
        };
        unsafe {
            gl.bind_vertex_array(Some(mesh.vao));
            if mesh.ebo.is_some() {
                gl.draw_elements(glow::TRIANGLES, count, glow::UNSIGNED_INT, 0);
            } else {
                gl.draw_arrays(glow::TRIANGLES, 0, count);
            }
            gl.bind_vertex_array(None);
        }
    }

    /// Draw the screen-filling quad.
    ///
    /// # Safety
    ///
    /// Requires a current GL context matching the one passed to
    /// [`new`](Self::new); the post-process program must already be bound.
    pub unsafe fn draw_screen_quad(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_vertex_array(Some(self.screen_quad.vao));
            gl.draw_arrays(glow::TRIANGLES, 0, 6);
            gl.bind_vertex_array(None);
        }
    }

    /// Release all GPU buffers.
    ///
    /// # Safety
    ///
    /// Must be called with the context used for creation, exactly once.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        for mesh in [&self.reduced_cube, &self.full_cube, &self.screen_quad] {
            unsafe {
                gl.delete_vertex_array(mesh.vao);
                gl.delete_buffer(mesh.vbo);
                if let Some(ebo) = mesh.ebo {
                    gl.delete_buffer(ebo);
                }
            }
        }
    }
}

/// Upload a cube mesh (position + normal + color layout), optionally with
/// an index buffer.
unsafe fn upload_cube_mesh(
    gl: &glow::Context,
    vertices: &[CubeVertex],
    indices: Option<&[u32]>,
) -> Result<Mesh, String> {
    unsafe {
        let vao = gl.create_vertex_array()?;
        let vbo = gl.create_buffer()?;

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(vertices),
            glow::STATIC_DRAW,
        );

        let ebo = match indices {
            Some(indices) => {
                let ebo = gl.create_buffer()?;
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
                gl.buffer_data_u8_slice(
                    glow::ELEMENT_ARRAY_BUFFER,
                    bytemuck::cast_slice(indices),
                    glow::STATIC_DRAW,
                );
                Some(ebo)
            }
            None => None,
        };

        // CubeVertex is 36 bytes — well within i32 range.
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let stride = std::mem::size_of::<CubeVertex>() as i32;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, stride, 12);
        gl.enable_vertex_attrib_array(2);
        gl.vertex_attrib_pointer_f32(2, 3, glow::FLOAT, false, stride, 24);

        gl.bind_vertex_array(None);

        Ok(Mesh { vao, vbo, ebo })
    }
}

/// Upload the screen quad (position + uv layout).
unsafe fn upload_quad_mesh(gl: &glow::Context, vertices: &[QuadVertex]) -> Result<Mesh, String> {
    unsafe {
        let vao = gl.create_vertex_array()?;
        let vbo = gl.create_buffer()?;

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(vertices),
            glow::STATIC_DRAW,
        );

        // QuadVertex is 16 bytes — well within i32 range.
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let stride = std::mem::size_of::<QuadVertex>() as i32;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, stride, 8);

        gl.bind_vertex_array(None);

        Ok(Mesh { vao, vbo, ebo: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn length(v: [f32; 3]) -> f32 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    #[test]
    fn reduced_cube_has_24_vertices_with_unit_normals() {
        assert_eq!(REDUCED_CUBE_VERTICES.len(), 24);
        for v in &REDUCED_CUBE_VERTICES {
            assert!((length(v.normal) - 1.0).abs() < 1.0e-6);
        }
    }

    #[test]
    fn reduced_cube_omits_back_and_bottom_faces() {
        for v in &REDUCED_CUBE_VERTICES {
            assert!(
                v.normal != [0.0, 0.0, -1.0] && v.normal != [0.0, -1.0, 0.0],
                "reduced cube must only contain the visible faces"
            );
        }
    }

    #[test]
    fn full_cube_has_24_unique_vertices_and_36_indices() {
        assert_eq!(FULL_CUBE_VERTICES.len(), 24);
        assert_eq!(FULL_CUBE_INDICES.len(), 36);
        for &i in &FULL_CUBE_INDICES {
            assert!((i as usize) < FULL_CUBE_VERTICES.len());
        }
    }

    #[test]
    fn full_cube_faces_share_one_normal_across_their_four_vertices() {
        for face in 0..6 {
            let base = face * 4;
            let normal = FULL_CUBE_VERTICES[base].normal;
            assert!((length(normal) - 1.0).abs() < 1.0e-6);
            for corner in 1..4 {
                assert_eq!(
                    FULL_CUBE_VERTICES[base + corner].normal,
                    normal,
                    "face {face} has mixed normals"
                );
            }
        }
    }

    #[test]
    fn full_cube_does_not_share_vertices_across_faces() {
        // Every index stays within its face's four-vertex block, which is
        // what keeps flat per-face shading correct.
        for (i, &index) in FULL_CUBE_INDICES.iter().enumerate() {
            let face = i / 6;
            let block = (face * 4)..(face * 4 + 4);
            assert!(block.contains(&(index as usize)));
        }
    }

    #[test]
    fn screen_quad_covers_clip_space() {
        assert_eq!(SCREEN_QUAD_VERTICES.len(), 6);
        let mut corners = [false; 4];
        for v in &SCREEN_QUAD_VERTICES {
            assert!(v.position[0].abs() <= 1.0 && v.position[1].abs() <= 1.0);
            assert!((0.0..=1.0).contains(&v.uv[0]) && (0.0..=1.0).contains(&v.uv[1]));
            match v.position {
                [-1.0, -1.0] => corners[0] = true,
                [1.0, -1.0] => corners[1] = true,
                [-1.0, 1.0] => corners[2] = true,
                [1.0, 1.0] => corners[3] = true,
                _ => {}
            }
        }
        assert!(corners.iter().all(|&c| c), "quad must reach all corners");
    }
}
