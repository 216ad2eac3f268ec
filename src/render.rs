//! Per-frame rendering: the geometry pass into a tier's offscreen target
//! and the pixelation post-process into the default framebuffer.
//!
//! [`Renderer`] owns all GL state for both passes: the tier programs and
//! their cached uniform locations, the framebuffer pool, and the geometry
//! store. Construction is all-or-nothing; any shader, buffer, or
//! framebuffer failure aborts startup so the render loop never runs
//! against partially-initialized GPU state.

use glam::{Mat4, Vec3};
use glow::HasContext;
use tracing::warn;

use crate::error::SetupError;
use crate::framebuffer::TieredFramebufferPool;
use crate::geometry::GeometryStore;
use crate::policy::{Lighting, Tier, TIER_COUNT};
use crate::shaders::{self, ShaderPair, CUBE_FLAT, CUBE_LAMBERT, CUBE_PHONG, PIXELATE};

/// World-space light position.
const LIGHT_POSITION: [f32; 3] = [-2.0, 3.0, 2.0];

/// Light color (white).
const LIGHT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Ambient term for the full lighting model.
const AMBIENT_COLOR: [f32; 3] = [0.3, 0.3, 0.3];

/// Clear color for both passes.
const CLEAR_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 1.0];

/// Vertical field of view in degrees.
const FOV_Y_DEGREES: f32 = 45.0;

/// Near clip plane.
const Z_NEAR: f32 = 0.1;

/// Far clip plane.
const Z_FAR: f32 = 100.0;

/// Camera distance limits.
const MIN_CAMERA_DISTANCE: f32 = 2.0;
const MAX_CAMERA_DISTANCE: f32 = 10.0;

/// Convert a `u32` to `i32` for GL API calls.
///
/// # Panics
///
/// Panics if `value > i32::MAX`. In practice, this is unreachable for
/// normal viewport dimensions.
pub(crate) fn gl_size(value: u32) -> i32 {
    i32::try_from(value).expect("dimension exceeds i32::MAX")
}

/// Camera state driving the view and model transforms.
///
/// The camera sits on the +Z axis looking at the origin; the cube itself
/// carries the two rotation angles.
#[derive(Debug, Clone, Copy)]
pub struct CameraState {
    /// Distance from the origin along +Z.
    pub distance: f32,
    /// Cube rotation about the X axis, in degrees.
    pub rotation_x: f32,
    /// Cube rotation about the Y axis, in degrees.
    pub rotation_y: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            distance: 5.0,
            rotation_x: 0.0,
            rotation_y: 0.0,
        }
    }
}

impl CameraState {
    /// Camera position in world space.
    pub fn eye(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.distance)
    }

    /// View matrix: camera at [`eye`](Self::eye) looking at the origin,
    /// +Y up.
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y)
    }

    /// Model matrix: X rotation applied after Y rotation.
    pub fn model(&self) -> Mat4 {
        Mat4::from_rotation_x(self.rotation_x.to_radians())
            * Mat4::from_rotation_y(self.rotation_y.to_radians())
    }

    /// Adjust both rotation angles by the given degree deltas.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.rotation_x += dx;
        self.rotation_y += dy;
    }

    /// Move the camera along +Z, clamped to the working range.
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance + delta).clamp(MIN_CAMERA_DISTANCE, MAX_CAMERA_DISTANCE);
    }
}

/// Cached uniform locations for a cube program.
///
/// Every location is optional: lower-tier programs deliberately omit the
/// lighting uniforms, and a hot-reloaded program may drop any of them.
/// Setting a `None` location is a GL no-op, so rendering never panics on
/// a missing uniform.
struct CubeUniforms {
    model: Option<glow::UniformLocation>,
    view: Option<glow::UniformLocation>,
    projection: Option<glow::UniformLocation>,
    light_pos: Option<glow::UniformLocation>,
    light_color: Option<glow::UniformLocation>,
    view_pos: Option<glow::UniformLocation>,
    ambient_color: Option<glow::UniformLocation>,
}

impl CubeUniforms {
    unsafe fn locate(gl: &glow::Context, program: glow::Program) -> Self {
        unsafe {
            Self {
                model: gl.get_uniform_location(program, "u_model"),
                view: gl.get_uniform_location(program, "u_view"),
                projection: gl.get_uniform_location(program, "u_projection"),
                light_pos: gl.get_uniform_location(program, "u_light_pos"),
                light_color: gl.get_uniform_location(program, "u_light_color"),
                view_pos: gl.get_uniform_location(program, "u_view_pos"),
                ambient_color: gl.get_uniform_location(program, "u_ambient_color"),
            }
        }
    }
}

/// Cached uniform locations for the pixelation program.
struct PixelateUniforms {
    screen_texture: Option<glow::UniformLocation>,
    pixel_size: Option<glow::UniformLocation>,
}

impl PixelateUniforms {
    unsafe fn locate(gl: &glow::Context, program: glow::Program) -> Self {
        unsafe {
            Self {
                screen_texture: gl.get_uniform_location(program, "u_screen_texture"),
                pixel_size: gl.get_uniform_location(program, "u_pixel_size"),
            }
        }
    }
}

/// One tier's compiled program with its source pair and uniform cache.
struct TierProgram {
    pair: ShaderPair,
    program: glow::Program,
    uniforms: CubeUniforms,
}

/// Owner of all rendering GL state; executes the two per-frame passes.
pub struct Renderer {
    pool: TieredFramebufferPool,
    geometry: GeometryStore,
    tier_programs: [TierProgram; TIER_COUNT],
    pixelate_program: glow::Program,
    pixelate_uniforms: PixelateUniforms,
}

impl Renderer {
    /// Compile every program, allocate the framebuffer pool, and upload
    /// all geometry.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context. The caller must ensure
    /// [`destroy`](Self::destroy) is called before the context is dropped.
    ///
    /// # Errors
    ///
    /// Any shader compile/link failure, GL allocation failure, or
    /// incomplete framebuffer is returned; the caller aborts startup.
    pub unsafe fn new(gl: &glow::Context) -> Result<Self, SetupError> {
        let tier_programs = [
            unsafe { build_tier_program(gl, CUBE_FLAT)? },
            unsafe { build_tier_program(gl, CUBE_LAMBERT)? },
            unsafe { build_tier_program(gl, CUBE_PHONG)? },
        ];

        let (vertex, fragment) = PIXELATE.resolve();
        let pixelate_program = unsafe { shaders::compile_program(gl, &vertex, &fragment) }
            .map_err(|log| SetupError::Shader {
                name: PIXELATE.name,
                log,
            })?;
        let pixelate_uniforms = unsafe { PixelateUniforms::locate(gl, pixelate_program) };

        let resolutions = [
            Tier::Low.profile().resolution,
            Tier::Medium.profile().resolution,
            Tier::High.profile().resolution,
        ];
        let pool = unsafe { TieredFramebufferPool::new(gl, resolutions)? };

        let geometry = unsafe { GeometryStore::new(gl) }.map_err(|message| {
            SetupError::Allocation {
                resource: "geometry buffers",
                message,
            }
        })?;

        Ok(Self {
            pool,
            geometry,
            tier_programs,
            pixelate_program,
            pixelate_uniforms,
        })
    }

    /// Render one frame: geometry pass into the tier's offscreen target,
    /// then the pixelation pass into the default framebuffer at
    /// `display_size`.
    ///
    /// # Safety
    ///
    /// Requires a current GL context matching the one passed to
    /// [`new`](Self::new).
    pub unsafe fn render_frame(
        &self,
        gl: &glow::Context,
        tier: Tier,
        camera: &CameraState,
        display_size: (u32, u32),
    ) {
        unsafe {
            self.geometry_pass(gl, tier, camera);
            self.post_process_pass(gl, tier, display_size);
        }
    }

    /// First pass: draw the cube into the tier's framebuffer at the
    /// tier's fixed resolution, with the tier's program and lighting set.
    unsafe fn geometry_pass(&self, gl: &glow::Context, tier: Tier, camera: &CameraState) {
        let profile = tier.profile();
        let (width, height) = profile.resolution;

        unsafe {
            self.pool.bind(gl, tier.index());
            gl.viewport(0, 0, gl_size(width), gl_size(height));
            gl.clear_color(
                CLEAR_COLOR[0],
                CLEAR_COLOR[1],
                CLEAR_COLOR[2],
                CLEAR_COLOR[3],
            );
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            gl.enable(glow::DEPTH_TEST);

            let tier_program = &self.tier_programs[tier.index()];
            gl.use_program(Some(tier_program.program));
            let u = &tier_program.uniforms;

            // Precision loss is acceptable: resolutions are small relative
            // to the f32 mantissa range.
            #[expect(clippy::cast_precision_loss)]
            let aspect = width as f32 / height as f32;
            let projection =
                Mat4::perspective_rh_gl(FOV_Y_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR);

            gl.uniform_matrix_4_f32_slice(u.model.as_ref(), false, &camera.model().to_cols_array());
            gl.uniform_matrix_4_f32_slice(u.view.as_ref(), false, &camera.view().to_cols_array());
            gl.uniform_matrix_4_f32_slice(u.projection.as_ref(), false, &projection.to_cols_array());

            match profile.lighting {
                Lighting::Unlit => {}
                Lighting::Basic => {
                    set_light_uniforms(gl, u);
                }
                Lighting::Full => {
                    set_light_uniforms(gl, u);
                    let eye = camera.eye();
                    gl.uniform_3_f32(u.view_pos.as_ref(), eye.x, eye.y, eye.z);
                    gl.uniform_3_f32(
                        u.ambient_color.as_ref(),
                        AMBIENT_COLOR[0],
                        AMBIENT_COLOR[1],
                        AMBIENT_COLOR[2],
                    );
                }
            }

            self.geometry
                .draw_cube(gl, profile.geometry, profile.draw_count);
            gl.use_program(None);
        }
    }

    /// Second pass: present the tier's color texture through the
    /// pixelation program onto the default framebuffer.
    unsafe fn post_process_pass(&self, gl: &glow::Context, tier: Tier, display_size: (u32, u32)) {
        let profile = tier.profile();

        unsafe {
            self.pool.unbind(gl);
            gl.viewport(0, 0, gl_size(display_size.0), gl_size(display_size.1));
            gl.clear_color(
                CLEAR_COLOR[0],
                CLEAR_COLOR[1],
                CLEAR_COLOR[2],
                CLEAR_COLOR[3],
            );
            gl.clear(glow::COLOR_BUFFER_BIT);
            gl.disable(glow::DEPTH_TEST);

            gl.use_program(Some(self.pixelate_program));
            gl.active_texture(glow::TEXTURE0);
            if let Some(texture) = self.pool.color_texture(tier.index()) {
                gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            }
            gl.uniform_1_i32(self.pixelate_uniforms.screen_texture.as_ref(), 0);
            gl.uniform_1_f32(self.pixelate_uniforms.pixel_size.as_ref(), profile.pixelation);

            self.geometry.draw_screen_quad(gl);

            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.use_program(None);
            gl.enable(glow::DEPTH_TEST);
        }
    }

    /// Hot-reload every program from its named sources.
    ///
    /// Each program that fails to rebuild keeps its previous handle; each
    /// rebuilt program gets its uniform locations re-cached and a
    /// warn-only validation pass.
    ///
    /// # Safety
    ///
    /// Requires a current GL context matching the one passed to
    /// [`new`](Self::new).
    pub unsafe fn reload_shaders(&mut self, gl: &glow::Context) {
        for tier_program in &mut self.tier_programs {
            let (vertex, fragment) = tier_program.pair.resolve();
            let reloaded = unsafe {
                shaders::reload_program(
                    gl,
                    tier_program.pair.name,
                    tier_program.program,
                    &vertex,
                    &fragment,
                )
            };
            if reloaded != tier_program.program {
                tier_program.program = reloaded;
                tier_program.uniforms = unsafe { CubeUniforms::locate(gl, reloaded) };
                if !unsafe { shaders::validate_program(gl, tier_program.pair.name, reloaded) } {
                    warn!("reloaded shader `{}` failed validation", tier_program.pair.name);
                }
            }
        }

        let (vertex, fragment) = PIXELATE.resolve();
        let reloaded = unsafe {
            shaders::reload_program(gl, PIXELATE.name, self.pixelate_program, &vertex, &fragment)
        };
        if reloaded != self.pixelate_program {
            self.pixelate_program = reloaded;
            self.pixelate_uniforms = unsafe { PixelateUniforms::locate(gl, reloaded) };
            if !unsafe { shaders::validate_program(gl, PIXELATE.name, reloaded) } {
                warn!("reloaded shader `{}` failed validation", PIXELATE.name);
            }
        }
    }

    /// Release all GL resources owned by this renderer.
    ///
    /// # Safety
    ///
    /// Must be called with the context used for creation, exactly once.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        unsafe {
            for tier_program in &self.tier_programs {
                gl.delete_program(tier_program.program);
            }
            gl.delete_program(self.pixelate_program);
            self.geometry.destroy(gl);
            self.pool.destroy(gl);
        }
    }
}

/// Set the light position/color pair shared by the lit tiers.
unsafe fn set_light_uniforms(gl: &glow::Context, u: &CubeUniforms) {
    unsafe {
        gl.uniform_3_f32(
            u.light_pos.as_ref(),
            LIGHT_POSITION[0],
            LIGHT_POSITION[1],
            LIGHT_POSITION[2],
        );
        gl.uniform_3_f32(
            u.light_color.as_ref(),
            LIGHT_COLOR[0],
            LIGHT_COLOR[1],
            LIGHT_COLOR[2],
        );
    }
}

/// Compile one tier's program from its resolved sources and cache its
/// uniform locations.
unsafe fn build_tier_program(gl: &glow::Context, pair: ShaderPair) -> Result<TierProgram, SetupError> {
    let (vertex, fragment) = pair.resolve();
    let program = unsafe { shaders::compile_program(gl, &vertex, &fragment) }.map_err(|log| {
        SetupError::Shader {
            name: pair.name,
            log,
        }
    })?;
    let uniforms = unsafe { CubeUniforms::locate(gl, program) };
    Ok(TierProgram {
        pair,
        program,
        uniforms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_sits_on_positive_z() {
        let camera = CameraState::default();
        let eye = camera.eye();
        assert!((eye.x).abs() < f32::EPSILON);
        assert!((eye.y).abs() < f32::EPSILON);
        assert!(eye.z > 0.0);
    }

    #[test]
    fn zoom_clamps_to_the_working_range() {
        let mut camera = CameraState::default();
        camera.zoom(-100.0);
        assert!((camera.distance - MIN_CAMERA_DISTANCE).abs() < f32::EPSILON);
        camera.zoom(100.0);
        assert!((camera.distance - MAX_CAMERA_DISTANCE).abs() < f32::EPSILON);
    }

    #[test]
    fn model_matrix_is_identity_without_rotation() {
        let camera = CameraState::default();
        let model = camera.model();
        assert!(model.abs_diff_eq(Mat4::IDENTITY, 1.0e-6));
    }

    #[test]
    fn model_matrix_rotates_unit_z_by_ninety_degrees_about_y() {
        let camera = CameraState {
            rotation_y: 90.0,
            ..CameraState::default()
        };
        let rotated = camera.model().transform_vector3(Vec3::Z);
        assert!(rotated.abs_diff_eq(Vec3::X, 1.0e-6));
    }

    #[test]
    fn view_matrix_moves_the_origin_to_camera_distance() {
        let camera = CameraState {
            distance: 7.0,
            ..CameraState::default()
        };
        let transformed = camera.view().transform_point3(Vec3::ZERO);
        assert!((transformed.z - -7.0).abs() < 1.0e-5);
    }

    #[test]
    fn gl_size_converts_small_dimensions() {
        assert_eq!(gl_size(0), 0);
        assert_eq!(gl_size(1200), 1200);
    }
}
