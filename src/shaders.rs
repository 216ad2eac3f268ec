//! Named shader resources and program lifecycle helpers.
//!
//! All shaders target GLSL 3.30 core (OpenGL 3.3), matching the requested
//! context version.
//!
//! Each stage pair is a named resource: the source text ships embedded in
//! the binary, and a same-named file pair under `shaders/` next to the
//! working directory overrides it when present. Overrides are re-read on
//! every [`ShaderPair::resolve`] call, which is what makes hot reload
//! work without a filesystem watcher.
//!
//! Failure semantics differ by phase:
//!
//! - [`compile_program`] failures during startup are fatal (the caller
//!   aborts with the compiler/linker diagnostic).
//! - [`reload_program`] failures at runtime are not: the previous program
//!   is kept and the session continues.
//! - [`validate_program`] only ever warns.

use std::path::Path;

use glow::HasContext;
use tracing::{debug, error, warn};

/// A named vertex+fragment source pair with embedded defaults.
#[derive(Debug, Clone, Copy)]
pub struct ShaderPair {
    /// Resource name; also the on-disk override stem (`shaders/<name>.vert`
    /// and `shaders/<name>.frag`).
    pub name: &'static str,
    /// Embedded vertex shader source.
    pub vertex: &'static str,
    /// Embedded fragment shader source.
    pub fragment: &'static str,
}

/// Unlit cube shading for the Low tier: vertex colors pass straight
/// through. No lighting uniforms.
///
/// | Name           | Type   | Description            |
/// |----------------|--------|------------------------|
/// | `u_model`      | `mat4` | Model transform        |
/// | `u_view`       | `mat4` | View transform         |
/// | `u_projection` | `mat4` | Projection transform   |
pub const CUBE_FLAT: ShaderPair = ShaderPair {
    name: "cube_flat",
    vertex: include_str!("../shaders/cube_flat.vert"),
    fragment: include_str!("../shaders/cube_flat.frag"),
};

/// Diffuse-only cube shading for the Medium tier.
///
/// | Name            | Type   | Description            |
/// |-----------------|--------|------------------------|
/// | `u_model`       | `mat4` | Model transform        |
/// | `u_view`        | `mat4` | View transform         |
/// | `u_projection`  | `mat4` | Projection transform   |
/// | `u_light_pos`   | `vec3` | Light position (world) |
/// | `u_light_color` | `vec3` | Light color            |
pub const CUBE_LAMBERT: ShaderPair = ShaderPair {
    name: "cube_lambert",
    vertex: include_str!("../shaders/cube_lambert.vert"),
    fragment: include_str!("../shaders/cube_lambert.frag"),
};

/// Full lighting model (ambient + diffuse + specular) for the High tier.
///
/// | Name              | Type   | Description            |
/// |-------------------|--------|------------------------|
/// | `u_model`         | `mat4` | Model transform        |
/// | `u_view`          | `mat4` | View transform         |
/// | `u_projection`    | `mat4` | Projection transform   |
/// | `u_light_pos`     | `vec3` | Light position (world) |
/// | `u_light_color`   | `vec3` | Light color            |
/// | `u_view_pos`      | `vec3` | Camera position        |
/// | `u_ambient_color` | `vec3` | Ambient term           |
pub const CUBE_PHONG: ShaderPair = ShaderPair {
    name: "cube_phong",
    vertex: include_str!("../shaders/cube_phong.vert"),
    fragment: include_str!("../shaders/cube_phong.frag"),
};

/// Post-process pixelation applied while presenting a tier's offscreen
/// texture to the default framebuffer.
///
/// | Name               | Type        | Description                      |
/// |--------------------|-------------|----------------------------------|
/// | `u_screen_texture` | `sampler2D` | The tier's color texture         |
/// | `u_pixel_size`     | `float`     | Sampling cells across the screen |
pub const PIXELATE: ShaderPair = ShaderPair {
    name: "pixelate",
    vertex: include_str!("../shaders/pixelate.vert"),
    fragment: include_str!("../shaders/pixelate.frag"),
};

impl ShaderPair {
    /// Current source text: the on-disk override when both stage files
    /// exist and are readable, the embedded default otherwise.
    pub fn resolve(&self) -> (String, String) {
        let dir = Path::new("shaders");
        let vert_path = dir.join(format!("{}.vert", self.name));
        let frag_path = dir.join(format!("{}.frag", self.name));

        match (
            std::fs::read_to_string(&vert_path),
            std::fs::read_to_string(&frag_path),
        ) {
            (Ok(vertex), Ok(fragment)) => {
                debug!("shader `{}` loaded from {}", self.name, dir.display());
                (vertex, fragment)
            }
            _ => (self.vertex.to_owned(), self.fragment.to_owned()),
        }
    }
}

/// Compile a shader program from vertex and fragment source strings.
///
/// The compiled shader objects are detached and deleted after successful
/// linking, so only the program handle needs to be cleaned up by the
/// caller.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns a descriptive error string if shader compilation or program
/// linking fails.
pub unsafe fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<glow::Program, String> {
    let program = unsafe { gl.create_program() }?;

    let vs = unsafe { compile_shader(gl, glow::VERTEX_SHADER, vertex_src) }?;
    let fs = unsafe { compile_shader(gl, glow::FRAGMENT_SHADER, fragment_src) }?;

    unsafe {
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(format!("Program link error: {log}"));
        }

        // Shaders can be detached and deleted after successful linking.
        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
    }

    Ok(program)
}

/// Compile a single shader stage (vertex or fragment) from source.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
unsafe fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    source: &str,
) -> Result<glow::Shader, String> {
    unsafe {
        let shader = gl.create_shader(shader_type)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(format!("Shader compile error: {log}"));
        }

        Ok(shader)
    }
}

/// Rebuild a program from new sources, keeping the old program on failure.
///
/// Hot reload must not crash a running session: if the new sources fail to
/// compile or link, the diagnostic is logged and `old` is returned
/// unchanged. On success the old program is deleted and the new handle
/// returned.
///
/// # Safety
///
/// Requires a valid, current OpenGL context. `old` must be a live program
/// created on that context.
pub unsafe fn reload_program(
    gl: &glow::Context,
    name: &str,
    old: glow::Program,
    vertex_src: &str,
    fragment_src: &str,
) -> glow::Program {
    match unsafe { compile_program(gl, vertex_src, fragment_src) } {
        Ok(new) => {
            unsafe { gl.delete_program(old) };
            debug!("shader `{name}` reloaded");
            new
        }
        Err(log) => {
            error!("shader `{name}` reload failed, keeping previous program: {log}");
            old
        }
    }
}

/// Non-fatal pipeline-state check: bind the program and confirm the GL
/// error flag stays clear. Logs a warning and returns `false` on failure;
/// never aborts.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
pub unsafe fn validate_program(gl: &glow::Context, name: &str, program: glow::Program) -> bool {
    unsafe {
        // Drain any stale error before the check.
        while gl.get_error() != glow::NO_ERROR {}

        gl.use_program(Some(program));
        let status = gl.get_error();
        gl.use_program(None);

        if status == glow::NO_ERROR {
            true
        } else {
            warn!("shader `{name}` failed the pipeline-state check (GL error {status:#06x})");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_sources_target_glsl_330() {
        for pair in [CUBE_FLAT, CUBE_LAMBERT, CUBE_PHONG, PIXELATE] {
            assert!(
                pair.vertex.starts_with("#version 330 core"),
                "{} vertex shader has the wrong version directive",
                pair.name
            );
            assert!(
                pair.fragment.starts_with("#version 330 core"),
                "{} fragment shader has the wrong version directive",
                pair.name
            );
        }
    }

    #[test]
    fn lighting_uniform_sets_grow_with_tier() {
        // Flat has no lighting uniforms, lambert has the light pair,
        // phong adds view position and ambient.
        assert!(!CUBE_FLAT.fragment.contains("u_light_pos"));
        assert!(CUBE_LAMBERT.fragment.contains("u_light_pos"));
        assert!(CUBE_LAMBERT.fragment.contains("u_light_color"));
        assert!(!CUBE_LAMBERT.fragment.contains("u_view_pos"));
        assert!(CUBE_PHONG.fragment.contains("u_view_pos"));
        assert!(CUBE_PHONG.fragment.contains("u_ambient_color"));
    }

    #[test]
    fn pixelate_exposes_the_post_process_uniforms() {
        assert!(PIXELATE.fragment.contains("u_screen_texture"));
        assert!(PIXELATE.fragment.contains("u_pixel_size"));
    }
}
