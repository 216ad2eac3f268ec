//! Pre-allocated per-tier offscreen render targets.
//!
//! One fixed-size framebuffer per quality tier, allocated at startup and
//! never resized. Switching tiers is a plain bind; oscillating oracle
//! output costs nothing beyond the bind itself, unlike a single resizable
//! target that would reallocate its storage on every switch.

use glow::HasContext;
use tracing::error;

use crate::error::SetupError;
use crate::policy::TIER_COUNT;
use crate::render::gl_size;

/// GL internal format for RGBA8 textures, pre-cast to the `i32` that
/// `tex_image_2d` expects.
#[expect(clippy::cast_possible_wrap)]
const RGBA8_INTERNAL_FORMAT: i32 = glow::RGBA8 as i32;

/// GPU objects backing one tier's render target.
struct FramebufferSlot {
    framebuffer: glow::Framebuffer,
    color: glow::Texture,
    depth_stencil: glow::Renderbuffer,
    resolution: (u32, u32),
}

/// One pre-allocated fixed-resolution render target per quality tier.
///
/// The pool owns its framebuffers, color textures, and depth/stencil
/// renderbuffers exclusively. Tier indices are validated at every entry
/// point: an out-of-range index logs an error and leaves GL state
/// untouched.
pub struct TieredFramebufferPool {
    slots: [FramebufferSlot; TIER_COUNT],
}

impl TieredFramebufferPool {
    /// Allocate one complete render target per tier.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context. The caller must ensure
    /// [`destroy`](Self::destroy) runs before the context is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if any GL allocation fails or any tier's
    /// framebuffer is incomplete; the caller aborts startup in both cases.
    pub unsafe fn new(
        gl: &glow::Context,
        resolutions: [(u32, u32); TIER_COUNT],
    ) -> Result<Self, SetupError> {
        let slots = [
            unsafe { allocate_slot(gl, 0, resolutions[0])? },
            unsafe { allocate_slot(gl, 1, resolutions[1])? },
            unsafe { allocate_slot(gl, 2, resolutions[2])? },
        ];
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
        Ok(Self { slots })
    }

    /// Bind the render target for `tier` as the active framebuffer.
    ///
    /// An out-of-range index logs an error and performs no GPU state
    /// mutation.
    ///
    /// # Safety
    ///
    /// Requires a current GL context matching the one used at creation.
    pub unsafe fn bind(&self, gl: &glow::Context, tier: usize) {
        let Some(slot) = self.slots.get(tier) else {
            error!("framebuffer bind rejected: tier index {tier} out of range");
            return;
        };
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, Some(slot.framebuffer)) };
    }

    /// Restore the default framebuffer as the render target.
    ///
    /// # Safety
    ///
    /// Requires a current GL context matching the one used at creation.
    pub unsafe fn unbind(&self, gl: &glow::Context) {
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
    }

    /// Color texture of `tier`, for sampling during the post-process pass.
    ///
    /// The handle is allocated once at startup, so repeated calls return
    /// the same texture. An out-of-range index logs an error and returns
    /// `None`.
    pub fn color_texture(&self, tier: usize) -> Option<glow::Texture> {
        match self.slots.get(tier) {
            Some(slot) => Some(slot.color),
            None => {
                error!("framebuffer texture lookup rejected: tier index {tier} out of range");
                None
            }
        }
    }

    /// Fixed resolution of `tier`'s render target.
    pub fn resolution(&self, tier: usize) -> Option<(u32, u32)> {
        self.slots.get(tier).map(|slot| slot.resolution)
    }

    /// Release all GPU objects of all three slots.
    ///
    /// # Safety
    ///
    /// Must be called with the context used for creation, exactly once.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        for slot in &self.slots {
            unsafe {
                gl.delete_framebuffer(slot.framebuffer);
                gl.delete_texture(slot.color);
                gl.delete_renderbuffer(slot.depth_stencil);
            }
        }
    }
}

/// Allocate and completeness-check one tier's render target.
unsafe fn allocate_slot(
    gl: &glow::Context,
    tier: usize,
    resolution: (u32, u32),
) -> Result<FramebufferSlot, SetupError> {
    let (width, height) = resolution;
    let w = gl_size(width);
    let h = gl_size(height);

    unsafe {
        let framebuffer = gl.create_framebuffer().map_err(|message| {
            SetupError::Allocation {
                resource: "framebuffer",
                message,
            }
        })?;
        let color = gl.create_texture().map_err(|message| SetupError::Allocation {
            resource: "color texture",
            message,
        })?;
        let depth_stencil =
            gl.create_renderbuffer()
                .map_err(|message| SetupError::Allocation {
                    resource: "depth/stencil renderbuffer",
                    message,
                })?;

        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

        gl.bind_texture(glow::TEXTURE_2D, Some(color));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            RGBA8_INTERNAL_FORMAT,
            w,
            h,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            glow::PixelUnpackData::Slice(None),
        );
        // GL constant values are small enough that the cast is always safe.
        #[expect(clippy::cast_possible_wrap)]
        {
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
        }
        gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(color),
            0,
        );
        gl.bind_texture(glow::TEXTURE_2D, None);

        gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth_stencil));
        gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH24_STENCIL8, w, h);
        gl.framebuffer_renderbuffer(
            glow::FRAMEBUFFER,
            glow::DEPTH_STENCIL_ATTACHMENT,
            glow::RENDERBUFFER,
            Some(depth_stencil),
        );
        gl.bind_renderbuffer(glow::RENDERBUFFER, None);

        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        if status != glow::FRAMEBUFFER_COMPLETE {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            error!("tier {tier} framebuffer incomplete: status {status:#06x}");
            return Err(SetupError::Framebuffer { tier, status });
        }

        Ok(FramebufferSlot {
            framebuffer,
            color,
            depth_stencil,
            resolution,
        })
    }
}
