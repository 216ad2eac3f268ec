//! Quality tiers and the tier → resource policy table.
//!
//! The policy is expressed as const data rather than inline branches: one
//! [`TierProfile`] per [`Tier`], fixed for the lifetime of the session.
//! Resolving a tier is a pure lookup and always yields the same profile.

/// Number of quality tiers.
pub const TIER_COUNT: usize = 3;

/// Resolution of the window and of the final post-processed image, in
/// physical pixels. Offscreen tier targets are smaller (see the profiles)
/// and are upscaled during the post-process pass.
pub const DISPLAY_SIZE: (u32, u32) = (1200, 800);

/// A discrete render-quality level, ordered by visual fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Reduced geometry, unlit shading, quarter-ish resolution, heavy
    /// pixelation.
    Low = 0,
    /// Full geometry, diffuse lighting, mid resolution.
    Medium = 1,
    /// Full geometry, full lighting model, full resolution, minimal
    /// pixelation.
    High = 2,
}

impl Tier {
    /// All tiers in ascending fidelity order.
    pub const ALL: [Tier; TIER_COUNT] = [Tier::Low, Tier::Medium, Tier::High];

    /// Validating conversion from a raw index.
    ///
    /// This is the boundary where untyped tier values (oracle output,
    /// subprocess replies) enter typed code; anything outside `{0, 1, 2}`
    /// is rejected here.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Tier::Low),
            1 => Some(Tier::Medium),
            2 => Some(Tier::High),
            _ => None,
        }
    }

    /// Index of this tier into fixed-size per-tier arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Low => "low",
            Tier::Medium => "medium",
            Tier::High => "high",
        }
    }

    /// The fixed resource profile for this tier.
    pub fn profile(self) -> &'static TierProfile {
        &TIER_TABLE[self.index()]
    }
}

/// Which uploaded mesh a tier draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    /// 24 unindexed vertices: the four faces that stay visible while the
    /// cube spins. Drawn with `glDrawArrays`.
    ReducedCube,
    /// 24 unique vertices + 36 indices, per-face normals. Drawn with
    /// `glDrawElements`.
    FullCube,
}

/// Which lighting uniforms a tier's shader program consumes.
///
/// Lower tiers use deliberately simpler programs; quality scaling is a
/// property of both resolution and shader complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lighting {
    /// No lighting uniforms; vertex colors pass through unchanged.
    Unlit,
    /// Light position and color only (diffuse term).
    Basic,
    /// Light position/color plus view position and ambient color
    /// (diffuse + specular + ambient).
    Full,
}

/// Immutable per-tier resource selection, fully constructed at startup.
#[derive(Debug, Clone, Copy)]
pub struct TierProfile {
    /// Offscreen render-target resolution for this tier.
    pub resolution: (u32, u32),
    /// Named shader resource compiled for this tier's cube pass.
    pub shader: &'static str,
    /// Mesh drawn at this tier.
    pub geometry: GeometryKind,
    /// Vertex count (reduced cube) or index count (full cube) for the
    /// draw call.
    pub draw_count: i32,
    /// Post-process pixelation strength: the number of sampling cells
    /// across the screen. Smaller values mean blockier output.
    pub pixelation: f32,
    /// Lighting uniforms the tier's program expects.
    pub lighting: Lighting,
}

/// The policy table. Order matches [`Tier::ALL`].
const TIER_TABLE: [TierProfile; TIER_COUNT] = [
    TierProfile {
        resolution: (600, 400),
        shader: "cube_flat",
        geometry: GeometryKind::ReducedCube,
        draw_count: 24,
        pixelation: 32.0,
        lighting: Lighting::Unlit,
    },
    TierProfile {
        resolution: (900, 600),
        shader: "cube_lambert",
        geometry: GeometryKind::FullCube,
        draw_count: 36,
        pixelation: 64.0,
        lighting: Lighting::Basic,
    },
    TierProfile {
        resolution: (1200, 800),
        shader: "cube_phong",
        geometry: GeometryKind::FullCube,
        draw_count: 36,
        pixelation: 200.0,
        lighting: Lighting::Full,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_index_accepts_exactly_the_three_tiers() {
        assert_eq!(Tier::from_index(0), Some(Tier::Low));
        assert_eq!(Tier::from_index(1), Some(Tier::Medium));
        assert_eq!(Tier::from_index(2), Some(Tier::High));
        assert_eq!(Tier::from_index(-1), None);
        assert_eq!(Tier::from_index(3), None);
        assert_eq!(Tier::from_index(i64::MAX), None);
    }

    #[test]
    fn tiers_are_ordered_by_fidelity() {
        assert!(Tier::Low < Tier::Medium);
        assert!(Tier::Medium < Tier::High);
    }

    #[test]
    fn low_profile_matches_policy_table() {
        let p = Tier::Low.profile();
        assert_eq!(p.resolution, (600, 400));
        assert_eq!(p.geometry, GeometryKind::ReducedCube);
        assert_eq!(p.draw_count, 24);
        assert!((p.pixelation - 32.0).abs() < f32::EPSILON);
        assert_eq!(p.lighting, Lighting::Unlit);
    }

    #[test]
    fn medium_profile_matches_policy_table() {
        let p = Tier::Medium.profile();
        assert_eq!(p.resolution, (900, 600));
        assert_eq!(p.geometry, GeometryKind::FullCube);
        assert_eq!(p.draw_count, 36);
        assert!((p.pixelation - 64.0).abs() < f32::EPSILON);
        assert_eq!(p.lighting, Lighting::Basic);
    }

    #[test]
    fn high_profile_matches_policy_table() {
        let p = Tier::High.profile();
        assert_eq!(p.resolution, (1200, 800));
        assert_eq!(p.geometry, GeometryKind::FullCube);
        assert_eq!(p.draw_count, 36);
        assert!((p.pixelation - 200.0).abs() < f32::EPSILON);
        assert_eq!(p.lighting, Lighting::Full);
    }

    #[test]
    fn resolve_is_deterministic_across_calls() {
        for tier in Tier::ALL {
            let a = tier.profile();
            let b = tier.profile();
            assert_eq!(a.resolution, b.resolution);
            assert_eq!(a.draw_count, b.draw_count);
            assert_eq!(a.shader, b.shader);
        }
    }
}
