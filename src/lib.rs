//! Adaptive-quality rotating-cube demo using OpenGL via [glow].
//!
//! The demo renders a spinning cube and adjusts render quality every
//! frame. A quality *oracle* — by default a built-in fuzzy-logic rule
//! table, optionally an external process — maps telemetry (frame rate,
//! temperature, GPU load, VRAM usage, motion intensity) to one of three
//! quality tiers. Each tier selects a fixed offscreen resolution, a cube
//! mesh, a shader program of matching complexity, and a post-process
//! pixelation strength.
//!
//! # Architecture
//!
//! - [`policy`] — the [`Tier`](policy::Tier) type and the per-tier
//!   resource table.
//! - [`oracle`] — the [`QualityOracle`](oracle::QualityOracle) contract,
//!   the fuzzy rule table, the subprocess oracle, and the
//!   fallback-to-Medium resolution logic.
//! - [`telemetry`] — frame-rate measurement and the synthetic drift
//!   profile behind the remaining readings.
//! - [`framebuffer`] — one pre-allocated fixed-size render target per
//!   tier, so oscillating oracle output never reallocates GPU storage.
//! - [`geometry`] — the reduced cube, the indexed full cube, and the
//!   screen quad.
//! - [`shaders`] — named GLSL source pairs with hot reload that keeps the
//!   last good program on failure.
//! - [`render`] — the two per-frame passes (geometry, pixelation).
//! - [`app`] — winit/glutin plumbing and the event loop.
//!
//! # Failure model
//!
//! Construction failures (context, shaders, framebuffers, oracle spawn)
//! are fatal before the first frame. Once the loop runs, failures degrade
//! instead: a broken oracle call falls back to Medium, a failed shader
//! reload keeps the previous program, and driver debug messages are
//! logged without ever steering control flow.
//!
//! [glow]: https://docs.rs/glow

pub mod app;
pub mod error;
pub mod framebuffer;
pub mod geometry;
pub mod oracle;
pub mod policy;
pub mod render;
pub mod shaders;
pub mod telemetry;

pub use app::{run, AppConfig};
pub use error::SetupError;
pub use oracle::{CommandOracle, FuzzyOracle, QualityOracle};
pub use policy::Tier;
pub use telemetry::Telemetry;
