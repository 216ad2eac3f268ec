//! Telemetry readings fed to the quality oracle.
//!
//! Frame rate is measured from real frame timestamps. Temperature, GPU
//! load, and VRAM usage have no portable source in a windowed demo, so
//! they follow a deterministic drift profile that keeps the oracle's
//! inputs moving through plausible ranges. Motion intensity is derived
//! by the caller from the cube's actual angular velocity.

use std::collections::VecDeque;
use std::time::Instant;

/// Number of frame timestamps kept for the rolling frame-rate average.
const FRAME_WINDOW: usize = 120;

/// One sample of the readings the oracle consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    /// Frames per second, clamped to `0..=120`.
    pub frame_rate: f32,
    /// GPU temperature in degrees Celsius, clamped to `0..=100`.
    pub temperature: f32,
    /// GPU load percentage, clamped to `0..=100`.
    pub gpu_load: f32,
    /// VRAM usage percentage, clamped to `0..=100`.
    pub vram_usage: f32,
    /// Scene motion intensity percentage, clamped to `0..=100`.
    pub motion_intensity: f32,
}

/// Produces [`Telemetry`] samples from frame timing and a drift profile.
pub struct TelemetrySampler {
    start: Instant,
    frames: VecDeque<Instant>,
}

impl TelemetrySampler {
    /// Create a sampler anchored at `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            frames: VecDeque::with_capacity(FRAME_WINDOW),
        }
    }

    /// Record that a frame was presented at `now`.
    pub fn note_frame(&mut self, now: Instant) {
        if self.frames.len() == FRAME_WINDOW {
            self.frames.pop_front();
        }
        self.frames.push_back(now);
    }

    /// Rolling average frame rate over the recorded window.
    ///
    /// Returns 0.0 until at least two frames have been recorded.
    #[expect(clippy::cast_precision_loss)] // window length is at most 120
    pub fn frame_rate(&self) -> f32 {
        let (Some(first), Some(last)) = (self.frames.front(), self.frames.back()) else {
            return 0.0;
        };
        let span = last.duration_since(*first).as_secs_f32();
        if span <= 0.0 || self.frames.len() < 2 {
            return 0.0;
        }
        (self.frames.len() - 1) as f32 / span
    }

    /// Take a telemetry sample at `now`.
    ///
    /// `motion_intensity` comes from the caller (angular velocity of the
    /// cube mapped to a percentage) and is clamped here along with every
    /// synthesized reading.
    pub fn sample(&self, now: Instant, motion_intensity: f32) -> Telemetry {
        let t = now.duration_since(self.start).as_secs_f32();
        Telemetry {
            frame_rate: self.frame_rate().clamp(0.0, 120.0),
            temperature: (55.0 + 18.0 * (t / 17.0).sin()).clamp(0.0, 100.0),
            gpu_load: (45.0 + 28.0 * (t / 9.0 + 1.3).sin()).clamp(0.0, 100.0),
            vram_usage: (40.0 + 22.0 * (t / 23.0 + 2.1).sin()).clamp(0.0, 100.0),
            motion_intensity: motion_intensity.clamp(0.0, 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn frame_rate_is_zero_before_two_frames() {
        let start = Instant::now();
        let mut sampler = TelemetrySampler::new(start);
        assert!((sampler.frame_rate() - 0.0).abs() < f32::EPSILON);
        sampler.note_frame(start);
        assert!((sampler.frame_rate() - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn frame_rate_matches_even_spacing() {
        let start = Instant::now();
        let mut sampler = TelemetrySampler::new(start);
        // 61 frames at exactly 60 fps: 16.666... ms apart.
        for i in 0..61_u64 {
            sampler.note_frame(start + Duration::from_nanos(i * 1_000_000_000 / 60));
        }
        let fps = sampler.frame_rate();
        assert!((fps - 60.0).abs() < 0.1, "expected ~60 fps, got {fps}");
    }

    #[test]
    fn window_drops_oldest_frames() {
        let start = Instant::now();
        let mut sampler = TelemetrySampler::new(start);
        // Slow frames first, then fast ones; once the window rolls past
        // the slow prefix, the average reflects only the fast frames.
        for i in 0..10_u64 {
            sampler.note_frame(start + Duration::from_millis(i * 100));
        }
        let slow = sampler.frame_rate();
        for i in 0..FRAME_WINDOW as u64 {
            sampler.note_frame(start + Duration::from_millis(1000 + i * 10));
        }
        let fast = sampler.frame_rate();
        assert!(fast > slow);
        assert!((fast - 100.0).abs() < 1.0, "expected ~100 fps, got {fast}");
    }

    #[test]
    fn sample_clamps_every_reading() {
        let start = Instant::now();
        let sampler = TelemetrySampler::new(start);
        let sample = sampler.sample(start + Duration::from_secs(500), 250.0);
        assert!((0.0..=120.0).contains(&sample.frame_rate));
        assert!((0.0..=100.0).contains(&sample.temperature));
        assert!((0.0..=100.0).contains(&sample.gpu_load));
        assert!((0.0..=100.0).contains(&sample.vram_usage));
        assert!((sample.motion_intensity - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn drift_profile_is_deterministic() {
        let start = Instant::now();
        let sampler = TelemetrySampler::new(start);
        let at = start + Duration::from_secs(42);
        let a = sampler.sample(at, 10.0);
        let b = sampler.sample(at, 10.0);
        assert_eq!(a, b);
    }
}
