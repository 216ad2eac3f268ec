//! Quality-tier selection: the oracle contract and its implementations.
//!
//! An oracle maps a [`Telemetry`] sample to a [`Tier`]. The render loop
//! treats the oracle as a black box behind [`QualityOracle`]: any failure
//! (I/O error, malformed reply, out-of-range index, no rule firing) is
//! recovered locally by falling back to [`Tier::Medium`], so a broken or
//! slow controller degrades quality selection instead of halting rendering.
//!
//! Two implementations ship:
//!
//! - [`FuzzyOracle`] — a native Mamdani-style rule table with Gaussian
//!   membership functions. This is the default.
//! - [`CommandOracle`] — a subprocess speaking a line-oriented protocol,
//!   selected with `--oracle <COMMAND>`.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::SetupError;
use crate::policy::Tier;
use crate::telemetry::Telemetry;

/// An error produced by a single oracle call.
///
/// All variants are recoverable: the caller substitutes the fallback tier
/// and continues the frame.
#[derive(Debug, Error)]
pub enum OracleError {
    /// No fuzzy rule fired with meaningful strength for the readings.
    #[error("no rule fired for the given readings")]
    NoRuleFired,
    /// I/O with the oracle process failed.
    #[error("oracle I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The oracle process closed its stdout.
    #[error("oracle process closed its output stream")]
    Closed,
    /// The oracle reply was not an integer.
    #[error("malformed oracle reply `{0}`")]
    Malformed(String),
    /// The oracle replied with an integer outside `{0, 1, 2}`.
    #[error("oracle reply {0} is not a valid tier index")]
    OutOfRange(i64),
}

/// Maps telemetry to a quality tier.
pub trait QualityOracle {
    /// Select a tier for the given readings.
    fn quality_for(&mut self, telemetry: &Telemetry) -> Result<Tier, OracleError>;
}

/// Manual tier override; takes precedence over the oracle until cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideState {
    forced: Option<Tier>,
}

impl OverrideState {
    /// Force a concrete tier on every subsequent frame.
    pub fn force(&mut self, tier: Tier) {
        self.forced = Some(tier);
    }

    /// Return to oracle-driven selection.
    pub fn clear(&mut self) {
        self.forced = None;
    }

    /// The forced tier, if any.
    pub fn current(self) -> Option<Tier> {
        self.forced
    }
}

/// Tier selected when the oracle fails.
pub const FALLBACK_TIER: Tier = Tier::Medium;

/// Resolve the tier for one frame.
///
/// A set override wins unconditionally; otherwise the oracle is consulted,
/// and any oracle failure falls back to [`FALLBACK_TIER`] without
/// propagating.
pub fn resolve_tier(
    override_state: OverrideState,
    oracle: &mut dyn QualityOracle,
    telemetry: &Telemetry,
) -> Tier {
    if let Some(forced) = override_state.current() {
        return forced;
    }
    match oracle.quality_for(telemetry) {
        Ok(tier) => tier,
        Err(err) => {
            debug!("oracle failed ({err}); falling back to {}", FALLBACK_TIER.label());
            FALLBACK_TIER
        }
    }
}

// ---------------------------------------------------------------------------
// Native fuzzy rule table
// ---------------------------------------------------------------------------

/// Gaussian membership function: `exp(-(x - mean)^2 / (2 * sigma^2))`.
#[derive(Debug, Clone, Copy)]
struct Gauss {
    mean: f32,
    sigma: f32,
}

impl Gauss {
    fn grade(self, x: f32) -> f32 {
        let d = x - self.mean;
        (-(d * d) / (2.0 * self.sigma * self.sigma)).exp()
    }
}

/// Membership grades of one reading in its low/medium/high bands.
#[derive(Debug, Clone, Copy)]
struct Bands {
    low: f32,
    medium: f32,
    high: f32,
}

/// Membership parameters for one input variable, low to high band.
#[derive(Debug, Clone, Copy)]
struct VariableBands([Gauss; 3]);

impl VariableBands {
    fn grade(self, x: f32) -> Bands {
        Bands {
            low: self.0[0].grade(x),
            medium: self.0[1].grade(x),
            high: self.0[2].grade(x),
        }
    }
}

// Fixed membership parameters. Band centers sit where an operator would
// draw the low/medium/high boundaries for each reading; sigmas are wide
// enough that adjacent bands overlap and rules blend smoothly.
const FPS_BANDS: VariableBands = VariableBands([
    Gauss { mean: 20.0, sigma: 12.0 },
    Gauss { mean: 50.0, sigma: 12.0 },
    Gauss { mean: 80.0, sigma: 15.0 },
]);
const TEMP_BANDS: VariableBands = VariableBands([
    Gauss { mean: 45.0, sigma: 15.0 }, // cool
    Gauss { mean: 70.0, sigma: 12.0 }, // warm
    Gauss { mean: 90.0, sigma: 10.0 }, // hot
]);
const LOAD_BANDS: VariableBands = VariableBands([
    Gauss { mean: 20.0, sigma: 15.0 },
    Gauss { mean: 50.0, sigma: 15.0 },
    Gauss { mean: 85.0, sigma: 12.0 },
]);
const VRAM_BANDS: VariableBands = VariableBands([
    Gauss { mean: 20.0, sigma: 15.0 },
    Gauss { mean: 50.0, sigma: 15.0 },
    Gauss { mean: 85.0, sigma: 12.0 },
]);
const MOTION_BANDS: VariableBands = VariableBands([
    Gauss { mean: 10.0, sigma: 15.0 }, // static
    Gauss { mean: 50.0, sigma: 15.0 }, // moderate
    Gauss { mean: 85.0, sigma: 12.0 }, // fast
]);

/// Rule activations below this are treated as "did not fire".
const ACTIVATION_EPSILON: f32 = 1.0e-4;

/// Fuzzified view of one telemetry sample.
#[derive(Debug, Clone, Copy)]
struct Grades {
    fps: Bands,
    temp: Bands,
    load: Bands,
    vram: Bands,
    motion: Bands,
}

impl Grades {
    fn of(telemetry: &Telemetry) -> Self {
        Self {
            fps: FPS_BANDS.grade(telemetry.frame_rate),
            temp: TEMP_BANDS.grade(telemetry.temperature),
            load: LOAD_BANDS.grade(telemetry.gpu_load),
            vram: VRAM_BANDS.grade(telemetry.vram_usage),
            motion: MOTION_BANDS.grade(telemetry.motion_intensity),
        }
    }
}

/// Fuzzy AND (minimum).
fn and(a: f32, b: f32) -> f32 {
    a.min(b)
}

/// Fuzzy OR (maximum).
fn or(a: f32, b: f32) -> f32 {
    a.max(b)
}

/// The rule base: antecedent strength per fuzzified sample, and the tier
/// the rule argues for.
const RULES: [(fn(&Grades) -> f32, Tier); 10] = [
    // All conditions favorable.
    (
        |g| and(g.fps.high, and(g.temp.low, and(g.load.low, g.vram.low))),
        Tier::High,
    ),
    // Good frame rate, cool, static scene.
    (
        |g| and(g.fps.high, and(g.temp.low, g.motion.low)),
        Tier::High,
    ),
    // Mixed mid-range conditions.
    (
        |g| and(g.fps.medium, and(g.temp.medium, g.load.medium)),
        Tier::Medium,
    ),
    // Frame rate holds but the GPU is warm or busy.
    (
        |g| and(g.fps.high, or(g.temp.medium, g.load.high)),
        Tier::Medium,
    ),
    (|g| and(g.fps.medium, g.motion.medium), Tier::Medium),
    // Struggling or overheating.
    (|g| or(g.fps.low, g.temp.high), Tier::Low),
    (|g| and(g.temp.high, g.load.high), Tier::Low),
    (|g| and(g.fps.low, g.motion.high), Tier::Low),
    (
        |g| and(g.vram.high, and(g.load.high, g.fps.low)),
        Tier::Low,
    ),
    // Mid frame rate with a comfortable GPU.
    (
        |g| and(g.fps.medium, and(g.temp.low, g.load.low)),
        Tier::Medium,
    ),
];

/// Native fuzzy-inference oracle.
///
/// Mamdani-style evaluation: antecedents combine with min/max, activations
/// aggregate per output tier with max, and the crisp tier is the rounded
/// centroid over the tier singletons {0, 1, 2}.
#[derive(Debug, Default, Clone, Copy)]
pub struct FuzzyOracle;

impl FuzzyOracle {
    /// Create the oracle. Infallible: the rule base is compiled in.
    pub fn new() -> Self {
        Self
    }
}

impl QualityOracle for FuzzyOracle {
    fn quality_for(&mut self, telemetry: &Telemetry) -> Result<Tier, OracleError> {
        let grades = Grades::of(telemetry);

        let mut strength = [0.0_f32; 3];
        for (rule, tier) in RULES {
            let w = rule(&grades);
            let slot = &mut strength[tier.index()];
            *slot = slot.max(w);
        }

        let total: f32 = strength.iter().sum();
        if total < ACTIVATION_EPSILON {
            return Err(OracleError::NoRuleFired);
        }

        let score = (strength[1] + 2.0 * strength[2]) / total;
        // score is in [0, 2] by construction, so the rounded value is a
        // valid index; from_index keeps the boundary check in one place.
        #[expect(clippy::cast_possible_truncation)]
        let index = i64::from(score.round() as i32);
        Tier::from_index(index).ok_or(OracleError::OutOfRange(index))
    }
}

// ---------------------------------------------------------------------------
// Subprocess oracle
// ---------------------------------------------------------------------------

/// Oracle implemented by an external process.
///
/// Protocol: for each query, one line with the five readings separated by
/// spaces (`frame_rate temperature gpu_load vram_usage motion_intensity`)
/// is written to the child's stdin, and one line containing a tier index
/// in `{0, 1, 2}` is read back from its stdout. The call blocks on the
/// child's reply; there is no timeout, so a hung process stalls the
/// render loop (documented scalability limit of the design).
pub struct CommandOracle {
    command: String,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl CommandOracle {
    /// Spawn the oracle process. The command line is split on whitespace;
    /// the first token is the program, the rest are arguments.
    ///
    /// Spawn failure is fatal at startup: a missing oracle entry point
    /// must stop the program rather than silently degrade every frame.
    pub fn spawn(command: &str) -> Result<Self, SetupError> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| SetupError::OracleSpawn {
            command: command.to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| SetupError::OracleSpawn {
                command: command.to_owned(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| SetupError::OracleSpawn {
            command: command.to_owned(),
            source: std::io::Error::other("child stdin unavailable"),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| SetupError::OracleSpawn {
            command: command.to_owned(),
            source: std::io::Error::other("child stdout unavailable"),
        })?;

        debug!("oracle process `{command}` started");
        Ok(Self {
            command: command.to_owned(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }
}

impl QualityOracle for CommandOracle {
    fn quality_for(&mut self, telemetry: &Telemetry) -> Result<Tier, OracleError> {
        writeln!(
            self.stdin,
            "{} {} {} {} {}",
            telemetry.frame_rate,
            telemetry.temperature,
            telemetry.gpu_load,
            telemetry.vram_usage,
            telemetry.motion_intensity,
        )?;
        self.stdin.flush()?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(OracleError::Closed);
        }
        parse_tier_line(&line)
    }
}

impl Drop for CommandOracle {
    fn drop(&mut self) {
        if let Err(err) = self.child.kill() {
            warn!("oracle process `{}` did not terminate: {err}", self.command);
        }
        let _ = self.child.wait();
    }
}

/// Parse one reply line from a subprocess oracle.
fn parse_tier_line(line: &str) -> Result<Tier, OracleError> {
    let trimmed = line.trim();
    let index: i64 = trimmed
        .parse()
        .map_err(|_| OracleError::Malformed(trimmed.to_owned()))?;
    Tier::from_index(index).ok_or(OracleError::OutOfRange(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telemetry(fps: f32, temp: f32, load: f32, vram: f32, motion: f32) -> Telemetry {
        Telemetry {
            frame_rate: fps,
            temperature: temp,
            gpu_load: load,
            vram_usage: vram,
            motion_intensity: motion,
        }
    }

    struct FailingOracle;

    impl QualityOracle for FailingOracle {
        fn quality_for(&mut self, _telemetry: &Telemetry) -> Result<Tier, OracleError> {
            Err(OracleError::Malformed("boom".to_owned()))
        }
    }

    struct FixedOracle(Tier);

    impl QualityOracle for FixedOracle {
        fn quality_for(&mut self, _telemetry: &Telemetry) -> Result<Tier, OracleError> {
            Ok(self.0)
        }
    }

    #[test]
    fn gaussian_grade_peaks_at_the_mean() {
        let g = Gauss { mean: 50.0, sigma: 10.0 };
        assert!((g.grade(50.0) - 1.0).abs() < f32::EPSILON);
        assert!((g.grade(40.0) - g.grade(60.0)).abs() < 1.0e-6);
        assert!(g.grade(40.0) < 1.0);
        // One sigma out: exp(-0.5).
        assert!((g.grade(60.0) - 0.606_530_7).abs() < 1.0e-5);
    }

    #[test]
    fn favorable_readings_select_high() {
        // High fps, low temperature, low load: the reference scenario.
        let mut oracle = FuzzyOracle::new();
        let tier = oracle
            .quality_for(&telemetry(75.0, 55.0, 40.0, 30.0, 20.0))
            .expect("rules must fire");
        assert_eq!(tier, Tier::High);
    }

    #[test]
    fn stressed_readings_select_low() {
        let mut oracle = FuzzyOracle::new();
        let tier = oracle
            .quality_for(&telemetry(25.0, 90.0, 85.0, 80.0, 70.0))
            .expect("rules must fire");
        assert_eq!(tier, Tier::Low);
    }

    #[test]
    fn balanced_readings_select_medium() {
        let mut oracle = FuzzyOracle::new();
        let tier = oracle
            .quality_for(&telemetry(60.0, 70.0, 60.0, 50.0, 40.0))
            .expect("rules must fire");
        assert_eq!(tier, Tier::Medium);
    }

    #[test]
    fn ideal_readings_select_high() {
        let mut oracle = FuzzyOracle::new();
        let tier = oracle
            .quality_for(&telemetry(100.0, 45.0, 20.0, 20.0, 5.0))
            .expect("rules must fire");
        assert_eq!(tier, Tier::High);
    }

    #[test]
    fn reference_scenario_resolves_the_high_profile() {
        let mut oracle = FuzzyOracle::new();
        let tier = oracle
            .quality_for(&telemetry(75.0, 55.0, 40.0, 30.0, 20.0))
            .expect("rules must fire");
        let profile = tier.profile();
        assert_eq!(profile.resolution, (1200, 800));
        assert!((profile.pixelation - 200.0).abs() < f32::EPSILON);
    }

    #[test]
    fn oracle_failure_falls_back_to_medium() {
        let sample = telemetry(75.0, 55.0, 40.0, 30.0, 20.0);
        let tier = resolve_tier(OverrideState::default(), &mut FailingOracle, &sample);
        assert_eq!(tier, Tier::Medium);
    }

    #[test]
    fn fallback_never_picks_low_or_high() {
        // Whatever the readings, a failing oracle must land on Medium.
        for fps in [0.0, 30.0, 60.0, 120.0] {
            let sample = telemetry(fps, 90.0, 90.0, 90.0, 90.0);
            let tier = resolve_tier(OverrideState::default(), &mut FailingOracle, &sample);
            assert_eq!(tier, Tier::Medium);
        }
    }

    #[test]
    fn override_takes_precedence_over_the_oracle() {
        let sample = telemetry(75.0, 55.0, 40.0, 30.0, 20.0);
        let mut oracle = FixedOracle(Tier::High);
        let mut state = OverrideState::default();
        state.force(Tier::Low);
        // Override wins on every call until cleared.
        assert_eq!(resolve_tier(state, &mut oracle, &sample), Tier::Low);
        assert_eq!(resolve_tier(state, &mut oracle, &sample), Tier::Low);
        state.clear();
        assert_eq!(resolve_tier(state, &mut oracle, &sample), Tier::High);
    }

    #[test]
    fn override_wins_even_when_the_oracle_fails() {
        let sample = telemetry(0.0, 0.0, 0.0, 0.0, 0.0);
        let mut state = OverrideState::default();
        state.force(Tier::High);
        assert_eq!(resolve_tier(state, &mut FailingOracle, &sample), Tier::High);
    }

    #[test]
    fn parse_tier_line_accepts_valid_indices() {
        assert_eq!(parse_tier_line("0\n").expect("valid"), Tier::Low);
        assert_eq!(parse_tier_line(" 1 ").expect("valid"), Tier::Medium);
        assert_eq!(parse_tier_line("2").expect("valid"), Tier::High);
    }

    #[test]
    fn parse_tier_line_rejects_garbage_and_out_of_range() {
        assert!(matches!(
            parse_tier_line("fast\n"),
            Err(OracleError::Malformed(_))
        ));
        assert!(matches!(
            parse_tier_line("2.0\n"),
            Err(OracleError::Malformed(_))
        ));
        assert!(matches!(
            parse_tier_line("7\n"),
            Err(OracleError::OutOfRange(7))
        ));
        assert!(matches!(
            parse_tier_line("-1\n"),
            Err(OracleError::OutOfRange(-1))
        ));
    }
}
