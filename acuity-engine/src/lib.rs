//! Adaptive Landolt-C visual acuity test.
//!
//! The test needs a stored [`calibration::Calibration`] (viewing distance,
//! physical screen size, pixel ratio). Each eye is tested on 17 levels of
//! ring optotypes with random gap orientation; correct answers skip ahead,
//! incorrect ones step back, and three misses end the eye. The result is
//! classified into a feedback band and posted to the results endpoint.

pub mod calibration;
pub mod config;
pub mod error;
pub mod feedback;
pub mod levels;
pub mod optotype;
pub mod session;
pub mod state;
pub mod submit;

pub use calibration::{load_calibration, save_calibration, Calibration, CalibrationError};
pub use config::{SizingConfig, TestConfig, TimingConfig, LEVEL_COUNT};
pub use error::AcuityError;
pub use feedback::{determine_vision_feedback, Severity, VisionFeedback};
pub use levels::{generate_test_levels, GapPosition, Rotation, TestLevel};
pub use optotype::{optotype_size_mm, optotype_size_px, size_table};
pub use session::{EyeOutcome, EyeSession, TestResult, TestSession};
pub use state::{Eye, Presentation, TestAction, TestEvent, TestState};
pub use submit::{submit_result, SubmissionOutcome};

use calibration::KeyValueStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

/// A test session bundled with its random source.
///
/// Thin owner around [`TestSession`] for adapters that hold the test across
/// UI callbacks. Pass a seeded RNG to get reproducible level sequences.
pub struct VisualAcuityTest<R: Rng = StdRng> {
    session: TestSession,
    rng: R,
}

impl VisualAcuityTest<StdRng> {
    pub fn new(calibration: Calibration, config: TestConfig) -> Self {
        Self::with_rng(calibration, config, StdRng::from_entropy())
    }

    pub fn seeded(calibration: Calibration, config: TestConfig, seed: u64) -> Self {
        Self::with_rng(calibration, config, StdRng::seed_from_u64(seed))
    }

    /// Load the calibration from `store`; a missing or invalid record is an error
    /// and the caller should send the user to calibration.
    pub fn from_store<S: KeyValueStore + ?Sized>(
        store: &S,
        config: TestConfig,
    ) -> Result<Self, AcuityError> {
        let calibration = load_calibration(store)?;
        Ok(Self::new(calibration, config))
    }
}

impl<R: Rng> VisualAcuityTest<R> {
    pub fn with_rng(calibration: Calibration, config: TestConfig, rng: R) -> Self {
        Self {
            session: TestSession::new(calibration, config),
            rng,
        }
    }

    /// Apply an event and return the actions the caller must render.
    pub fn process_event(&mut self, event: TestEvent) -> Vec<TestAction> {
        self.session.handle(event, &mut self.rng)
    }

    pub fn start(&mut self) -> Vec<TestAction> {
        self.process_event(TestEvent::Start)
    }

    pub fn answer(&mut self, answer: GapPosition) -> Vec<TestAction> {
        self.process_event(TestEvent::Answer(answer))
    }

    /// Answer by click-target label ("1".."8").
    ///
    /// Labels outside the ring are logged and leave the state unchanged.
    pub fn answer_label(&mut self, label: &str) -> Result<Vec<TestAction>, AcuityError> {
        let answer = label.parse::<GapPosition>().map_err(|e| {
            warn!("{e}");
            e
        })?;
        Ok(self.answer(answer))
    }

    pub fn acknowledge_cover_eye(&mut self) -> Vec<TestAction> {
        self.process_event(TestEvent::CoverEyeAcknowledged)
    }

    pub fn acknowledge_result(&mut self) -> Vec<TestAction> {
        self.process_event(TestEvent::ResultAcknowledged)
    }

    pub fn state(&self) -> TestState {
        self.session.state()
    }

    pub fn session(&self) -> &TestSession {
        &self.session
    }

    /// Whether leaving now should ask for confirmation.
    pub fn in_progress(&self) -> bool {
        self.session.in_progress()
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.session.result()
    }
}
