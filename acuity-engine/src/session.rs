//! Per-eye adaptive search and the two-eye test session.
//!
//! [`TestSession`] is a plain value: [`TestSession::apply`] takes the session
//! and one event and returns the next session together with the render
//! actions for the adapter. Nothing here touches a display.

use acuity_shared::SaveResultRequest;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calibration::Calibration;
use crate::config::TestConfig;
use crate::feedback::{determine_vision_feedback, VisionFeedback};
use crate::levels::{generate_test_levels, GapPosition, TestLevel};
use crate::optotype::optotype_size_px;
use crate::state::{Eye, Presentation, TestAction, TestEvent, TestState};

/// Search progress for one eye.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EyeSession {
    pub eye: Eye,
    pub current_index: usize,
    pub incorrect_count: u8,
    /// Starts at 1, so an eye that fails every trial still reports level 1
    pub highest_level_passed: u8,
    levels: Vec<TestLevel>,
}

/// Outcome of a correct or incorrect answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    /// Incorrect, and the eye's allowance is used up
    MaxIncorrect,
}

impl EyeSession {
    /// Fresh session with a newly randomized level sequence.
    pub fn new<R: Rng + ?Sized>(eye: Eye, rng: &mut R) -> Self {
        Self::with_levels(eye, generate_test_levels(rng))
    }

    pub fn with_levels(eye: Eye, levels: Vec<TestLevel>) -> Self {
        Self {
            eye,
            current_index: 0,
            incorrect_count: 0,
            highest_level_passed: 1,
            levels,
        }
    }

    pub fn levels(&self) -> &[TestLevel] {
        &self.levels
    }

    /// Trial to present next, None once the sequence is exhausted.
    pub fn current(&self) -> Option<&TestLevel> {
        self.levels.get(self.current_index)
    }

    pub fn is_complete(&self, config: &TestConfig) -> bool {
        self.incorrect_count >= config.max_incorrect || self.current_index >= self.levels.len()
    }

    /// Score an answer against the current trial and move the index.
    pub fn answer(&mut self, answer: GapPosition, config: &TestConfig) -> Option<AnswerOutcome> {
        let trial = *self.current()?;

        if trial.is_correct(answer) {
            self.current_index += config.step_after_correct(trial.level);
            self.highest_level_passed = self.highest_level_passed.max(trial.level);
            debug!(
                "{} correct at level {}, index now {}",
                self.eye, trial.level, self.current_index
            );
            return Some(AnswerOutcome::Correct);
        }

        self.incorrect_count += 1;
        if self.incorrect_count >= config.max_incorrect {
            debug!("{} reached {} incorrect answers", self.eye, self.incorrect_count);
            return Some(AnswerOutcome::MaxIncorrect);
        }

        self.current_index = self.current_index.saturating_sub(1);
        debug!(
            "{} incorrect at level {} ({} so far), index now {}",
            self.eye, trial.level, self.incorrect_count, self.current_index
        );
        Some(AnswerOutcome::Incorrect)
    }

    pub fn outcome(&self) -> EyeOutcome {
        EyeOutcome {
            level: self.highest_level_passed,
            incorrect: self.incorrect_count,
        }
    }
}

/// Final numbers for one eye.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeOutcome {
    pub level: u8,
    pub incorrect: u8,
}

/// Aggregate result once both eyes are done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub left_eye_level: u8,
    pub right_eye_level: u8,
    pub left_eye_incorrect: u8,
    pub right_eye_incorrect: u8,
    /// Incorrect count of the session that ran last (the right eye)
    pub incorrect_answers: u8,
    pub feedback: VisionFeedback,
}

impl TestResult {
    pub fn new(left: EyeOutcome, right: EyeOutcome) -> Self {
        Self {
            left_eye_level: left.level,
            right_eye_level: right.level,
            left_eye_incorrect: left.incorrect,
            right_eye_incorrect: right.incorrect,
            incorrect_answers: right.incorrect,
            feedback: determine_vision_feedback(left.level, right.level),
        }
    }

    /// Body for the save-results endpoint.
    pub fn to_request(&self) -> SaveResultRequest {
        SaveResultRequest {
            left_eye_level: self.left_eye_level,
            right_eye_level: self.right_eye_level,
            incorrect_answers: self.incorrect_answers,
            right_eye_incorrect: self.right_eye_incorrect,
            left_eye_incorrect: self.left_eye_incorrect,
            feedback: self.feedback.message().to_string(),
        }
    }
}

/// Complete state of a two-eye test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSession {
    calibration: Calibration,
    config: TestConfig,
    state: TestState,
    eye: Option<EyeSession>,
    left: Option<EyeOutcome>,
    result: Option<TestResult>,
    in_progress: bool,
}

impl TestSession {
    pub fn new(calibration: Calibration, config: TestConfig) -> Self {
        Self {
            calibration,
            config,
            state: TestState::NotStarted,
            eye: None,
            left: None,
            result: None,
            in_progress: false,
        }
    }

    pub fn state(&self) -> TestState {
        self.state
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Session of the eye currently under test.
    pub fn eye_session(&self) -> Option<&EyeSession> {
        self.eye.as_ref()
    }

    pub fn left_outcome(&self) -> Option<EyeOutcome> {
        self.left
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    /// True from start until the final result is acknowledged.
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Apply one event, returning the next session and what to render.
    pub fn apply<R: Rng + ?Sized>(
        mut self,
        event: TestEvent,
        rng: &mut R,
    ) -> (Self, Vec<TestAction>) {
        let actions = self.handle(event, rng);
        (self, actions)
    }

    pub(crate) fn handle<R: Rng + ?Sized>(
        &mut self,
        event: TestEvent,
        rng: &mut R,
    ) -> Vec<TestAction> {
        use TestState::*;

        let mut actions = Vec::new();
        match (self.state, event) {
            (_, TestEvent::Start) => {
                info!("Starting visual acuity test");
                self.eye = Some(EyeSession::new(Eye::Left, rng));
                self.left = None;
                self.result = None;
                self.in_progress = true;
                actions.push(TestAction::ShowInstructions { eye: Eye::Left });
                self.present(&mut actions);
            }

            (AwaitingResponse { .. }, TestEvent::Answer(answer)) => {
                let outcome = match self.eye.as_mut() {
                    Some(eye) => eye.answer(answer, &self.config),
                    None => None,
                };
                match outcome {
                    Some(AnswerOutcome::Correct) => self.present(&mut actions),
                    Some(AnswerOutcome::Incorrect) => {
                        actions.push(TestAction::WrongAnswer);
                        self.present(&mut actions);
                    }
                    Some(AnswerOutcome::MaxIncorrect) => {
                        actions.push(TestAction::MaxIncorrectReached);
                        self.complete_eye(&mut actions);
                    }
                    None => warn!("Answer {answer} received with no trial on screen"),
                }
            }

            (EyeComplete { eye: Eye::Left }, TestEvent::CoverEyeAcknowledged) => {
                info!("Switching to the right eye");
                self.eye = Some(EyeSession::new(Eye::Right, rng));
                actions.push(TestAction::ShowInstructions { eye: Eye::Right });
                self.present(&mut actions);
            }

            (SessionComplete, TestEvent::ResultAcknowledged) if self.in_progress => {
                self.in_progress = false;
                if let Some(result) = &self.result {
                    actions.push(TestAction::SubmitResult(result.to_request()));
                }
            }

            (state, event) => {
                warn!("Ignoring {event:?} in state {state:?}");
            }
        }
        actions
    }

    /// Present the current trial, or finish the eye if its search is over.
    fn present(&mut self, actions: &mut Vec<TestAction>) {
        let Some(eye) = self.eye.as_ref() else {
            return;
        };
        if eye.is_complete(&self.config) {
            self.complete_eye(actions);
            return;
        }
        let Some(trial) = eye.current() else {
            return;
        };

        let size_px = optotype_size_px(trial.level, &self.calibration, &self.config.sizing);
        debug!(
            "{}: level {} at {} ({} px)",
            eye.eye, trial.level, trial.rotation, size_px
        );
        self.state = TestState::AwaitingResponse {
            eye: eye.eye,
            level: trial.level,
        };
        actions.push(TestAction::Present(Presentation {
            eye: eye.eye,
            level: trial.level,
            rotation: trial.rotation,
            size_px,
        }));
    }

    fn complete_eye(&mut self, actions: &mut Vec<TestAction>) {
        let Some(eye) = self.eye.as_ref() else {
            return;
        };
        let outcome = eye.outcome();
        info!(
            "{} finished at level {} with {} incorrect",
            eye.eye, outcome.level, outcome.incorrect
        );

        match eye.eye {
            Eye::Left => {
                self.left = Some(outcome);
                self.state = TestState::EyeComplete { eye: Eye::Left };
                actions.push(TestAction::PromptCoverEye {
                    completed: Eye::Left,
                    next: Eye::Right,
                });
            }
            Eye::Right => {
                let left = self.left.unwrap_or(EyeOutcome {
                    level: 1,
                    incorrect: 0,
                });
                let result = TestResult::new(left, outcome);
                self.state = TestState::SessionComplete;
                self.result = Some(result.clone());
                actions.push(TestAction::Finished(result));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Severity;
    use crate::levels::Rotation;
    use acuity_shared::CalibrationRecord;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn calibration() -> Calibration {
        Calibration::new(CalibrationRecord {
            scaling_factor: 0.875,
            target_distance: 400.0,
            measured_distance: 350.0,
            screen_width: 508.0,
            screen_height: 285.75,
            pixel_density: 1.0,
            calibration_date: "2024-11-02T10:15:00.000Z".to_string(),
        })
        .unwrap()
    }

    /// All trials with the gap at 0 degrees, so "1" is always right.
    fn fixed_levels() -> Vec<TestLevel> {
        (1..=17)
            .map(|level| TestLevel::new(level, Rotation::ALL[0]))
            .collect()
    }

    fn right() -> GapPosition {
        GapPosition::new(1).unwrap()
    }

    fn wrong() -> GapPosition {
        GapPosition::new(5).unwrap()
    }

    #[test]
    fn test_correct_answer_steps() {
        let config = TestConfig::default();
        let mut eye = EyeSession::with_levels(Eye::Left, fixed_levels());
        eye.current_index = 4;
        assert_eq!(eye.current().unwrap().level, 5);

        assert_eq!(eye.answer(right(), &config), Some(AnswerOutcome::Correct));
        assert_eq!(eye.current_index, 6);
        assert_eq!(eye.highest_level_passed, 5);

        eye.current_index = 11;
        assert_eq!(eye.answer(right(), &config), Some(AnswerOutcome::Correct));
        assert_eq!(eye.current_index, 12);
        assert_eq!(eye.highest_level_passed, 12);
    }

    #[test]
    fn test_incorrect_steps_back_and_saturates() {
        let config = TestConfig::default();
        let mut eye = EyeSession::with_levels(Eye::Left, fixed_levels());

        assert_eq!(eye.answer(wrong(), &config), Some(AnswerOutcome::Incorrect));
        assert_eq!(eye.current_index, 0);
        assert_eq!(eye.answer(wrong(), &config), Some(AnswerOutcome::Incorrect));
        assert_eq!(eye.answer(wrong(), &config), Some(AnswerOutcome::MaxIncorrect));
        assert_eq!(eye.incorrect_count, 3);
        assert!(eye.is_complete(&config));
        assert_eq!(eye.outcome(), EyeOutcome { level: 1, incorrect: 3 });
    }

    #[test]
    fn test_all_correct_exhausts_sequence() {
        let config = TestConfig::default();
        let mut eye = EyeSession::with_levels(Eye::Right, fixed_levels());
        while !eye.is_complete(&config) {
            eye.answer(right(), &config);
        }
        // 1,3,5,7,9,11 then 12..=17
        assert_eq!(eye.highest_level_passed, 17);
        assert_eq!(eye.incorrect_count, 0);
        assert_eq!(eye.current_index, 17);
    }

    #[test]
    fn test_start_presents_left_eye() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let session = TestSession::new(calibration(), TestConfig::default());
        assert!(!session.in_progress());

        let (session, actions) = session.apply(TestEvent::Start, &mut rng);
        assert!(session.in_progress());
        assert_eq!(
            session.state(),
            TestState::AwaitingResponse {
                eye: Eye::Left,
                level: 1
            }
        );
        assert_eq!(actions[0], TestAction::ShowInstructions { eye: Eye::Left });
        let TestAction::Present(p) = &actions[1] else {
            panic!("expected a presentation, got {actions:?}");
        };
        assert_eq!(p.level, 1);
        assert!(p.size_px > 1);
    }

    #[test]
    fn test_events_out_of_order_are_ignored() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let session = TestSession::new(calibration(), TestConfig::default());

        let (session, actions) = session.apply(TestEvent::Answer(right()), &mut rng);
        assert!(actions.is_empty());
        assert_eq!(session.state(), TestState::NotStarted);

        let (session, _) = session.apply(TestEvent::Start, &mut rng);
        let before = session.clone();
        let (session, actions) = session.apply(TestEvent::CoverEyeAcknowledged, &mut rng);
        assert!(actions.is_empty());
        assert_eq!(session, before);

        let (session, actions) = session.apply(TestEvent::ResultAcknowledged, &mut rng);
        assert!(actions.is_empty());
        assert_eq!(session, before);
    }

    #[test]
    fn test_three_misses_end_each_eye() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut session = TestSession::new(calibration(), TestConfig::default());
        session.handle(TestEvent::Start, &mut rng);

        let answer_wrong = |session: &mut TestSession, rng: &mut ChaCha8Rng| {
            let trial = *session.eye_session().unwrap().current().unwrap();
            let label = trial.correct_answer.label() % 8 + 1;
            session.handle(TestEvent::Answer(GapPosition::new(label).unwrap()), rng)
        };

        answer_wrong(&mut session, &mut rng);
        answer_wrong(&mut session, &mut rng);
        let actions = answer_wrong(&mut session, &mut rng);
        assert_eq!(
            actions,
            vec![
                TestAction::MaxIncorrectReached,
                TestAction::PromptCoverEye {
                    completed: Eye::Left,
                    next: Eye::Right
                }
            ]
        );
        assert_eq!(session.left_outcome(), Some(EyeOutcome { level: 1, incorrect: 3 }));

        let actions = session.handle(TestEvent::CoverEyeAcknowledged, &mut rng);
        assert_eq!(actions[0], TestAction::ShowInstructions { eye: Eye::Right });
        assert_eq!(session.eye_session().unwrap().incorrect_count, 0);

        answer_wrong(&mut session, &mut rng);
        answer_wrong(&mut session, &mut rng);
        let actions = answer_wrong(&mut session, &mut rng);
        let TestAction::Finished(result) = &actions[1] else {
            panic!("expected the result, got {actions:?}");
        };
        assert_eq!(result.left_eye_level, 1);
        assert_eq!(result.right_eye_level, 1);
        assert_eq!(result.feedback.severity, Severity::Severe);
        assert_eq!(session.state(), TestState::SessionComplete);
        assert!(session.in_progress());

        let actions = session.handle(TestEvent::ResultAcknowledged, &mut rng);
        assert!(matches!(actions.as_slice(), [TestAction::SubmitResult(_)]));
        assert!(!session.in_progress());

        // Submitted once only.
        assert!(session.handle(TestEvent::ResultAcknowledged, &mut rng).is_empty());
    }

    #[test]
    fn test_restart_resets_everything() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut session = TestSession::new(calibration(), TestConfig::default());
        session.handle(TestEvent::Start, &mut rng);
        let trial = *session.eye_session().unwrap().current().unwrap();
        session.handle(TestEvent::Answer(trial.correct_answer), &mut rng);
        assert_eq!(session.eye_session().unwrap().current_index, 2);

        session.handle(TestEvent::Start, &mut rng);
        let eye = session.eye_session().unwrap();
        assert_eq!(eye.eye, Eye::Left);
        assert_eq!(eye.current_index, 0);
        assert_eq!(eye.highest_level_passed, 1);
    }

    #[test]
    fn test_request_uses_right_eye_count() {
        let result = TestResult::new(
            EyeOutcome { level: 9, incorrect: 3 },
            EyeOutcome { level: 15, incorrect: 2 },
        );
        let request = result.to_request();
        assert_eq!(request.left_eye_level, 9);
        assert_eq!(request.right_eye_level, 15);
        assert_eq!(request.left_eye_incorrect, 3);
        assert_eq!(request.right_eye_incorrect, 2);
        assert_eq!(request.incorrect_answers, 2);
        assert_eq!(
            request.feedback,
            "Your vision is okay, but consider an eye checkup for better clarity."
        );
    }
}
