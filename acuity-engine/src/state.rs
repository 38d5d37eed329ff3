use std::fmt;

use acuity_shared::SaveResultRequest;
use serde::{Deserialize, Serialize};

use crate::levels::{GapPosition, Rotation};
use crate::session::TestResult;

/// Eye under test. The left eye is always tested first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub fn as_str(self) -> &'static str {
        match self {
            Eye::Left => "Left",
            Eye::Right => "Right",
        }
    }

    /// The three instruction lines shown before this eye's trials.
    pub fn instructions(self) -> [&'static str; 3] {
        let cover = match self {
            Eye::Left => "Please cover your left eye!",
            Eye::Right => "Please cover your right eye!",
        };
        [
            cover,
            "Keep your head in a distance of 30-35 cm from the screen!",
            "Find the gap and mark it on the lower ring!",
        ]
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Eye", self.as_str())
    }
}

/// States of the trial state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    /// Waiting for the start button
    NotStarted,
    /// An optotype is on screen and a click is expected
    AwaitingResponse { eye: Eye, level: u8 },
    /// The eye's session ended; waiting for the cover-eye prompt to be confirmed
    EyeComplete { eye: Eye },
    /// Both eyes done; the result is on screen
    SessionComplete,
}

/// Inputs that drive state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestEvent {
    /// Start (or restart) the test with the left eye
    Start,
    /// The user clicked a ring segment
    Answer(GapPosition),
    /// The user confirmed the cover-eye prompt
    CoverEyeAcknowledged,
    /// The user confirmed the final result
    ResultAcknowledged,
}

/// What the rendering adapter has to draw for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presentation {
    pub eye: Eye,
    pub level: u8,
    pub rotation: Rotation,
    /// Width and height of the optotype in pixels
    pub size_px: u32,
}

/// Render instructions emitted by a transition, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum TestAction {
    ShowInstructions { eye: Eye },
    Present(Presentation),
    WrongAnswer,
    MaxIncorrectReached,
    PromptCoverEye { completed: Eye, next: Eye },
    Finished(TestResult),
    /// Post the result; emitted once per completed session
    SubmitResult(SaveResultRequest),
}

impl TestAction {
    /// Status line to show for this action, if it has one.
    pub fn message(&self) -> Option<String> {
        match self {
            TestAction::WrongAnswer => Some("Wrong answer! Be careful.".to_string()),
            TestAction::MaxIncorrectReached => {
                Some("Maximum incorrect answers reached.".to_string())
            }
            TestAction::PromptCoverEye { next, .. } => Some(next.instructions()[0].to_string()),
            TestAction::Present(p) => Some(format!("Current Level: {}", p.level)),
            TestAction::Finished(result) => Some(result.feedback.message().to_string()),
            TestAction::SubmitResult(_) => Some("Saving results...".to_string()),
            TestAction::ShowInstructions { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_display() {
        assert_eq!(Eye::Left.to_string(), "Left Eye");
        assert_eq!(Eye::Right.to_string(), "Right Eye");
    }

    #[test]
    fn test_instructions() {
        assert_eq!(Eye::Left.instructions()[0], "Please cover your left eye!");
        assert_eq!(Eye::Right.instructions()[0], "Please cover your right eye!");
        assert_eq!(Eye::Left.instructions()[1], Eye::Right.instructions()[1]);
    }

    #[test]
    fn test_action_messages() {
        assert_eq!(
            TestAction::WrongAnswer.message().as_deref(),
            Some("Wrong answer! Be careful.")
        );
        assert_eq!(
            TestAction::MaxIncorrectReached.message().as_deref(),
            Some("Maximum incorrect answers reached.")
        );
        assert_eq!(TestAction::ShowInstructions { eye: Eye::Left }.message(), None);
    }
}
