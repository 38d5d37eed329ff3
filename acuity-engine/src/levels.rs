//! Optotype orientations and the per-eye level sequence.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::config::LEVEL_COUNT;
use crate::error::AcuityError;

/// Gap orientation of the ring, in 45 degree steps clockwise from the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rotation(u8);

impl Rotation {
    pub const ALL: [Rotation; 8] = [
        Rotation(0),
        Rotation(1),
        Rotation(2),
        Rotation(3),
        Rotation(4),
        Rotation(5),
        Rotation(6),
        Rotation(7),
    ];

    /// Rotation from a multiple of 45 degrees in `0..360`.
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        if degrees % 45 == 0 && degrees < 360 {
            Some(Rotation((degrees / 45) as u8))
        } else {
            None
        }
    }

    /// Uniformly random orientation.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Rotation(rng.gen_range(0..8))
    }

    pub fn degrees(self) -> u16 {
        u16::from(self.0) * 45
    }

    pub fn radians(self) -> f64 {
        f64::from(self.degrees()).to_radians()
    }

    /// Click region that identifies this orientation.
    pub fn correct_answer(self) -> GapPosition {
        GapPosition::from_rotation(self)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// One of the eight clickable ring segments, labelled "1" to "8".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GapPosition(u8);

impl GapPosition {
    pub fn new(label: u8) -> Option<Self> {
        (1..=8).contains(&label).then_some(GapPosition(label))
    }

    /// `((degrees / 45) + 1) mod 8`, with 0 reported as 8.
    pub fn from_rotation(rotation: Rotation) -> Self {
        match (rotation.0 + 1) % 8 {
            0 => GapPosition(8),
            n => GapPosition(n),
        }
    }

    pub fn label(self) -> u8 {
        self.0
    }
}

impl fmt::Display for GapPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GapPosition {
    type Err = AcuityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(GapPosition::new)
            .ok_or_else(|| AcuityError::InvalidAnswer(s.to_string()))
    }
}

/// A single trial: which level to show and how the gap is oriented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestLevel {
    pub level: u8,
    pub rotation: Rotation,
    pub correct_answer: GapPosition,
}

impl TestLevel {
    pub fn new(level: u8, rotation: Rotation) -> Self {
        Self {
            level,
            rotation,
            correct_answer: rotation.correct_answer(),
        }
    }

    pub fn is_correct(&self, answer: GapPosition) -> bool {
        self.correct_answer == answer
    }
}

/// One trial per level 1..=17, each with an independent random orientation.
pub fn generate_test_levels<R: Rng + ?Sized>(rng: &mut R) -> Vec<TestLevel> {
    (1..=LEVEL_COUNT)
        .map(|level| TestLevel::new(level, Rotation::random(rng)))
        .collect()
}
