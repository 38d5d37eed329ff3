//! Prints engine actions to the terminal and saves optotype previews.

use std::path::PathBuf;

use acuity_engine::{Eye, Presentation, Rotation, TestAction, TestResult};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::render;

/// Side of the text optotype, in cells.
const MIN_CELLS: u32 = 7;
const MAX_CELLS: u32 = 31;
/// Screen pixels per text cell.
const PIXELS_PER_CELL: u32 = 4;

pub struct Terminal {
    preview_dir: Option<PathBuf>,
    presented: usize,
}

impl Terminal {
    pub fn new(preview_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = &preview_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating preview directory {}", dir.display()))?;
        }
        Ok(Self {
            preview_dir,
            presented: 0,
        })
    }

    pub fn show(&mut self, action: &TestAction) -> Result<()> {
        match action {
            TestAction::ShowInstructions { eye } => show_instructions(*eye),
            TestAction::Present(presentation) => self.present(presentation)?,
            TestAction::WrongAnswer | TestAction::MaxIncorrectReached => {
                if let Some(message) = action.message() {
                    println!("\n!! {message}");
                }
            }
            TestAction::PromptCoverEye { completed, next } => {
                println!("\n{completed} done.");
                for (i, line) in next.instructions().iter().enumerate() {
                    println!("  {}) {line}", i + 1);
                }
            }
            TestAction::Finished(result) => show_result(result),
            TestAction::SubmitResult(_) => {
                if let Some(message) = action.message() {
                    println!("\n{message}");
                }
            }
        }
        Ok(())
    }

    fn present(&mut self, presentation: &Presentation) -> Result<()> {
        self.presented += 1;
        println!(
            "\nCurrent Eye: {}   Current Level: {}   ({} px)",
            presentation.eye, presentation.level, presentation.size_px
        );

        let cells = (presentation.size_px / PIXELS_PER_CELL).clamp(MIN_CELLS, MAX_CELLS);
        for line in render::ascii_art(cells, presentation.rotation) {
            println!("    {line}");
        }

        if let Some(dir) = &self.preview_dir {
            if presentation.size_px > render::MAX_IMAGE_PX {
                warn!(
                    "Skipping preview: {} px exceeds {} px",
                    presentation.size_px,
                    render::MAX_IMAGE_PX
                );
                return Ok(());
            }
            let path = dir.join(format!(
                "{:03}_{}_level{:02}.png",
                self.presented,
                presentation.eye.as_str().to_lowercase(),
                presentation.level
            ));
            render::generate(presentation.size_px, presentation.rotation)
                .save(&path)
                .with_context(|| format!("writing preview {}", path.display()))?;
            info!("Preview written to {}", path.display());
        }
        Ok(())
    }
}

pub fn show_instructions(eye: Eye) {
    println!("\nVisual Acuity Test - {eye}");
    for (i, line) in eye.instructions().iter().enumerate() {
        println!("  {}) {line}", i + 1);
    }
}

/// Which digit to type for each gap direction.
pub fn legend() -> String {
    Rotation::ALL
        .iter()
        .map(|r| format!("{}={}", r.correct_answer(), render::gap_direction(*r)))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn show_result(result: &TestResult) {
    println!();
    for line in result.feedback.summary_lines() {
        println!("{line}");
    }
}
