//! Progress reporting module for tagging runs.
//!
//! Stages are reported through [`ProgressCallback`]; the CLI renders them on
//! stderr so stdout stays free for `--json` reports.

use std::fmt;
use std::io::{self, Write};

/// Processing stages of a tagging run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingStage {
    /// Initializing
    #[default]
    Initializing,
    /// Parsing the input PDF
    Loading,
    /// Reading positioned text from page content
    Extracting,
    /// Labelling fragments as headings, paragraphs and list items
    Classifying,
    /// Building the structure tree and marked-content spans
    Planning,
    /// Committing the plan to the document
    Applying,
    /// Title and language
    Metadata,
    /// Writing the output PDF
    Writing,
    /// Completed
    Completed,
}

impl ProcessingStage {
    /// Get the name of the stage
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingStage::Initializing => "Initializing",
            ProcessingStage::Loading => "Loading",
            ProcessingStage::Extracting => "Extracting",
            ProcessingStage::Classifying => "Classifying",
            ProcessingStage::Planning => "Planning",
            ProcessingStage::Applying => "Applying",
            ProcessingStage::Metadata => "Metadata",
            ProcessingStage::Writing => "Writing",
            ProcessingStage::Completed => "Completed",
        }
    }

    /// Get a short description of the stage
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::Initializing => "preparing",
            ProcessingStage::Loading => "parsing document",
            ProcessingStage::Extracting => "extracting text layout",
            ProcessingStage::Classifying => "classifying blocks",
            ProcessingStage::Planning => "planning structure tree",
            ProcessingStage::Applying => "tagging pages",
            ProcessingStage::Metadata => "writing title and language",
            ProcessingStage::Writing => "writing output",
            ProcessingStage::Completed => "done",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.description())
    }
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// No output
    Quiet,
    /// Normal output (stage display only)
    #[default]
    Normal,
    /// Verbose output (page-level progress)
    Verbose,
    /// Very verbose (debug messages)
    VeryVerbose,
}

impl OutputMode {
    /// Create OutputMode from verbosity level
    pub fn from_verbosity(level: u8) -> Self {
        match level {
            0 => OutputMode::Normal,
            1 => OutputMode::Verbose,
            _ => OutputMode::VeryVerbose,
        }
    }

    /// Create OutputMode from the CLI's `-v` count and `--quiet` flag
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            OutputMode::Quiet
        } else {
            Self::from_verbosity(verbose)
        }
    }

    /// Check if output should be shown at this mode
    pub fn should_show(&self, required: OutputMode) -> bool {
        use OutputMode::*;
        match (self, required) {
            (Quiet, _) => false,
            (Normal, Quiet | Normal) => true,
            (Verbose, Quiet | Normal | Verbose) => true,
            (VeryVerbose, _) => true,
            _ => false,
        }
    }
}

/// Progress bar width in characters
const PROGRESS_BAR_WIDTH: usize = 40;

/// Build a progress bar string
pub fn build_progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = (percent as usize * PROGRESS_BAR_WIDTH) / 100;
    let empty = PROGRESS_BAR_WIDTH - filled;
    format!("[{}{}]", "=".repeat(filled), "-".repeat(empty))
}

/// Receives stage transitions from the pipeline
pub trait ProgressCallback {
    /// A stage is starting
    fn on_step_start(&self, _stage: ProcessingStage) {}

    /// Item-level progress inside the current stage
    fn on_step_progress(&self, _current: usize, _total: usize) {}

    /// A stage finished with a short summary
    fn on_step_complete(&self, _stage: ProcessingStage, _message: &str) {}

    /// Diagnostic detail
    fn on_debug(&self, _message: &str) {}
}

/// Discards every report
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {}

/// Renders progress on stderr
#[derive(Debug, Clone, Copy)]
pub struct ConsoleProgress {
    mode: OutputMode,
}

impl ConsoleProgress {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_step_start(&self, stage: ProcessingStage) {
        if self.mode.should_show(OutputMode::Verbose) {
            eprintln!("  Stage: {}", stage);
        }
    }

    fn on_step_progress(&self, current: usize, total: usize) {
        if total > 0 && self.mode.should_show(OutputMode::Verbose) {
            let percent = ((current as f64 / total as f64) * 100.0) as u8;
            eprint!(
                "\r    {} {:3}% ({}/{})",
                build_progress_bar(percent),
                percent,
                current,
                total
            );
            if current >= total {
                eprintln!();
            }
            let _ = io::stderr().flush();
        }
    }

    fn on_step_complete(&self, stage: ProcessingStage, message: &str) {
        if self.mode.should_show(OutputMode::Verbose) {
            eprintln!("    {}: {}", stage.name(), message);
        }
    }

    fn on_debug(&self, message: &str) {
        if self.mode.should_show(OutputMode::VeryVerbose) {
            eprintln!("    [DEBUG] {}", message);
        }
    }
}
