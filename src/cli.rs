//! CLI argument definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::classify::{McidScope, ThresholdScope};
use crate::config::CliOverrides;

/// Exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INPUT_NOT_FOUND: i32 = 2;
    pub const INPUT_INTEGRITY: i32 = 3;
    pub const SERIALIZATION: i32 = 4;
    pub const CONFIG_ERROR: i32 = 5;
}

/// Add logical structure tags to PDFs for assistive technology
#[derive(Debug, Parser)]
#[command(name = "pdf-a11y-tagger", version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Tag a PDF with headings, paragraphs and list items
    Tag(TagArgs),

    /// Print the blocks a PDF would be tagged with
    Inspect(InspectArgs),

    /// List image keys or inject alt text from a JSON map
    AltText(AltTextArgs),

    /// Show document accessibility facts and config locations
    Info(InfoArgs),
}

/// Threshold scope as a CLI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    Document,
    Page,
}

impl From<ScopeArg> for ThresholdScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Document => ThresholdScope::Document,
            ScopeArg::Page => ThresholdScope::Page,
        }
    }
}

impl From<ScopeArg> for McidScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Document => McidScope::Document,
            ScopeArg::Page => McidScope::Page,
        }
    }
}

/// Options shared by commands that classify text
#[derive(Debug, Clone, Args)]
pub struct ClassifyArgs {
    /// Config file (default: ./pdf-a11y-tagger.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Level-1 heading ratio of the largest font size
    #[arg(long, value_name = "RATIO")]
    pub h1_ratio: Option<f32>,

    /// Level-2 heading ratio of the largest font size
    #[arg(long, value_name = "RATIO")]
    pub h2_ratio: Option<f32>,

    /// Where the largest font size is measured
    #[arg(long, value_enum)]
    pub threshold_scope: Option<ScopeArg>,

    /// Range over which MCIDs are unique
    #[arg(long, value_enum)]
    pub mcid_scope: Option<ScopeArg>,

    /// Baseline tolerance for merging runs into one line
    #[arg(long, value_name = "PT")]
    pub y_tolerance: Option<f32>,

    /// Keep every show-text run as its own fragment
    #[arg(long)]
    pub no_merge_lines: bool,
}

impl ClassifyArgs {
    /// Overrides for the classification settings
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            heading1_ratio: self.h1_ratio,
            heading2_ratio: self.h2_ratio,
            threshold_scope: self.threshold_scope.map(Into::into),
            mcid_scope: self.mcid_scope.map(Into::into),
            y_tolerance: self.y_tolerance,
            merge_lines: self.no_merge_lines.then_some(false),
            ..CliOverrides::default()
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct TagArgs {
    /// Input PDF
    pub input: PathBuf,

    /// Output PDF
    pub output: PathBuf,

    #[command(flatten)]
    pub classify: ClassifyArgs,

    /// Document title
    #[arg(long)]
    pub title: Option<String>,

    /// Document language (BCP 47 tag, default en-US)
    #[arg(long)]
    pub lang: Option<String>,

    /// Leave title and language untouched
    #[arg(long, conflicts_with_all = ["title", "lang"])]
    pub no_metadata: bool,

    /// JSON map of image key to alt text to inject while tagging
    #[arg(long, value_name = "JSON")]
    pub alt_text: Option<PathBuf>,

    /// Allow OUTPUT to be the same file as INPUT
    #[arg(long)]
    pub in_place: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl TagArgs {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            title: self.title.clone(),
            lang: self.lang.clone(),
            skip_metadata: self.no_metadata,
            in_place: self.in_place,
            ..self.classify.overrides()
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// Input PDF
    pub input: PathBuf,

    #[command(flatten)]
    pub classify: ClassifyArgs,

    /// Print blocks as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct AltTextArgs {
    /// Input PDF
    pub input: PathBuf,

    /// JSON map of image key to alt text; without it, image keys are listed
    #[arg(long, value_name = "JSON", requires = "output")]
    pub map: Option<PathBuf>,

    /// Output PDF
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Allow OUTPUT to be the same file as INPUT
    #[arg(long)]
    pub in_place: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct InfoArgs {
    /// PDF to describe; without it only version and config paths are shown
    pub input: Option<PathBuf>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tag() {
        let cli = Cli::parse_from([
            "pdf-a11y-tagger",
            "tag",
            "in.pdf",
            "out.pdf",
            "--title",
            "Report",
            "--threshold-scope",
            "page",
            "--no-merge-lines",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Tag(args) = cli.command else {
            panic!("expected tag");
        };
        assert_eq!(args.input, PathBuf::from("in.pdf"));
        assert_eq!(args.classify.threshold_scope, Some(ScopeArg::Page));

        let overrides = args.overrides();
        assert_eq!(overrides.title.as_deref(), Some("Report"));
        assert_eq!(overrides.threshold_scope, Some(ThresholdScope::Page));
        assert_eq!(overrides.merge_lines, Some(false));
        assert!(overrides.lang.is_none());
    }

    #[test]
    fn test_no_metadata_conflicts_with_title() {
        let result = Cli::try_parse_from([
            "pdf-a11y-tagger",
            "tag",
            "in.pdf",
            "out.pdf",
            "--title",
            "T",
            "--no-metadata",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_alt_text_map_requires_output() {
        let result = Cli::try_parse_from(["pdf-a11y-tagger", "alt-text", "in.pdf", "--map", "m.json"]);
        assert!(result.is_err());

        let cli = Cli::parse_from(["pdf-a11y-tagger", "alt-text", "in.pdf"]);
        assert!(matches!(cli.command, Commands::AltText(ref a) if a.map.is_none()));
    }

    #[test]
    fn test_inspect_defaults() {
        let cli = Cli::parse_from(["pdf-a11y-tagger", "inspect", "in.pdf", "--json"]);
        let Commands::Inspect(args) = cli.command else {
            panic!("expected inspect");
        };
        assert!(args.json);
        let overrides = args.classify.overrides();
        assert!(overrides.merge_lines.is_none());
        assert!(overrides.heading1_ratio.is_none());
    }
}
