//! pdf-a11y-tagger - Structure tagging for untagged PDFs
//!
//! CLI entry point

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use pdf_a11y_tagger::{
    exit_codes,
    // Alt text
    document_images, load_alt_text_map,
    // CLI
    AltTextArgs, Cli, Commands, InfoArgs, InspectArgs, TagArgs,
    // Config
    CliOverrides, Config, ConfigError,
    // Pipeline
    load_document, DocumentInfo, ErrorKind, PipelineError, TaggingOptions, TaggingPipeline,
    // Progress
    ConsoleProgress, OutputMode,
};
use tracing::{warn, Level};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let mode = OutputMode::from_flags(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Tag(args) => run_tag(args, mode),
        Commands::Inspect(args) => run_inspect(args),
        Commands::AltText(args) => run_alt_text(args, mode),
        Commands::Info(args) => run_info(args),
    };

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    });
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<PipelineError>() {
        return match e.kind() {
            ErrorKind::InputNotFound => exit_codes::INPUT_NOT_FOUND,
            ErrorKind::InputIntegrity => exit_codes::INPUT_INTEGRITY,
            ErrorKind::Serialization => exit_codes::SERIALIZATION,
            ErrorKind::Config => exit_codes::CONFIG_ERROR,
            ErrorKind::Document => exit_codes::GENERAL_ERROR,
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return exit_codes::CONFIG_ERROR;
    }
    exit_codes::GENERAL_ERROR
}

/// Explicit config files must load; the implicit lookup falls back to defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load_from_path(path)?),
        None => Ok(Config::load().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable config file");
            Config::default()
        })),
    }
}

fn pipeline_options(config_path: Option<&Path>, overrides: &CliOverrides) -> Result<TaggingOptions> {
    Ok(load_config(config_path)?.merge_with_cli(overrides))
}

// ============ Tag Command ============

fn run_tag(args: &TagArgs, mode: OutputMode) -> Result<()> {
    let mut options = pipeline_options(args.classify.config.as_deref(), &args.overrides())?;
    if let Some(map_path) = &args.alt_text {
        let map = load_alt_text_map(map_path).map_err(PipelineError::from)?;
        options.alt_text = Some(map);
    }

    let pipeline = TaggingPipeline::new(options);
    let progress = ConsoleProgress::new(mode);
    let result = pipeline
        .process_with_progress(&args.input, &args.output, &progress)
        .with_context(|| format!("Failed to tag {}", args.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    if mode.should_show(OutputMode::Normal) {
        println!(
            "Tagged {} of {} pages: {} headings (H1 {}, H2 {}), {} paragraphs, {} list items",
            result.tagged_pages,
            result.page_count,
            result.counts.heading1 + result.counts.heading2,
            result.counts.heading1,
            result.counts.heading2,
            result.counts.paragraph,
            result.counts.list_item
        );
        if let Some(report) = &result.alt_text {
            println!(
                "Alt text: {} applied, {} unmatched",
                report.applied.len(),
                report.unmatched.len()
            );
        }
        println!(
            "Wrote {} ({} bytes) in {:.2}s",
            result.output.display(),
            result.output_size,
            result.elapsed_seconds
        );
    }
    Ok(())
}

// ============ Inspect Command ============

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let options = pipeline_options(args.classify.config.as_deref(), &args.classify.overrides())?;
    let blocks = TaggingPipeline::new(options)
        .inspect(&args.input)
        .with_context(|| format!("Failed to inspect {}", args.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }

    println!("{:>4} {:>4}  {:<3} TEXT", "PAGE", "MCID", "TAG");
    for block in &blocks {
        let text: String = block.text.chars().take(72).collect();
        println!(
            "{:>4} {:>4}  {:<3} {}",
            block.page_number,
            block.mcid,
            block.kind.role(),
            text
        );
    }
    Ok(())
}

// ============ Alt Text Command ============

fn run_alt_text(args: &AltTextArgs, mode: OutputMode) -> Result<()> {
    let (Some(map_path), Some(output)) = (&args.map, &args.output) else {
        return list_images(args);
    };

    let map = load_alt_text_map(map_path).map_err(PipelineError::from)?;
    let options = TaggingOptions {
        in_place: args.in_place,
        ..TaggingOptions::structure_only()
    };
    let report = TaggingPipeline::new(options)
        .process_alt_text(&args.input, output, &map)
        .with_context(|| format!("Failed to inject alt text into {}", args.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if mode.should_show(OutputMode::Normal) {
        for key in &report.applied {
            println!("  wrote alt text for {}", key);
        }
        for key in &report.unmatched {
            println!("  no image for {}", key);
        }
        println!("Saved {}", output.display());
    }
    Ok(())
}

fn list_images(args: &AltTextArgs) -> Result<()> {
    let doc = load_document(&args.input).map_err(PipelineError::from)?;
    let images = document_images(&doc).map_err(PipelineError::from)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&images)?);
        return Ok(());
    }
    for image in &images {
        println!(
            "{}  /{}{}",
            image.key,
            image.resource_name,
            if image.has_alt { "  (has alt)" } else { "" }
        );
    }
    Ok(())
}

// ============ Info Command ============

fn run_info(args: &InfoArgs) -> Result<()> {
    let info = match &args.input {
        Some(input) => {
            let doc = load_document(input).map_err(PipelineError::from)?;
            Some(DocumentInfo::read(&doc))
        }
        None => None,
    };

    if args.json {
        let report = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "config_paths": Config::search_paths(),
            "document": info,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("pdf-a11y-tagger v{}", env!("CARGO_PKG_VERSION"));

    if let Some(info) = info {
        println!();
        println!("Document:");
        println!("  PDF version:    {}", info.version);
        println!("  Pages:          {}", info.page_count);
        println!("  Title:          {}", info.title.as_deref().unwrap_or("(none)"));
        println!("  Language:       {}", info.lang.as_deref().unwrap_or("(none)"));
        println!("  Marked:         {}", if info.marked { "yes" } else { "no" });
        println!(
            "  Structure tree: {}",
            if info.has_struct_tree { "yes" } else { "no" }
        );
    }

    println!();
    println!("Config File Locations:");
    for path in Config::search_paths() {
        let found = if path.is_file() { " (found)" } else { "" };
        println!("  {}{}", path.display(), found);
    }
    Ok(())
}
