use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde_json::json;
use stackmark_core::classify::is_in_app;
use stackmark_core::codec::normalize_uuid;
use stackmark_core::config::ErrorTrackingConfig;
use stackmark_core::images::file::read_image_file;
use stackmark_core::images::ImageCatalog;
use stackmark_core::ErrorTracker;
use stackmark_utils::{debug, init_logging_with, LogFormat, LogLevel, LoggingOptions};

/// Prefix of the environment variables that adjust in-app classification.
const ENV_PREFIX: &str = "STACKMARK";

/// Inspect loaded binary images and symbolicated call stacks.
#[derive(Parser, Debug)]
#[command(name = "stackmark")]
#[command(version)]
#[command(about = "Inspect loaded binary images and symbolicated call stacks", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,

    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format: pretty or json (overrides STACKMARK_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Pretty-print JSON output
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,

    /// Module-name prefix to always treat as in-app (repeatable)
    #[arg(long = "include", global = true)]
    includes: Vec<String>,

    /// Module-name prefix to never treat as in-app (repeatable)
    #[arg(long = "exclude", global = true)]
    excludes: Vec<String>,

    /// Treat modules that match no rule as not in-app
    #[arg(long, global = true, default_value_t = false)]
    not_in_app_by_default: bool,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List the binary images loaded into this process
    Images
    {
        /// Only report images loaded at these addresses (hex)
        #[arg(long = "address")]
        addresses: Vec<String>,
    },
    /// Capture and symbolicate this process's stack, with its image table
    Trace
    {
        /// Number of frames to drop from the top of the stack
        #[arg(short, long, default_value_t = 0)]
        skip: usize,
    },
    /// Parse pre-formatted stack text from a file (or stdin)
    Parse
    {
        /// File holding the stack text; reads stdin when omitted
        file: Option<PathBuf>,
    },
    /// Read build id and code-segment bounds from a binary on disk
    Inspect
    {
        /// Path to a Mach-O or ELF file
        path: PathBuf,
    },
    /// Normalize UUID text to canonical form
    Uuid
    {
        /// UUID, with or without hyphens
        text: String,
    },
    /// Show how a module name is classified
    Classify
    {
        /// Module name (last path component of the image)
        module: String,
    },
}

fn main()
{
    let cli = Cli::parse();

    let mut options = LoggingOptions::from_env();
    if let Some(level) = cli.log_level {
        options = options.level(level);
    }
    if let Some(format) = cli.log_format {
        options = options.format(format);
    }

    let _guard = match init_logging_with(&options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(cli: &Cli) -> Result<(), Box<dyn std::error::Error>>
{
    let config = build_config(cli);
    debug!(?config, "classification settings");

    let output = match &cli.command {
        Commands::Images { addresses } => {
            let catalog = ImageCatalog::new();
            if addresses.is_empty() {
                serde_json::to_value(catalog.list_loaded_images())?
            } else {
                serde_json::to_value(catalog.find_images(addresses))?
            }
        }
        Commands::Trace { skip } => {
            let tracker = ErrorTracker::new(config);
            let frames = tracker.capture_frames(*skip);
            let images = tracker.debug_images(&frames);
            json!({ "frames": frames, "debug_images": images })
        }
        Commands::Parse { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut text = String::new();
                    io::stdin().read_to_string(&mut text)?;
                    text
                }
            };
            let tracker = ErrorTracker::new(config);
            serde_json::to_value(tracker.parse_stack_text(&text))?
        }
        Commands::Inspect { path } => serde_json::to_value(read_image_file(path)?)?,
        Commands::Uuid { text } => json!(normalize_uuid(text)),
        Commands::Classify { module } => json!({ "module": module, "in_app": is_in_app(module, &config) }),
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");
    Ok(())
}

fn build_config(cli: &Cli) -> ErrorTrackingConfig
{
    let mut builder = ErrorTrackingConfig::builder().apply_env(ENV_PREFIX);
    for prefix in &cli.includes {
        builder = builder.include(prefix.as_str());
    }
    for prefix in &cli.excludes {
        builder = builder.exclude(prefix.as_str());
    }
    if cli.not_in_app_by_default {
        builder = builder.in_app_by_default(false);
    }
    builder.build()
}
