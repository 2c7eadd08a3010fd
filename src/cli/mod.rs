//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `run <FILE>` -- upload a file, optionally preprocess/augment it, and
//!   write the workbench page
//! - `classify <FILE>...` -- print the media category of each file
//! - `config show|path` -- inspect configuration
//! - `version` -- print build/version info

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::config::{self, ClientConfig, TransportMode};
use crate::error::{ClientError, ErrorKind};
use crate::media::{MediaCategory, UploadedFile};
use crate::render::page::PageOptions;
use crate::render::MediaBlob;
use crate::server;
use crate::workflow::{Controller, Controls, NoticeLevel};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Workbench client for a media preprocessing and augmentation backend.
#[derive(Parser, Debug)]
#[command(
    name = "mediaprep",
    version = env!("CARGO_PKG_VERSION"),
    about = "Upload media to a preprocessing backend and render the results"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a file, run actions on it, and write the resulting page.
    Run(RunArgs),

    /// Print the media category of each file.
    Classify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// File to upload.
    pub file: PathBuf,

    /// Preprocess the file after upload.
    #[arg(long)]
    pub preprocess: bool,

    /// Augment the file (after preprocessing, if both are given).
    #[arg(long)]
    pub augment: bool,

    /// Answer from built-in sample data; no backend needed.
    #[arg(long, conflicts_with = "fallback")]
    pub fixtures: bool,

    /// Use the backend, falling back to sample data when it is unavailable.
    #[arg(long)]
    pub fallback: bool,

    /// Backend origin (overrides config and MEDIAPREP_BASE_URL).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Do not fetch a CSRF token.
    #[arg(long)]
    pub no_csrf: bool,

    #[command(flatten)]
    pub controls: ControlArgs,

    /// Write the page here instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Save every decoded media blob into this directory.
    #[arg(long, value_name = "DIR")]
    pub save_media: Option<PathBuf>,

    /// Write processed text to this file.
    #[arg(long, value_name = "FILE")]
    pub export_text: Option<PathBuf>,

    /// Serve the page on this port after running.
    #[arg(long, value_name = "PORT")]
    pub serve: Option<u16>,

    /// Address to bind when serving.
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,
}

/// Control overrides. Flags that do not apply to the file's category are ignored.
#[derive(Args, Debug, Default, Clone)]
pub struct ControlArgs {
    #[arg(long, help_heading = "Image")]
    pub resize_width: Option<u32>,
    #[arg(long, help_heading = "Image")]
    pub resize_height: Option<u32>,
    #[arg(long, help_heading = "Image")]
    pub grayscale: bool,
    #[arg(long, help_heading = "Image")]
    pub flip: bool,
    #[arg(long, help_heading = "Image")]
    pub rotate: bool,
    /// Brightness delta in -1.0..=1.0.
    #[arg(long, allow_hyphen_values = true, help_heading = "Image")]
    pub brightness: Option<f64>,

    /// Normalize colors (image) or levels (audio).
    #[arg(long, value_name = "BOOL")]
    pub normalize: Option<bool>,

    #[arg(long, value_name = "BOOL", help_heading = "Audio")]
    pub remove_silence: Option<bool>,
    #[arg(long, value_name = "BOOL", help_heading = "Audio")]
    pub reduce_noise: Option<bool>,
    /// Speed ratio in 0.5..=2.0.
    #[arg(long, help_heading = "Audio")]
    pub speed: Option<f64>,
    /// Semitones in -12..=12.
    #[arg(long, allow_hyphen_values = true, help_heading = "Audio")]
    pub pitch_shift: Option<i32>,

    #[arg(long, value_name = "BOOL", help_heading = "Mesh")]
    pub remove_duplicates: Option<bool>,
    #[arg(long, value_name = "BOOL", help_heading = "Mesh")]
    pub fix_normals: Option<bool>,
    #[arg(long, value_name = "BOOL", help_heading = "Mesh")]
    pub fill_holes: Option<bool>,
}

impl ControlArgs {
    pub fn apply(&self, controls: &mut Controls) {
        match controls {
            Controls::Image(c) => {
                if self.resize_width.is_some() {
                    c.resize_width = self.resize_width;
                }
                if self.resize_height.is_some() {
                    c.resize_height = self.resize_height;
                }
                c.grayscale |= self.grayscale;
                c.flip |= self.flip;
                c.rotate |= self.rotate;
                if let Some(v) = self.brightness {
                    c.brightness = v;
                }
                if let Some(v) = self.normalize {
                    c.normalize = v;
                }
            }
            Controls::Audio(c) => {
                if let Some(v) = self.normalize {
                    c.normalize = v;
                }
                if let Some(v) = self.remove_silence {
                    c.remove_silence = v;
                }
                if let Some(v) = self.reduce_noise {
                    c.reduce_noise = v;
                }
                if let Some(v) = self.speed {
                    c.speed = v;
                }
                if let Some(v) = self.pitch_shift {
                    c.pitch_shift = v;
                }
            }
            Controls::Text => {}
            Controls::Mesh(c) => {
                if let Some(v) = self.remove_duplicates {
                    c.remove_duplicates = v;
                }
                if let Some(v) = self.fix_normals {
                    c.fix_normals = v;
                }
                if let Some(v) = self.fill_holes {
                    c.fill_holes = v;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

/// Dispatch a parsed command line.
pub async fn run(cli: Cli, config: ClientConfig) -> CliResult {
    match cli.command {
        Command::Run(args) => handle_run(args, config).await,
        Command::Classify { files } => {
            handle_classify(&files);
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => handle_config_show(&config),
        Command::Config(ConfigCommand::Path) => {
            handle_config_path();
            Ok(())
        }
        Command::Version => {
            handle_version();
            Ok(())
        }
    }
}

/// Apply `run` flags on top of the loaded configuration.
pub fn effective_config(
    args: &RunArgs,
    mut config: ClientConfig,
) -> Result<ClientConfig, ClientError> {
    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }
    if args.fixtures {
        config.transport = TransportMode::Fixtures;
    } else if args.fallback {
        config.transport = TransportMode::LiveWithFallback;
    }
    if args.no_csrf {
        config.csrf = false;
    }
    config
        .validated_base_url()
        .map_err(|e| ClientError::Config(e.to_string()))?;
    Ok(config)
}

/// Run the `run` subcommand.
pub async fn handle_run(args: RunArgs, config: ClientConfig) -> CliResult {
    let config = effective_config(&args, config)?;
    let controller = Arc::new(Controller::from_config(&config)?);
    let file = UploadedFile::from_path(&args.file).await?;
    let category = file.category();

    let mut first_error: Option<ClientError> = None;
    let selected = controller.select_file(file).await;
    report_notice(&controller);
    match selected {
        Ok(_) => {}
        // Nothing became active; there is nothing else to do.
        Err(err) if err.kind() == ErrorKind::UserInput => return Err(err.into()),
        Err(err) => first_error = Some(err),
    }

    if let Some(category) = category {
        controller.update_controls(|controls| args.controls.apply(controls))?;
        if args.preprocess {
            if let Err(err) = controller.preprocess(category).await {
                first_error.get_or_insert(err);
            }
            report_notice(&controller);
        }
        if args.augment {
            if let Err(err) = controller.augment(category).await {
                first_error.get_or_insert(err);
            }
            report_notice(&controller);
        }
    }

    let page = controller.render_page(&PageOptions::default());
    match &args.out {
        Some(path) => {
            tokio::fs::write(path, &page).await?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{page}"),
    }

    if let Some(dir) = &args.save_media {
        let blobs: Vec<MediaBlob> =
            controller.with_surface(|s| s.blobs().iter().cloned().collect());
        for path in save_blobs(dir, &blobs).await? {
            eprintln!("Saved {}", path.display());
        }
    }

    if let Some(path) = &args.export_text {
        match controller.with_surface(|s| s.text_export().cloned()) {
            Some(export) => {
                export.write_to(path).await?;
                eprintln!("Wrote {} ({})", path.display(), export.filename);
            }
            None => eprintln!("No processed text to export"),
        }
    }

    if let Some(port) = args.serve {
        eprintln!("Serving on http://{}:{}/ (Ctrl-C to stop)", args.bind, port);
        server::serve(controller.clone(), PageOptions::default(), &args.bind, port).await?;
    }

    match first_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn report_notice(controller: &Controller) {
    if let Some(notice) = controller.notice() {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Danger => "error",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
}

/// Write each blob as `<label>.<ext>` under `dir`.
async fn save_blobs(dir: &Path, blobs: &[MediaBlob]) -> std::io::Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;
    let mut written = Vec::with_capacity(blobs.len());
    for blob in blobs {
        let path = dir.join(blob_file_name(blob));
        tokio::fs::write(&path, &blob.bytes).await?;
        written.push(path);
    }
    written.sort();
    Ok(written)
}

fn blob_file_name(blob: &MediaBlob) -> String {
    let stem: String = blob
        .label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let essence = blob.mime.split(';').next().unwrap_or_default();
    let ext = match essence {
        "audio/wav" => "wav",
        "audio/mpeg" => "mp3",
        "image/jpeg" => "jpg",
        "text/plain" => "txt",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("bin"),
    };
    let id = blob.id.simple().to_string();
    format!("{stem}_{}.{ext}", &id[..8])
}

/// Run the `classify` subcommand.
pub fn handle_classify(files: &[PathBuf]) {
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let category = MediaCategory::classify(&name)
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unsupported".to_string());
        println!("{}\t{}", path.display(), category);
    }
}

/// Run the `config show` subcommand.
pub fn handle_config_show(config: &ClientConfig) -> CliResult {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::get_config_path().display());
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("mediaprep {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("MEDIAPREP_BUILD_DATE"));
    println!("  Git commit: {}", env!("MEDIAPREP_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
