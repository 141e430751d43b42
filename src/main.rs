use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use codraw::canvas::{Canvas, SurfaceError};
use codraw::genai::GenClient;
use codraw::genai::config::GenConfig;
use codraw::genai::types::{GenError, ImageModel};
use codraw::sketch::{SketchError, SketchScript};
use codraw::studio::credentials::{CredentialProvider, EnvCredentials};
use codraw::studio::error::SubmitError;
use codraw::studio::usage::{FileStore, UsageCounter};
use codraw::studio::{Studio, SubmitOutcome};
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Gen(#[from] GenError),
    #[error("{}", .0.display_message())]
    Submit(#[from] SubmitError),
    #[error("canvas: {0}")]
    Surface(#[from] SurfaceError),
    #[error("{0}")]
    Sketch(#[from] SketchError),
    #[error("invalid pen color '{0}' (expected #RGB or #RRGGBB)")]
    InvalidColor(String),
    #[error("read {}: {source}", .path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Gen(e) => e.error_code(),
            Self::Submit(e) => e.error_code(),
            Self::Surface(_) => "E_SURFACE",
            Self::Sketch(_) => "E_SKETCH",
            Self::InvalidColor(_) => "E_INVALID_COLOR",
            Self::Read { .. } | Self::Io(_) => "E_IO",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "codraw", about = "Sketch on a canvas and have an image model redraw it")]
struct Cli {
    /// JSON file holding the persisted usage counter.
    #[arg(long, env = "CODRAW_STATE", default_value = ".codraw/state.json", global = true)]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send the canvas and a prompt for generation and export the result.
    Generate(GenerateArgs),
    /// Compose the canvas locally and export it without calling the model.
    Render(CanvasArgs),
    /// Show or reset the generation counter.
    Usage {
        #[arg(long, default_value_t = false)]
        reset: bool,
    },
}

#[derive(Args, Debug)]
struct CanvasArgs {
    /// Image to letterbox as the starting background.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Stroke script to replay before exporting or submitting.
    #[arg(long)]
    sketch: Option<PathBuf>,

    /// Initial pen color.
    #[arg(long)]
    color: Option<String>,

    /// Directory the PNG is written to.
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long, short)]
    prompt: String,

    /// Model id or alias (`flash`, `pro`); defaults to `GEN_MODEL`.
    #[arg(long)]
    model: Option<ImageModel>,

    #[command(flatten)]
    canvas: CanvasArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt::init();
    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "failed to load .env");
        }
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Generate(args) => run_generate(&cli.state, args).await,
        Command::Render(args) => run_render(args).await,
        Command::Usage { reset } => run_usage(&cli.state, reset),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, code = e.error_code(), "codraw failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_generate(state: &Path, args: GenerateArgs) -> Result<(), CliError> {
    let config = match GenConfig::from_env() {
        Ok(config) => config,
        Err(GenError::MissingApiKey { var }) => {
            EnvCredentials::new(var.clone()).open_selector().await;
            return Err(GenError::MissingApiKey { var }.into());
        }
        Err(e) => return Err(e.into()),
    };
    let credentials = Arc::new(EnvCredentials::new(config.api_key_env.clone()));
    let client = GenClient::from_config(config)?;
    let model = args.model.unwrap_or(client.model());

    let usage = UsageCounter::load(Arc::new(FileStore::open(state)));
    let canvas = prepare_canvas(&args.canvas).await?;
    let studio = Studio::new(Arc::new(client), usage)
        .with_canvas(canvas)
        .with_credentials(credentials);
    studio.select_model(model);
    studio.check_credentials().await;

    let outcome = match studio.submit(&args.prompt).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.is_surfaced() && studio.needs_credential() {
                studio.select_credential().await;
            }
            return Err(e.into());
        }
    };

    match outcome {
        SubmitOutcome::Generated { mime_type, placement } => {
            if placement.is_none() {
                warn!(%mime_type, "generated image could not be shown; exporting the submitted canvas");
            }
            let canvas = studio.canvas();
            let guard = canvas.lock().await;
            let path = export(&*guard, &args.canvas.out).await?;
            println!("{}", path.display());
            println!("generations: {} ({}%)", studio.usage_count(), studio.usage_progress());
        }
        SubmitOutcome::Skipped => println!("nothing submitted"),
    }
    Ok(())
}

async fn run_render(args: CanvasArgs) -> Result<(), CliError> {
    let canvas = prepare_canvas(&args).await?;
    let path = export(&canvas, &args.out).await?;
    println!("{}", path.display());
    Ok(())
}

fn run_usage(state: &Path, reset: bool) -> Result<(), CliError> {
    let store = Arc::new(FileStore::open(state));
    let mut usage = UsageCounter::load(store);
    if reset {
        usage.reset();
        info!(path = %state.display(), "usage reset");
    }
    println!("generations: {} ({}%)", usage.count(), usage.progress_percent());
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

/// Mount a canvas and apply the background, pen color and sketch in order.
async fn prepare_canvas(args: &CanvasArgs) -> Result<Canvas, CliError> {
    let mut canvas = Canvas::new();
    canvas.initialize();

    if let Some(path) = &args.background {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| CliError::Read { path: path.clone(), source })?;
        canvas.set_background(&bytes)?;
    }
    if let Some(color) = &args.color {
        if !canvas.set_pen_color(color) {
            return Err(CliError::InvalidColor(color.clone()));
        }
    }
    if let Some(path) = &args.sketch {
        let strokes = SketchScript::load(path)?.replay(&mut canvas)?;
        info!(path = %path.display(), strokes, "sketch applied");
    }
    Ok(canvas)
}

async fn export(canvas: &Canvas, dir: &Path) -> Result<PathBuf, CliError> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(canvas.export_png(dir)?)
}
