#![warn(unused_extern_crates)]
use anyhow::{Context, Error, Result};
use clap::{Args, Parser, ValueEnum};
use picplate::analysis::ImageAnalysis;
use picplate::gemini::{GenerateContentRequest, Part};
use picplate::redact::{DEFAULT_JPEG_QUALITY, Redactor};
use picplate::vision::{AnnotateImageResponse, detect_and_redact};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{Level, debug, info, span, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CmdArgs {
    /// Image to redact
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the redacted image (same format as the input)
    #[arg(short, long)]
    output: PathBuf,

    /// Saved Vision API response for the input image. Without it no faces
    /// are known and the image is copied unchanged
    #[arg(short, long, value_name = "FILE")]
    faces: Option<PathBuf>,

    /// Fill colour for face boxes, as RRGGBB
    #[arg(long, default_value = "000000", value_parser = parse_hex_color)]
    fill: [u8; 3],

    /// Quality used when re-encoding JPEG input
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Also write the image analysis JSON body to this file
    #[arg(short, long, value_name = "FILE")]
    analysis: Option<PathBuf>,

    #[command(flatten)]
    request: RequestArgs,
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Write a Gemini generateContent body carrying the redacted image to this file
    #[arg(long, value_name = "FILE", requires = "prompt")]
    request_out: Option<PathBuf>,

    /// Prompt text for the Gemini request
    #[arg(long, requires = "request_out")]
    prompt: Option<String>,

    /// Which request preset to use
    #[arg(long, value_enum, default_value_t = RequestKind::Recipe)]
    kind: RequestKind,

    /// Sampling temperature for recipe requests
    #[arg(long)]
    temperature: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RequestKind {
    Recipe,
    Restaurants,
}

fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_env_filter(filter)
        .init();

    let args = CmdArgs::parse();

    let redactor = Redactor::new()
        .with_fill(args.fill)
        .with_jpeg_quality(args.jpeg_quality);

    let response = match &args.faces {
        Some(path) => AnnotateImageResponse::from_file(path)?,
        None => {
            debug!("No Vision response given, assuming no faces");
            AnnotateImageResponse::default()
        }
    };

    process_image(&args, &response, &redactor)
}

fn process_image(
    args: &CmdArgs,
    response: &AnnotateImageResponse,
    redactor: &Redactor,
) -> Result<()> {
    let span = span!(Level::INFO, "process_image");
    let _guard = span.enter();
    let start = Instant::now();

    let image = read(&args.input)?;
    let redacted = detect_and_redact(response, redactor, &image);
    if *redacted == *image && !response.face_annotations.is_empty() {
        warn!("Faces were reported but the image is unchanged");
    }
    write(&args.output, &redacted)?;
    info!("Redacted image at {:?}", args.output);

    if let Some(path) = &args.analysis {
        let analysis = ImageAnalysis::with_processed(response, &redacted);
        write(path, serde_json::to_string_pretty(&analysis)?.as_bytes())?;
        info!("Analysis at {path:?}");
    }

    if let (Some(path), Some(prompt)) = (&args.request.request_out, &args.request.prompt) {
        let request = match args.request.kind {
            RequestKind::Recipe => GenerateContentRequest::recipe(prompt, args.request.temperature),
            RequestKind::Restaurants => GenerateContentRequest::restaurants(prompt),
        }
        .with_part(Part::inline_data(&redacted));
        write(path, request.to_json()?.as_bytes())?;
        info!("Gemini request at {path:?}");
    }

    debug!("Took {:?}", start.elapsed());
    Ok(())
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

fn parse_hex_color(s: &str) -> Result<[u8; 3]> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(Error::msg(format!("expected RRGGBB, got {s:?}")));
    }

    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .with_context(|| format!("invalid hex colour {s:?}"))
    };

    Ok([channel(0)?, channel(2)?, channel(4)?])
}
