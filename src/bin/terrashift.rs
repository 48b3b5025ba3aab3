use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sha2::Digest as _;
use tracing_subscriber::EnvFilter;

use terrashift::{
    FrameIndex, FrameResult, Heightmap, PipelineDoc, ReferenceKernels, RunReport, RunRequest,
    RunSink, Session, SessionId, SessionOpts, TerraError, TerraResult,
};

#[derive(Parser, Debug)]
#[command(name = "terrashift", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check frame coverage of a pipeline and print the report as JSON.
    Validate(ValidateArgs),
    /// Run a pipeline and print one line per computed frame.
    Run(RunArgs),
    /// Compute up to one frame and write it as a 16-bit grayscale PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input pipeline JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input pipeline JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// First frame to compute (default 1).
    #[arg(long)]
    from: Option<u32>,

    /// Last frame to compute (default totalFrames).
    #[arg(long)]
    to: Option<u32>,

    /// Directory for per-frame PNGs.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Wall-clock budget per step call, in milliseconds.
    #[arg(long)]
    budget_ms: Option<u64>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input pipeline JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (frame 0 is the initial terrain).
    #[arg(long)]
    frame: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Print the SHA-256 of the frame's little-endian f32 data.
    #[arg(long)]
    digest: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Run(args) => cmd_run(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn load_session(path: &Path, opts: SessionOpts) -> anyhow::Result<Session> {
    let doc = PipelineDoc::from_path(path)
        .with_context(|| format!("read pipeline '{}'", path.display()))?;
    let session = doc
        .build_session(SessionId(1), Arc::new(ReferenceKernels), opts)
        .with_context(|| format!("load pipeline '{}'", path.display()))?;
    Ok(session)
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let session = load_session(&args.in_path, SessionOpts::default())?;
    let result = session.validate();
    println!("{}", serde_json::to_string_pretty(&result)?);
    result.require_full_coverage()?;
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let opts = SessionOpts {
        step_budget: args.budget_ms.map(Duration::from_millis),
        ..SessionOpts::default()
    };
    let session = load_session(&args.in_path, opts)?;
    if let Some(dir) = &args.out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir '{}'", dir.display()))?;
    }

    let req = RunRequest {
        from: args.from.map(FrameIndex),
        to: args.to.map(FrameIndex),
        max_frames: None,
    };
    let mut sink = PrintSink { out_dir: args.out };
    let report = session.run(req, &mut sink)?;
    eprintln!(
        "{}: {} frame(s) computed, high water {}",
        report.status, report.frames_computed, report.high_water
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let session = load_session(&args.in_path, SessionOpts::default())?;
    let frame = FrameIndex(args.frame);
    if frame.0 > 0 {
        session.run(RunRequest::until(frame.0), &mut terrashift::NullSink)?;
    }
    let hm = session
        .get_frame(frame)
        .with_context(|| format!("frame {frame} was not computed"))?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    write_png(&hm, &args.out)?;
    eprintln!("wrote {}", args.out.display());

    if args.digest {
        println!("{}", sha256_hex(&hm.to_le_bytes()));
    }
    Ok(())
}

/// Prints frame summaries and optionally writes each frame as a PNG.
struct PrintSink {
    out_dir: Option<PathBuf>,
}

impl RunSink for PrintSink {
    fn push_frame(&mut self, r: &FrameResult) -> TerraResult<()> {
        let jobs: Vec<&str> = r.jobs_applied.iter().map(|j| j.as_str()).collect();
        println!(
            "frame {:>5}  min {:>10.4}  max {:>10.4}  mean {:>10.4}  {}  [{}]",
            r.frame.0,
            r.stats.min,
            r.stats.max,
            r.stats.mean,
            r.fingerprint,
            jobs.join(", ")
        );
        if let Some(dir) = &self.out_dir {
            let path = dir.join(format!("frame_{:05}.png", r.frame.0));
            write_png(&r.heightmap, &path).map_err(TerraError::Other)?;
        }
        Ok(())
    }

    fn end(&mut self, report: &RunReport) -> TerraResult<()> {
        tracing::debug!(frames = report.frames_computed, "sink closed");
        Ok(())
    }
}

/// Write `hm` as 16-bit grayscale, normalised to the frame's own min/max.
fn write_png(hm: &Heightmap, path: &Path) -> anyhow::Result<()> {
    let stats = hm.stats();
    let span = stats.max - stats.min;
    let pixels: Vec<u16> = hm
        .data()
        .iter()
        .map(|&v| {
            if span > 0.0 {
                (((v - stats.min) / span).clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16
            } else {
                0
            }
        })
        .collect();
    let img = image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_raw(
        hm.width(),
        hm.height(),
        pixels,
    )
    .context("heightmap buffer does not match its dimensions")?;
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
